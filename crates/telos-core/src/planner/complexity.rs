//! Advisory complexity scoring
//!
//! The label steers the orchestrator toward a fast path for trivial
//! requests. It never changes task semantics.

use crate::plan::Complexity;
use regex::Regex;
use std::sync::OnceLock;

const TECHNICAL_TERMS: &[&str] = &[
    "api", "database", "deploy", "compile", "test", "server", "docker", "git", "regex", "schema",
    "endpoint", "build", "install", "config", "migration", "refactor",
];

fn numbered_list_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*\d+[.)]\s").unwrap())
}

fn file_op_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(file|write|read|save|create|delete|edit)\b").unwrap())
}

/// Score a prompt and classify it.
///
/// Thresholds: score >= 6 is complex, >= 3 moderate, else simple.
#[must_use]
pub(super) fn classify(prompt: &str) -> Complexity {
    let score = score(prompt);
    if score >= 6 {
        Complexity::Complex
    } else if score >= 3 {
        Complexity::Moderate
    } else {
        Complexity::Simple
    }
}

fn score(prompt: &str) -> usize {
    let lower = prompt.to_lowercase();
    let mut score = 0;

    let words = prompt.split_whitespace().count();
    if words >= 25 {
        score += 2;
    } else if words >= 12 {
        score += 1;
    }

    let connectives = lower.matches(" then ").count()
        + lower.matches(" after that ").count()
        + lower.matches(", and ").count()
        + numbered_list_pattern().find_iter(prompt).count();
    score += connectives.min(3);

    let technical = TECHNICAL_TERMS
        .iter()
        .filter(|term| lower.contains(*term))
        .count();
    score += technical.min(3);

    if file_op_pattern().is_match(prompt) {
        score += 2;
    }

    score
}
