//! Content synthesis for dependent file writes
//!
//! When a file-write task depends on earlier tasks, its `content` argument
//! is usually a placeholder: the model planned the write before the inputs
//! existed. This module composes real content from the dependency outputs —
//! through the LLM when one is wired in, otherwise by extracting structure
//! (numbers, URLs, headings) and assembling a report. The target path and
//! the call set are never changed.

use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;
use telos_llm::{ChatRequest, LlmClient, Message};
use telos_tools::{PriorOutputs, ToolSpec};
use tracing::{debug, warn};

use crate::planner::heuristics::looks_like_write;

/// Timeout for the grounded-synthesis LLM call
const SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest excerpt carried per dependency output
const MAX_EXCERPT_CHARS: usize = 400;

fn number_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d+(?:\.\d+)?%?\b").unwrap())
}

fn url_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://[^\s\x22\x27<>)]+").unwrap())
}

fn heading_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^#{1,3}\s+(.+)$").unwrap())
}

/// Whether a call is a file write eligible for enrichment
#[must_use]
pub(super) fn is_file_write(spec: &ToolSpec, arguments: &serde_json::Value) -> bool {
    spec.capabilities.writes_fs
        && looks_like_write(arguments)
        && arguments.get("content").is_some()
}

/// Produce an enriched argument object with `content` composed from the
/// dependency outputs.
pub(super) async fn enrich_content(
    arguments: serde_json::Value,
    description: &str,
    prior: &PriorOutputs,
    client: Option<&dyn LlmClient>,
) -> serde_json::Value {
    let content = match client {
        Some(client) => match llm_content(description, prior, client).await {
            Some(content) => content,
            None => heuristic_content(description, prior),
        },
        None => heuristic_content(description, prior),
    };

    let mut enriched = arguments;
    if let Some(object) = enriched.as_object_mut() {
        object.insert("content".to_string(), serde_json::Value::String(content));
    }
    enriched
}

/// Ask the LLM for content grounded in the prior outputs
async fn llm_content(
    description: &str,
    prior: &PriorOutputs,
    client: &dyn LlmClient,
) -> Option<String> {
    let mut grounding = String::new();
    for (task_id, output) in prior.iter() {
        grounding.push_str(&format!("### Output of {task_id}\n{output}\n\n"));
    }

    let system = format!(
        "Compose the file content for this step: {description}\n\
         Ground every statement in the results below. Do not invent facts.\n\
         Reply with the file content only, no preamble.\n\n{grounding}"
    );
    let request = ChatRequest::new(vec![Message::system(system)]).with_max_tokens(1024);

    match tokio::time::timeout(SYNTHESIS_TIMEOUT, client.chat(request)).await {
        Ok(Ok(response)) if !response.content.trim().is_empty() => {
            debug!("Content synthesized via llm");
            Some(response.content)
        }
        Ok(Ok(_)) => None,
        Ok(Err(e)) => {
            warn!(error = %e, "Content synthesis call failed, using extraction");
            None
        }
        Err(_) => {
            warn!("Content synthesis call timed out, using extraction");
            None
        }
    }
}

/// Compose a report by extracting structure from the prior outputs
fn heuristic_content(description: &str, prior: &PriorOutputs) -> String {
    let mut numbers = Vec::new();
    let mut urls = Vec::new();
    let mut headings = Vec::new();
    let mut excerpts = Vec::new();

    for (task_id, output) in prior.iter() {
        let text = match output {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };

        for m in number_pattern().find_iter(&text).take(8) {
            let v = m.as_str().to_string();
            if !numbers.contains(&v) {
                numbers.push(v);
            }
        }
        for m in url_pattern().find_iter(&text).take(8) {
            let v = m.as_str().to_string();
            if !urls.contains(&v) {
                urls.push(v);
            }
        }
        for c in heading_pattern().captures_iter(&text).take(8) {
            let v = c[1].trim().to_string();
            if !headings.contains(&v) {
                headings.push(v);
            }
        }

        let excerpt: String = text.chars().take(MAX_EXCERPT_CHARS).collect();
        excerpts.push((task_id.to_string(), excerpt));
    }

    let mut report = format!("# {description}\n\n");
    if !headings.is_empty() {
        report.push_str("## Topics\n");
        for heading in &headings {
            report.push_str(&format!("- {heading}\n"));
        }
        report.push('\n');
    }
    if !numbers.is_empty() {
        report.push_str("## Key figures\n");
        for number in &numbers {
            report.push_str(&format!("- {number}\n"));
        }
        report.push('\n');
    }
    if !urls.is_empty() {
        report.push_str("## Sources\n");
        for url in &urls {
            report.push_str(&format!("- {url}\n"));
        }
        report.push('\n');
    }
    report.push_str("## Source excerpts\n");
    for (task_id, excerpt) in &excerpts {
        report.push_str(&format!("### {task_id}\n{excerpt}\n\n"));
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use telos_tools::CapabilitySet;

    fn write_spec() -> ToolSpec {
        ToolSpec::new("file", "Files").with_capabilities(CapabilitySet {
            reads_fs: true,
            writes_fs: true,
            ..CapabilitySet::none()
        })
    }

    #[test]
    fn test_is_file_write() {
        let spec = write_spec();
        let write = serde_json::json!({"action": "write", "path": "r.md", "content": "x"});
        assert!(is_file_write(&spec, &write));

        let read = serde_json::json!({"action": "read", "path": "r.md"});
        assert!(!is_file_write(&spec, &read));

        let read_only_spec = ToolSpec::new("web", "Web").with_capabilities(CapabilitySet {
            accesses_network: true,
            ..CapabilitySet::none()
        });
        assert!(!is_file_write(&read_only_spec, &write));
    }

    #[test]
    fn test_heuristic_content_extracts_structure() {
        let prior = PriorOutputs::from_iter(vec![(
            "task-1".to_string(),
            serde_json::json!({
                "results": "Rust 1.88 released. See https://blog.rust-lang.org for 3 highlights.\n# Release notes"
            }),
        )]);

        let content = heuristic_content("write a report", &prior);
        assert!(content.contains("# write a report"));
        assert!(content.contains("https://blog.rust-lang.org"));
        assert!(content.contains("1.88"));
        assert!(content.contains("### task-1"));
    }

    #[tokio::test]
    async fn test_enrich_preserves_path() {
        let prior = PriorOutputs::from_iter(vec![(
            "task-1".to_string(),
            serde_json::json!("the answer is 42"),
        )]);
        let args = serde_json::json!({"action": "write", "path": "r.md", "content": "placeholder"});

        let enriched = enrich_content(args, "summarize findings", &prior, None).await;
        assert_eq!(enriched["path"], "r.md");
        assert_eq!(enriched["action"], "write");
        let content = enriched["content"].as_str().unwrap();
        assert!(content.contains("42"));
        assert_ne!(content, "placeholder");
    }
}
