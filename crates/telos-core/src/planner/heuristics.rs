//! Timeout classes and description splitting

use std::time::Duration;
use telos_tools::ToolSpec;

/// Derive a task timeout from the tool's semantic class.
///
/// Defaults; callers may override per task:
/// deploy/install ≈ 60 s, test ≈ 30 s, shell ≈ 20 s, web/search ≈ 15 s,
/// file ops ≈ 8 s, anything else 20 s.
#[must_use]
pub(crate) fn timeout_for(spec: &ToolSpec, tool_name: &str) -> Duration {
    let name = tool_name.to_lowercase();
    if name.contains("deploy") || name.contains("install") {
        return Duration::from_secs(60);
    }
    if name.contains("test") {
        return Duration::from_secs(30);
    }
    if spec.capabilities.executes_shell {
        return Duration::from_secs(20);
    }
    if spec.capabilities.accesses_network
        || name.contains("web")
        || name.contains("search")
        || name.contains("http")
    {
        return Duration::from_secs(15);
    }
    if spec.capabilities.reads_fs || spec.capabilities.writes_fs {
        return Duration::from_secs(8);
    }
    Duration::from_secs(20)
}

/// Connectives that separate sub-steps inside a compound description
const CONNECTIVES: &[&str] = &[" and then ", " then ", " after that ", " and "];

/// Maximum rounds of splitting applied to one description
const MAX_SPLIT_DEPTH: usize = 3;

/// Split a compound description into sub-steps at natural connectives.
///
/// Runs as an iterative worklist with a fixed depth bound, so pathological
/// descriptions cannot recurse without limit. Returns at least one piece.
#[must_use]
pub(crate) fn split_connectives(description: &str) -> Vec<String> {
    let mut pieces = vec![description.trim().to_string()];

    for _ in 0..MAX_SPLIT_DEPTH {
        let mut next = Vec::with_capacity(pieces.len());
        let mut split_any = false;

        for piece in &pieces {
            match CONNECTIVES
                .iter()
                .find_map(|c| piece.find(c).map(|at| (at, c.len())))
            {
                Some((at, len)) => {
                    let (head, tail) = piece.split_at(at);
                    let tail = &tail[len..];
                    if !head.trim().is_empty() {
                        next.push(head.trim().to_string());
                    }
                    if !tail.trim().is_empty() {
                        next.push(tail.trim().to_string());
                    }
                    split_any = true;
                }
                None => next.push(piece.clone()),
            }
        }

        pieces = next;
        if !split_any {
            break;
        }
    }

    if pieces.is_empty() {
        pieces.push(description.trim().to_string());
    }
    pieces
}

/// Argument keys that usually carry a file path
const PATH_KEYS: &[&str] = &["path", "file", "filename", "target", "dest", "source"];

/// Pull path-like argument values out of an argument object
#[must_use]
pub(crate) fn extract_paths(arguments: &serde_json::Value) -> Vec<String> {
    let mut paths = Vec::new();
    if let Some(object) = arguments.as_object() {
        for key in PATH_KEYS {
            if let Some(value) = object.get(*key).and_then(|v| v.as_str()) {
                paths.push(value.to_string());
            }
        }
    }
    paths
}

/// Replace a path-valued argument equal to `old` with `new`
#[must_use]
pub(crate) fn replace_path(
    arguments: &serde_json::Value,
    old: &str,
    new: &str,
) -> serde_json::Value {
    let mut updated = arguments.clone();
    if let Some(object) = updated.as_object_mut() {
        for key in PATH_KEYS {
            if object.get(*key).and_then(|v| v.as_str()) == Some(old) {
                object.insert((*key).to_string(), serde_json::Value::String(new.to_string()));
            }
        }
    }
    updated
}

/// Whether an argument object describes a write-style file operation
#[must_use]
pub(crate) fn looks_like_write(arguments: &serde_json::Value) -> bool {
    let Some(object) = arguments.as_object() else {
        return false;
    };
    if object.contains_key("content") {
        return true;
    }
    matches!(
        object.get("action").and_then(|v| v.as_str()),
        Some("write" | "append" | "create" | "delete" | "move")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use telos_tools::CapabilitySet;

    #[test]
    fn test_timeout_classes() {
        let web = ToolSpec::new("web", "Search the web").with_capabilities(CapabilitySet {
            accesses_network: true,
            ..CapabilitySet::none()
        });
        assert_eq!(timeout_for(&web, "web"), Duration::from_secs(15));

        let file = ToolSpec::new("file", "Files").with_capabilities(CapabilitySet {
            reads_fs: true,
            writes_fs: true,
            ..CapabilitySet::none()
        });
        assert_eq!(timeout_for(&file, "file"), Duration::from_secs(8));

        let bash = ToolSpec::new("bash", "Shell").with_capabilities(CapabilitySet {
            executes_shell: true,
            ..CapabilitySet::none()
        });
        assert_eq!(timeout_for(&bash, "bash"), Duration::from_secs(20));
        assert_eq!(timeout_for(&bash, "test_runner"), Duration::from_secs(30));
        assert_eq!(timeout_for(&bash, "deploy"), Duration::from_secs(60));
    }

    #[test]
    fn test_split_connectives() {
        let pieces = split_connectives("search for rust then write a report");
        assert_eq!(pieces, vec!["search for rust", "write a report"]);

        let pieces = split_connectives("fetch data and parse it and then save results");
        assert!(pieces.len() >= 3);

        // Nothing to split
        assert_eq!(split_connectives("list files"), vec!["list files"]);
    }

    #[test]
    fn test_split_depth_is_bounded() {
        let long = "a and b and c and d and e and f and g and h";
        let pieces = split_connectives(long);
        // Three rounds of single splits yield at most 4 pieces
        assert!(pieces.len() <= 4, "got {pieces:?}");
    }

    #[test]
    fn test_extract_paths_and_write_detection() {
        let args = serde_json::json!({"action": "write", "path": "out/report.md", "content": "x"});
        assert_eq!(extract_paths(&args), vec!["out/report.md"]);
        assert!(looks_like_write(&args));

        let read = serde_json::json!({"action": "read", "path": "in.txt"});
        assert!(!looks_like_write(&read));
    }
}
