//! Tool types for LLM function calling

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A tool entry as presented to the model: name, description, and a JSON
/// schema for its parameters. The agent core renders these from its typed
/// tool registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolManifestEntry {
    /// Tool name
    pub name: String,
    /// Tool description
    pub description: String,
    /// JSON schema for parameters
    pub parameters: serde_json::Value,
}

impl ToolManifestEntry {
    /// Create a new manifest entry
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// A tool call requested by the LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Unique ID for this tool call
    pub id: String,
    /// Tool name
    pub name: String,
    /// Arguments as a JSON string
    pub arguments: String,
}

impl ToolCallRequest {
    /// Parse arguments as a typed value
    pub fn parse_arguments<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.arguments).map_err(|e| Error::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_entry() {
        let entry = ToolManifestEntry::new(
            "file",
            "Read and write files",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string"}
                },
                "required": ["path"]
            }),
        );

        assert_eq!(entry.name, "file");
        assert!(entry.parameters.get("required").is_some());
    }

    #[test]
    fn test_tool_call_parse_arguments() {
        let call = ToolCallRequest {
            id: "call_123".to_string(),
            name: "web".to_string(),
            arguments: r#"{"query": "rust schedulers"}"#.to_string(),
        };

        #[derive(Deserialize)]
        struct Args {
            query: String,
        }

        let args: Args = call.parse_arguments().unwrap();
        assert_eq!(args.query, "rust schedulers");
    }
}
