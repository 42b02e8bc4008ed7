//! Typed tool schemas and capability flags
//!
//! Parameter schemas are explicit value objects rather than free-form JSON,
//! so the planner and executor validate against the same declaration the
//! model sees.

use serde::{Deserialize, Serialize};
use telos_llm::ToolManifestEntry;

/// Type tag for a declared parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    /// UTF-8 string
    String,
    /// Integer
    Integer,
    /// Boolean
    Boolean,
    /// One of a fixed set of string values
    Enum(Vec<String>),
    /// Nested JSON object
    Object,
    /// JSON array
    Array,
}

impl ParamKind {
    /// JSON-schema type name for this kind
    #[must_use]
    pub fn json_type(&self) -> &'static str {
        match self {
            Self::String | Self::Enum(_) => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        }
    }

    /// Check a JSON value against this kind
    #[must_use]
    pub fn accepts(&self, value: &serde_json::Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Enum(options) => value
                .as_str()
                .map(|s| options.iter().any(|o| o == s))
                .unwrap_or(false),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
        }
    }
}

/// A single declared parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name
    pub name: String,
    /// Type tag
    pub kind: ParamKind,
    /// Whether the parameter must be present
    pub required: bool,
    /// Human description, surfaced to the model
    pub description: String,
}

impl ParamSpec {
    /// Create a required parameter
    #[must_use]
    pub fn required(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            description: description.into(),
        }
    }

    /// Create an optional parameter
    #[must_use]
    pub fn optional(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            description: description.into(),
        }
    }
}

/// Capability flags describing a tool's side effects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    /// Reads the filesystem
    pub reads_fs: bool,
    /// Writes the filesystem
    pub writes_fs: bool,
    /// Spawns shell processes
    pub executes_shell: bool,
    /// Talks to the network
    pub accesses_network: bool,
    /// Mutates version-control state
    pub mutates_vcs: bool,
}

impl CapabilitySet {
    /// A tool with no side effects
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Read-only filesystem access
    #[must_use]
    pub fn read_only_fs() -> Self {
        Self {
            reads_fs: true,
            ..Self::default()
        }
    }

    /// Derive the risk level from the flags
    #[must_use]
    pub fn risk(&self) -> RiskLevel {
        if self.executes_shell || self.mutates_vcs {
            RiskLevel::High
        } else if self.writes_fs {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// Whether any flag marks the tool as side-effecting
    #[must_use]
    pub fn is_side_effecting(&self) -> bool {
        self.writes_fs || self.executes_shell || self.mutates_vcs
    }
}

/// Risk level derived from capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Read-only operations
    Low,
    /// Scoped write operations
    Medium,
    /// Shell execution and VCS mutation
    High,
}

impl RiskLevel {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tool metadata and schema, immutable after registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Unique tool name, case-sensitive
    pub name: String,
    /// Human-readable description used in planner prompts
    pub description: String,
    /// Declared parameters
    pub params: Vec<ParamSpec>,
    /// Side-effect flags
    pub capabilities: CapabilitySet,
}

impl ToolSpec {
    /// Create a new spec with no parameters
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
            capabilities: CapabilitySet::none(),
        }
    }

    /// Add a parameter
    #[must_use]
    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Set the capability flags
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: CapabilitySet) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Look up a declared parameter by name
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Names of all required parameters
    #[must_use]
    pub fn required_params(&self) -> Vec<&str> {
        self.params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect()
    }

    /// Render the JSON schema the model sees for this tool's parameters
    #[must_use]
    pub fn json_schema(&self) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        for param in &self.params {
            let mut prop = serde_json::Map::new();
            prop.insert(
                "type".to_string(),
                serde_json::Value::String(param.kind.json_type().to_string()),
            );
            prop.insert(
                "description".to_string(),
                serde_json::Value::String(param.description.clone()),
            );
            if let ParamKind::Enum(options) = &param.kind {
                prop.insert(
                    "enum".to_string(),
                    serde_json::Value::Array(
                        options
                            .iter()
                            .map(|o| serde_json::Value::String(o.clone()))
                            .collect(),
                    ),
                );
            }
            properties.insert(param.name.clone(), serde_json::Value::Object(prop));
        }

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": self.required_params(),
        })
    }

    /// Render this spec as an LLM manifest entry
    #[must_use]
    pub fn manifest_entry(&self) -> ToolManifestEntry {
        ToolManifestEntry::new(&self.name, &self.description, self.json_schema())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_spec() -> ToolSpec {
        ToolSpec::new("file", "Read and write files")
            .with_param(ParamSpec::required(
                "action",
                ParamKind::Enum(vec!["read".into(), "write".into()]),
                "Operation to perform",
            ))
            .with_param(ParamSpec::required("path", ParamKind::String, "Target path"))
            .with_param(ParamSpec::optional(
                "content",
                ParamKind::String,
                "Content for write",
            ))
            .with_capabilities(CapabilitySet {
                reads_fs: true,
                writes_fs: true,
                ..CapabilitySet::none()
            })
    }

    #[test]
    fn test_param_kind_accepts() {
        assert!(ParamKind::String.accepts(&serde_json::json!("x")));
        assert!(!ParamKind::String.accepts(&serde_json::json!(3)));
        assert!(ParamKind::Integer.accepts(&serde_json::json!(3)));
        assert!(ParamKind::Boolean.accepts(&serde_json::json!(true)));

        let e = ParamKind::Enum(vec!["read".into(), "write".into()]);
        assert!(e.accepts(&serde_json::json!("read")));
        assert!(!e.accepts(&serde_json::json!("delete")));
    }

    #[test]
    fn test_risk_from_capabilities() {
        assert_eq!(CapabilitySet::none().risk(), RiskLevel::Low);
        assert_eq!(CapabilitySet::read_only_fs().risk(), RiskLevel::Low);

        let writer = CapabilitySet {
            writes_fs: true,
            ..CapabilitySet::none()
        };
        assert_eq!(writer.risk(), RiskLevel::Medium);
        assert!(writer.is_side_effecting());

        let shell = CapabilitySet {
            executes_shell: true,
            ..CapabilitySet::none()
        };
        assert_eq!(shell.risk(), RiskLevel::High);
    }

    #[test]
    fn test_json_schema_render() {
        let schema = file_spec().json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["path"]["type"], "string");
        assert_eq!(schema["properties"]["action"]["enum"][0], "read");

        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(required, vec!["action", "path"]);
    }

    #[test]
    fn test_manifest_entry() {
        let entry = file_spec().manifest_entry();
        assert_eq!(entry.name, "file");
        assert!(entry.parameters.get("properties").is_some());
    }
}
