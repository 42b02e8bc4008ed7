//! Agent configuration
//!
//! Environment variables consumed here:
//! - `TELOS_API_KEY` / `TELOS_API_ENDPOINT`: handed to the LLM transport
//! - `TELOS_APPROVAL_MODE`: `interactive` | `auto_edit` | `yolo`
//! - `TELOS_MONITOR_ENABLED`: enables the observability bridge
//! - `TELOS_WORKING_DIR`: working directory for tool side effects
//! - `TELOS_MAX_CONCURRENCY`: executor worker ceiling

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// How side-effecting tools are gated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalMode {
    /// Every side-effecting tool requires an explicit decision
    #[default]
    Interactive,
    /// File writes are auto-approved; shell and VCS mutation still gate
    AutoEdit,
    /// Everything is auto-approved
    Yolo,
}

impl ApprovalMode {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interactive => "interactive",
            Self::AutoEdit => "auto_edit",
            Self::Yolo => "yolo",
        }
    }

    /// Whether a tool with these capabilities must go through the gate
    #[must_use]
    pub fn requires_gate(&self, caps: &telos_tools::CapabilitySet) -> bool {
        match self {
            Self::Yolo => false,
            Self::AutoEdit => caps.executes_shell || caps.mutates_vcs,
            Self::Interactive => caps.is_side_effecting(),
        }
    }
}

impl FromStr for ApprovalMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "interactive" => Ok(Self::Interactive),
            "auto_edit" => Ok(Self::AutoEdit),
            "yolo" => Ok(Self::Yolo),
            _ => Err(format!("unknown approval mode: {s}")),
        }
    }
}

impl std::fmt::Display for ApprovalMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Top-level agent configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// LLM API key (handed to the transport, never logged)
    pub api_key: Option<String>,
    /// LLM API endpoint override
    pub api_endpoint: Option<String>,
    /// Approval gating mode
    pub approval_mode: ApprovalMode,
    /// Whether the observability bridge should attach
    pub monitor_enabled: bool,
    /// Working directory for tool side effects
    pub working_dir: PathBuf,
    /// Executor worker ceiling
    pub max_concurrency: usize,
    /// Per-task attempt ceiling
    pub max_attempts: u32,
    /// Timeout for planning LLM calls
    pub planning_timeout: Duration,
    /// Timeout for general chat LLM calls
    pub chat_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_endpoint: None,
            approval_mode: ApprovalMode::default(),
            monitor_enabled: false,
            working_dir: PathBuf::from("."),
            max_concurrency: 3,
            max_attempts: 2,
            planning_timeout: Duration::from_secs(30),
            chat_timeout: Duration::from_secs(60),
        }
    }
}

impl AgentConfig {
    /// Create a new configuration with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from the environment
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(key) = std::env::var("TELOS_API_KEY") {
            if !key.is_empty() {
                config.api_key = Some(key);
            }
        }
        if let Ok(endpoint) = std::env::var("TELOS_API_ENDPOINT") {
            if !endpoint.is_empty() {
                config.api_endpoint = Some(endpoint);
            }
        }
        if let Ok(mode) = std::env::var("TELOS_APPROVAL_MODE") {
            if let Ok(parsed) = mode.parse() {
                config.approval_mode = parsed;
            }
        }
        if let Ok(flag) = std::env::var("TELOS_MONITOR_ENABLED") {
            config.monitor_enabled = matches!(flag.as_str(), "1" | "true" | "yes");
        }
        if let Ok(dir) = std::env::var("TELOS_WORKING_DIR") {
            if !dir.is_empty() {
                config.working_dir = PathBuf::from(dir);
            }
        }
        if let Ok(n) = std::env::var("TELOS_MAX_CONCURRENCY") {
            if let Ok(parsed) = n.parse::<usize>() {
                if parsed > 0 {
                    config.max_concurrency = parsed;
                }
            }
        }

        config
    }

    /// Set the approval mode
    #[must_use]
    pub fn with_approval_mode(mut self, mode: ApprovalMode) -> Self {
        self.approval_mode = mode;
        self
    }

    /// Set the working directory
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Set the executor worker ceiling
    #[must_use]
    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n;
        self
    }

    /// Set the per-task attempt ceiling
    #[must_use]
    pub fn with_max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Enable or disable the observability bridge
    #[must_use]
    pub fn with_monitor(mut self, enabled: bool) -> Self {
        self.monitor_enabled = enabled;
        self
    }
}
