//! Telos Tools - Tool Contract and Registry
//!
//! This crate provides the tool system the Telos agent core executes against:
//! - Schema: typed parameter schemas and capability flags
//! - Registry: tool registration, lookup, and manifest rendering
//! - Validate: argument validation against declared schemas
//! - Classify: mapping tool failures to recovery strategies
//!
//! Tool *implementations* (shell, file, web, git, ...) live outside this
//! workspace; they implement the `Tool` trait and are registered at startup.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod classify;
pub mod error;
pub mod registry;
pub mod schema;
pub mod validate;

pub use classify::{classify_message, FailureClass, RecoveryStrategy};
pub use error::{Error, Result};
pub use registry::{PriorOutputs, Tool, ToolOutcome, ToolRegistry};
pub use schema::{CapabilitySet, ParamKind, ParamSpec, RiskLevel, ToolSpec};
pub use validate::validate_args;
