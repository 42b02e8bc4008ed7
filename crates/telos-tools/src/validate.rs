//! Argument validation against declared schemas
//!
//! Both the planner (at plan materialization) and the executor (immediately
//! before dispatch) validate through this module, so a plan that passed
//! planning cannot later reach a handler with malformed arguments.

use crate::error::{Error, Result};
use crate::schema::ToolSpec;

/// Validate a JSON argument object against a tool's declared schema.
///
/// Checks, in order: the value is an object; every required parameter is
/// present; every present parameter is declared; every value matches its
/// declared kind.
pub fn validate_args(spec: &ToolSpec, args: &serde_json::Value) -> Result<()> {
    let object = args.as_object().ok_or_else(|| Error::BadArguments {
        tool: spec.name.clone(),
        reason: "arguments must be a JSON object".to_string(),
    })?;

    for required in spec.required_params() {
        if !object.contains_key(required) {
            return Err(Error::BadArguments {
                tool: spec.name.clone(),
                reason: format!("missing required parameter '{required}'"),
            });
        }
    }

    for (name, value) in object {
        let param = spec.param(name).ok_or_else(|| Error::BadArguments {
            tool: spec.name.clone(),
            reason: format!("unknown parameter '{name}'"),
        })?;

        if !param.kind.accepts(value) {
            return Err(Error::BadArguments {
                tool: spec.name.clone(),
                reason: format!(
                    "parameter '{name}' expects {}, got {value}",
                    param.kind.json_type()
                ),
            });
        }
    }

    Ok(())
}
