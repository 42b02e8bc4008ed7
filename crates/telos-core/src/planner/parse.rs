//! Parsing the model's plan JSON
//!
//! Models wrap JSON in code fences or prose despite instructions, so the
//! parser extracts the outermost object before deserializing.

use serde::Deserialize;

/// One of the two reply shapes the planning prompt allows
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub(super) enum PlanShape {
    /// Direct answer, no tools
    Conversation {
        /// The answer text
        response: String,
    },
    /// Multi-step work
    Tasks {
        /// Planned steps in declared order
        plan: Vec<StepShape>,
    },
}

/// A single planned step as the model wrote it
#[derive(Debug, Deserialize)]
pub(super) struct StepShape {
    #[serde(default)]
    pub id: Option<String>,
    pub description: String,
    pub tool: String,
    #[serde(default)]
    pub args: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub success_criteria: Option<String>,
}

/// Parse a plan shape out of raw model output
pub(super) fn parse_plan_shape(content: &str) -> Result<PlanShape, String> {
    let json = extract_object(content).ok_or_else(|| "no JSON object found".to_string())?;
    serde_json::from_str(json).map_err(|e| e.to_string())
}

/// Parse a bare JSON object (argument re-synthesis replies)
pub(crate) fn parse_json_object(content: &str) -> Result<serde_json::Value, String> {
    let json = extract_object(content).ok_or_else(|| "no JSON object found".to_string())?;
    let value: serde_json::Value = serde_json::from_str(json).map_err(|e| e.to_string())?;
    if value.is_object() {
        Ok(value)
    } else {
        Err("expected a JSON object".to_string())
    }
}

/// Slice out the outermost `{ ... }`, tolerating fences and prose around it
fn extract_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&content[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_conversation_shape() {
        let shape = parse_plan_shape(r#"{"type": "conversation", "response": "4"}"#).unwrap();
        match shape {
            PlanShape::Conversation { response } => assert_eq!(response, "4"),
            PlanShape::Tasks { .. } => panic!("wrong shape"),
        }
    }

    #[test]
    fn test_parse_tasks_shape() {
        let raw = r#"{"type": "tasks", "plan": [
            {"id": "task-1", "description": "write file", "tool": "file",
             "args": {"action": "write", "path": "a.txt", "content": "hi"},
             "depends_on": [], "success_criteria": "file exists"}
        ]}"#;
        let shape = parse_plan_shape(raw).unwrap();
        match shape {
            PlanShape::Tasks { plan } => {
                assert_eq!(plan.len(), 1);
                assert_eq!(plan[0].tool, "file");
                assert_eq!(plan[0].args["path"], "a.txt");
            }
            PlanShape::Conversation { .. } => panic!("wrong shape"),
        }
    }

    #[test]
    fn test_parse_tolerates_fences_and_prose() {
        let raw = "Here is the plan:\n```json\n{\"type\": \"conversation\", \"response\": \"hello\"}\n```\nDone.";
        assert!(parse_plan_shape(raw).is_ok());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_plan_shape("no json here").is_err());
        assert!(parse_plan_shape("{\"type\": \"mystery\"}").is_err());
    }

    #[test]
    fn test_parse_json_object() {
        assert!(parse_json_object("{\"a\": 1}").is_ok());
        assert!(parse_json_object("[1, 2]").is_err());
    }
}
