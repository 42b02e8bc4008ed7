//! Advisory post-failure recovery
//!
//! When tasks fail, the orchestrator asks the model for an alternative
//! strategy. The answer is advisory only: it is recorded as an adjustment
//! and folded into the final response, never fed back into the executor.

use super::core::Orchestrator;
use crate::executor::TaskReport;
use crate::plan::Plan;
use std::time::Duration;
use telos_llm::{ChatRequest, LlmClient, Message};
use tracing::{debug, warn};

const ADVISORY_TIMEOUT: Duration = Duration::from_secs(30);

impl Orchestrator {
    /// Ask the model for an alternative strategy given the failing tasks.
    /// Returns None when the call fails or produces nothing useful.
    pub(super) async fn advise_recovery(
        &self,
        plan: &Plan,
        failed: &[&TaskReport],
    ) -> Option<String> {
        let mut failures = String::new();
        for report in failed {
            let class = report
                .error_class
                .map(|c| c.to_string())
                .unwrap_or_else(|| report.status.to_string());
            failures.push_str(&format!(
                "- {} [{}]: {}\n",
                report.description,
                class,
                report.error.as_deref().unwrap_or("no detail")
            ));
        }

        let request = ChatRequest::new(vec![
            Message::system(
                "Some steps of a task plan failed. Propose ONE alternative strategy \
                 the user could try next, in one or two sentences. Reply with the \
                 strategy only.",
            ),
            Message::user(format!(
                "Original request: {}\n\nFailed steps:\n{failures}",
                plan.original_prompt
            )),
        ])
        .with_max_tokens(256);

        match tokio::time::timeout(ADVISORY_TIMEOUT, self.client.chat(request)).await {
            Ok(Ok(response)) => {
                let strategy = response.content.trim().to_string();
                if strategy.is_empty() {
                    None
                } else {
                    debug!("Recovery advisory produced");
                    Some(strategy)
                }
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Recovery advisory call failed");
                None
            }
            Err(_) => {
                warn!("Recovery advisory call timed out");
                None
            }
        }
    }
}
