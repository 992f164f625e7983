use std::path::Path;

use anyhow::Context;
use catalyst_agent::{PermissionMode, QueryOptions, RunConfig};
use catalyst_core::config::PlannerConfig;
use catalyst_core::planner::Collaborator;
use catalyst_core::CatalystError;

/// The planning agent: one headless `claude` run per instruction.
pub struct ClaudeCollaborator {
    runtime: tokio::runtime::Runtime,
    opts: QueryOptions,
}

impl ClaudeCollaborator {
    pub fn new(config: &PlannerConfig, model: Option<&str>, no_trace: bool, root: &Path) -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
        let opts = QueryOptions {
            model: Some(model.unwrap_or(config.model.as_str()).to_string()),
            max_turns: Some(config.max_turns),
            // Planning is text only; tool use is never pre-approved.
            permission_mode: PermissionMode::DontAsk,
            path_to_executable: Some(config.executable.clone()),
            no_session_persistence: no_trace,
            cwd: Some(root.to_path_buf()),
            ..Default::default()
        };
        Ok(Self { runtime, opts })
    }
}

impl Collaborator for ClaudeCollaborator {
    fn respond(&self, instruction: &str) -> catalyst_core::Result<String> {
        let config = RunConfig {
            system_prompt: Some(SYSTEM_PROMPT.to_string()),
            prompt: instruction.to_string(),
            opts: self.opts.clone(),
        };
        tracing::info!(model = ?self.opts.model, "asking planning agent");
        let result = self
            .runtime
            .block_on(catalyst_agent::run(config))
            .map_err(|e| CatalystError::PlannerCommunication(e.to_string()))?;

        if result.is_error {
            let detail = if result.errors.is_empty() {
                "no detail".to_string()
            } else {
                result.errors.join("; ")
            };
            return Err(CatalystError::PlannerCommunication(format!(
                "agent run ended with an error ({detail})"
            )));
        }
        tracing::debug!(
            turns = result.num_turns,
            cost_usd = result.total_cost_usd,
            "planning agent answered"
        );
        Ok(result.result_text)
    }
}

const SYSTEM_PROMPT: &str = "You design small desktop automation actions. \
Answer in plain text with fenced action definitions exactly as the user describes. \
Do not use tools.";
