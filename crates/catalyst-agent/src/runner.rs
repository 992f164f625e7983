use futures::StreamExt;

use crate::stream::QueryStream;
use crate::{query, AgentError, Message, QueryOptions, Result};

// ─── RunConfig / RunResult ────────────────────────────────────────────────

#[derive(Debug)]
pub struct RunConfig {
    /// Replaces Claude's default system prompt when set.
    pub system_prompt: Option<String>,
    pub prompt: String,
    pub opts: QueryOptions,
}

/// The terminal result of a completed run.
#[derive(Debug)]
pub struct RunResult {
    pub session_id: String,
    /// Final text; falls back to the concatenated assistant text when the
    /// result message carries none.
    pub result_text: String,
    pub total_cost_usd: f64,
    pub num_turns: u32,
    /// `true` if the run ended with any error subtype (max_turns, …).
    pub is_error: bool,
    pub errors: Vec<String>,
}

// ─── Public API ───────────────────────────────────────────────────────────

/// Drive one query to completion and return its [`RunResult`].
///
/// Fails if the stream ends without a `result` message or a line fails to
/// parse.
pub async fn run(config: RunConfig) -> Result<RunResult> {
    let mut opts = config.opts;
    if let Some(sp) = config.system_prompt {
        opts.system_prompt = Some(sp);
    }
    tracing::debug!(model = ?opts.model, "starting agent run");
    collect(query(config.prompt, opts)).await
}

pub(crate) async fn collect(mut stream: QueryStream) -> Result<RunResult> {
    let mut assistant_text = Vec::new();

    while let Some(msg) = stream.next().await {
        match msg? {
            Message::Assistant(a) => {
                let text = a.text();
                if !text.is_empty() {
                    assistant_text.push(text);
                }
            }
            Message::Result(r) => {
                let result_text = match r.result_text() {
                    Some(text) if !text.trim().is_empty() => text.to_string(),
                    _ if r.is_error() => String::new(),
                    _ => assistant_text.join("\n"),
                };
                tracing::debug!(
                    session_id = %r.session_id,
                    turns = r.num_turns,
                    cost_usd = r.total_cost_usd,
                    is_error = r.is_error(),
                    "agent run finished"
                );
                return Ok(RunResult {
                    session_id: r.session_id.clone(),
                    result_text,
                    total_cost_usd: r.total_cost_usd,
                    num_turns: r.num_turns,
                    is_error: r.is_error(),
                    errors: r.errors,
                });
            }
            Message::System(_) | Message::Other => {}
        }
    }

    Err(AgentError::NoResult)
}

// ─── Tests ────────────────────────────────────────────────────────────────
