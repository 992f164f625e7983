use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

// ─── Message ──────────────────────────────────────────────────────────────

/// The subset of `claude --output-format stream-json` output the planner
/// needs. Discriminated by the JSON `"type"` field; every other type
/// (tool progress, stream events, auth status, …) lands in `Other`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    System(SystemMessage),
    Assistant(AssistantMessage),
    Result(ResultMessage),
    #[serde(other)]
    Other,
}

impl Message {
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Message::System(m) => Some(&m.session_id),
            Message::Assistant(m) => Some(&m.session_id),
            Message::Result(m) => Some(&m.session_id),
            Message::Other => None,
        }
    }
}

/// `type = "system"`. Only the init subtype is interesting and only for its
/// model name.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SystemMessage {
    pub subtype: String,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

// ─── Assistant ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssistantMessage {
    pub message: AssistantContent,
    pub session_id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssistantContent {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        name: String,
        /// Tool inputs vary per tool.
        #[serde(default)]
        input: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

impl AssistantMessage {
    /// All text blocks joined with newlines.
    pub fn text(&self) -> String {
        self.message
            .content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ─── Result ───────────────────────────────────────────────────────────────

/// `type = "result"`: the terminal message of every query.
///
/// `subtype` is `success` or one of the `error_*` conditions
/// (`error_max_turns`, `error_during_execution`, …).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResultMessage {
    pub subtype: String,
    pub session_id: String,
    /// Present only on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default)]
    pub num_turns: u32,
    #[serde(default)]
    pub total_cost_usd: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl ResultMessage {
    pub fn is_error(&self) -> bool {
        self.is_error || self.subtype != "success"
    }

    pub fn result_text(&self) -> Option<&str> {
        if self.is_error() {
            return None;
        }
        self.result.as_deref()
    }
}

// ─── QueryOptions ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Claude model name (e.g. `"claude-sonnet-4-6"`)
    pub model: Option<String>,
    /// Maximum number of agentic turns before stopping with `error_max_turns`
    pub max_turns: Option<u32>,
    /// Replaces Claude's default system prompt
    pub system_prompt: Option<String>,
    pub permission_mode: PermissionMode,
    /// Tool names that are explicitly disallowed
    pub disallowed_tools: Vec<String>,
    /// Working directory for the subprocess (default: current dir)
    pub cwd: Option<PathBuf>,
    /// Additional environment variables for the subprocess
    pub env: HashMap<String, String>,
    /// Custom path to the `claude` binary (default: `"claude"`)
    pub path_to_executable: Option<String>,
    /// Disable session persistence (`--no-session-persistence`)
    pub no_session_persistence: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PermissionMode {
    #[default]
    Default,
    /// Planning mode: no actual tool execution
    Plan,
    /// Don't prompt; deny anything not pre-approved
    DontAsk,
}

impl PermissionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionMode::Default => "default",
            PermissionMode::Plan => "plan",
            PermissionMode::DontAsk => "dontAsk",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_message_types_parse_as_other() {
        let msg: Message =
            serde_json::from_str(r#"{"type":"rate_limit_event","session_id":"s1"}"#).unwrap();
        assert!(matches!(msg, Message::Other));
        assert_eq!(msg.session_id(), None);
    }

    #[test]
    fn assistant_text_skips_tool_blocks() {
        let line = r#"{"type":"assistant","session_id":"s1","parent_tool_use_id":null,
            "message":{"id":"m","role":"assistant","model":"x","content":[
                {"type":"text","text":"first"},
                {"type":"tool_use","id":"t","name":"Bash","input":{"command":"ls"}},
                {"type":"thinking","thinking":"hmm"},
                {"type":"text","text":"second"}]}}"#;
        let msg: Message = serde_json::from_str(line).unwrap();
        let Message::Assistant(a) = msg else {
            panic!("expected assistant");
        };
        assert_eq!(a.text(), "first\nsecond");
    }

    #[test]
    fn error_subtypes_have_no_result_text() {
        let r: ResultMessage = serde_json::from_str(
            r#"{"subtype":"error_max_turns","session_id":"s","is_error":true,"num_turns":4,"total_cost_usd":0.1}"#,
        )
        .unwrap();
        assert!(r.is_error());
        assert_eq!(r.result_text(), None);
    }
}
