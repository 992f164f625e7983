//! Action definitions: the structured records the catalog persists.
//!
//! An action never carries executable source. Its body is either a short
//! list of primitive [`Op`]s interpreted by a [`crate::host::Host`], or a
//! composite sequence of other action names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

pub const COMPOSITE_STATUS: &str = "Task completed";

// ---------------------------------------------------------------------------
// Op
// ---------------------------------------------------------------------------

/// A primitive operation an action body can perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    /// Bring an application to the foreground, launching it if needed.
    OpenApp { app: String },
    /// Run a program to completion; a non-zero exit fails the action.
    Run {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
    /// Write `content` to `path` (`~/` expands to the home directory).
    WriteFile { path: String, content: String },
    /// Append a line to the run journal.
    Record { message: String },
    /// Invoke another action; its status is discarded.
    Call { action: String },
}

impl Op {
    /// Keyword used for this op in the definition language.
    pub fn keyword(&self) -> &'static str {
        match self {
            Op::OpenApp { .. } => "open_app",
            Op::Run { .. } => "run",
            Op::WriteFile { .. } => "write_file",
            Op::Record { .. } => "record",
            Op::Call { .. } => "call",
        }
    }
}

// ---------------------------------------------------------------------------
// ActionBody
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionBody {
    Primitive {
        #[serde(default)]
        ops: Vec<Op>,
        returns: String,
    },
    Composite { sequence: Vec<String> },
}

// ---------------------------------------------------------------------------
// ActionDef
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDef {
    pub name: String,
    #[serde(default)]
    pub doc: String,
    pub body: ActionBody,
    pub created_at: DateTime<Utc>,
    /// The request that caused this action to be synthesized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utterance: Option<String>,
}

impl ActionDef {
    pub fn primitive(
        name: impl Into<String>,
        doc: impl Into<String>,
        ops: Vec<Op>,
        returns: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            doc: doc.into(),
            body: ActionBody::Primitive {
                ops,
                returns: returns.into(),
            },
            created_at: Utc::now(),
            utterance: None,
        }
    }

    pub fn composite(name: impl Into<String>, sequence: Vec<String>) -> Self {
        Self {
            name: name.into(),
            doc: "Execute a sequence of actions.".to_string(),
            body: ActionBody::Composite { sequence },
            created_at: Utc::now(),
            utterance: None,
        }
    }

    pub fn with_utterance(mut self, utterance: impl Into<String>) -> Self {
        self.utterance = Some(utterance.into());
        self
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.body, ActionBody::Composite { .. })
    }

    /// Names this action invokes, in order.
    pub fn references(&self) -> Vec<&str> {
        match &self.body {
            ActionBody::Composite { sequence } => sequence.iter().map(String::as_str).collect(),
            ActionBody::Primitive { ops, .. } => ops
                .iter()
                .filter_map(|op| match op {
                    Op::Call { action } => Some(action.as_str()),
                    _ => None,
                })
                .collect(),
        }
    }

    /// Render the definition in the fenced `def` language the planner parses.
    pub fn to_source(&self) -> String {
        let mut out = format!("def {}():\n", self.name);
        if !self.doc.is_empty() {
            let _ = writeln!(out, "    \"\"\"{}\"\"\"", self.doc);
        }
        match &self.body {
            ActionBody::Composite { sequence } => {
                for name in sequence {
                    let _ = writeln!(out, "    call {name}");
                }
                let _ = writeln!(out, "    return {}", quote(COMPOSITE_STATUS));
            }
            ActionBody::Primitive { ops, returns } => {
                for op in ops {
                    let _ = writeln!(out, "    {}", render_op(op));
                }
                let _ = writeln!(out, "    return {}", quote(returns));
            }
        }
        out
    }
}

fn render_op(op: &Op) -> String {
    match op {
        Op::OpenApp { app } => format!("open_app {}", quote(app)),
        Op::Run { program, args } => {
            let mut line = format!("run {}", quote(program));
            for arg in args {
                line.push(' ');
                line.push_str(&quote(arg));
            }
            line
        }
        Op::WriteFile { path, content } => {
            format!("write_file {} {}", quote(path), quote(content))
        }
        Op::Record { message } => format!("record {}", quote(message)),
        Op::Call { action } => format!("call {action}"),
    }
}

/// Double-quote `s`, escaping backslashes, quotes and newlines.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_yaml_is_tagged() {
        let def = ActionDef::primitive(
            "open_chrome",
            "Open Google Chrome browser.",
            vec![Op::OpenApp {
                app: "Google Chrome".into(),
            }],
            "Chrome opened successfully",
        );
        let yaml = serde_yaml::to_string(&def).unwrap();
        assert!(yaml.contains("kind: primitive"));
        assert!(yaml.contains("op: open_app"));
        assert!(!yaml.contains("utterance"));
    }

    #[test]
    fn composite_references_in_order() {
        let def = ActionDef::composite("run_task", vec!["a".into(), "b".into(), "c".into()]);
        assert!(def.is_composite());
        assert_eq!(def.references(), vec!["a", "b", "c"]);
    }

    #[test]
    fn to_source_renders_ops() {
        let def = ActionDef::primitive(
            "note_it",
            "Note \"it\".",
            vec![
                Op::Record {
                    message: "line\nbreak".into(),
                },
                Op::Call {
                    action: "other".into(),
                },
            ],
            "done",
        );
        let src = def.to_source();
        assert!(src.starts_with("def note_it():\n"));
        assert!(src.contains("record \"line\\nbreak\""));
        assert!(src.contains("    call other\n"));
        assert!(src.ends_with("    return \"done\"\n"));
    }
}
