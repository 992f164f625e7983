//! Plans that never need the agent: built-in fallbacks for when its
//! response is unusable, and the `open <app>` shortcut.

use regex::Regex;
use std::sync::OnceLock;

use crate::action::{ActionDef, Op};
use crate::paths::{self, MAX_ACTION_NAME_LEN};

const PLACEHOLDER_PREFIX: &str = "placeholder_";

/// Known spoken names and the application they launch.
const APP_ALIASES: &[(&str, &str)] = &[
    ("chrome", "Google Chrome"),
    ("google chrome", "Google Chrome"),
    ("browser", "Google Chrome"),
    ("vs code", "Visual Studio Code"),
    ("vscode", "Visual Studio Code"),
    ("code", "Visual Studio Code"),
    ("terminal", "Terminal"),
];

/// Words that mean an `open ...` utterance asks for more than one app.
const COMPOUND_WORDS: &[&str] = &["and", "then", "with", "a", "an", "new", "to", "in"];

static OPEN_RE: OnceLock<Regex> = OnceLock::new();

fn open_re() -> &'static Regex {
    OPEN_RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:please\s+)?open\s+(?:the\s+)?([a-z0-9][a-z0-9 .+\-]*?)\s*[.!]?\s*$")
            .unwrap()
    })
}

// ---------------------------------------------------------------------------
// Open shortcut
// ---------------------------------------------------------------------------

/// The app named by a simple `open <app>` utterance (one to three words).
pub fn match_open_command(utterance: &str) -> Option<String> {
    let cap = open_re().captures(utterance)?;
    let app = cap[1].to_lowercase();
    let words: Vec<&str> = app.split_whitespace().collect();
    if words.is_empty() || words.len() > 3 || words.iter().any(|w| COMPOUND_WORDS.contains(w)) {
        return None;
    }
    Some(words.join(" "))
}

/// `open_<app>`: bring the named application to the foreground.
pub fn open_app_action(spoken: &str) -> Option<ActionDef> {
    let spoken = spoken.trim().to_lowercase();
    let ident = paths::identifier_from_words(&spoken);
    if ident.is_empty() {
        return None;
    }
    let name = format!("open_{ident}");
    if !paths::is_valid_action_name(&name) {
        return None;
    }

    let app = APP_ALIASES
        .iter()
        .find(|(alias, _)| *alias == spoken)
        .map(|(_, app)| app.to_string())
        .unwrap_or_else(|| title_case(&spoken));
    let display = if app == "Google Chrome" {
        "Chrome".to_string()
    } else {
        app.clone()
    };

    Some(ActionDef::primitive(
        name,
        format!("Open {app}."),
        vec![Op::OpenApp { app }],
        format!("{display} opened successfully"),
    ))
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Fallback table
// ---------------------------------------------------------------------------

fn create_text_file() -> ActionDef {
    ActionDef::primitive(
        "create_text_file",
        "Create a new text file on the desktop.",
        vec![Op::WriteFile {
            path: "~/Desktop/new_file.txt".into(),
            content: String::new(),
        }],
        "Created file at ~/Desktop/new_file.txt",
    )
}

/// The single action used when the agent's answer yields nothing usable.
///
/// Utterances mentioning a browser get `open_chrome`, file creation gets
/// `create_text_file`, anything else a placeholder that only records it ran.
pub fn fallback_action(utterance: &str) -> ActionDef {
    let lowered = utterance.to_lowercase();
    let def = if ["chrome", "browser"].iter().any(|k| lowered.contains(k)) {
        open_app_action("chrome")
    } else if ["text file", "create file", "new file"]
        .iter()
        .any(|k| lowered.contains(k))
    {
        Some(create_text_file())
    } else {
        None
    };
    def.unwrap_or_else(|| placeholder_action(utterance))
}

pub fn placeholder_action(utterance: &str) -> ActionDef {
    let mut slug = paths::identifier_from_words(utterance);
    if slug.is_empty() {
        slug = "action".to_string();
    }
    let mut name = format!("{PLACEHOLDER_PREFIX}{slug}");
    name.truncate(MAX_ACTION_NAME_LEN);
    let name = name.trim_end_matches('_').to_string();

    ActionDef::primitive(
        name,
        format!("Placeholder for: {utterance}"),
        vec![Op::Record {
            message: format!("placeholder ran for: {utterance}"),
        }],
        "Executed placeholder action",
    )
}
