//! Best-effort extraction of a plan from free-text agent output.
//!
//! Everything here treats the response as untrusted text. Nothing in this
//! module fails: unusable fragments are reported in
//! [`ParsedResponse::rejected`] and dropped.

use regex::Regex;
use std::sync::OnceLock;

use crate::action::{ActionDef, Op};
use crate::paths;

#[derive(Debug, Default)]
pub struct ParsedResponse {
    /// Definitions from fenced blocks, in response order.
    pub definitions: Vec<ActionDef>,
    /// Candidate call orders, most explicit first: the sequence sentence,
    /// explicit `call x` mentions, then every `def x` mention.
    pub sequence_tiers: Vec<Vec<String>>,
    pub composite_name: Option<String>,
    /// Human-readable reasons for every fenced block that was dropped.
    pub rejected: Vec<String>,
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

static FENCE_RE: OnceLock<Regex> = OnceLock::new();
static HEADER_RE: OnceLock<Regex> = OnceLock::new();
static SEQUENCE_RE: OnceLock<Regex> = OnceLock::new();
static CALL_RE: OnceLock<Regex> = OnceLock::new();
static DEF_RE: OnceLock<Regex> = OnceLock::new();
static COMPOSITE_RE: OnceLock<Regex> = OnceLock::new();
static TOKEN_RE: OnceLock<Regex> = OnceLock::new();
static BARE_CALL_RE: OnceLock<Regex> = OnceLock::new();

fn fence_re() -> &'static Regex {
    FENCE_RE.get_or_init(|| Regex::new(r"(?s)```[^\n]*\n(.*?)```").unwrap())
}

fn header_re() -> &'static Regex {
    HEADER_RE.get_or_init(|| {
        Regex::new(r"^def\s+([A-Za-z0-9_]+)\s*\(([^)]*)\)\s*(?:->\s*\w+\s*)?:?$").unwrap()
    })
}

fn sequence_re() -> &'static Regex {
    SEQUENCE_RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:call|execute|run|invoke)(?:\s+in)?(?:\s+this)?(?:\s+the)?\s+sequence\b[\s:*]+([A-Za-z0-9_,`*\->→ \t]+)",
        )
        .unwrap()
    })
}

fn call_re() -> &'static Regex {
    CALL_RE.get_or_init(|| Regex::new(r"(?i)\bcall\s+`?([A-Za-z0-9_]+)`?").unwrap())
}

fn def_re() -> &'static Regex {
    DEF_RE.get_or_init(|| Regex::new(r"\bdef\s+([A-Za-z0-9_]+)").unwrap())
}

fn composite_re() -> &'static Regex {
    COMPOSITE_RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:composite|combined|wrapper)\s+(?:function|action)(?:\s+name)?(?:\s*\**\s*:\s*\**\s*|\s+(?:called|named)\s+)`?([A-Za-z0-9_]+)`?",
        )
        .unwrap()
    })
}

fn token_re() -> &'static Regex {
    TOKEN_RE.get_or_init(|| {
        Regex::new(r#""((?:[^"\\]|\\.)*)"|'((?:[^'\\]|\\.)*)'|(\S+)"#).unwrap()
    })
}

fn bare_call_re() -> &'static Regex {
    BARE_CALL_RE.get_or_init(|| Regex::new(r"^([a-z_][a-z0-9_]*)\(\)$").unwrap())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn parse_response(text: &str) -> ParsedResponse {
    let mut parsed = ParsedResponse::default();

    for cap in fence_re().captures_iter(text) {
        let block = &cap[1];
        if !block.lines().any(|l| l.trim_start().starts_with("def ")) {
            continue;
        }
        match parse_definition(block) {
            Ok(def) => {
                if parsed.definitions.iter().any(|d| d.name == def.name) {
                    parsed
                        .rejected
                        .push(format!("{}: defined more than once", def.name));
                } else {
                    parsed.definitions.push(def);
                }
            }
            Err(reason) => parsed.rejected.push(reason),
        }
    }

    // Prose only: `call x` lines inside fenced bodies are not call orders.
    let prose = fence_re().replace_all(text, "\n");

    let mut tiers = Vec::new();
    if let Some(cap) = sequence_re().captures(&prose) {
        tiers.push(split_sequence(&cap[1]));
    }
    tiers.push(
        call_re()
            .captures_iter(&prose)
            .map(|c| c[1].to_string())
            .collect(),
    );
    tiers.push(
        def_re()
            .captures_iter(text)
            .map(|c| c[1].to_string())
            .collect(),
    );
    parsed.sequence_tiers = tiers;

    parsed.composite_name = composite_re()
        .captures(&prose)
        .map(|c| c[1].to_string())
        .filter(|name| paths::is_valid_action_name(name));

    parsed
}

fn split_sequence(list: &str) -> Vec<String> {
    list.replace('→', ",")
        .replace("->", ",")
        .split(',')
        .map(|item| {
            let item = item.trim().trim_matches(|c| c == '`' || c == '*').trim();
            let item = item
                .strip_prefix("and ")
                .or_else(|| item.strip_prefix("then "))
                .unwrap_or(item);
            item.trim_matches(|c| c == '`' || c == '*').trim().to_string()
        })
        .filter(|item| !item.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// Definition blocks
// ---------------------------------------------------------------------------

/// Parse one fenced block of the form
///
/// ```text
/// def open_chrome():
///     """Open Google Chrome browser."""
///     open_app "Google Chrome"
///     return "Chrome opened successfully"
/// ```
pub fn parse_definition(block: &str) -> Result<ActionDef, String> {
    let mut lines = block
        .lines()
        .map(str::trim)
        .skip_while(|l| l.is_empty() || l.starts_with('@') || l.starts_with('#'));

    let header = lines.next().ok_or("empty definition block")?;
    let cap = header_re()
        .captures(header)
        .ok_or_else(|| format!("unrecognized definition header: {header}"))?;
    let name = cap[1].to_string();
    if !paths::is_valid_action_name(&name) {
        return Err(format!("{name}: invalid action name"));
    }
    let params = cap[2].trim();
    if !params.is_empty() && params != "self" {
        return Err(format!("{name}: parameters are not supported ({params})"));
    }

    let mut doc: Option<String> = None;
    let mut ops = Vec::new();
    let mut returns: Option<String> = None;
    let mut open_doc: Option<(&str, String)> = None;

    for line in lines {
        if let Some((delim, mut acc)) = open_doc.take() {
            if let Some(end) = line.find(delim) {
                acc.push(' ');
                acc.push_str(&line[..end]);
                doc = Some(acc.trim().to_string());
            } else {
                acc.push(' ');
                acc.push_str(line);
                open_doc = Some((delim, acc));
            }
            continue;
        }
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if returns.is_some() {
            return Err(format!("{name}: statement after return: {line}"));
        }
        if doc.is_none() && ops.is_empty() {
            if let Some(delim) = ["\"\"\"", "'''"].into_iter().find(|d| line.starts_with(d)) {
                let rest = &line[3..];
                match rest.find(delim) {
                    Some(end) => doc = Some(rest[..end].trim().to_string()),
                    None => open_doc = Some((delim, rest.to_string())),
                }
                continue;
            }
            if let [Token::Quoted(text)] = tokenize(line)?.as_slice() {
                doc = Some(text.clone());
                continue;
            }
        }

        if let Some(cap) = bare_call_re().captures(line) {
            ops.push(Op::Call {
                action: cap[1].to_string(),
            });
            continue;
        }

        let tokens = tokenize(line)?;
        let (keyword, args) = match tokens.split_first() {
            Some((Token::Bare(k), rest)) => (k.as_str(), rest),
            _ => return Err(format!("{name}: unsupported statement: {line}")),
        };
        match (keyword, args) {
            ("return", [value]) => returns = Some(value.text().to_string()),
            ("open_app", [app]) => ops.push(Op::OpenApp {
                app: app.text().to_string(),
            }),
            ("run", [program, rest @ ..]) => ops.push(Op::Run {
                program: program.text().to_string(),
                args: rest.iter().map(|t| t.text().to_string()).collect(),
            }),
            ("write_file", [path, content]) => ops.push(Op::WriteFile {
                path: path.text().to_string(),
                content: content.text().to_string(),
            }),
            ("record", [message]) => ops.push(Op::Record {
                message: message.text().to_string(),
            }),
            ("call", [target]) => {
                let target = target.text().trim_matches('`').trim_end_matches("()");
                if !paths::is_valid_action_name(target) {
                    return Err(format!("{name}: invalid call target: {target}"));
                }
                ops.push(Op::Call {
                    action: target.to_string(),
                });
            }
            _ => return Err(format!("{name}: unsupported statement: {line}")),
        }
    }

    if open_doc.is_some() {
        return Err(format!("{name}: unterminated docstring"));
    }

    let returns = returns.unwrap_or_else(|| format!("{name} completed"));
    Ok(ActionDef::primitive(name, doc.unwrap_or_default(), ops, returns))
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Quoted(String),
    Bare(String),
}

impl Token {
    fn text(&self) -> &str {
        match self {
            Token::Quoted(s) | Token::Bare(s) => s,
        }
    }
}

fn tokenize(line: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    for cap in token_re().captures_iter(line) {
        if let Some(m) = cap.get(1).or_else(|| cap.get(2)) {
            tokens.push(Token::Quoted(unescape(m.as_str())));
        } else {
            let bare = &cap[3];
            if bare.starts_with('"') || bare.starts_with('\'') {
                return Err(format!("unterminated string in: {line}"));
            }
            tokens.push(Token::Bare(bare.to_string()));
        }
    }
    Ok(tokens)
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
