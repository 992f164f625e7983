use crate::error::{CatalystError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const CATALYST_DIR: &str = ".catalyst";

pub const CONFIG_FILE: &str = ".catalyst/config.yaml";
pub const CATALOG_FILE: &str = ".catalyst/catalog.yaml";
pub const CONTINUATION_FILE: &str = ".catalyst/continuation.yaml";
pub const JOURNAL_FILE: &str = ".catalyst/journal.log";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn catalyst_dir(root: &Path) -> PathBuf {
    root.join(CATALYST_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn catalog_path(root: &Path) -> PathBuf {
    root.join(CATALOG_FILE)
}

pub fn continuation_path(root: &Path) -> PathBuf {
    root.join(CONTINUATION_FILE)
}

pub fn journal_path(root: &Path) -> PathBuf {
    root.join(JOURNAL_FILE)
}

/// Expand a leading `~/` (or a bare `~`) to the user's home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return Ok(PathBuf::from(path)),
    };
    let home = home::home_dir().ok_or(CatalystError::HomeNotFound)?;
    Ok(if rest.is_empty() { home } else { home.join(rest) })
}

// ---------------------------------------------------------------------------
// Action name validation
// ---------------------------------------------------------------------------

pub const MAX_ACTION_NAME_LEN: usize = 64;

static ACTION_NAME_RE: OnceLock<Regex> = OnceLock::new();

fn action_name_re() -> &'static Regex {
    ACTION_NAME_RE.get_or_init(|| Regex::new(r"^[a-z_][a-z0-9_]*$").unwrap())
}

pub fn is_valid_action_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_ACTION_NAME_LEN
        && name != "_"
        && action_name_re().is_match(name)
}

pub fn validate_action_name(name: &str) -> Result<()> {
    if !is_valid_action_name(name) {
        return Err(CatalystError::InvalidActionName(name.to_string()));
    }
    Ok(())
}

/// Internal actions are invocable but hidden from enumeration.
pub fn is_internal(name: &str) -> bool {
    name.starts_with('_')
}

/// Turn free text into an action-name fragment: lowercase words joined by `_`.
///
/// Characters outside `[a-z0-9]` separate words. The result may be empty.
pub fn identifier_from_words(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        for name in ["open_chrome", "a", "run_task_2", "_activate", "x1"] {
            validate_action_name(name).unwrap_or_else(|_| panic!("expected valid: {name}"));
        }
    }

    #[test]
    fn invalid_names() {
        for name in ["", "_", "Open", "open-chrome", "1st", "has space", "the`"] {
            assert!(
                validate_action_name(name).is_err(),
                "expected invalid: {name}"
            );
        }
        assert!(!is_valid_action_name(&"a".repeat(65)));
    }

    #[test]
    fn identifier_from_words_normalizes() {
        assert_eq!(identifier_from_words("Open  Google-Chrome!"), "open_google_chrome");
        assert_eq!(identifier_from_words("   "), "");
    }

    #[test]
    fn expand_home_leaves_plain_paths() {
        assert_eq!(expand_home("/tmp/x").unwrap(), PathBuf::from("/tmp/x"));
        assert_eq!(expand_home("~user/x").unwrap(), PathBuf::from("~user/x"));
    }

    #[test]
    fn path_helpers() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            catalog_path(root),
            PathBuf::from("/tmp/proj/.catalyst/catalog.yaml")
        );
        assert_eq!(
            continuation_path(root),
            PathBuf::from("/tmp/proj/.catalyst/continuation.yaml")
        );
    }
}
