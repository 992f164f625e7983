use anyhow::Context;
use catalyst_core::paths;
use std::path::{Path, PathBuf};

/// Resolve the catalyst root directory.
///
/// Priority:
/// 1. `--root` flag / `CATALYST_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `.catalyst/`
/// 3. The user's home directory, so the catalog follows the user around
pub fn resolve_root(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    if let Some(p) = explicit {
        return Ok(p.to_path_buf());
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    if let Some(found) = find_upward(&cwd) {
        return Ok(found);
    }

    home::home_dir().context("no .catalyst/ found and the home directory is unknown; pass --root")
}

fn find_upward(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(paths::CATALYST_DIR).is_dir())
        .map(Path::to_path_buf)
}
