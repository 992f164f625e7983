//! The OS bridge that primitive action ops run against.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use chrono::Utc;

use crate::paths;

/// Side effects available to action bodies. Failures are reported as plain
/// reasons; the registry attaches the action name.
pub trait Host: Send + Sync {
    fn open_app(&self, app: &str) -> Result<(), String>;
    fn run(&self, program: &str, args: &[String]) -> Result<String, String>;
    fn write_file(&self, path: &Path, content: &str) -> Result<(), String>;
    fn record(&self, action: &str, message: &str) -> Result<(), String>;
}

// ---------------------------------------------------------------------------
// SystemHost
// ---------------------------------------------------------------------------

/// Performs ops against the real machine. `record` appends to the journal
/// under the project root.
pub struct SystemHost {
    journal: PathBuf,
}

impl SystemHost {
    pub fn new(root: &Path) -> Self {
        Self {
            journal: paths::journal_path(root),
        }
    }

    pub fn journal_path(&self) -> &Path {
        &self.journal
    }
}

impl Host for SystemHost {
    fn open_app(&self, app: &str) -> Result<(), String> {
        let mut cmd = open_app_command(app)?;
        tracing::debug!(app, "activating application");
        cmd.stdin(Stdio::null());
        if cfg!(target_os = "macos") {
            // `open -a` returns once the app is activated.
            let status = cmd
                .status()
                .map_err(|e| format!("failed to launch {app}: {e}"))?;
            if !status.success() {
                return Err(format!("opening {app} exited with {status}"));
            }
        } else {
            cmd.spawn()
                .map_err(|e| format!("failed to launch {app}: {e}"))?;
        }
        Ok(())
    }

    fn run(&self, program: &str, args: &[String]) -> Result<String, String> {
        tracing::debug!(program, ?args, "running command");
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|e| format!("failed to spawn {program}: {e}"))?;
        if !output.status.success() {
            return Err(format!("{program} exited with {}", output.status));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn write_file(&self, path: &Path, content: &str) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        std::fs::write(path, content).map_err(|e| format!("{}: {e}", path.display()))
    }

    fn record(&self, action: &str, message: &str) -> Result<(), String> {
        let line = format!("{} {action}: {message}\n", Utc::now().to_rfc3339());
        crate::io::append_durable(&self.journal, &line).map_err(|e| e.to_string())
    }
}

#[cfg(target_os = "macos")]
fn open_app_command(app: &str) -> Result<Command, String> {
    let mut cmd = Command::new("open");
    cmd.args(["-a", app]);
    Ok(cmd)
}

/// Off macOS there is no app-by-name launcher; resolve a matching executable
/// (`Google Chrome` → `google-chrome`, `google_chrome`, `googlechrome`, …).
#[cfg(not(target_os = "macos"))]
fn open_app_command(app: &str) -> Result<Command, String> {
    let lowered = app.to_lowercase();
    let words: Vec<&str> = lowered.split_whitespace().collect();
    let candidates = [
        words.join("-"),
        words.join("_"),
        words.concat(),
        words.last().map(|w| w.to_string()).unwrap_or_default(),
    ];
    let exe = candidates
        .iter()
        .filter(|c| !c.is_empty())
        .find_map(|c| which::which(c).ok())
        .ok_or_else(|| format!("no executable found for application '{app}'"))?;
    let mut cmd = Command::new(exe);
    cmd.stdout(Stdio::null()).stderr(Stdio::null());
    Ok(cmd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn record_appends_to_journal() {
        let dir = TempDir::new().unwrap();
        let host = SystemHost::new(dir.path());
        host.record("greet", "hello").unwrap();
        host.record("greet", "again").unwrap();
        let journal = std::fs::read_to_string(host.journal_path()).unwrap();
        let lines: Vec<_> = journal.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("greet: hello"));
    }

    #[test]
    fn write_file_creates_parents() {
        let dir = TempDir::new().unwrap();
        let host = SystemHost::new(dir.path());
        let path = dir.path().join("out/notes.txt");
        host.write_file(&path, "content").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "content");
    }

    #[test]
    fn run_reports_nonzero_exit() {
        let dir = TempDir::new().unwrap();
        let host = SystemHost::new(dir.path());
        assert!(host.run("false", &[]).is_err());
        assert_eq!(host.run("echo", &["hi".into()]).unwrap().trim(), "hi");
    }
}
