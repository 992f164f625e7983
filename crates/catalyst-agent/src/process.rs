use std::process::Stdio;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::types::{Message, PermissionMode, QueryOptions};
use crate::{AgentError, Result};

// ─── AgentProcess ─────────────────────────────────────────────────────────

/// A running `claude --output-format stream-json --input-format stream-json`
/// subprocess.
///
/// The prompt goes in as one JSON user message on stdin, after which stdin
/// is closed. Responses are read as JSONL from stdout; stderr is collected in
/// the background and attached to exit errors.
pub(crate) struct AgentProcess {
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
    stdin: Option<ChildStdin>,
    stderr_buf: Arc<Mutex<String>>,
}

impl AgentProcess {
    pub(crate) async fn spawn(prompt: &str, opts: &QueryOptions) -> Result<Self> {
        let mut cmd = build_command(opts);
        // Allows running from inside another Claude session.
        cmd.env_remove("CLAUDECODE");
        for (k, v) in &opts.env {
            cmd.env(k, v);
        }

        let mut process = Self::from_command(cmd)?;
        let user_msg = serde_json::json!({
            "type": "user",
            "message": {
                "role": "user",
                "content": [{"type": "text", "text": prompt}]
            }
        });
        process.send_message(&user_msg).await?;
        process.close_stdin();
        Ok(process)
    }

    #[cfg(test)]
    pub(crate) fn spawn_command(cmd: Command) -> Result<Self> {
        Self::from_command(cmd)
    }

    fn from_command(mut cmd: Command) -> Result<Self> {
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|source| AgentError::Spawn {
            program: cmd.as_std().get_program().to_string_lossy().into_owned(),
            source,
        })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AgentError::Process("stdout not captured".into()))?;
        let stdin = child.stdin.take();

        let stderr_buf = Arc::new(Mutex::new(String::new()));
        if let Some(stderr) = child.stderr.take() {
            let buf = Arc::clone(&stderr_buf);
            tokio::spawn(async move {
                let mut reader = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = reader.next_line().await {
                    if let Ok(mut b) = buf.lock() {
                        if !b.is_empty() {
                            b.push('\n');
                        }
                        b.push_str(&line);
                    }
                }
            });
        }

        Ok(Self {
            child,
            lines: BufReader::new(stdout).lines(),
            stdin,
            stderr_buf,
        })
    }

    async fn send_message(&mut self, msg: &serde_json::Value) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| AgentError::Process("stdin already closed".into()))?;
        let mut buf = serde_json::to_vec(msg)
            .map_err(|e| AgentError::Process(format!("failed to serialize stdin message: {e}")))?;
        buf.push(b'\n');
        stdin.write_all(&buf).await?;
        stdin.flush().await?;
        Ok(())
    }

    fn close_stdin(&mut self) {
        self.stdin.take();
    }

    /// Next non-empty JSONL line from stdout, or `Ok(None)` at EOF.
    pub(crate) async fn next_message(&mut self) -> Result<Option<Message>> {
        while let Some(line) = self.lines.next_line().await? {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let msg = serde_json::from_str::<Message>(trimmed).map_err(|source| AgentError::Parse {
                line: trimmed.to_owned(),
                source,
            })?;
            if matches!(msg, Message::Other) {
                tracing::trace!(line = trimmed, "skipping unhandled stream-json message");
                continue;
            }
            return Ok(Some(msg));
        }
        Ok(None)
    }

    /// Wait for exit; `Some` when the process failed, with captured stderr.
    pub(crate) async fn wait_exit_error(&mut self) -> Option<AgentError> {
        let status = match self.child.wait().await {
            Ok(s) => s,
            Err(e) => return Some(AgentError::Io(e)),
        };
        if status.success() {
            return None;
        }

        let stderr = self
            .stderr_buf
            .lock()
            .map(|b| b.clone())
            .unwrap_or_default();
        let head = match status.code() {
            Some(code) => format!("agent process exited with code {code}"),
            None => "agent process terminated by signal".to_string(),
        };
        Some(AgentError::Process(if stderr.is_empty() {
            head
        } else {
            format!("{head}\nstderr: {stderr}")
        }))
    }

    pub(crate) async fn kill(&mut self) {
        let _ = self.child.kill().await;
    }
}

// ─── Command builder ──────────────────────────────────────────────────────

fn build_command(opts: &QueryOptions) -> Command {
    let exe = opts.path_to_executable.as_deref().unwrap_or("claude");
    let mut cmd = Command::new(exe);

    cmd.arg("--output-format")
        .arg("stream-json")
        .arg("--verbose")
        .arg("--input-format")
        .arg("stream-json");

    if let Some(model) = &opts.model {
        cmd.arg("--model").arg(model);
    }
    if let Some(max_turns) = opts.max_turns {
        cmd.arg("--max-turns").arg(max_turns.to_string());
    }
    if !opts.disallowed_tools.is_empty() {
        cmd.arg("--disallowed-tools").args(&opts.disallowed_tools);
    }
    if opts.permission_mode != PermissionMode::Default {
        cmd.arg("--permission-mode").arg(opts.permission_mode.as_str());
    }
    if let Some(sp) = &opts.system_prompt {
        cmd.arg("--system-prompt").arg(sp);
    }
    if opts.no_session_persistence {
        cmd.arg("--no-session-persistence");
    }
    if let Some(cwd) = &opts.cwd {
        cmd.current_dir(cwd);
    }

    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(opts: &QueryOptions) -> Vec<String> {
        build_command(opts)
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn default_command_uses_stream_json_both_ways() {
        let args = args(&QueryOptions::default());
        assert_eq!(
            args,
            vec![
                "--output-format",
                "stream-json",
                "--verbose",
                "--input-format",
                "stream-json"
            ]
        );
    }

    #[test]
    fn options_map_to_flags() {
        let opts = QueryOptions {
            model: Some("claude-sonnet-4-6".into()),
            max_turns: Some(4),
            system_prompt: Some("plan".into()),
            permission_mode: PermissionMode::DontAsk,
            no_session_persistence: true,
            ..Default::default()
        };
        let args = args(&opts).join(" ");
        assert!(args.contains("--model claude-sonnet-4-6"));
        assert!(args.contains("--max-turns 4"));
        assert!(args.contains("--permission-mode dontAsk"));
        assert!(args.contains("--system-prompt plan"));
        assert!(args.ends_with("--no-session-persistence"));
    }

    #[tokio::test]
    async fn missing_executable_names_the_program() {
        let cmd = Command::new("/nonexistent/catalyst-test-agent");
        match AgentProcess::spawn_command(cmd) {
            Err(AgentError::Spawn { program, .. }) => {
                assert_eq!(program, "/nonexistent/catalyst-test-agent")
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("spawn should fail"),
        }
    }
}
