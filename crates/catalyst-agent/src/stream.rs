use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use crate::process::AgentProcess;
use crate::types::{Message, QueryOptions};
use crate::Result;

// ─── QueryStream ──────────────────────────────────────────────────────────

/// An async stream of [`Message`]s from one agent subprocess.
///
/// A background task owns the [`AgentProcess`] and forwards messages over an
/// mpsc channel until the terminal `Result` message or process exit.
/// Dropping the stream makes the task stop at its next send.
pub struct QueryStream {
    rx: mpsc::Receiver<Result<Message>>,
}

impl QueryStream {
    pub(crate) fn new(prompt: String, opts: QueryOptions) -> Self {
        let (tx, rx) = mpsc::channel(32);

        tokio::spawn(async move {
            let process = match AgentProcess::spawn(&prompt, &opts).await {
                Ok(p) => p,
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                    return;
                }
            };
            forward(process, tx).await;
        });

        QueryStream { rx }
    }

    #[cfg(test)]
    pub(crate) fn from_channel(rx: mpsc::Receiver<Result<Message>>) -> Self {
        Self { rx }
    }
}

/// Pump messages from `process` into `tx`. Surfaces a non-zero exit when the
/// process ended without a result message.
pub(crate) async fn forward(mut process: AgentProcess, tx: mpsc::Sender<Result<Message>>) {
    let mut got_result = false;
    loop {
        match process.next_message().await {
            Err(e) => {
                let _ = tx.send(Err(e)).await;
                break;
            }
            Ok(None) => break,
            Ok(Some(msg)) => {
                let terminal = matches!(msg, Message::Result(_));
                got_result |= terminal;
                if tx.send(Ok(msg)).await.is_err() || terminal {
                    break;
                }
            }
        }
    }

    if !got_result {
        if let Some(exit_err) = process.wait_exit_error().await {
            let _ = tx.send(Err(exit_err)).await;
        }
    }
    process.kill().await;
}

impl Stream for QueryStream {
    type Item = Result<Message>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
