//! `catalyst-agent`: drives the Claude CLI as catalyst's planning agent.
//!
//! ```text
//! QueryOptions
//!     │
//!     ▼
//! AgentProcess   ← spawns `claude --output-format stream-json …`,
//!     │             prompt on stdin, JSONL on stdout
//!     ▼
//! QueryStream    ← futures::Stream<Item = Result<Message>> over mpsc
//!     │
//!     ▼
//! runner::run    ← collects the terminal result into a RunResult
//! ```

pub mod error;
pub mod runner;
pub mod stream;
pub mod types;

pub(crate) mod process;

pub use error::AgentError;
pub use runner::{run, RunConfig, RunResult};
pub use stream::QueryStream;
pub use types::{
    AssistantMessage, ContentBlock, Message, PermissionMode, QueryOptions, ResultMessage,
    SystemMessage,
};

pub type Result<T> = std::result::Result<T, AgentError>;

/// Start a single query. The stream ends after the first
/// [`Message::Result`] or on process exit.
pub fn query(prompt: impl Into<String>, opts: QueryOptions) -> QueryStream {
    QueryStream::new(prompt.into(), opts)
}
