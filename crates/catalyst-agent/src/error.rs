use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("could not start agent executable '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("agent i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("unreadable stream-json line ({source}): {line}")]
    Parse {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("agent stream ended without a result message")]
    NoResult,

    #[error("agent process: {0}")]
    Process(String),
}
