use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalystError {
    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("invalid action name '{0}': must be lowercase letters, digits and underscores")]
    InvalidActionName(String),

    #[error("action already defined with a different body: {0}")]
    DuplicateDefinition(String),

    #[error("action '{action}' failed: {reason}")]
    ActionFailed { action: String, reason: String },

    #[error("call depth exceeded while invoking '{0}' (cyclic composite?)")]
    CallDepthExceeded(String),

    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    #[error("planning agent unavailable: {0}")]
    PlannerCommunication(String),

    #[error("restart failed: {0}")]
    RestartFailure(String),

    #[error("missing credential: set the {0} environment variable")]
    MissingCredential(String),

    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, CatalystError>;
