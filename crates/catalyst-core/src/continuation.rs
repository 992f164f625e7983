use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::paths;

/// The single action to invoke once freshly committed definitions are loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Continuation {
    pub pending_action: String,
    /// The utterance that produced this continuation.
    #[serde(default)]
    pub utterance: String,
    pub created_at: DateTime<Utc>,
}

impl Continuation {
    pub fn new(pending_action: impl Into<String>, utterance: impl Into<String>) -> Self {
        Self {
            pending_action: pending_action.into(),
            utterance: utterance.into(),
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// ContinuationStore
// ---------------------------------------------------------------------------

/// Holds at most one [`Continuation`] at
/// `<root>/.catalyst/continuation.yaml`. Writes replace the file atomically.
pub struct ContinuationStore {
    path: PathBuf,
}

impl ContinuationStore {
    pub fn new(root: &Path) -> Self {
        Self {
            path: paths::continuation_path(root),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> Result<Option<Continuation>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&self.path)?;
        if data.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_yaml::from_str(&data)?))
    }

    /// Record `continuation`, replacing any previous one.
    pub fn write(&self, continuation: &Continuation) -> Result<()> {
        if let Some(previous) = self.read().ok().flatten() {
            tracing::warn!(
                previous = %previous.pending_action,
                next = %continuation.pending_action,
                "replacing an unconsumed continuation"
            );
        }
        let data = serde_yaml::to_string(continuation)?;
        crate::io::atomic_write(&self.path, data.as_bytes())
    }

    /// Delete the record (no-op when nothing is pending).
    pub fn clear(&self) -> Result<()> {
        crate::io::remove_if_exists(&self.path)?;
        Ok(())
    }
}
