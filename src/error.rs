// Error taxonomy surfaced by task-list operations

use thiserror::Error;

use crate::models::TaskId;

/// Errors returned by [`crate::TaskStore`] operations and value parsing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskError {
    /// Input rejected: empty text, unknown priority or filter mode.
    #[error("validation failed: {0}")]
    Validation(String),

    /// No task carries the requested id.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The blob store could not persist the collection. In-memory state is
    /// left as it was before the call.
    #[error("failed to persist '{key}': {reason}")]
    Persistence { key: String, reason: String },
}

impl TaskError {
    /// Wrap a blob-store failure for `key`, keeping the full context chain.
    pub fn persistence(key: &str, err: &eyre::Report) -> Self {
        Self::Persistence {
            key: key.to_string(),
            reason: format!("{:#}", err),
        }
    }
}
