//! Error types for the task queues
//!
//! Provides unified error handling using thiserror. The cache has no error
//! type: absence and expiry are both reported as a miss.

use std::time::Duration;

use thiserror::Error;

// == Queue Error Enum ==
/// Unified error type for queue administration and task outcomes.
#[derive(Error, Debug)]
pub enum QueueError {
    /// No queue registered under this name
    #[error("Queue not found: {0}")]
    QueueNotFound(String),

    /// A queue with this name already exists
    #[error("Queue already exists: {0}")]
    DuplicateQueue(String),

    /// Queue configuration cannot be used
    #[error("Invalid queue config: {0}")]
    InvalidConfig(String),

    /// Backlog is at capacity; the task was not admitted
    #[error("Queue full: {name} already holds {capacity} pending tasks")]
    QueueFull { name: String, capacity: usize },

    /// A single attempt exceeded its allotted time
    #[error("Task timed out after {0:?}")]
    TaskTimeout(Duration),

    /// The work itself returned an error
    #[error(transparent)]
    Task(#[from] anyhow::Error),

    /// Every allowed attempt failed; wraps the last failure
    #[error("Task failed after {attempts} attempts: {last}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        last: Box<QueueError>,
    },

    /// Pending task rejected because its queue was cleared
    #[error("Queue cleared: {0}")]
    QueueCleared(String),

    /// Pending task or admission rejected during shutdown
    #[error("Queue manager is shutting down")]
    ShuttingDown,

    /// The outcome channel closed without a result
    #[error("Task abandoned before completion")]
    Abandoned,
}

impl QueueError {
    // == Classification ==
    /// Returns true if this error, or the last failure it wraps, is a timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            QueueError::TaskTimeout(_) => true,
            QueueError::RetryExhausted { last, .. } => last.is_timeout(),
            _ => false,
        }
    }

    /// Returns true for administrative rejections (clear or shutdown).
    pub fn is_rejection(&self) -> bool {
        matches!(self, QueueError::QueueCleared(_) | QueueError::ShuttingDown)
    }
}

// == Result Type Alias ==
/// Convenience Result type for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;
