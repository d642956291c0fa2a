use rendezvous_bridge::QueueId;
use thiserror::Error;

/// Why a dispatched task produced no value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("Task panicked on queue {queue}: {message}")]
    Panicked { queue: QueueId, message: String },

    #[error("Task was dropped by queue {queue} without running")]
    Abandoned { queue: QueueId },
}

impl TaskError {
    /// Queue the task was routed to.
    pub fn queue(&self) -> QueueId {
        match self {
            TaskError::Panicked { queue, .. } | TaskError::Abandoned { queue } => *queue,
        }
    }
}

pub type Result<T> = std::result::Result<T, TaskError>;
