use thiserror::Error;

use crate::execution::QueueId;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Queue not accepting work: {0}")]
    QueueUnavailable(QueueId),

    #[error("Queue closed: {0}")]
    QueueClosed(String),

    #[error("Failed to start execution context: {0}")]
    Spawn(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
