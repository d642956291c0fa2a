use thiserror::Error;

/// Contract violations reported by [`Barrier`](crate::Barrier) and
/// [`Promise`](crate::Promise).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncError {
    #[error("Barrier has already been unlocked")]
    DoubleUnlock,

    #[error("Promise value has already been set")]
    AlreadySet,
}

pub type Result<T> = std::result::Result<T, SyncError>;
