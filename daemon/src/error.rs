use notification_store::DbError;

/// Failures reported back to IPC callers.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("no live notification with id {0}")]
    NotFound(u32),

    #[error("dialog type {0} is out of range (0-4)")]
    InvalidDialogType(u32),

    #[error("notification id space exhausted")]
    IdSpaceExhausted,

    #[error("service lock poisoned")]
    LockPoisoned,

    #[error("store error: {0}")]
    Store(#[from] DbError),
}
