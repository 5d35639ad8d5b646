use dcr_types::{EventKey, TypeError};

/// Errors from event store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No node row exists for the key.
    #[error("event not found: {0}")]
    NotFound(EventKey),

    /// A node row already exists for the key.
    #[error("event already exists: {0}")]
    AlreadyExists(EventKey),

    /// The lock column is held by another owner.
    #[error("event {key} is locked by {owner}")]
    Locked { key: EventKey, owner: String },

    /// The state machine refused to execute.
    #[error("event {key} is not executable: {reason}")]
    NotExecutable { key: EventKey, reason: String },

    /// Rows disagree with each other (orphaned relations, duplicate rows).
    #[error("storage consistency violation: {0}")]
    Consistency(String),

    /// The definition or token handed to the store is malformed.
    #[error("invalid input: {0}")]
    Invalid(#[from] TypeError),

    /// A writer panicked while holding the store guard.
    #[error("store lock poisoned")]
    Poisoned,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
