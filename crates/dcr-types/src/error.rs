use thiserror::Error;

/// Errors produced while validating type-level input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid uri for {field}: {value}")]
    InvalidUri { field: &'static str, value: String },

    #[error("{event} is related at both {first} and {second}")]
    ConflictingUri {
        event: String,
        first: String,
        second: String,
    },

    #[error("lock token targets {token} but was sent to {path}")]
    TokenMismatch { token: String, path: String },
}

/// A rejected transition of the event state machine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("event is locked by {owner}")]
    LockHeld { owner: String },

    #[error("event is not included")]
    NotIncluded,

    #[error("event is already executed")]
    AlreadyExecuted,
}
