use dcr_ledger::LedgerError;
use dcr_peer::PeerError;
use dcr_protocol::ErrorCode;
use dcr_store::StoreError;
use dcr_types::TypeError;
use thiserror::Error;

/// Errors surfaced by engine operations, one variant per family of
/// [`ErrorCode`]. Only the HTTP layer turns them into responses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("locked: {0}")]
    Locked(String),

    #[error("not executable: {0}")]
    NotExecutable(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// A peer was unreachable or answered unexpectedly.
    #[error("{code}: {message}")]
    Coordination { code: ErrorCode, message: String },

    #[error("failed to update state: {0}")]
    UpdateState(String),

    #[error("storage consistency violation: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::Unauthorized(_) => ErrorCode::Unauthorized,
            Self::Locked(_) => ErrorCode::Locked,
            Self::NotExecutable(_) => ErrorCode::NotExecutable,
            Self::InvalidInput(_) => ErrorCode::InvalidInput,
            Self::AlreadyExists(_) => ErrorCode::AlreadyExists,
            Self::Coordination { code, .. } => *code,
            Self::UpdateState(_) => ErrorCode::FailedToUpdateState,
            Self::Storage(_) => ErrorCode::StorageConsistency,
            Self::Internal(_) => ErrorCode::Internal,
        }
    }

    pub fn from_code(code: ErrorCode, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            ErrorCode::NotFound => Self::NotFound(message),
            ErrorCode::Unauthorized => Self::Unauthorized(message),
            ErrorCode::Locked => Self::Locked(message),
            ErrorCode::NotExecutable => Self::NotExecutable(message),
            ErrorCode::InvalidInput => Self::InvalidInput(message),
            ErrorCode::AlreadyExists => Self::AlreadyExists(message),
            ErrorCode::FailedToUpdateState => Self::UpdateState(message),
            ErrorCode::StorageConsistency => Self::Storage(message),
            ErrorCode::Internal => Self::Internal(message),
            code => Self::Coordination { code, message },
        }
    }

    pub fn coordination(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Coordination {
            code,
            message: message.into(),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        let message = err.to_string();
        match err {
            StoreError::NotFound(_) => Self::NotFound(message),
            StoreError::AlreadyExists(_) => Self::AlreadyExists(message),
            StoreError::Locked { .. } => Self::Locked(message),
            StoreError::NotExecutable { .. } => Self::NotExecutable(message),
            StoreError::Invalid(_) => Self::InvalidInput(message),
            StoreError::Consistency(_) | StoreError::Poisoned => Self::Storage(message),
        }
    }
}

impl From<LedgerError> for EngineError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err {
            LedgerError::RecordNotFound { .. } => Self::NotFound(message),
            LedgerError::IntegrityViolation { .. } | LedgerError::Poisoned => Self::Storage(message),
            LedgerError::CounterpartAlreadySet { .. } | LedgerError::Serialization(_) => {
                Self::Internal(message)
            }
        }
    }
}

impl From<PeerError> for EngineError {
    fn from(err: PeerError) -> Self {
        Self::from_code(err.code(), err.to_string())
    }
}

impl From<TypeError> for EngineError {
    fn from(err: TypeError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use dcr_peer::PeerOp;
    use dcr_types::EventKey;

    #[test]
    fn store_errors_keep_their_family() {
        let key = EventKey::new("w1", "e1");
        let locked = StoreError::Locked {
            key: key.clone(),
            owner: "e2".into(),
        };
        assert_eq!(EngineError::from(locked).code(), ErrorCode::Locked);
        assert_eq!(
            EngineError::from(StoreError::Consistency("dup".into())).code(),
            ErrorCode::StorageConsistency
        );
        assert_eq!(
            EngineError::from(StoreError::AlreadyExists(key)).code(),
            ErrorCode::AlreadyExists
        );
    }

    #[test]
    fn peer_rejection_passes_through() {
        let err = PeerError::Rejected {
            op: PeerOp::CheckCondition,
            target: "w1/e2".into(),
            code: ErrorCode::NotFound,
            message: "gone".into(),
        };
        assert_eq!(EngineError::from(err).code(), ErrorCode::NotFound);

        let err = PeerError::Transport {
            op: PeerOp::CheckCondition,
            target: "w1/e2".into(),
            reason: "timeout".into(),
        };
        assert_eq!(
            EngineError::from(err).code(),
            ErrorCode::FailedToCheckConditionAtAnotherEvent
        );
    }

    #[test]
    fn from_code_round_trips() {
        for code in [
            ErrorCode::Locked,
            ErrorCode::FailedToLockOtherEvent,
            ErrorCode::FailedToUpdateState,
            ErrorCode::StorageConsistency,
        ] {
            assert_eq!(EngineError::from_code(code, "x").code(), code);
        }
    }
}
