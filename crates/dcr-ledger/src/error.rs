use dcr_types::EventKey;

use crate::records::HistoryKind;

/// Errors produced by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("no {kind:?} record at timestamp {timestamp} with counterpart {counterpart:?} for {key}")]
    RecordNotFound {
        key: EventKey,
        timestamp: u64,
        counterpart: Option<String>,
        kind: HistoryKind,
    },

    #[error("counterpart timestamp of {key}@{timestamp} is already set to {existing}")]
    CounterpartAlreadySet {
        key: EventKey,
        timestamp: u64,
        existing: u64,
    },

    #[error("integrity violation for {key} at timestamp {timestamp}: {reason}")]
    IntegrityViolation {
        key: EventKey,
        timestamp: u64,
        reason: String,
    },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("ledger lock poisoned")]
    Poisoned,
}

pub type LedgerResult<T> = Result<T, LedgerError>;
