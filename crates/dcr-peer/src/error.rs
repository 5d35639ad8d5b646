use std::fmt;

use dcr_protocol::ErrorCode;
use thiserror::Error;

/// The kind of outbound call that failed, used to pick the error code a
/// transport or unexpected-status failure is reported as.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PeerOp {
    IsExecuted,
    IsIncluded,
    CheckCondition,
    CheckMilestone,
    GetState,
    SendPending,
    SendIncluded,
    SendExcluded,
    Lock,
    Unlock,
    Login,
    GetWorkflow,
    Health,
    GetEvent,
    GetHistory,
    Create,
    Delete,
    Reset,
    Execute,
}

impl PeerOp {
    pub fn failure_code(&self) -> ErrorCode {
        match self {
            Self::IsExecuted => ErrorCode::FailedToGetExecutedFromAnotherEvent,
            Self::IsIncluded => ErrorCode::FailedToGetIncludedFromAnotherEvent,
            Self::CheckCondition => ErrorCode::FailedToCheckConditionAtAnotherEvent,
            Self::CheckMilestone => ErrorCode::FailedToCheckMilestoneAtAnotherEvent,
            Self::GetState => ErrorCode::FailedToGetStateFromAnotherEvent,
            Self::SendPending => ErrorCode::FailedToUpdatePendingAtAnotherEvent,
            Self::SendIncluded => ErrorCode::FailedToUpdateIncludedAtAnotherEvent,
            Self::SendExcluded => ErrorCode::FailedToUpdateExcludedAtAnotherEvent,
            Self::Lock => ErrorCode::FailedToLockOtherEvent,
            Self::Unlock => ErrorCode::FailedToUnlockOtherEvent,
            Self::Login | Self::GetWorkflow => ErrorCode::FailedToReachRegistry,
            Self::Health
            | Self::GetEvent
            | Self::GetHistory
            | Self::Create
            | Self::Delete
            | Self::Reset
            | Self::Execute => ErrorCode::Internal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IsExecuted => "is-executed",
            Self::IsIncluded => "is-included",
            Self::CheckCondition => "check-condition",
            Self::CheckMilestone => "check-milestone",
            Self::GetState => "get-state",
            Self::SendPending => "send-pending",
            Self::SendIncluded => "send-included",
            Self::SendExcluded => "send-excluded",
            Self::Lock => "lock",
            Self::Unlock => "unlock",
            Self::Login => "login",
            Self::GetWorkflow => "get-workflow",
            Self::Health => "health",
            Self::GetEvent => "get-event",
            Self::GetHistory => "get-history",
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Reset => "reset",
            Self::Execute => "execute",
        }
    }
}

impl fmt::Display for PeerOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum PeerError {
    /// The peer answered with a structured, client-facing rejection.
    #[error("{op} at {target} rejected: {code}: {message}")]
    Rejected {
        op: PeerOp,
        target: String,
        code: ErrorCode,
        message: String,
    },

    #[error("{op} at {target} failed with status {status}: {message}")]
    Status {
        op: PeerOp,
        target: String,
        status: u16,
        message: String,
    },

    #[error("{op} at {target} unreachable: {reason}")]
    Transport {
        op: PeerOp,
        target: String,
        reason: String,
    },

    #[error("{op} at {target} returned a malformed body: {reason}")]
    Decode {
        op: PeerOp,
        target: String,
        reason: String,
    },

    #[error("invalid peer address {uri}: {reason}")]
    InvalidAddress { uri: String, reason: String },

    #[error("http client setup failed: {0}")]
    Client(String),
}

impl PeerError {
    pub fn op(&self) -> Option<PeerOp> {
        match self {
            Self::Rejected { op, .. }
            | Self::Status { op, .. }
            | Self::Transport { op, .. }
            | Self::Decode { op, .. } => Some(*op),
            Self::InvalidAddress { .. } | Self::Client(_) => None,
        }
    }

    /// Domain code for this failure. Structured rejections keep the peer's
    /// own code; everything else becomes the failure code of the call.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Rejected { code, .. } => *code,
            Self::InvalidAddress { .. } => ErrorCode::InvalidInput,
            Self::Client(_) => ErrorCode::Internal,
            other => other
                .op()
                .map(|op| op.failure_code())
                .unwrap_or(ErrorCode::Internal),
        }
    }

    /// Whether the peer was reached and refused for a known reason.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

pub type PeerResult<T> = Result<T, PeerError>;
