use std::fmt;

use serde::{Deserialize, Serialize};

/// Every error kind a node can answer with.
///
/// Client-facing kinds map 1:1 to a 4xx status and are passed through
/// unchanged when one node relays another's answer. The `FailedTo…` kinds
/// mean a peer was unreachable or answered unexpectedly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    NotFound,
    Unauthorized,
    Locked,
    NotExecutable,
    InvalidInput,
    AlreadyExists,
    FailedToGetExecutedFromAnotherEvent,
    FailedToGetIncludedFromAnotherEvent,
    FailedToCheckConditionAtAnotherEvent,
    FailedToCheckMilestoneAtAnotherEvent,
    FailedToGetStateFromAnotherEvent,
    FailedToLockOtherEvent,
    FailedToUnlockOtherEvent,
    FailedToUpdateState,
    FailedToUpdatePendingAtAnotherEvent,
    FailedToUpdateIncludedAtAnotherEvent,
    FailedToUpdateExcludedAtAnotherEvent,
    FailedToReachRegistry,
    StorageConsistency,
    Internal,
}

impl ErrorCode {
    /// HTTP status this code is rendered with.
    pub fn status(&self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::Unauthorized => 401,
            Self::Locked | Self::AlreadyExists => 409,
            Self::NotExecutable => 412,
            Self::InvalidInput => 400,
            _ => 500,
        }
    }

    /// Whether the code is an expected, client-facing rejection rather than
    /// a coordination or storage failure.
    pub fn is_client_facing(&self) -> bool {
        self.status() < 500
    }

    /// Fallback decoding when a peer answers with a bare status and no body.
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            400 => Some(Self::InvalidInput),
            401 => Some(Self::Unauthorized),
            404 => Some(Self::NotFound),
            409 => Some(Self::Locked),
            412 => Some(Self::NotExecutable),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// JSON body of every non-2xx response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorBody {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ErrorCode::NotFound.status(), 404);
        assert_eq!(ErrorCode::Unauthorized.status(), 401);
        assert_eq!(ErrorCode::Locked.status(), 409);
        assert_eq!(ErrorCode::NotExecutable.status(), 412);
        assert_eq!(ErrorCode::InvalidInput.status(), 400);
        assert_eq!(ErrorCode::FailedToLockOtherEvent.status(), 500);
        assert_eq!(ErrorCode::StorageConsistency.status(), 500);
    }

    #[test]
    fn client_facing_split() {
        assert!(ErrorCode::Locked.is_client_facing());
        assert!(ErrorCode::AlreadyExists.is_client_facing());
        assert!(!ErrorCode::FailedToUpdateState.is_client_facing());
        assert!(!ErrorCode::Internal.is_client_facing());
    }

    #[test]
    fn bare_status_fallback() {
        assert_eq!(ErrorCode::from_status(409), Some(ErrorCode::Locked));
        assert_eq!(ErrorCode::from_status(412), Some(ErrorCode::NotExecutable));
        assert_eq!(ErrorCode::from_status(502), None);
    }

    #[test]
    fn body_json_shape() {
        let body = ErrorBody::new(ErrorCode::NotExecutable, "event is not included");
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"code":"NotExecutable","message":"event is not included"}"#);
    }
}
