use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::key::EventKey;
use crate::relation::validate_uri;

/// Where a calling event node lives. Sent with every state notification so
/// the receiver can attribute the change in its history.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventAddress {
    pub workflow_id: String,
    pub event_id: String,
    pub uri: String,
}

impl EventAddress {
    pub fn new(
        workflow_id: impl Into<String>,
        event_id: impl Into<String>,
        uri: impl Into<String>,
    ) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            event_id: event_id.into(),
            uri: uri.into(),
        }
    }

    pub fn key(&self) -> EventKey {
        EventKey::new(self.workflow_id.clone(), self.event_id.clone())
    }

    pub fn validate(&self) -> Result<(), TypeError> {
        self.key().validate()?;
        validate_uri("uri", &self.uri)
    }
}

/// Lock request/release token exchanged between nodes.
///
/// `workflow_id`/`event_id` name the node being locked; `lock_owner` is the
/// event id of the node asking for the lock.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockToken {
    pub workflow_id: String,
    pub event_id: String,
    pub lock_owner: String,
}

impl LockToken {
    pub fn new(target: &EventKey, lock_owner: impl Into<String>) -> Self {
        Self {
            workflow_id: target.workflow_id.clone(),
            event_id: target.event_id.clone(),
            lock_owner: lock_owner.into(),
        }
    }

    /// Check the token is well formed and addressed to `path`.
    pub fn validate_for(&self, path: &EventKey) -> Result<(), TypeError> {
        if self.lock_owner.trim().is_empty() {
            return Err(TypeError::MissingField("lock_owner"));
        }
        let token = EventKey::new(self.workflow_id.clone(), self.event_id.clone());
        if &token != path {
            return Err(TypeError::TokenMismatch {
                token: token.to_string(),
                path: path.to_string(),
            });
        }
        Ok(())
    }
}
