use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Identity of an event node: unique per `(workflow_id, event_id)`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventKey {
    pub workflow_id: String,
    pub event_id: String,
}

impl EventKey {
    pub fn new(workflow_id: impl Into<String>, event_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            event_id: event_id.into(),
        }
    }

    /// Reject keys with an empty component.
    pub fn validate(&self) -> Result<(), TypeError> {
        if self.workflow_id.trim().is_empty() {
            return Err(TypeError::MissingField("workflow_id"));
        }
        if self.event_id.trim().is_empty() {
            return Err(TypeError::MissingField("event_id"));
        }
        Ok(())
    }
}

impl fmt::Debug for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventKey({}/{})", self.workflow_id, self.event_id)
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.workflow_id, self.event_id)
    }
}
