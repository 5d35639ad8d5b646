use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::definition::EventDefinition;
use crate::error::TransitionError;
use crate::key::EventKey;
use crate::relation::Relations;

/// The three DCR marking flags of an event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventState {
    pub executed: bool,
    pub included: bool,
    pub pending: bool,
}

impl EventState {
    /// Local half of the executability rule: included and not yet executed.
    pub fn is_locally_executable(&self) -> bool {
        self.included && !self.executed
    }

    /// Whether an event depending on this one through a condition may run.
    pub fn satisfies_condition(&self) -> bool {
        !self.included || self.executed
    }

    /// Whether this event holds back an event depending on it through a milestone.
    pub fn blocks_milestone(&self) -> bool {
        self.included && self.pending
    }
}

/// Persisted state of a single event node.
///
/// The lock has two states: unlocked (`lock_owner == None`) and locked by an
/// owner. Every transition below is a plain mutation; atomicity against
/// concurrent requests is the store's job.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventNode {
    pub workflow_id: String,
    pub event_id: String,
    pub name: String,
    pub own_uri: String,
    pub roles: BTreeSet<String>,

    pub executed: bool,
    pub included: bool,
    pub pending: bool,

    pub initial_executed: bool,
    pub initial_included: bool,
    pub initial_pending: bool,

    pub lock_owner: Option<String>,
    pub relations: Relations,
}

impl EventNode {
    pub fn from_definition(definition: EventDefinition) -> Self {
        Self {
            workflow_id: definition.workflow_id,
            event_id: definition.event_id,
            name: definition.name,
            own_uri: definition.own_uri,
            roles: definition.roles,
            executed: definition.executed,
            included: definition.included,
            pending: definition.pending,
            initial_executed: definition.executed,
            initial_included: definition.included,
            initial_pending: definition.pending,
            lock_owner: None,
            relations: definition.relations,
        }
    }

    pub fn key(&self) -> EventKey {
        EventKey::new(self.workflow_id.clone(), self.event_id.clone())
    }

    pub fn state(&self) -> EventState {
        EventState {
            executed: self.executed,
            included: self.included,
            pending: self.pending,
        }
    }

    pub fn initial_state(&self) -> EventState {
        EventState {
            executed: self.initial_executed,
            included: self.initial_included,
            pending: self.initial_pending,
        }
    }

    /// Whether any of `roles` is allowed to execute this event.
    pub fn authorizes<'a>(&self, roles: impl IntoIterator<Item = &'a String>) -> bool {
        roles.into_iter().any(|role| self.roles.contains(role))
    }

    /// Unlocked → Locked(owner). Re-locking by the current owner succeeds.
    pub fn set_lock(&mut self, owner: &str) -> Result<(), TransitionError> {
        match &self.lock_owner {
            Some(current) if current != owner => Err(TransitionError::LockHeld {
                owner: current.clone(),
            }),
            _ => {
                self.lock_owner = Some(owner.to_string());
                Ok(())
            }
        }
    }

    /// Locked(*) → Unlocked, whoever holds the lock.
    pub fn clear_lock(&mut self) {
        self.lock_owner = None;
    }

    /// Mark the event executed. Inclusion and pending flags are left to the
    /// notifications sent by other events.
    pub fn execute(&mut self) -> Result<(), TransitionError> {
        if !self.included {
            return Err(TransitionError::NotIncluded);
        }
        if self.executed {
            return Err(TransitionError::AlreadyExecuted);
        }
        self.executed = true;
        Ok(())
    }

    /// Restore the initial snapshot and drop the lock regardless of owner.
    pub fn reset(&mut self) {
        self.executed = self.initial_executed;
        self.included = self.initial_included;
        self.pending = self.initial_pending;
        self.lock_owner = None;
    }

    pub fn set_included(&mut self, included: bool) {
        self.included = included;
    }

    pub fn set_pending(&mut self, pending: bool) {
        self.pending = pending;
    }
}
