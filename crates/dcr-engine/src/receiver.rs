use dcr_ledger::{HistoryKind, HistoryReader, HistoryRecord};
use dcr_protocol::{CheckQuery, CheckResponse, Notification};
use dcr_types::{EventDefinition, EventKey, EventNode, LockToken};
use tracing::{debug, info};

use crate::engine::EventEngine;
use crate::error::EngineResult;

impl EventEngine {
    pub fn create(&self, definition: EventDefinition) -> EngineResult<EventNode> {
        definition.validate()?;
        let node = self.store.create(definition)?;
        info!(
            workflow = %node.workflow_id,
            event = %node.event_id,
            relations = node.relations.len(),
            "event created"
        );
        Ok(node)
    }

    /// Remove an event that nobody holds locked. Its history is kept, so a
    /// re-created event continues the timestamp sequence.
    pub fn delete(&self, key: &EventKey) -> EngineResult<EventNode> {
        let node = self.store.delete(key)?;
        info!(workflow = %key.workflow_id, event = %key.event_id, "event deleted");
        Ok(node)
    }

    /// Privileged recovery: restore the initial snapshot and drop any lock,
    /// whoever owns it.
    pub fn reset(&self, key: &EventKey) -> EngineResult<EventNode> {
        let before = self.store.get(key)?;
        let node = self.store.reset(key)?;
        info!(
            workflow = %key.workflow_id,
            event = %key.event_id,
            cleared_owner = ?before.lock_owner,
            "event reset"
        );
        Ok(node)
    }

    pub fn get(&self, key: &EventKey) -> EngineResult<EventNode> {
        Ok(self.store.get(key)?)
    }

    pub fn is_executed(&self, key: &EventKey, sender_id: &str) -> EngineResult<bool> {
        let node = self.store.get(key)?;
        debug!(workflow = %key.workflow_id, event = %key.event_id, sender = sender_id, "executed read");
        Ok(node.executed)
    }

    pub fn is_included(&self, key: &EventKey, sender_id: &str) -> EngineResult<bool> {
        let node = self.store.get(key)?;
        debug!(workflow = %key.workflow_id, event = %key.event_id, sender = sender_id, "included read");
        Ok(node.included)
    }

    /// Answer whether this event lets a conditioned event run: it must be
    /// excluded or executed.
    pub fn check_condition(&self, key: &EventKey, query: &CheckQuery) -> EngineResult<CheckResponse> {
        let node = self.store.get(key)?;
        let record = self.recorder.record_incoming(
            key,
            HistoryKind::CheckedConditionBy,
            &query.sender_event_id,
            query.sender_timestamp,
        )?;
        Ok(CheckResponse {
            satisfied: node.state().satisfies_condition(),
            timestamp: record.timestamp,
        })
    }

    /// Answer whether this event lets a milestone-bound event run: it must
    /// not be both included and pending.
    pub fn check_milestone(&self, key: &EventKey, query: &CheckQuery) -> EngineResult<CheckResponse> {
        let node = self.store.get(key)?;
        let record = self.recorder.record_incoming(
            key,
            HistoryKind::CheckedMilestoneBy,
            &query.sender_event_id,
            query.sender_timestamp,
        )?;
        Ok(CheckResponse {
            satisfied: !node.state().blocks_milestone(),
            timestamp: record.timestamp,
        })
    }

    /// Inclusion or exclusion notice from a peer whose relation fired.
    /// Returns the timestamp recorded for it.
    pub fn set_included(
        &self,
        key: &EventKey,
        included: bool,
        notice: &Notification,
    ) -> EngineResult<u64> {
        notice.sender.validate()?;
        self.store.get(key)?;
        let kind = if included {
            HistoryKind::IncludedBy
        } else {
            HistoryKind::ExcludedBy
        };
        // Recorded before the change so a refused notice leaves state untouched.
        let record = self.recorder.record_incoming(
            key,
            kind,
            &notice.sender.event_id,
            notice.sender_timestamp,
        )?;
        self.store.set_included(key, included)?;
        debug!(
            workflow = %key.workflow_id,
            event = %key.event_id,
            sender = %notice.sender.event_id,
            included,
            timestamp = record.timestamp,
            "inclusion updated"
        );
        Ok(record.timestamp)
    }

    /// Pending notice from a peer whose response relation fired.
    pub fn set_pending(
        &self,
        key: &EventKey,
        pending: bool,
        notice: &Notification,
    ) -> EngineResult<u64> {
        notice.sender.validate()?;
        self.store.get(key)?;
        let record = self.recorder.record_incoming(
            key,
            HistoryKind::SetPendingBy,
            &notice.sender.event_id,
            notice.sender_timestamp,
        )?;
        self.store.set_pending(key, pending)?;
        debug!(
            workflow = %key.workflow_id,
            event = %key.event_id,
            sender = %notice.sender.event_id,
            pending,
            timestamp = record.timestamp,
            "pending updated"
        );
        Ok(record.timestamp)
    }

    pub fn lock(&self, key: &EventKey, token: &LockToken) -> EngineResult<()> {
        token.validate_for(key)?;
        self.store.set_lock(key, &token.lock_owner)?;
        debug!(workflow = %key.workflow_id, event = %key.event_id, owner = %token.lock_owner, "lock acquired");
        Ok(())
    }

    /// Release a lock held by `owner`. Releasing an unlocked event succeeds;
    /// a lock held by someone else is refused with `Locked`.
    pub fn unlock(&self, key: &EventKey, owner: &str) -> EngineResult<()> {
        self.store.release_lock(key, owner)?;
        debug!(workflow = %key.workflow_id, event = %key.event_id, owner, "lock released");
        Ok(())
    }

    pub fn event_history(&self, key: &EventKey) -> EngineResult<Vec<HistoryRecord>> {
        Ok(self.ledger().read_event(key)?)
    }

    pub fn workflow_history(&self, workflow_id: &str) -> EngineResult<Vec<HistoryRecord>> {
        Ok(self.ledger().read_workflow(workflow_id)?)
    }
}
