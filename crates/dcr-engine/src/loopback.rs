//! In-process peer network for exercising the protocol across several
//! engines without HTTP.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use dcr_ledger::InMemoryHistoryLedger;
use dcr_peer::{PeerCommunicator, PeerError, PeerOp, PeerResult};
use dcr_protocol::{CheckQuery, CheckResponse, Notification};
use dcr_store::InMemoryEventStore;
use dcr_types::{EventAddress, EventDefinition, LockToken, RelationTarget, Relations};

use crate::engine::EventEngine;
use crate::error::EngineError;

pub(crate) fn definition(event_id: &str, uri: &str) -> EventDefinition {
    EventDefinition {
        workflow_id: "w1".into(),
        event_id: event_id.into(),
        name: event_id.to_uppercase(),
        own_uri: uri.into(),
        roles: ["clerk".to_string()].into_iter().collect(),
        executed: false,
        included: true,
        pending: false,
        relations: Relations::default(),
    }
}

pub(crate) fn target(event_id: &str, uri: &str) -> RelationTarget {
    RelationTarget::new("w1", event_id, uri)
}

#[derive(Default)]
pub(crate) struct LoopbackNetwork {
    nodes: RwLock<HashMap<String, Arc<EventEngine>>>,
    failing: Mutex<HashSet<(String, PeerOp)>>,
    exclusions: Mutex<HashMap<String, RelationTarget>>,
    calls: Mutex<Vec<(PeerOp, String)>>,
}

impl LoopbackNetwork {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Start an engine reachable at `uri` with its own store and ledger.
    pub(crate) fn spawn(self: &Arc<Self>, uri: &str) -> Arc<EventEngine> {
        let engine = Arc::new(EventEngine::new(
            Arc::new(InMemoryEventStore::new()),
            Arc::new(InMemoryHistoryLedger::new()),
            self.clone(),
        ));
        self.nodes
            .write()
            .unwrap()
            .insert(uri.to_string(), engine.clone());
        engine
    }

    /// Make every `op` against `event_id` fail as if the peer were unreachable.
    pub(crate) fn fail(&self, event_id: &str, op: PeerOp) {
        self.failing.lock().unwrap().insert((event_id.to_string(), op));
    }

    /// Once `event_id` is locked, have it exclude `victim` straight away, the
    /// way a concurrent execute on that node would.
    pub(crate) fn exclude_on_lock(&self, event_id: &str, victim: RelationTarget) {
        self.exclusions
            .lock()
            .unwrap()
            .insert(event_id.to_string(), victim);
    }

    pub(crate) fn calls(&self) -> Vec<(PeerOp, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn calls_of(&self, op: PeerOp) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|(o, _)| *o == op)
            .map(|(_, id)| id)
            .collect()
    }

    fn route(&self, op: PeerOp, target: &RelationTarget) -> PeerResult<Arc<EventEngine>> {
        self.calls
            .lock()
            .unwrap()
            .push((op, target.event_id.clone()));

        let unreachable = |reason: &str| PeerError::Transport {
            op,
            target: target.key().to_string(),
            reason: reason.to_string(),
        };
        if self
            .failing
            .lock()
            .unwrap()
            .contains(&(target.event_id.clone(), op))
        {
            return Err(unreachable("injected failure"));
        }
        self.nodes
            .read()
            .unwrap()
            .get(&target.uri)
            .cloned()
            .ok_or_else(|| unreachable("no node at address"))
    }
}

fn answer(op: PeerOp, target: &RelationTarget, err: EngineError) -> PeerError {
    let code = err.code();
    if code.is_client_facing() {
        PeerError::Rejected {
            op,
            target: target.key().to_string(),
            code,
            message: err.to_string(),
        }
    } else {
        PeerError::Status {
            op,
            target: target.key().to_string(),
            status: code.status(),
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl PeerCommunicator for LoopbackNetwork {
    async fn is_executed(&self, target: &RelationTarget, sender_id: &str) -> PeerResult<bool> {
        let op = PeerOp::IsExecuted;
        self.route(op, target)?
            .is_executed(&target.key(), sender_id)
            .map_err(|e| answer(op, target, e))
    }

    async fn is_included(&self, target: &RelationTarget, sender_id: &str) -> PeerResult<bool> {
        let op = PeerOp::IsIncluded;
        self.route(op, target)?
            .is_included(&target.key(), sender_id)
            .map_err(|e| answer(op, target, e))
    }

    async fn check_condition(
        &self,
        target: &RelationTarget,
        query: &CheckQuery,
    ) -> PeerResult<CheckResponse> {
        let op = PeerOp::CheckCondition;
        self.route(op, target)?
            .check_condition(&target.key(), query)
            .map_err(|e| answer(op, target, e))
    }

    async fn check_milestone(
        &self,
        target: &RelationTarget,
        query: &CheckQuery,
    ) -> PeerResult<CheckResponse> {
        let op = PeerOp::CheckMilestone;
        self.route(op, target)?
            .check_milestone(&target.key(), query)
            .map_err(|e| answer(op, target, e))
    }

    async fn send_pending(
        &self,
        target: &RelationTarget,
        pending: bool,
        notice: &Notification,
    ) -> PeerResult<u64> {
        let op = PeerOp::SendPending;
        self.route(op, target)?
            .set_pending(&target.key(), pending, notice)
            .map_err(|e| answer(op, target, e))
    }

    async fn send_included(
        &self,
        target: &RelationTarget,
        included: bool,
        notice: &Notification,
    ) -> PeerResult<u64> {
        let op = if included {
            PeerOp::SendIncluded
        } else {
            PeerOp::SendExcluded
        };
        self.route(op, target)?
            .set_included(&target.key(), included, notice)
            .map_err(|e| answer(op, target, e))
    }

    async fn lock(&self, target: &RelationTarget, token: &LockToken) -> PeerResult<()> {
        let op = PeerOp::Lock;
        self.route(op, target)?
            .lock(&target.key(), token)
            .map_err(|e| answer(op, target, e))?;

        let victim = self.exclusions.lock().unwrap().remove(&target.event_id);
        if let Some(victim) = victim {
            let engine = self.nodes.read().unwrap().get(&victim.uri).cloned().unwrap();
            let sender = EventAddress::new(&target.workflow_id, &target.event_id, &target.uri);
            engine
                .set_included(&victim.key(), false, &Notification::new(sender, None))
                .unwrap();
        }
        Ok(())
    }

    async fn unlock(&self, target: &RelationTarget, owner: &str) -> PeerResult<()> {
        let op = PeerOp::Unlock;
        self.route(op, target)?
            .unlock(&target.key(), owner)
            .map_err(|e| answer(op, target, e))
    }
}
