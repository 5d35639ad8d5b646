//! The execute protocol, run by the event being executed.
//!
//! Order of steps: authorize, local precondition, condition and milestone
//! checks, self-lock, peer locks, commit, propagation, unlock. Locks are
//! released on every path once the self-lock is held. A failed propagation
//! does not undo the local commit.

use dcr_ledger::{HistoryKind, HistoryRecord};
use dcr_protocol::{CheckQuery, ErrorCode, EventStateDto, ExecuteResponse, Notification};
use dcr_types::{EventKey, EventNode, LockToken, RelationKind, RelationTarget};
use tracing::{debug, info, warn};

use crate::engine::EventEngine;
use crate::error::{EngineError, EngineResult};

fn propagation_code(kind: RelationKind) -> ErrorCode {
    match kind {
        RelationKind::Response => ErrorCode::FailedToUpdatePendingAtAnotherEvent,
        RelationKind::Inclusion => ErrorCode::FailedToUpdateIncludedAtAnotherEvent,
        _ => ErrorCode::FailedToUpdateExcludedAtAnotherEvent,
    }
}

impl EventEngine {
    /// Execute an event on behalf of a caller holding `roles`.
    ///
    /// Every failure of an existing event is also noted as `ExecuteFailed`
    /// in its history.
    pub async fn execute(&self, key: &EventKey, roles: &[String]) -> EngineResult<ExecuteResponse> {
        let outcome = self.run_execute(key, roles).await;
        if let Err(err) = &outcome {
            warn!(
                workflow = %key.workflow_id,
                event = %key.event_id,
                code = %err.code(),
                error = %err,
                "execute failed"
            );
            if self.store.exists(key).unwrap_or(false) {
                self.recorder.note(
                    HistoryRecord::new(key, HistoryKind::ExecuteFailed)
                        .with_message(format!("{}: {err}", err.code())),
                );
            }
        }
        outcome
    }

    /// Composite state as seen by `sender_id`, with `executable` evaluated
    /// through the same condition and milestone checks execute uses.
    pub async fn state(&self, key: &EventKey, sender_id: &str) -> EngineResult<EventStateDto> {
        let node = self.store.get(key)?;
        debug!(workflow = %key.workflow_id, event = %key.event_id, sender = sender_id, "state read");

        let executable = node.state().is_locally_executable()
            && self.blocking_relation(&node).await?.is_none();

        Ok(EventStateDto {
            workflow_id: node.workflow_id,
            event_id: node.event_id,
            name: node.name,
            executed: node.executed,
            included: node.included,
            pending: node.pending,
            executable,
        })
    }

    async fn run_execute(&self, key: &EventKey, roles: &[String]) -> EngineResult<ExecuteResponse> {
        let node = self.store.get(key)?;
        if !node.authorizes(roles) {
            return Err(EngineError::Unauthorized(format!(
                "none of the given roles may execute {key}"
            )));
        }

        self.recorder
            .note(HistoryRecord::new(key, HistoryKind::ExecuteStart));

        if !node.included {
            return Err(EngineError::NotExecutable(format!("{key} is excluded")));
        }
        if node.executed {
            return Err(EngineError::NotExecutable(format!("{key} is already executed")));
        }
        if let Some(reason) = self.blocking_relation(&node).await? {
            return Err(EngineError::NotExecutable(reason));
        }

        self.store.set_lock(key, &key.event_id)?;
        debug!(workflow = %key.workflow_id, event = %key.event_id, "self lock acquired");

        let mut held = Vec::new();
        let outcome = self.run_locked(&node, &mut held).await;
        let released = self.release_all(key, &held).await;

        match (outcome, released) {
            (Ok(response), Ok(())) => Ok(response),
            (Ok(_), Err(err)) => Err(err),
            (Err(err), _) => Err(err),
        }
    }

    /// Steps that run while this event holds its own lock. Every peer lock
    /// taken is pushed onto `held` so the caller can release it.
    async fn run_locked(
        &self,
        node: &EventNode,
        held: &mut Vec<RelationTarget>,
    ) -> EngineResult<ExecuteResponse> {
        let key = node.key();

        for target in node.relations.lock_targets(&key) {
            let token = LockToken::new(&target.key(), key.event_id.clone());
            if let Err(err) = self.peers.lock(&target, &token).await {
                warn!(
                    workflow = %key.workflow_id,
                    event = %key.event_id,
                    target = %target.key(),
                    held = held.len(),
                    error = %err,
                    "peer lock failed, rolling back"
                );
                return Err(EngineError::coordination(
                    ErrorCode::FailedToLockOtherEvent,
                    format!("could not lock {}: {err}", target.key()),
                ));
            }
            held.push(target);
        }

        self.store
            .execute(&key)
            .map_err(|err| EngineError::UpdateState(err.to_string()))?;
        let finished = self
            .recorder
            .note(HistoryRecord::new(&key, HistoryKind::ExecuteFinished));
        info!(workflow = %key.workflow_id, event = %key.event_id, "event executed");

        self.propagate(node).await?;

        Ok(ExecuteResponse {
            workflow_id: key.workflow_id,
            event_id: key.event_id,
            executed: true,
            history_timestamp: finished.map(|r| r.timestamp).unwrap_or(0),
        })
    }

    /// Release peer locks in reverse acquisition order, then the self-lock.
    /// Every release is attempted even if an earlier one fails.
    async fn release_all(&self, key: &EventKey, held: &[RelationTarget]) -> EngineResult<()> {
        let mut failures = Vec::new();

        for target in held.iter().rev() {
            if let Err(err) = self.peers.unlock(target, &key.event_id).await {
                warn!(
                    workflow = %key.workflow_id,
                    event = %key.event_id,
                    target = %target.key(),
                    error = %err,
                    "peer unlock failed"
                );
                failures.push(format!("{}: {err}", target.key()));
            }
        }

        if let Err(err) = self.store.release_lock(key, &key.event_id) {
            warn!(workflow = %key.workflow_id, event = %key.event_id, error = %err, "self unlock failed");
            failures.push(format!("{key}: {err}"));
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(EngineError::coordination(
                ErrorCode::FailedToUnlockOtherEvent,
                failures.join("; "),
            ))
        }
    }

    /// First condition or milestone that keeps `node` from running, if any.
    async fn blocking_relation(&self, node: &EventNode) -> EngineResult<Option<String>> {
        for target in node.relations.get(RelationKind::Condition) {
            if !self.check(node, target, RelationKind::Condition).await? {
                return Ok(Some(format!("condition {} is not satisfied", target.key())));
            }
        }
        for target in node.relations.get(RelationKind::Milestone) {
            if !self.check(node, target, RelationKind::Milestone).await? {
                return Ok(Some(format!("milestone {} is included and pending", target.key())));
            }
        }
        Ok(None)
    }

    async fn check(
        &self,
        node: &EventNode,
        target: &RelationTarget,
        kind: RelationKind,
    ) -> EngineResult<bool> {
        let key = node.key();
        if target.key() == key {
            let state = node.state();
            return Ok(match kind {
                RelationKind::Condition => state.satisfies_condition(),
                _ => !state.blocks_milestone(),
            });
        }

        let outgoing = match kind {
            RelationKind::Condition => HistoryKind::ChecksCondition,
            _ => HistoryKind::ChecksMilestone,
        };
        let sent = self
            .recorder
            .note(HistoryRecord::new(&key, outgoing).with_counterpart(&target.event_id, None));
        let query = CheckQuery {
            sender_workflow_id: key.workflow_id.clone(),
            sender_event_id: key.event_id.clone(),
            sender_timestamp: sent.as_ref().map(|r| r.timestamp),
        };

        let answer = match kind {
            RelationKind::Condition => self.peers.check_condition(target, &query).await?,
            _ => self.peers.check_milestone(target, &query).await?,
        };
        self.recorder.backfill(sent, answer.timestamp);
        debug!(
            workflow = %key.workflow_id,
            event = %key.event_id,
            target = %target.key(),
            %kind,
            satisfied = answer.satisfied,
            "relation checked"
        );
        Ok(answer.satisfied)
    }

    /// Send the state changes of every fired relation. Stops at the first
    /// failed notice; the local commit stays in place.
    async fn propagate(&self, node: &EventNode) -> EngineResult<()> {
        let key = node.key();
        let sender = self.sender_address(node);

        for (kind, outgoing) in [
            (RelationKind::Response, HistoryKind::SetsPending),
            (RelationKind::Inclusion, HistoryKind::Includes),
            (RelationKind::Exclusion, HistoryKind::Excludes),
        ] {
            for target in node.relations.get(kind) {
                if target.key() == key {
                    self.propagate_to_self(&key, kind, outgoing)?;
                    continue;
                }

                let sent = self
                    .recorder
                    .note(HistoryRecord::new(&key, outgoing).with_counterpart(&target.event_id, None));
                let notice = Notification::new(sender.clone(), sent.as_ref().map(|r| r.timestamp));

                let outcome = match kind {
                    RelationKind::Response => self.peers.send_pending(target, true, &notice).await,
                    RelationKind::Inclusion => self.peers.send_included(target, true, &notice).await,
                    _ => self.peers.send_included(target, false, &notice).await,
                };

                match outcome {
                    Ok(timestamp) => self.recorder.backfill(sent, timestamp),
                    Err(err) => {
                        warn!(
                            workflow = %key.workflow_id,
                            event = %key.event_id,
                            target = %target.key(),
                            %kind,
                            error = %err,
                            "propagation failed, local commit kept"
                        );
                        return Err(EngineError::coordination(
                            propagation_code(kind),
                            format!("{kind} notice to {}: {err}", target.key()),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// A relation from an event to itself: apply it directly and write both
    /// sides of the interaction into the event's own history.
    fn propagate_to_self(
        &self,
        key: &EventKey,
        kind: RelationKind,
        outgoing: HistoryKind,
    ) -> EngineResult<()> {
        let sent = self
            .recorder
            .note(HistoryRecord::new(key, outgoing).with_counterpart(&key.event_id, None));

        let applied = match kind {
            RelationKind::Response => self.store.set_pending(key, true),
            RelationKind::Inclusion => self.store.set_included(key, true),
            _ => self.store.set_included(key, false),
        };
        applied.map_err(|err| EngineError::coordination(propagation_code(kind), err.to_string()))?;

        let incoming = outgoing.counterpart_kind().unwrap_or(outgoing);
        let received = self.recorder.note(
            HistoryRecord::new(key, incoming)
                .with_counterpart(&key.event_id, sent.as_ref().map(|r| r.timestamp)),
        );
        if let Some(received) = received {
            self.recorder.backfill(sent, received.timestamp);
        }
        Ok(())
    }
}
