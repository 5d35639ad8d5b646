use std::sync::Arc;

use dcr_ledger::{HistoryKind, HistoryLedger, HistoryReader, HistoryRecord, HistoryWriter};
use dcr_types::EventKey;
use tracing::warn;

use crate::error::EngineResult;

/// Writes history on behalf of the engine.
///
/// The initiator's own records are best-effort ([`note`](Self::note)):
/// a failing ledger is logged and never masks the outcome of the operation
/// being recorded. Records a receiver hands back to its caller are written
/// strictly, since the assigned timestamp is part of the answer.
#[derive(Clone)]
pub struct HistoryRecorder {
    ledger: Arc<dyn HistoryLedger>,
}

impl HistoryRecorder {
    pub fn new(ledger: Arc<dyn HistoryLedger>) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &Arc<dyn HistoryLedger> {
        &self.ledger
    }

    pub fn note(&self, record: HistoryRecord) -> Option<HistoryRecord> {
        let kind = record.kind;
        match self.ledger.reserve_next(record) {
            Ok(stored) => Some(stored),
            Err(err) => {
                warn!(?kind, error = %err, "history write failed");
                None
            }
        }
    }

    /// Record an interaction another event started with this one.
    ///
    /// A claimed sender timestamp that does not advance past the highest one
    /// seen from that sender is logged as a regression; the record is still
    /// written so the verifier can see it.
    pub fn record_incoming(
        &self,
        key: &EventKey,
        kind: HistoryKind,
        sender_id: &str,
        sender_timestamp: Option<u64>,
    ) -> EngineResult<HistoryRecord> {
        if let Some(claimed) = sender_timestamp {
            let highest = self.ledger.highest_counterpart_timestamp(key, sender_id)?;
            if claimed <= highest {
                warn!(
                    workflow = %key.workflow_id,
                    event = %key.event_id,
                    counterpart = sender_id,
                    claimed,
                    highest,
                    "counterpart timestamp regression"
                );
            }
        }

        let record = HistoryRecord::new(key, kind).with_counterpart(sender_id, sender_timestamp);
        Ok(self.ledger.reserve_next(record)?)
    }

    /// Fill in the timestamp the counterpart assigned to an interaction this
    /// event started.
    pub fn backfill(&self, record: Option<HistoryRecord>, counterpart_timestamp: u64) {
        let Some(mut record) = record else {
            return;
        };
        record.counterpart_timestamp = Some(counterpart_timestamp);
        if let Err(err) = self.ledger.update_history(&record) {
            warn!(
                workflow = %record.workflow_id,
                event = %record.event_id,
                timestamp = record.timestamp,
                error = %err,
                "counterpart back-fill failed"
            );
        }
    }
}
