use std::collections::BTreeMap;
use std::sync::RwLock;

use dcr_types::EventKey;

use crate::error::{LedgerError, LedgerResult};
use crate::records::HistoryRecord;
use crate::traits::{HistoryReader, HistoryWriter};

/// In-memory history ledger for embedding and tests.
///
/// One stream per event, kept in timestamp order. Reservation happens under
/// the write guard, which makes `max + 1` race-free.
pub struct InMemoryHistoryLedger {
    inner: RwLock<LedgerState>,
}

#[derive(Default)]
struct LedgerState {
    streams: BTreeMap<EventKey, Vec<HistoryRecord>>,
}

impl InMemoryHistoryLedger {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(LedgerState::default()),
        }
    }

    /// Total number of records across all events.
    pub fn record_count(&self) -> usize {
        self.inner
            .read()
            .map(|s| s.streams.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    fn read_state(&self) -> LedgerResult<std::sync::RwLockReadGuard<'_, LedgerState>> {
        self.inner.read().map_err(|_| LedgerError::Poisoned)
    }

    fn write_state(&self) -> LedgerResult<std::sync::RwLockWriteGuard<'_, LedgerState>> {
        self.inner.write().map_err(|_| LedgerError::Poisoned)
    }
}

impl Default for InMemoryHistoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryWriter for InMemoryHistoryLedger {
    fn reserve_next(&self, mut record: HistoryRecord) -> LedgerResult<HistoryRecord> {
        let key = record.key();
        let mut state = self.write_state()?;
        let stream = state.streams.entry(key).or_default();

        let last = stream.last();
        record.timestamp = last.map(|r| r.timestamp).unwrap_or(0) + 1;
        record.prev_hash = last.map(|r| r.record_hash);
        record.record_hash = record.compute_hash()?;

        stream.push(record.clone());
        Ok(record)
    }

    fn update_history(&self, record: &HistoryRecord) -> LedgerResult<HistoryRecord> {
        let key = record.key();
        let not_found = || LedgerError::RecordNotFound {
            key: key.clone(),
            timestamp: record.timestamp,
            counterpart: record.counterpart_id.clone(),
            kind: record.kind,
        };

        let mut state = self.write_state()?;
        let stored = state
            .streams
            .get_mut(&key)
            .and_then(|stream| {
                stream.iter_mut().find(|r| {
                    r.timestamp == record.timestamp
                        && r.counterpart_id == record.counterpart_id
                        && r.kind == record.kind
                })
            })
            .ok_or_else(not_found)?;

        match (stored.counterpart_timestamp, record.counterpart_timestamp) {
            (_, None) => {}
            (Some(existing), Some(new)) if existing != new => {
                tracing::warn!(
                    workflow = %key.workflow_id,
                    event = %key.event_id,
                    timestamp = record.timestamp,
                    existing,
                    claimed = new,
                    "counterpart timestamp already set"
                );
                return Err(LedgerError::CounterpartAlreadySet {
                    key,
                    timestamp: record.timestamp,
                    existing,
                });
            }
            (_, Some(new)) => {
                tracing::debug!(
                    workflow = %key.workflow_id,
                    event = %key.event_id,
                    timestamp = record.timestamp,
                    counterpart_timestamp = new,
                    "counterpart timestamp back-filled"
                );
                stored.counterpart_timestamp = Some(new);
            }
        }
        Ok(stored.clone())
    }
}

impl HistoryReader for InMemoryHistoryLedger {
    fn highest_counterpart_timestamp(
        &self,
        key: &EventKey,
        counterpart_id: &str,
    ) -> LedgerResult<u64> {
        let state = self.read_state()?;
        Ok(state
            .streams
            .get(key)
            .into_iter()
            .flatten()
            .filter(|r| r.counterpart_id.as_deref() == Some(counterpart_id))
            .filter_map(|r| r.counterpart_timestamp)
            .max()
            .unwrap_or(0))
    }

    fn latest_timestamp(&self, key: &EventKey) -> LedgerResult<u64> {
        let state = self.read_state()?;
        Ok(state
            .streams
            .get(key)
            .and_then(|s| s.last())
            .map(|r| r.timestamp)
            .unwrap_or(0))
    }

    fn read_event(&self, key: &EventKey) -> LedgerResult<Vec<HistoryRecord>> {
        let state = self.read_state()?;
        Ok(state.streams.get(key).cloned().unwrap_or_default())
    }

    fn read_workflow(&self, workflow_id: &str) -> LedgerResult<Vec<HistoryRecord>> {
        let state = self.read_state()?;
        Ok(state
            .streams
            .iter()
            .filter(|(key, _)| key.workflow_id == workflow_id)
            .flat_map(|(_, stream)| stream.iter().cloned())
            .collect())
    }
}
