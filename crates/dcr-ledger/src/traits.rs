use dcr_types::EventKey;

use crate::error::LedgerResult;
use crate::records::HistoryRecord;

/// Write boundary for history records.
pub trait HistoryWriter: Send + Sync {
    /// Assign `record.timestamp = highest timestamp of its event (or 0) + 1`,
    /// link and hash it, and persist it, all in one step. Concurrent callers
    /// for the same event never receive the same timestamp.
    fn reserve_next(&self, record: HistoryRecord) -> LedgerResult<HistoryRecord>;

    /// Back-fill `counterpart_timestamp` of the stored record that matches
    /// `record` on `(timestamp, counterpart_id, kind)`.
    fn update_history(&self, record: &HistoryRecord) -> LedgerResult<HistoryRecord>;
}

/// Read boundary for history queries and export.
pub trait HistoryReader: Send + Sync {
    /// Highest `counterpart_timestamp` recorded for interactions with
    /// `counterpart_id`, or 0 if there are none.
    fn highest_counterpart_timestamp(
        &self,
        key: &EventKey,
        counterpart_id: &str,
    ) -> LedgerResult<u64>;

    /// Highest timestamp reserved for the event, or 0.
    fn latest_timestamp(&self, key: &EventKey) -> LedgerResult<u64>;

    /// All records of one event in timestamp order.
    fn read_event(&self, key: &EventKey) -> LedgerResult<Vec<HistoryRecord>>;

    /// All records of every event of a workflow, grouped by event and in
    /// timestamp order within each event.
    fn read_workflow(&self, workflow_id: &str) -> LedgerResult<Vec<HistoryRecord>>;
}

/// Combined ledger handle, usable as a trait object.
pub trait HistoryLedger: HistoryWriter + HistoryReader {}

impl<T: HistoryWriter + HistoryReader> HistoryLedger for T {}
