use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::records::HistoryRecord;

/// Address of one record across the whole workflow.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordRef {
    pub event_id: String,
    pub timestamp: u64,
}

impl RecordRef {
    pub fn of(record: &HistoryRecord) -> Self {
        Self {
            event_id: record.event_id.clone(),
            timestamp: record.timestamp,
        }
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.event_id, self.timestamp)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Consecutive records of the same event.
    Local,
    /// An initiating record and the record its counterpart wrote for it.
    Remote,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CausalEdge {
    pub from: RecordRef,
    pub to: RecordRef,
    pub kind: EdgeKind,
}

/// Histories of the events of one workflow stitched into a directed graph.
///
/// Built from whatever records are handed in, typically the concatenated
/// exports of several nodes. Records whose counterpart cross-reference
/// cannot be resolved within that set are listed in `unmatched`; judging
/// them is left to the verifier.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CausalGraph {
    pub workflow_id: String,
    pub records: Vec<HistoryRecord>,
    pub edges: Vec<CausalEdge>,
    pub unmatched: Vec<RecordRef>,
}

impl CausalGraph {
    pub fn build(workflow_id: &str, records: impl IntoIterator<Item = HistoryRecord>) -> Self {
        let mut by_ref: BTreeMap<RecordRef, HistoryRecord> = BTreeMap::new();
        for record in records {
            if record.workflow_id == workflow_id {
                by_ref.insert(RecordRef::of(&record), record);
            }
        }

        let mut edges = Vec::new();
        let mut unmatched = BTreeSet::new();

        let mut previous: Option<&HistoryRecord> = None;
        for record in by_ref.values() {
            if let Some(prev) = previous.filter(|p| p.event_id == record.event_id) {
                edges.push(CausalEdge {
                    from: RecordRef::of(prev),
                    to: RecordRef::of(record),
                    kind: EdgeKind::Local,
                });
            }
            previous = Some(record);

            let Some(expected_kind) = record.kind.counterpart_kind() else {
                continue;
            };
            let (Some(counterpart), Some(counterpart_ts)) =
                (&record.counterpart_id, record.counterpart_timestamp)
            else {
                unmatched.insert(RecordRef::of(record));
                continue;
            };

            let other_ref = RecordRef {
                event_id: counterpart.clone(),
                timestamp: counterpart_ts,
            };
            let pairs_up = by_ref.get(&other_ref).is_some_and(|other| {
                other.kind == expected_kind
                    && other.counterpart_id.as_deref() == Some(record.event_id.as_str())
            });
            if !pairs_up {
                unmatched.insert(RecordRef::of(record));
                continue;
            }

            if record.kind.is_outgoing() {
                edges.push(CausalEdge {
                    from: RecordRef::of(record),
                    to: other_ref,
                    kind: EdgeKind::Remote,
                });
            }
        }

        Self {
            workflow_id: workflow_id.to_string(),
            records: by_ref.into_values().collect(),
            edges,
            unmatched: unmatched.into_iter().collect(),
        }
    }

    /// Records directly enabled by `from`.
    pub fn successors(&self, from: &RecordRef) -> Vec<&RecordRef> {
        self.edges
            .iter()
            .filter(|e| &e.from == from)
            .map(|e| &e.to)
            .collect()
    }

    pub fn remote_edges(&self) -> impl Iterator<Item = &CausalEdge> {
        self.edges.iter().filter(|e| e.kind == EdgeKind::Remote)
    }
}
