//! Causal history ledger for DCR event nodes.
//!
//! Every cross-node interaction an event takes part in is written here with a
//! per-event timestamp (`1, 2, 3, …` with no gaps) and, where known, the
//! timestamp the other side assigned to the same interaction. The resulting
//! records let an offline verifier stitch the histories of all nodes of a
//! workflow into one causal graph.
//!
//! This crate provides:
//! - [`HistoryRecord`] / [`HistoryKind`] with hash-linked integrity
//! - `HistoryWriter` / `HistoryReader` trait boundaries
//! - [`InMemoryHistoryLedger`] for embedding and tests
//! - [`HistoryValidator`] (sequence + hash chain checks)
//! - [`CausalGraph`] export for the consistency verifier

pub mod error;
pub mod graph;
pub mod memory;
pub mod records;
pub mod traits;
pub mod validation;

pub use error::{LedgerError, LedgerResult};
pub use graph::{CausalEdge, CausalGraph, EdgeKind, RecordRef};
pub use memory::InMemoryHistoryLedger;
pub use records::{HistoryKind, HistoryRecord};
pub use traits::{HistoryLedger, HistoryReader, HistoryWriter};
pub use validation::{HistoryValidator, ValidationReport, Violation, ViolationKind};
