//! Event node engine for distributed DCR workflows.
//!
//! [`EventEngine`] hosts any number of event nodes on top of an
//! [`dcr_store::EventStore`], a [`dcr_ledger::HistoryLedger`] and a
//! [`dcr_peer::PeerCommunicator`]. It answers the calls other nodes make
//! (reads, checks, notices, locks) and runs the execute protocol when one of
//! its own events is executed.

pub mod coordinator;
pub mod engine;
pub mod error;
pub mod receiver;
pub mod recorder;

#[cfg(test)]
mod loopback;

pub use engine::EventEngine;
pub use error::{EngineError, EngineResult};
pub use recorder::HistoryRecorder;
