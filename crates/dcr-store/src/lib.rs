//! Event state storage for DCR event nodes.
//!
//! A node's state lives in two kinds of rows: one node row per
//! `(workflow_id, event_id)` holding the marking flags, initial snapshot and
//! lock owner, and one relation row per `(workflow_id, event_id, kind,
//! foreign event)`. Reads materialize both into an [`dcr_types::EventNode`].
//!
//! # Design Rules
//!
//! 1. At most one node row per key. Anything else is a consistency error.
//! 2. The lock owner column is the only mutual exclusion between requests:
//!    `set_lock` is a check-and-set performed under the store's write guard.
//! 3. Deleting a node removes its relation rows.
//! 4. Reset bypasses the lock owner check.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryEventStore;
pub use traits::EventStore;
