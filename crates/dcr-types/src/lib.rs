//! Foundation types for distributed DCR (Dynamic Condition Response) event nodes.
//!
//! Every activity of a DCR workflow runs as its own node. This crate holds the
//! vocabulary those nodes share: the persisted [`EventNode`] with its
//! execution-lock state machine, the relation sets that point at other nodes,
//! and the small value objects ([`EventAddress`], [`LockToken`]) that travel
//! between nodes.
//!
//! # Key Types
//!
//! - [`EventKey`]: `(workflow_id, event_id)` identity of a node
//! - [`EventNode`]: current/initial state, lock owner, relations
//! - [`Relations`]: condition/response/inclusion/exclusion/milestone targets
//! - [`EventDefinition`]: the payload a node is created from
//! - [`LockToken`]: lock request passed between nodes

pub mod address;
pub mod definition;
pub mod error;
pub mod key;
pub mod node;
pub mod relation;

pub use address::{EventAddress, LockToken};
pub use definition::EventDefinition;
pub use error::{TransitionError, TypeError};
pub use key::EventKey;
pub use node::{EventNode, EventState};
pub use relation::{RelationKind, RelationTarget, Relations};
