use dcr_types::{EventDefinition, EventKey, EventNode, EventState};

use crate::error::StoreResult;

/// Persisted state of the event nodes hosted by one process.
///
/// Every method is a single atomic step against the stored rows; callers
/// never hold a guard across calls.
pub trait EventStore: Send + Sync {
    /// Insert a node row and its relation rows.
    ///
    /// Fails with `AlreadyExists` if the key is taken.
    fn create(&self, definition: EventDefinition) -> StoreResult<EventNode>;

    /// Materialize a node with all of its relations.
    fn get(&self, key: &EventKey) -> StoreResult<EventNode>;

    /// Whether a node row exists for the key.
    fn exists(&self, key: &EventKey) -> StoreResult<bool>;

    /// Remove a node and cascade to its relation rows.
    ///
    /// Fails with `Locked` while anyone holds the node's lock.
    fn delete(&self, key: &EventKey) -> StoreResult<EventNode>;

    /// Check-and-set of the lock column. Succeeds when unlocked or already
    /// held by `owner`.
    fn set_lock(&self, key: &EventKey, owner: &str) -> StoreResult<()>;

    /// Release the lock if it is held by `owner`. Releasing an unlocked node
    /// is a no-op.
    fn release_lock(&self, key: &EventKey, owner: &str) -> StoreResult<()>;

    /// Mark the node executed. Fails with `NotExecutable` unless it is
    /// included and not yet executed.
    fn execute(&self, key: &EventKey) -> StoreResult<EventState>;

    /// Restore the initial snapshot and clear the lock regardless of owner.
    fn reset(&self, key: &EventKey) -> StoreResult<EventNode>;

    /// Unconditional setter used by notifications from other events.
    fn set_included(&self, key: &EventKey, included: bool) -> StoreResult<EventState>;

    /// Unconditional setter used by notifications from other events.
    fn set_pending(&self, key: &EventKey, pending: bool) -> StoreResult<EventState>;
}
