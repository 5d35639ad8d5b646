use async_trait::async_trait;
use dcr_protocol::{CheckQuery, CheckResponse, Notification};
use dcr_types::{LockToken, RelationTarget};

use crate::error::PeerResult;

/// Calls one event node makes on another.
///
/// Every call names its destination explicitly; implementations must not
/// keep per-destination mutable state, so one instance can serve any number
/// of concurrent calls. Each call is attempted exactly once.
#[async_trait]
pub trait PeerCommunicator: Send + Sync {
    async fn is_executed(&self, target: &RelationTarget, sender_id: &str) -> PeerResult<bool>;

    async fn is_included(&self, target: &RelationTarget, sender_id: &str) -> PeerResult<bool>;

    /// Ask a condition target whether it is excluded or executed.
    async fn check_condition(
        &self,
        target: &RelationTarget,
        query: &CheckQuery,
    ) -> PeerResult<CheckResponse>;

    /// Ask a milestone target whether it is not both included and pending.
    async fn check_milestone(
        &self,
        target: &RelationTarget,
        query: &CheckQuery,
    ) -> PeerResult<CheckResponse>;

    /// Returns the history timestamp the target assigned to the notice.
    async fn send_pending(
        &self,
        target: &RelationTarget,
        pending: bool,
        notice: &Notification,
    ) -> PeerResult<u64>;

    /// `included == false` is an exclusion notice.
    async fn send_included(
        &self,
        target: &RelationTarget,
        included: bool,
        notice: &Notification,
    ) -> PeerResult<u64>;

    async fn lock(&self, target: &RelationTarget, token: &LockToken) -> PeerResult<()>;

    async fn unlock(&self, target: &RelationTarget, owner: &str) -> PeerResult<()>;
}
