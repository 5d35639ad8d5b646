use std::sync::Arc;

use dcr_ledger::HistoryLedger;
use dcr_peer::PeerCommunicator;
use dcr_store::EventStore;
use dcr_types::{EventAddress, EventNode};

use crate::recorder::HistoryRecorder;

/// The event nodes hosted by one process.
///
/// Stateless between requests: everything that survives a call lives in the
/// store or the ledger. Components are injected once at startup.
///
/// Receiver-side operations (what other nodes and administrators call) are
/// in `receiver`; the execute protocol this node runs as initiator is in
/// `coordinator`.
pub struct EventEngine {
    pub(crate) store: Arc<dyn EventStore>,
    pub(crate) recorder: HistoryRecorder,
    pub(crate) peers: Arc<dyn PeerCommunicator>,
    public_uri: Option<String>,
}

impl EventEngine {
    pub fn new(
        store: Arc<dyn EventStore>,
        ledger: Arc<dyn HistoryLedger>,
        peers: Arc<dyn PeerCommunicator>,
    ) -> Self {
        Self {
            store,
            recorder: HistoryRecorder::new(ledger),
            peers,
            public_uri: None,
        }
    }

    /// Address peers are told to reach this process at. When unset, each
    /// event's own URI is used.
    pub fn with_public_uri(mut self, public_uri: Option<String>) -> Self {
        self.public_uri = public_uri;
        self
    }

    pub fn ledger(&self) -> &Arc<dyn HistoryLedger> {
        self.recorder.ledger()
    }

    pub(crate) fn sender_address(&self, node: &EventNode) -> EventAddress {
        let uri = self.public_uri.as_deref().unwrap_or(&node.own_uri);
        EventAddress::new(node.workflow_id.clone(), node.event_id.clone(), uri)
    }
}
