//! Outbound calls of a DCR event node.
//!
//! [`PeerCommunicator`] is the seam the execution coordinator talks through;
//! [`HttpPeerClient`] implements it over HTTP/JSON with the destination given
//! per call. Transport failures and unexpected statuses are reported with the
//! failure code of the operation; structured client-facing rejections from a
//! peer keep the peer's code. Nothing here retries.

pub mod error;
pub mod http;
pub mod node_client;
pub mod registry;
pub mod traits;

pub use error::{PeerError, PeerOp, PeerResult};
pub use http::HttpPeerClient;
pub use node_client::NodeClient;
pub use registry::RegistryClient;
pub use traits::PeerCommunicator;
