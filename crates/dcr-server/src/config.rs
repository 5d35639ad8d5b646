use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Settings of one node process, read from TOML. Every field has a default,
/// so a partial file is fine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub bind_addr: SocketAddr,
    /// URI peers reach this process at. Sent as the sender address of
    /// outgoing notices; each event's own URI is used when unset.
    pub public_uri: Option<String>,
    /// Transport timeout of every outbound call. Calls are never retried.
    pub peer_timeout_ms: u64,
    /// Bearer token required for create, delete and reset. Those are open
    /// when unset.
    pub admin_token: Option<String>,
    pub registry_url: Option<String>,
    pub log_level: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
            public_uri: None,
            peer_timeout_ms: 5_000,
            admin_token: None,
            registry_url: None,
            log_level: "info".into(),
        }
    }
}

impl NodeConfig {
    pub fn from_toml(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_millis(self.peer_timeout_ms)
    }
}
