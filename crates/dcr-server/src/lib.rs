//! HTTP server for DCR event nodes.
//!
//! Exposes the peer protocol (state reads, condition and milestone checks,
//! notices, locks), the execute trigger, administration guarded by an
//! optional bearer token, and history export. Errors leave as
//! `{ "code", "message" }` with the status of their code.

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use auth::{Action, AdminTokenAuth, AuthProvider, Credentials, Identity};
pub use config::NodeConfig;
pub use error::{ServerError, ServerResult};
pub use server::DcrServer;
pub use state::AppState;
