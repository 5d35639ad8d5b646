//! Wire protocol between DCR event nodes, their clients, and the registry.
//!
//! Defines the HTTP routes, the JSON bodies exchanged on them, and the closed
//! set of error codes a node answers with.

pub mod endpoint;
pub mod error;
pub mod message;

pub use endpoint::{routes, EventRoute, RegistryRoute};
pub use error::{ErrorBody, ErrorCode};
pub use message::{
    CheckQuery, CheckResponse, DirectoryEntry, EventStateDto, EventSummary, ExecuteRequest,
    ExecuteResponse, HealthResponse, LoginRequest, LoginResponse, Notification,
    TimestampResponse, WorkflowDirectory,
};
