use std::sync::Arc;

use axum::http::HeaderMap;
use dcr_engine::EventEngine;

use crate::auth::{Action, AuthProvider, Credentials, Identity};
use crate::error::{ServerError, ServerResult};

/// Shared handler state. Cloned per request; everything behind it is `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<EventEngine>,
    pub auth: Arc<dyn AuthProvider>,
}

impl AppState {
    pub fn new(engine: Arc<EventEngine>, auth: Arc<dyn AuthProvider>) -> Self {
        Self { engine, auth }
    }

    pub async fn require(&self, headers: &HeaderMap, action: Action) -> ServerResult<Identity> {
        let identity = self
            .auth
            .authenticate(&Credentials::from_headers(headers))
            .await?;
        if !self.auth.authorize(&identity, &action).await? {
            return Err(ServerError::AdminRequired(action.to_string()));
        }
        tracing::debug!(identity = %identity.name, %action, "admin action authorized");
        Ok(identity)
    }
}
