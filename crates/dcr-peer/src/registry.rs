use std::time::Duration;

use dcr_protocol::{LoginRequest, LoginResponse, RegistryRoute, WorkflowDirectory};
use reqwest::Client;

use crate::error::{PeerOp, PeerResult};
use crate::http::{build_client, call, endpoint};

/// Client for the central registry that resolves credentials to roles and
/// event ids to node URIs.
#[derive(Clone, Debug)]
pub struct RegistryClient {
    client: Client,
    base_url: String,
}

impl RegistryClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> PeerResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into(),
        })
    }

    /// Roles of `username`, keyed by workflow id.
    pub async fn login(&self, username: &str, password: &str) -> PeerResult<LoginResponse> {
        let url = endpoint(&self.base_url, &RegistryRoute::Login.segments())?;
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        call(PeerOp::Login, &self.base_url, self.client.post(url).json(&body)).await
    }

    pub async fn workflow(&self, workflow_id: &str) -> PeerResult<WorkflowDirectory> {
        let url = endpoint(&self.base_url, &RegistryRoute::Workflow(workflow_id).segments())?;
        call(PeerOp::GetWorkflow, &self.base_url, self.client.get(url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use dcr_protocol::ErrorCode;

    async fn stub_registry() -> String {
        let app = Router::new()
            .route(
                "/login",
                post(|Json(req): Json<LoginRequest>| async move {
                    if req.password != "secret" {
                        return Err(StatusCode::UNAUTHORIZED);
                    }
                    let mut login = LoginResponse::default();
                    login.roles.insert("w1".into(), vec!["nurse".into()]);
                    Ok(Json(login))
                }),
            )
            .route(
                "/workflows/w1",
                get(|| async {
                    Json(serde_json::json!({
                        "workflow_id": "w1",
                        "name": "Hospital",
                        "events": [{"event_id": "e1", "name": "Admit", "uri": "http://n1"}]
                    }))
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn login_and_resolve() {
        let registry = RegistryClient::new(stub_registry().await, Duration::from_secs(2)).unwrap();

        let login = registry.login("alice", "secret").await.unwrap();
        assert_eq!(login.roles_for("w1"), ["nurse".to_string()]);

        let dir = registry.workflow("w1").await.unwrap();
        assert_eq!(dir.find("e1").and_then(|e| e.uri.as_deref()), Some("http://n1"));
    }

    #[tokio::test]
    async fn bad_credentials_are_unauthorized() {
        let registry = RegistryClient::new(stub_registry().await, Duration::from_secs(2)).unwrap();
        let err = registry.login("alice", "wrong").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }

    #[tokio::test]
    async fn unknown_workflow_is_not_found() {
        let registry = RegistryClient::new(stub_registry().await, Duration::from_secs(2)).unwrap();
        let err = registry.workflow("w9").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }
}
