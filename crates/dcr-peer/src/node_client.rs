use std::time::Duration;

use dcr_ledger::HistoryRecord;
use dcr_protocol::{EventRoute, EventStateDto, ExecuteRequest, ExecuteResponse, HealthResponse};
use dcr_types::{EventDefinition, EventKey, EventNode};
use reqwest::{Client, RequestBuilder};

use crate::error::{PeerOp, PeerResult};
use crate::http::{build_client, call, dispatch, endpoint};

/// Client for operating one event node from outside the workflow: creating
/// and removing events, resets, triggering executions, and reading history.
#[derive(Clone, Debug)]
pub struct NodeClient {
    client: Client,
    base_url: String,
    admin_token: Option<String>,
}

impl NodeClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> PeerResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into(),
            admin_token: None,
        })
    }

    /// Bearer token sent with create, delete and reset.
    pub fn with_admin_token(mut self, token: Option<String>) -> Self {
        self.admin_token = token;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn admin(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.admin_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn event_url(&self, key: &EventKey, route: EventRoute<'_>) -> PeerResult<reqwest::Url> {
        endpoint(&self.base_url, &route.segments(key))
    }

    pub async fn health(&self) -> PeerResult<HealthResponse> {
        let url = endpoint(&self.base_url, &["health".to_string()])?;
        call(PeerOp::Health, &self.base_url, self.client.get(url)).await
    }

    pub async fn create(&self, definition: &EventDefinition) -> PeerResult<EventNode> {
        let url = self.event_url(&definition.key(), EventRoute::Events)?;
        let request = self.admin(self.client.post(url).json(definition));
        call(PeerOp::Create, &self.base_url, request).await
    }

    pub async fn get(&self, key: &EventKey) -> PeerResult<EventNode> {
        let url = self.event_url(key, EventRoute::Event)?;
        call(PeerOp::GetEvent, &self.base_url, self.client.get(url)).await
    }

    pub async fn state(&self, key: &EventKey, sender_id: &str) -> PeerResult<EventStateDto> {
        let url = self.event_url(key, EventRoute::State(sender_id))?;
        call(PeerOp::GetState, &self.base_url, self.client.get(url)).await
    }

    pub async fn history(&self, key: &EventKey) -> PeerResult<Vec<HistoryRecord>> {
        let url = self.event_url(key, EventRoute::History)?;
        call(PeerOp::GetHistory, &self.base_url, self.client.get(url)).await
    }

    pub async fn workflow_history(&self, workflow_id: &str) -> PeerResult<Vec<HistoryRecord>> {
        let url = endpoint(
            &self.base_url,
            &["history".to_string(), workflow_id.to_string()],
        )?;
        call(PeerOp::GetHistory, &self.base_url, self.client.get(url)).await
    }

    pub async fn delete(&self, key: &EventKey) -> PeerResult<()> {
        let url = self.event_url(key, EventRoute::Event)?;
        let request = self.admin(self.client.delete(url));
        dispatch(PeerOp::Delete, &self.base_url, request).await?;
        Ok(())
    }

    pub async fn reset(&self, key: &EventKey) -> PeerResult<EventNode> {
        let url = self.event_url(key, EventRoute::Reset)?;
        let request = self.admin(self.client.put(url));
        call(PeerOp::Reset, &self.base_url, request).await
    }

    pub async fn execute(&self, key: &EventKey, roles: Vec<String>) -> PeerResult<ExecuteResponse> {
        let url = self.event_url(key, EventRoute::Execute)?;
        let body = ExecuteRequest { roles };
        call(PeerOp::Execute, &self.base_url, self.client.put(url).json(&body)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use axum::{Json, Router};
    use dcr_protocol::ErrorCode;

    use crate::error::PeerError;

    async fn stub_node() -> String {
        let app = Router::new().route(
            "/events/w1/e1/state/dcr-cli",
            get(|| async {
                Json(EventStateDto {
                    workflow_id: "w1".into(),
                    event_id: "e1".into(),
                    name: "Admit".into(),
                    executed: false,
                    included: true,
                    pending: true,
                    executable: true,
                })
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
    async fn state_reads_composite_flags() {
        let node = NodeClient::new(stub_node().await, Duration::from_secs(2)).unwrap();
        let state = node.state(&EventKey::new("w1", "e1"), "dcr-cli").await.unwrap();
        assert!(state.executable);
        assert!(state.pending);
        assert_eq!(state.name, "Admit");
    }

    #[tokio::test]
    async fn unreachable_node_maps_state_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let node = NodeClient::new(format!("http://{addr}"), Duration::from_secs(2)).unwrap();
        let err = node.state(&EventKey::new("w1", "e1"), "dcr-cli").await.unwrap_err();
        assert!(matches!(err, PeerError::Transport { op: PeerOp::GetState, .. }));
        assert_eq!(err.code(), ErrorCode::FailedToGetStateFromAnotherEvent);
    }

    #[test]
    fn admin_token_is_optional() {
        let node = NodeClient::new("http://127.0.0.1:1", Duration::from_secs(1))
            .unwrap()
            .with_admin_token(Some("s3cret".into()));
        assert_eq!(node.base_url(), "http://127.0.0.1:1");
        assert_eq!(node.admin_token.as_deref(), Some("s3cret"));
    }
}
