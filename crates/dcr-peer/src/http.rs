use std::time::Duration;

use async_trait::async_trait;
use dcr_protocol::{
    CheckQuery, CheckResponse, ErrorBody, ErrorCode, EventRoute, Notification,
    TimestampResponse,
};
use dcr_types::{LockToken, RelationTarget};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;

use crate::error::{PeerError, PeerOp, PeerResult};
use crate::traits::PeerCommunicator;

/// Join path segments onto a node or registry base URI, percent-encoding
/// each segment.
pub(crate) fn endpoint(base: &str, segments: &[String]) -> PeerResult<Url> {
    let invalid = |reason: String| PeerError::InvalidAddress {
        uri: base.to_string(),
        reason,
    };
    let mut url = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| invalid("address cannot carry a path".into()))?;
        path.pop_if_empty().extend(segments);
    }
    Ok(url)
}

pub(crate) fn build_client(timeout: Duration) -> PeerResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| PeerError::Client(e.to_string()))
}

/// Send once, returning the response only if it carries a 2xx status.
pub(crate) async fn dispatch(op: PeerOp, target: &str, request: RequestBuilder) -> PeerResult<Response> {
    let response = request.send().await.map_err(|e| PeerError::Transport {
        op,
        target: target.to_string(),
        reason: e.to_string(),
    })?;

    if response.status().is_success() {
        Ok(response)
    } else {
        let err = failure(op, target, response).await;
        tracing::debug!(%op, target, error = %err, "peer call failed");
        Err(err)
    }
}

pub(crate) async fn call<T: DeserializeOwned>(
    op: PeerOp,
    target: &str,
    request: RequestBuilder,
) -> PeerResult<T> {
    let response = dispatch(op, target, request).await?;
    response.json::<T>().await.map_err(|e| PeerError::Decode {
        op,
        target: target.to_string(),
        reason: e.to_string(),
    })
}

/// Decode a non-2xx answer. Client-facing codes become [`PeerError::Rejected`]
/// so callers can pass them through; anything else is an unexpected status.
async fn failure(op: PeerOp, target: &str, response: Response) -> PeerError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();

    let (code, message) = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => (Some(body.code), body.message),
        Err(_) => (ErrorCode::from_status(status), text),
    };

    match code {
        Some(code) if code.is_client_facing() => PeerError::Rejected {
            op,
            target: target.to_string(),
            code,
            message,
        },
        Some(code) => PeerError::Status {
            op,
            target: target.to_string(),
            status,
            message: format!("{code}: {message}"),
        },
        None => PeerError::Status {
            op,
            target: target.to_string(),
            status,
            message,
        },
    }
}

/// [`PeerCommunicator`] over HTTP/JSON.
///
/// Holds one immutable `reqwest::Client` (a shared connection pool); the
/// destination comes from each call's [`RelationTarget`].
#[derive(Clone, Debug)]
pub struct HttpPeerClient {
    client: Client,
}

impl HttpPeerClient {
    pub fn new(timeout: Duration) -> PeerResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
        })
    }

    fn url(&self, target: &RelationTarget, route: EventRoute<'_>) -> PeerResult<Url> {
        endpoint(&target.uri, &route.segments(&target.key()))
    }
}

fn label(target: &RelationTarget) -> String {
    format!("{} ({})", target.key(), target.uri)
}

#[async_trait]
impl PeerCommunicator for HttpPeerClient {
    async fn is_executed(&self, target: &RelationTarget, sender_id: &str) -> PeerResult<bool> {
        let url = self.url(target, EventRoute::ExecutedBy(sender_id))?;
        call(PeerOp::IsExecuted, &label(target), self.client.get(url)).await
    }

    async fn is_included(&self, target: &RelationTarget, sender_id: &str) -> PeerResult<bool> {
        let url = self.url(target, EventRoute::IncludedBy(sender_id))?;
        call(PeerOp::IsIncluded, &label(target), self.client.get(url)).await
    }

    async fn check_condition(
        &self,
        target: &RelationTarget,
        query: &CheckQuery,
    ) -> PeerResult<CheckResponse> {
        let url = self.url(target, EventRoute::Condition)?;
        let request = self.client.get(url).query(query);
        call(PeerOp::CheckCondition, &label(target), request).await
    }

    async fn check_milestone(
        &self,
        target: &RelationTarget,
        query: &CheckQuery,
    ) -> PeerResult<CheckResponse> {
        let url = self.url(target, EventRoute::Milestone)?;
        let request = self.client.get(url).query(query);
        call(PeerOp::CheckMilestone, &label(target), request).await
    }

    async fn send_pending(
        &self,
        target: &RelationTarget,
        pending: bool,
        notice: &Notification,
    ) -> PeerResult<u64> {
        let url = self.url(target, EventRoute::SetPending(pending))?;
        let response: TimestampResponse =
            call(PeerOp::SendPending, &label(target), self.client.put(url).json(notice)).await?;
        Ok(response.timestamp)
    }

    async fn send_included(
        &self,
        target: &RelationTarget,
        included: bool,
        notice: &Notification,
    ) -> PeerResult<u64> {
        let op = if included {
            PeerOp::SendIncluded
        } else {
            PeerOp::SendExcluded
        };
        let url = self.url(target, EventRoute::SetIncluded(included))?;
        let response: TimestampResponse =
            call(op, &label(target), self.client.put(url).json(notice)).await?;
        Ok(response.timestamp)
    }

    async fn lock(&self, target: &RelationTarget, token: &LockToken) -> PeerResult<()> {
        let url = self.url(target, EventRoute::Lock)?;
        dispatch(PeerOp::Lock, &label(target), self.client.post(url).json(token)).await?;
        Ok(())
    }

    async fn unlock(&self, target: &RelationTarget, owner: &str) -> PeerResult<()> {
        let url = self.url(target, EventRoute::Unlock(owner))?;
        dispatch(PeerOp::Unlock, &label(target), self.client.delete(url)).await?;
        Ok(())
    }
}
