use std::fmt;

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use dcr_types::EventKey;

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug)]
pub struct Identity {
    pub name: String,
    pub is_admin: bool,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self { name: "anonymous".into(), is_admin: false }
    }

    pub fn admin(name: impl Into<String>) -> Self {
        Self { name: name.into(), is_admin: true }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credentials {
    Bearer(String),
    Anonymous,
}

impl Credentials {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|token| Self::Bearer(token.trim().to_string()))
            .unwrap_or(Self::Anonymous)
    }
}

/// Privileged operations. Everything peers call is open.
#[derive(Clone, Debug)]
pub enum Action {
    CreateEvent,
    DeleteEvent(EventKey),
    ResetEvent(EventKey),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateEvent => write!(f, "create-event"),
            Self::DeleteEvent(key) => write!(f, "delete:{key}"),
            Self::ResetEvent(key) => write!(f, "reset:{key}"),
        }
    }
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity>;
    async fn authorize(&self, identity: &Identity, action: &Action) -> ServerResult<bool>;
}

/// Guards privileged operations with one shared bearer token. Without a
/// configured token every caller is an administrator.
pub struct AdminTokenAuth {
    token: Option<String>,
}

impl AdminTokenAuth {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

#[async_trait]
impl AuthProvider for AdminTokenAuth {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity> {
        match (&self.token, credentials) {
            (None, _) => Ok(Identity::admin("open")),
            (Some(expected), Credentials::Bearer(given)) if expected == given => {
                Ok(Identity::admin("token"))
            }
            (Some(_), Credentials::Bearer(_)) => {
                Err(ServerError::AuthFailed("unknown bearer token".into()))
            }
            (Some(_), Credentials::Anonymous) => Ok(Identity::anonymous()),
        }
    }

    async fn authorize(&self, identity: &Identity, _action: &Action) -> ServerResult<bool> {
        Ok(identity.is_admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_header_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(Credentials::from_headers(&headers), Credentials::Anonymous);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(Credentials::from_headers(&headers), Credentials::Bearer("abc".into()));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(Credentials::from_headers(&headers), Credentials::Anonymous);
    }

    #[test]
    fn action_display() {
        let key = EventKey::new("w1", "e1");
        assert_eq!(Action::ResetEvent(key).to_string(), "reset:w1/e1");
        assert_eq!(Action::CreateEvent.to_string(), "create-event");
    }

    #[tokio::test]
    async fn open_node_admits_everyone() {
        let auth = AdminTokenAuth::new(None);
        let id = auth.authenticate(&Credentials::Anonymous).await.unwrap();
        assert!(auth.authorize(&id, &Action::CreateEvent).await.unwrap());
    }

    #[tokio::test]
    async fn token_guards_admin_actions() {
        let auth = AdminTokenAuth::new(Some("s3cret".into()));

        let anon = auth.authenticate(&Credentials::Anonymous).await.unwrap();
        assert!(!auth.authorize(&anon, &Action::CreateEvent).await.unwrap());

        let admin = auth
            .authenticate(&Credentials::Bearer("s3cret".into()))
            .await
            .unwrap();
        assert!(auth.authorize(&admin, &Action::CreateEvent).await.unwrap());

        assert!(matches!(
            auth.authenticate(&Credentials::Bearer("nope".into())).await,
            Err(ServerError::AuthFailed(_))
        ));
    }
}
