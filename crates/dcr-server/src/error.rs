use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dcr_engine::EngineError;
use dcr_peer::PeerError;
use dcr_protocol::{ErrorBody, ErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("administrator token required for {0}")]
    AdminRequired(String),

    #[error("peer client error: {0}")]
    Peer(#[from] PeerError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Engine(err) => err.code(),
            Self::BadRequest(_) => ErrorCode::InvalidInput,
            Self::AuthFailed(_) | Self::AdminRequired(_) => ErrorCode::Unauthorized,
            Self::Peer(err) => err.code(),
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => ErrorCode::Internal,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let code = self.code();
        let status =
            StatusCode::from_u16(code.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(%code, error = %self, "request failed");
        }
        (status, Json(ErrorBody::new(code, self.to_string()))).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
