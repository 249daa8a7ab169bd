//! HTTP error response mapping for the connection endpoint.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use boardhub_domain::error::{BoardHubError, HandshakeError};

/// JSON error body returned when a connection attempt is refused.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`BoardHubError`] to an HTTP response with appropriate status.
pub struct WsError(BoardHubError);

impl From<BoardHubError> for WsError {
    fn from(err: BoardHubError) -> Self {
        Self(err)
    }
}

impl From<HandshakeError> for WsError {
    fn from(err: HandshakeError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for WsError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            BoardHubError::Handshake(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            BoardHubError::StoreUnavailable(err) => {
                tracing::error!(error = %err, "presence store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
            BoardHubError::Delivery(err) => {
                tracing::error!(error = %err, "delivery error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
