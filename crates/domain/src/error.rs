//! Common error types used across the workspace.
//!
//! Each failure class gets its own typed error; [`BoardHubError`] is the
//! umbrella the ports and services return, with `#[from]` conversions from
//! the specific types.

use thiserror::Error;

/// Top-level error returned by hub operations.
#[derive(Debug, Error)]
pub enum BoardHubError {
    /// The connection was refused before reaching the open state.
    #[error("handshake rejected")]
    Handshake(#[from] HandshakeError),

    /// A presence store operation failed. Non-fatal for the connection:
    /// the presence broadcast for that event is skipped and the
    /// connection stays open.
    #[error("presence store unavailable")]
    StoreUnavailable(#[from] StoreUnavailableError),

    /// A single recipient's socket write failed. Fatal only for that
    /// recipient, never for the publisher or other recipients.
    #[error("event delivery failed")]
    Delivery(#[from] DeliveryError),
}

/// Reasons a connection attempt is refused before it opens.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The board identifier is empty or contains non-word characters.
    #[error("invalid board identifier: {0:?}")]
    InvalidBoardId(String),
}

/// The presence store backend could not complete an operation.
#[derive(Debug, Error)]
#[error("presence store unavailable: {reason}")]
pub struct StoreUnavailableError {
    /// Backend-specific description of the failure.
    pub reason: String,
}

/// Writing an event to one recipient's transport failed.
#[derive(Debug, Error)]
#[error("failed to deliver event: {reason}")]
pub struct DeliveryError {
    /// Transport-specific description of the failure.
    pub reason: String,
}
