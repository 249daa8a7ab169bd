//! # boardhub-adapter-ws-axum
//!
//! WebSocket adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve the room connection endpoint (`/ws/board/{board_id}`)
//! - Extract the board identifier and optional display name from the
//!   request and refuse malformed handshakes before upgrading
//! - Drive one socket per session: write the session's outbound events as
//!   JSON text frames, watch the client side for closure, and funnel both
//!   termination paths into the single session close
//!
//! ## Dependency rule
//! Depends on `boardhub-app` (for the hub and port traits) and
//! `boardhub-domain` (for rooms, envelopes, errors). Never leaks axum
//! types into the domain.

pub mod error;
pub mod router;
pub mod state;
pub mod ws;
