//! # boardhub-app
//!
//! Application layer: the collaboration hub and its **port definitions**.
//!
//! ## Responsibilities
//! - Define **port traits** that adapters (or a distributed deployment)
//!   implement:
//!   - `PresenceStore`: atomic per-room presence set mutation
//!   - `EventPublisher`: room-scoped event publication
//! - Provide **in-process infrastructure** that doesn't need external IO:
//!   - `RoomBus`: per-room broadcast channels
//!   - `InMemoryPresenceStore`: mutex-guarded presence sets
//!   - `ConnectionRegistry`: process-local room membership
//! - Drive the per-connection lifecycle (`BoardHub` / `RoomSession`)
//! - Expose the `BroadcastService` the mutation collaborator calls after
//!   each committed create/update/delete
//!
//! ## Dependency rule
//! Depends on `boardhub-domain` only (plus `tokio::sync` for channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the
//! reverse.

pub mod event_bus;
pub mod hub;
pub mod ports;
pub mod presence;
pub mod registry;
pub mod services;
