//! Broadcast service: the entry point for the mutation collaborator.
//!
//! The CRUD layer calls [`BroadcastService::broadcast_event`] exactly once
//! per committed create/update/delete, after the commit is durable, so a
//! client reacting to the event can immediately re-fetch consistent state.

use serde_json::Value;

use boardhub_domain::error::BoardHubError;
use boardhub_domain::event::{EventEnvelope, EventKind};
use boardhub_domain::room::RoomId;

use crate::ports::EventPublisher;

/// Stateless facade publishing one typed event to a board's room.
pub struct BroadcastService<B> {
    bus: B,
}

impl<B: EventPublisher> BroadcastService<B> {
    /// Create a service publishing through the given bus.
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Publish `payload` as a `kind` event to the room of `board_id`.
    ///
    /// Sequential calls from one caller are delivered to each recipient in
    /// call order. Publishing to a board nobody is watching succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`BoardHubError::Handshake`] when `board_id` is not a valid
    /// board identifier, or whatever the bus reports.
    pub async fn broadcast_event(
        &self,
        board_id: &str,
        kind: EventKind,
        payload: Value,
    ) -> Result<(), BoardHubError> {
        let room = RoomId::for_board(board_id)?;
        self.bus
            .publish(&room, EventEnvelope::new(kind, payload))
            .await
    }
}
