//! Event bus port: room-scoped publish for hub events.

use std::future::Future;

use boardhub_domain::error::BoardHubError;
use boardhub_domain::event::EventEnvelope;
use boardhub_domain::room::RoomId;

/// Publishes events to every subscriber of a room.
///
/// Delivery is at-most-once per currently-subscribed recipient per call;
/// recipients that subscribe after a publish do not see it. Events
/// published sequentially by one caller reach a given recipient in publish
/// order; concurrent publishers may interleave.
pub trait EventPublisher {
    /// Publish an event to all current subscribers of `room`.
    ///
    /// Publishing to a room with zero subscribers is a silent no-op,
    /// not an error.
    fn publish(
        &self,
        room: &RoomId,
        event: EventEnvelope,
    ) -> impl Future<Output = Result<(), BoardHubError>> + Send;
}

impl<T: EventPublisher + Send + Sync> EventPublisher for std::sync::Arc<T> {
    fn publish(
        &self,
        room: &RoomId,
        event: EventEnvelope,
    ) -> impl Future<Output = Result<(), BoardHubError>> + Send {
        (**self).publish(room, event)
    }
}
