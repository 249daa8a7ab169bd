//! In-process event bus backed by per-room tokio broadcast channels.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, PoisonError};

use tokio::sync::broadcast;

use boardhub_domain::error::BoardHubError;
use boardhub_domain::event::EventEnvelope;
use boardhub_domain::room::RoomId;

use crate::ports::EventPublisher;

/// In-process event bus with one [`broadcast`] channel per room.
///
/// Channels are created lazily on first subscribe and pruned when a
/// publish finds no receivers left. Publishing to a room nobody is
/// subscribed to succeeds and drops the event.
pub struct RoomBus {
    capacity: usize,
    rooms: Mutex<HashMap<RoomId, broadcast::Sender<EventEnvelope>>>,
}

impl RoomBus {
    /// Create a new bus; `capacity` bounds each room channel.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            rooms: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe to events for one room.
    ///
    /// Returns a receiver that will get all events published to `room`
    /// *after* the subscription is created.
    #[must_use]
    pub fn subscribe(&self, room: &RoomId) -> broadcast::Receiver<EventEnvelope> {
        let mut rooms = self.rooms.lock().unwrap_or_else(PoisonError::into_inner);
        rooms
            .entry(room.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }
}

impl EventPublisher for RoomBus {
    fn publish(
        &self,
        room: &RoomId,
        event: EventEnvelope,
    ) -> impl Future<Output = Result<(), BoardHubError>> + Send {
        let mut rooms = self.rooms.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(sender) = rooms.get(room) {
            // send fails only when the last receiver is gone; prune the
            // idle channel so abandoned rooms don't accumulate.
            if sender.send(event).is_err() {
                rooms.remove(room);
            }
        }
        drop(rooms);
        async { Ok(()) }
    }
}
