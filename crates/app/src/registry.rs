//! Process-local bookkeeping of live connections per room.

use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use tokio::sync::mpsc;

use boardhub_domain::event::EventEnvelope;
use boardhub_domain::room::RoomId;

/// Unique identifier for one open connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(uuid::Uuid);

impl Default for ConnectionId {
    fn default() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl ConnectionId {
    /// Generate a new random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Non-owning reference to one open connection.
///
/// The owning session holds the receiving half; the registry keeps only
/// the send channel (and the display name for observability), so dropping
/// a session invalidates its registry entry without coordination.
#[derive(Clone)]
pub struct ConnectionHandle {
    /// Display name supplied at connection time, if any.
    pub user: Option<String>,
    /// Outbound queue feeding the connection's transport writer.
    pub sender: mpsc::UnboundedSender<EventEnvelope>,
}

/// Map of room → live local connections.
///
/// Purely in-process: registration and removal are done only by the
/// owning session, so a read-write lock per map is enough. Cross-process
/// fan-out is the event bus's job, not the registry's.
#[derive(Default)]
pub struct ConnectionRegistry {
    rooms: RwLock<HashMap<RoomId, HashMap<ConnectionId, ConnectionHandle>>>,
}

impl ConnectionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to the room's set.
    ///
    /// Returns `true` when this is the first local connection for the
    /// room (the caller then attaches the room's bus forwarder).
    pub fn register(&self, room: &RoomId, id: ConnectionId, handle: ConnectionHandle) -> bool {
        let mut rooms = self.rooms.write().unwrap_or_else(PoisonError::into_inner);
        let members = rooms.entry(room.clone()).or_default();
        let first = members.is_empty();
        members.insert(id, handle);
        first
    }

    /// Remove a connection from the room's set. No-op when absent, so
    /// racing teardown paths can both call it safely.
    ///
    /// Returns `true` when no local connection remains for the room.
    pub fn unregister(&self, room: &RoomId, id: ConnectionId) -> bool {
        let mut rooms = self.rooms.write().unwrap_or_else(PoisonError::into_inner);
        let Some(members) = rooms.get_mut(room) else {
            return true;
        };
        members.remove(&id);
        if members.is_empty() {
            rooms.remove(room);
            return true;
        }
        false
    }

    /// Invoke `f` once per connection registered in `room` at call time.
    ///
    /// Iterates over a snapshot taken under the read lock, so connections
    /// joining or leaving mid-iteration are neither guaranteed included
    /// nor excluded, but a handle passed to `f` was fully registered.
    pub fn for_each<F: FnMut(&ConnectionHandle)>(&self, room: &RoomId, mut f: F) {
        let snapshot: Vec<ConnectionHandle> = {
            let rooms = self.rooms.read().unwrap_or_else(PoisonError::into_inner);
            rooms
                .get(room)
                .map(|members| members.values().cloned().collect())
                .unwrap_or_default()
        };
        for handle in &snapshot {
            f(handle);
        }
    }

    /// Number of local connections currently registered for `room`.
    #[must_use]
    pub fn room_len(&self, room: &RoomId) -> usize {
        let rooms = self.rooms.read().unwrap_or_else(PoisonError::into_inner);
        rooms.get(room).map_or(0, HashMap::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(board: &str) -> RoomId {
        RoomId::for_board(board).unwrap()
    }

    fn handle(user: Option<&str>) -> (ConnectionHandle, mpsc::UnboundedReceiver<EventEnvelope>) {
        let (sender, rx) = mpsc::unbounded_channel();
        (
            ConnectionHandle {
                user: user.map(ToString::to_string),
                sender,
            },
            rx,
        )
    }

    #[test]
    fn should_report_first_connection_in_room() {
        let registry = ConnectionRegistry::new();
        let (h1, _rx1) = handle(Some("alice"));
        let (h2, _rx2) = handle(Some("bob"));

        assert!(registry.register(&room("1"), ConnectionId::new(), h1));
        assert!(!registry.register(&room("1"), ConnectionId::new(), h2));
        assert_eq!(registry.room_len(&room("1")), 2);
    }

    #[test]
    fn should_report_empty_room_after_last_unregister() {
        let registry = ConnectionRegistry::new();
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        let (h1, _rx1) = handle(None);
        let (h2, _rx2) = handle(None);
        registry.register(&room("1"), id1, h1);
        registry.register(&room("1"), id2, h2);

        assert!(!registry.unregister(&room("1"), id1));
        assert!(registry.unregister(&room("1"), id2));
        assert_eq!(registry.room_len(&room("1")), 0);
    }

    #[test]
    fn should_absorb_duplicate_unregister() {
        let registry = ConnectionRegistry::new();
        let id = ConnectionId::new();
        let (h, _rx) = handle(Some("alice"));
        registry.register(&room("1"), id, h);

        assert!(registry.unregister(&room("1"), id));
        assert!(registry.unregister(&room("1"), id));
    }

    #[test]
    fn should_visit_only_connections_of_the_requested_room() {
        let registry = ConnectionRegistry::new();
        let (h1, _rx1) = handle(Some("alice"));
        let (h2, _rx2) = handle(Some("bob"));
        registry.register(&room("1"), ConnectionId::new(), h1);
        registry.register(&room("2"), ConnectionId::new(), h2);

        let mut seen = Vec::new();
        registry.for_each(&room("1"), |conn| seen.push(conn.user.clone()));

        assert_eq!(seen, vec![Some("alice".to_string())]);
    }

    #[test]
    fn should_visit_nobody_in_unknown_room() {
        let registry = ConnectionRegistry::new();
        let mut count = 0;
        registry.for_each(&room("ghost"), |_| count += 1);
        assert_eq!(count, 0);
    }
}
