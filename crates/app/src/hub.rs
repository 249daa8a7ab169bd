//! Board hub: the per-connection lifecycle and room fan-out.
//!
//! A [`BoardHub`] owns the process-local side of every room: the
//! [`ConnectionRegistry`], one forwarder task per room with local
//! connections (bridging the event bus to each connection's outbound
//! queue), and the presence bookkeeping around joins and leaves.
//!
//! A [`RoomSession`] is one client's lifecycle, an explicit state machine
//! `Connecting → Open → Closing → Closed`. Teardown is guarded by the
//! state so racing close triggers (socket error and explicit disconnect)
//! produce exactly one presence removal and one registry removal.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use boardhub_domain::event::EventEnvelope;
use boardhub_domain::room::RoomId;

use crate::event_bus::RoomBus;
use crate::ports::{EventPublisher, PresenceStore};
use crate::registry::{ConnectionHandle, ConnectionId, ConnectionRegistry};

/// Lifecycle state of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Handshake accepted, not yet registered.
    Connecting,
    /// Registered and receiving room events.
    Open,
    /// Teardown in progress.
    Closing,
    /// Teardown finished. Terminal.
    Closed,
}

/// The process-local collaboration hub.
///
/// Generic over the [`PresenceStore`] port so a scaled deployment can back
/// presence with a shared external store without touching the lifecycle
/// logic.
pub struct BoardHub<P> {
    inner: Arc<HubInner<P>>,
}

struct HubInner<P> {
    presence: P,
    bus: Arc<RoomBus>,
    registry: Arc<ConnectionRegistry>,
    forwarders: Mutex<HashMap<RoomId, JoinHandle<()>>>,
}

impl<P> BoardHub<P>
where
    P: PresenceStore + Send + Sync,
{
    /// Create a hub over a presence store and a shared event bus.
    pub fn new(presence: P, bus: Arc<RoomBus>) -> Self {
        Self {
            inner: Arc::new(HubInner {
                presence,
                bus,
                registry: Arc::new(ConnectionRegistry::new()),
                forwarders: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// The event bus this hub forwards from.
    #[must_use]
    pub fn bus(&self) -> &Arc<RoomBus> {
        &self.inner.bus
    }

    /// The process-local connection registry.
    #[must_use]
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.inner.registry
    }

    /// Open a session for one client connection.
    ///
    /// Registers the connection, attaches the room's forwarder task if
    /// this is the first local connection for the room, and, when a
    /// display name was supplied, records presence and publishes the
    /// resulting `PRESENCE_UPDATE` (which the joiner itself also
    /// receives). A presence store failure is logged and skipped; the
    /// session still opens.
    ///
    /// Returns the session and the outbound queue of events to write to
    /// the transport, one JSON message per event.
    pub async fn join(
        &self,
        room: RoomId,
        user: Option<String>,
    ) -> (RoomSession<P>, mpsc::UnboundedReceiver<EventEnvelope>) {
        let (sender, outbound) = mpsc::unbounded_channel();
        let id = ConnectionId::new();
        let hub = &self.inner;
        let session = RoomSession {
            hub: Arc::clone(hub),
            room: room.clone(),
            id,
            user: user.clone(),
            state: Mutex::new(SessionState::Connecting),
        };

        // Subscribe before registering: whichever connection turns out to
        // be first in the room hands its receiver to the forwarder, and
        // that receiver then predates every member's presence publish.
        let bus_rx = hub.bus.subscribe(&room);
        let first = hub.registry.register(
            &room,
            id,
            ConnectionHandle {
                user: user.clone(),
                sender,
            },
        );
        if first {
            let task = spawn_forwarder(Arc::clone(&hub.registry), room.clone(), bus_rx);
            let mut forwarders = hub.forwarders.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(stale) = forwarders.insert(room.clone(), task) {
                stale.abort();
            }
        }
        session.set_state(SessionState::Open);
        tracing::debug!(room = %room, connection = %id, "connection open");

        if let Some(name) = &user {
            match hub.presence.add(&room, name).await {
                Ok(users) => hub.publish_presence(&room, &users).await,
                Err(err) => {
                    tracing::warn!(room = %room, error = %err, "presence add failed, skipping presence broadcast");
                }
            }
        }

        (session, outbound)
    }
}

impl<P> HubInner<P>
where
    P: PresenceStore + Send + Sync,
{
    async fn publish_presence(&self, room: &RoomId, users: &BTreeSet<String>) {
        if let Err(err) = self
            .bus
            .publish(room, EventEnvelope::presence_update(users))
            .await
        {
            tracing::warn!(room = %room, error = %err, "failed to publish presence update");
        }
    }

    fn drop_forwarder(&self, room: &RoomId) {
        let mut forwarders = self.forwarders.lock().unwrap_or_else(PoisonError::into_inner);
        // re-check emptiness under the lock: a connection may have joined
        // the room since the closing session observed it as empty, and its
        // forwarder must survive this teardown
        if self.registry.room_len(room) > 0 {
            return;
        }
        if let Some(task) = forwarders.remove(room) {
            task.abort();
        }
    }
}

impl<P> Drop for HubInner<P> {
    fn drop(&mut self) {
        let mut forwarders = self.forwarders.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, task) in forwarders.drain() {
            task.abort();
        }
    }
}

/// Bridge one room's bus subscription to every locally registered
/// connection. One task per room with local connections.
fn spawn_forwarder(
    registry: Arc<ConnectionRegistry>,
    room: RoomId,
    mut bus_rx: broadcast::Receiver<EventEnvelope>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match bus_rx.recv().await {
                Ok(event) => {
                    registry.for_each(&room, |conn| {
                        // a closed queue means that connection is already
                        // tearing down; its own session handles cleanup
                        let _ = conn.sender.send(event.clone());
                    });
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(room = %room, skipped, "room forwarder lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// One client's connection lifecycle.
pub struct RoomSession<P> {
    hub: Arc<HubInner<P>>,
    room: RoomId,
    id: ConnectionId,
    user: Option<String>,
    state: Mutex<SessionState>,
}

impl<P> RoomSession<P>
where
    P: PresenceStore + Send + Sync,
{
    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The room this session belongs to.
    #[must_use]
    pub fn room(&self) -> &RoomId {
        &self.room
    }

    /// This connection's identifier.
    #[must_use]
    pub fn connection_id(&self) -> ConnectionId {
        self.id
    }

    fn set_state(&self, next: SessionState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Tear the session down: unregister, remove presence (publishing the
    /// resulting `PRESENCE_UPDATE` when a name was supplied), and drop the
    /// room forwarder once no local connection remains.
    ///
    /// Idempotent: a second invocation, from whichever path raced this
    /// one, is absorbed as a no-op.
    pub async fn close(&self) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if matches!(*state, SessionState::Closing | SessionState::Closed) {
                tracing::debug!(room = %self.room, connection = %self.id, "duplicate teardown absorbed");
                return;
            }
            *state = SessionState::Closing;
        }

        let room_empty = self.hub.registry.unregister(&self.room, self.id);

        if let Some(name) = &self.user {
            match self.hub.presence.remove(&self.room, name).await {
                Ok(users) => self.hub.publish_presence(&self.room, &users).await,
                Err(err) => {
                    tracing::warn!(room = %self.room, error = %err, "presence remove failed, skipping presence broadcast");
                }
            }
        }

        if room_empty {
            self.hub.drop_forwarder(&self.room);
        }

        self.set_state(SessionState::Closed);
        tracing::debug!(room = %self.room, connection = %self.id, "connection closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::InMemoryPresenceStore;
    use boardhub_domain::error::{BoardHubError, StoreUnavailableError};
    use boardhub_domain::event::EventKind;
    use std::time::Duration;

    fn room(board: &str) -> RoomId {
        RoomId::for_board(board).unwrap()
    }

    fn hub() -> (Arc<BoardHub<Arc<InMemoryPresenceStore>>>, Arc<InMemoryPresenceStore>) {
        let presence = Arc::new(InMemoryPresenceStore::new());
        let bus = Arc::new(RoomBus::new(64));
        (
            Arc::new(BoardHub::new(Arc::clone(&presence), bus)),
            presence,
        )
    }

    async fn recv(rx: &mut mpsc::UnboundedReceiver<EventEnvelope>) -> EventEnvelope {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("outbound queue closed")
    }

    fn presence_event(users: &[&str]) -> EventEnvelope {
        EventEnvelope::presence_update(&users.iter().map(ToString::to_string).collect())
    }

    #[tokio::test]
    async fn should_open_session_and_deliver_own_presence_update() {
        let (hub, _) = hub();
        let (session, mut rx) = hub.join(room("1"), Some("alice".into())).await;

        assert_eq!(session.state(), SessionState::Open);
        assert_eq!(recv(&mut rx).await, presence_event(&["alice"]));
    }

    #[tokio::test]
    async fn should_broadcast_presence_to_all_members_on_join() {
        let (hub, _) = hub();
        let (_alice, mut alice_rx) = hub.join(room("1"), Some("alice".into())).await;
        assert_eq!(recv(&mut alice_rx).await, presence_event(&["alice"]));

        let (_bob, mut bob_rx) = hub.join(room("1"), Some("bob".into())).await;

        assert_eq!(recv(&mut alice_rx).await, presence_event(&["alice", "bob"]));
        assert_eq!(recv(&mut bob_rx).await, presence_event(&["alice", "bob"]));
    }

    #[tokio::test]
    async fn should_fan_out_published_events_to_room_members_only() {
        let (hub, _) = hub();
        let (_alice, mut alice_rx) = hub.join(room("1"), Some("alice".into())).await;
        let (_carol, mut carol_rx) = hub.join(room("2"), Some("carol".into())).await;
        assert_eq!(recv(&mut alice_rx).await, presence_event(&["alice"]));
        assert_eq!(recv(&mut carol_rx).await, presence_event(&["carol"]));

        let event = EventEnvelope::new(EventKind::CardCreated, serde_json::json!({"id": 5}));
        hub.bus().publish(&room("1"), event.clone()).await.unwrap();

        assert_eq!(recv(&mut alice_rx).await, event);
        tokio::task::yield_now().await;
        assert!(carol_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn should_remove_presence_and_notify_remaining_members_on_close() {
        let (hub, presence) = hub();
        let (_alice, mut alice_rx) = hub.join(room("1"), Some("alice".into())).await;
        let (bob, mut bob_rx) = hub.join(room("1"), Some("bob".into())).await;
        assert_eq!(recv(&mut alice_rx).await, presence_event(&["alice"]));
        assert_eq!(recv(&mut alice_rx).await, presence_event(&["alice", "bob"]));
        assert_eq!(recv(&mut bob_rx).await, presence_event(&["alice", "bob"]));

        bob.close().await;

        assert_eq!(bob.state(), SessionState::Closed);
        assert_eq!(recv(&mut alice_rx).await, presence_event(&["alice"]));
        assert_eq!(
            presence.get(&room("1")).await.unwrap(),
            BTreeSet::from(["alice".to_string()])
        );
    }

    #[tokio::test]
    async fn should_absorb_duplicate_close() {
        let (hub, _) = hub();
        let (_alice, mut alice_rx) = hub.join(room("1"), Some("alice".into())).await;
        let (bob, _bob_rx) = hub.join(room("1"), Some("bob".into())).await;
        assert_eq!(recv(&mut alice_rx).await, presence_event(&["alice"]));
        assert_eq!(recv(&mut alice_rx).await, presence_event(&["alice", "bob"]));

        bob.close().await;
        bob.close().await;

        // exactly one removal notification, exactly one registry removal
        assert_eq!(recv(&mut alice_rx).await, presence_event(&["alice"]));
        tokio::task::yield_now().await;
        assert!(alice_rx.try_recv().is_err());
        assert_eq!(hub.registry().room_len(&room("1")), 1);
    }

    #[tokio::test]
    async fn should_skip_presence_for_anonymous_connections() {
        let (hub, presence) = hub();
        let (session, mut rx) = hub.join(room("1"), None).await;

        assert!(presence.get(&room("1")).await.unwrap().is_empty());

        // anonymous connections still receive room events
        let event = EventEnvelope::new(EventKind::BoardUpdated, serde_json::json!({"id": 1}));
        hub.bus().publish(&room("1"), event.clone()).await.unwrap();
        assert_eq!(recv(&mut rx).await, event);

        session.close().await;
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn should_collapse_connections_sharing_a_display_name() {
        let (hub, presence) = hub();
        let (_tab1, mut rx1) = hub.join(room("1"), Some("alice".into())).await;
        let (_tab2, _rx2) = hub.join(room("1"), Some("alice".into())).await;

        assert_eq!(recv(&mut rx1).await, presence_event(&["alice"]));
        assert_eq!(recv(&mut rx1).await, presence_event(&["alice"]));
        assert_eq!(presence.get(&room("1")).await.unwrap().len(), 1);
        assert_eq!(hub.registry().room_len(&room("1")), 2);
    }

    #[tokio::test]
    async fn should_reattach_forwarder_when_room_is_rejoined() {
        let (hub, _) = hub();
        let (session, mut rx) = hub.join(room("1"), Some("alice".into())).await;
        assert_eq!(recv(&mut rx).await, presence_event(&["alice"]));
        session.close().await;
        assert_eq!(hub.registry().room_len(&room("1")), 0);

        let (_again, mut rx) = hub.join(room("1"), Some("bob".into())).await;
        assert_eq!(recv(&mut rx).await, presence_event(&["bob"]));
    }

    /// Presence store whose `remove` stalls, widening the teardown window
    /// in which another connection can join the room.
    struct SlowRemoveStore {
        inner: InMemoryPresenceStore,
    }

    impl PresenceStore for SlowRemoveStore {
        async fn add(&self, room: &RoomId, name: &str) -> Result<BTreeSet<String>, BoardHubError> {
            self.inner.add(room, name).await
        }

        async fn remove(
            &self,
            room: &RoomId,
            name: &str,
        ) -> Result<BTreeSet<String>, BoardHubError> {
            tokio::time::sleep(Duration::from_millis(100)).await;
            self.inner.remove(room, name).await
        }

        async fn get(&self, room: &RoomId) -> Result<BTreeSet<String>, BoardHubError> {
            self.inner.get(room).await
        }
    }

    #[tokio::test]
    async fn should_keep_forwarding_to_connection_that_joins_during_close() {
        let presence = SlowRemoveStore {
            inner: InMemoryPresenceStore::new(),
        };
        let hub = Arc::new(BoardHub::new(presence, Arc::new(RoomBus::new(64))));

        let (alice, mut alice_rx) = hub.join(room("1"), Some("alice".into())).await;
        assert_eq!(recv(&mut alice_rx).await, presence_event(&["alice"]));

        // alice's teardown stalls in the store while bob joins the room
        let closing = tokio::spawn(async move { alice.close().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        let (_bob, mut bob_rx) = hub.join(room("1"), Some("bob".into())).await;
        assert_eq!(recv(&mut bob_rx).await, presence_event(&["alice", "bob"]));
        closing.await.unwrap();
        assert_eq!(recv(&mut bob_rx).await, presence_event(&["bob"]));

        // the resumed teardown must not have torn down bob's forwarder
        let event = EventEnvelope::new(EventKind::CardCreated, serde_json::json!({"id": 1}));
        hub.bus().publish(&room("1"), event.clone()).await.unwrap();
        assert_eq!(recv(&mut bob_rx).await, event);
    }

    /// Presence store whose every operation fails.
    struct UnavailableStore;

    impl PresenceStore for UnavailableStore {
        async fn add(
            &self,
            _room: &RoomId,
            _name: &str,
        ) -> Result<BTreeSet<String>, BoardHubError> {
            Err(StoreUnavailableError {
                reason: "backend gone".to_string(),
            }
            .into())
        }

        async fn remove(
            &self,
            _room: &RoomId,
            _name: &str,
        ) -> Result<BTreeSet<String>, BoardHubError> {
            Err(StoreUnavailableError {
                reason: "backend gone".to_string(),
            }
            .into())
        }

        async fn get(&self, _room: &RoomId) -> Result<BTreeSet<String>, BoardHubError> {
            Err(StoreUnavailableError {
                reason: "backend gone".to_string(),
            }
            .into())
        }
    }

    #[tokio::test]
    async fn should_stay_open_when_presence_store_is_unavailable() {
        let hub = Arc::new(BoardHub::new(UnavailableStore, Arc::new(RoomBus::new(64))));

        let (session, mut rx) = hub.join(room("1"), Some("alice".into())).await;
        assert_eq!(session.state(), SessionState::Open);

        // the presence broadcast is skipped but delivery still works
        let event = EventEnvelope::new(EventKind::BoardUpdated, serde_json::json!({"id": 1}));
        hub.bus().publish(&room("1"), event.clone()).await.unwrap();
        assert_eq!(recv(&mut rx).await, event);
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());

        session.close().await;
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(hub.registry().room_len(&room("1")), 0);
    }
}
