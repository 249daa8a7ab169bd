//! In-process presence store with atomic per-room set updates.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use boardhub_domain::error::{BoardHubError, StoreUnavailableError};
use boardhub_domain::room::RoomId;

use crate::ports::PresenceStore;

/// Mutex-guarded presence sets, one per room.
///
/// Every mutation runs as a single guarded read-modify-write, so
/// concurrent connects and disconnects for the same room cannot lose
/// updates. Rooms whose set becomes empty are dropped from the map.
#[derive(Default)]
pub struct InMemoryPresenceStore {
    rooms: Mutex<HashMap<RoomId, BTreeSet<String>>>,
}

impl InMemoryPresenceStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<RoomId, BTreeSet<String>>>, BoardHubError> {
        self.rooms.lock().map_err(|_| {
            StoreUnavailableError {
                reason: "presence lock poisoned".to_string(),
            }
            .into()
        })
    }
}

impl PresenceStore for InMemoryPresenceStore {
    async fn add(&self, room: &RoomId, name: &str) -> Result<BTreeSet<String>, BoardHubError> {
        let mut rooms = self.lock()?;
        let users = rooms.entry(room.clone()).or_default();
        users.insert(name.to_string());
        Ok(users.clone())
    }

    async fn remove(&self, room: &RoomId, name: &str) -> Result<BTreeSet<String>, BoardHubError> {
        let mut rooms = self.lock()?;
        let Some(users) = rooms.get_mut(room) else {
            return Ok(BTreeSet::new());
        };
        users.remove(name);
        let snapshot = users.clone();
        if snapshot.is_empty() {
            rooms.remove(room);
        }
        Ok(snapshot)
    }

    async fn get(&self, room: &RoomId) -> Result<BTreeSet<String>, BoardHubError> {
        let rooms = self.lock()?;
        Ok(rooms.get(room).cloned().unwrap_or_default())
    }
}
