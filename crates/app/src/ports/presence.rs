//! Presence store port: the set of display names present in each room.
//!
//! Presence is the only state mutated by more than one connection (and,
//! in a scaled deployment, more than one process) concurrently, so the
//! mutating operations must be linearizable per room: concurrent calls
//! for the same room must never lose an update. Fetching the whole set,
//! mutating it locally, and writing it back is therefore not a valid
//! implementation strategy: every mutation happens as one atomic
//! set-update on the store side.

use std::collections::BTreeSet;
use std::future::Future;

use boardhub_domain::error::BoardHubError;
use boardhub_domain::room::RoomId;

/// Per-room set of currently-present display names.
///
/// Names are unique per room by value: two connections sharing a display
/// name collapse to one presence entry. Callers must act only on the set
/// returned by the mutating calls; [`PresenceStore::get`] is a best-effort
/// snapshot that may be stale by the time it is used.
pub trait PresenceStore {
    /// Atomically insert `name` into the room's set and return the
    /// resulting set. Adding an already-present name is a no-op that
    /// returns the unchanged set.
    ///
    /// # Errors
    ///
    /// Returns [`BoardHubError::StoreUnavailable`] when the backing store
    /// cannot be reached. Callers treat this as non-fatal and skip the
    /// presence broadcast for the event.
    fn add(
        &self,
        room: &RoomId,
        name: &str,
    ) -> impl Future<Output = Result<BTreeSet<String>, BoardHubError>> + Send;

    /// Atomically remove `name` from the room's set and return the
    /// resulting set. Removing an absent name is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`BoardHubError::StoreUnavailable`] when the backing store
    /// cannot be reached.
    fn remove(
        &self,
        room: &RoomId,
        name: &str,
    ) -> impl Future<Output = Result<BTreeSet<String>, BoardHubError>> + Send;

    /// Snapshot of the room's current membership.
    ///
    /// # Errors
    ///
    /// Returns [`BoardHubError::StoreUnavailable`] when the backing store
    /// cannot be reached.
    fn get(
        &self,
        room: &RoomId,
    ) -> impl Future<Output = Result<BTreeSet<String>, BoardHubError>> + Send;
}

impl<T: PresenceStore + Send + Sync> PresenceStore for std::sync::Arc<T> {
    fn add(
        &self,
        room: &RoomId,
        name: &str,
    ) -> impl Future<Output = Result<BTreeSet<String>, BoardHubError>> + Send {
        (**self).add(room, name)
    }

    fn remove(
        &self,
        room: &RoomId,
        name: &str,
    ) -> impl Future<Output = Result<BTreeSet<String>, BoardHubError>> + Send {
        (**self).remove(room, name)
    }

    fn get(
        &self,
        room: &RoomId,
    ) -> impl Future<Output = Result<BTreeSet<String>, BoardHubError>> + Send {
        (**self).get(room)
    }
}
