//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside
//! world. The in-process implementations in this crate cover a single
//! server process; a horizontally scaled deployment swaps in adapters
//! backed by a shared store and broker without touching the hub.

pub mod event_bus;
pub mod presence;

pub use event_bus::EventPublisher;
pub use presence::PresenceStore;
