//! Shared application state for axum handlers.

use std::sync::Arc;

use boardhub_app::hub::BoardHub;

/// Application state shared across all axum handlers.
///
/// Generic over the presence store to avoid dynamic dispatch. `Clone` is
/// implemented manually so the store itself does not need to be `Clone`;
/// only the `Arc` is cloned.
pub struct AppState<P> {
    /// The collaboration hub serving every room in this process.
    pub hub: Arc<BoardHub<P>>,
}

impl<P> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            hub: Arc::clone(&self.hub),
        }
    }
}

impl<P> AppState<P> {
    /// Wrap a hub for handler injection.
    #[must_use]
    pub fn new(hub: Arc<BoardHub<P>>) -> Self {
        Self { hub }
    }
}
