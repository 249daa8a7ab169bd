//! Axum router assembly.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use boardhub_app::ports::PresenceStore;

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Exposes the room connection endpoint and a health check. Includes a
/// [`TraceLayer`] that logs each HTTP request/response at the `DEBUG`
/// level using the `tracing` ecosystem.
pub fn build<P>(state: AppState<P>) -> Router
where
    P: PresenceStore + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .route("/ws/board/{board_id}", get(crate::ws::connect::<P>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use boardhub_app::event_bus::RoomBus;
    use boardhub_app::hub::BoardHub;
    use boardhub_app::presence::InMemoryPresenceStore;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        let hub = Arc::new(BoardHub::new(
            InMemoryPresenceStore::new(),
            Arc::new(RoomBus::new(16)),
        ));
        build(AppState::new(hub))
    }

    #[tokio::test]
    async fn should_return_ok_when_health_check_called() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn should_refuse_plain_http_request_on_connection_endpoint() {
        // no upgrade headers: the request must be rejected, not served
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/ws/board/42?username=alice")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn should_not_serve_unrelated_paths() {
        let response = app()
            .oneshot(Request::builder().uri("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
