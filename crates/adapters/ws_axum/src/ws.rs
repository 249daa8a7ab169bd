//! WebSocket endpoint: the transport face of a room connection.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use boardhub_app::hub::BoardHub;
use boardhub_app::ports::PresenceStore;
use boardhub_domain::error::{BoardHubError, DeliveryError};
use boardhub_domain::event::EventEnvelope;
use boardhub_domain::room::RoomId;

use crate::error::WsError;
use crate::state::AppState;

/// Out-of-band parameters supplied at connection time.
#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    /// Display name for presence tracking. Missing or blank disables
    /// presence for this connection but not event delivery.
    username: Option<String>,
}

/// `GET /ws/board/{board_id}`: upgrade to the board room's event stream.
///
/// The board identifier is validated before the upgrade; a malformed one
/// is refused with `400 Bad Request` and the connection never opens.
pub async fn connect<P>(
    Path(board_id): Path<String>,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState<P>>,
    ws: WebSocketUpgrade,
) -> Result<Response, WsError>
where
    P: PresenceStore + Send + Sync + 'static,
{
    let room = RoomId::for_board(&board_id)?;
    let user = params.username.filter(|name| !name.is_empty());
    let hub = Arc::clone(&state.hub);
    Ok(ws.on_upgrade(move |socket| serve_connection(hub, room, user, socket)))
}

/// Run one upgraded socket until either side ends it, then close the
/// session exactly once.
async fn serve_connection<P>(
    hub: Arc<BoardHub<P>>,
    room: RoomId,
    user: Option<String>,
    socket: WebSocket,
) where
    P: PresenceStore + Send + Sync + 'static,
{
    let (session, outbound) = hub.join(room, user).await;
    let (sink, stream) = socket.split();

    let mut write_task = tokio::spawn(forward_events(outbound, sink));
    let mut read_task = tokio::spawn(drain_client(stream));

    // Whichever half finishes first ends the connection; cancelling the
    // other half only drops this connection's own pending sends.
    tokio::select! {
        result = &mut write_task => {
            read_task.abort();
            if let Ok(Err(err)) = result {
                tracing::debug!(room = %session.room(), connection = %session.connection_id(), error = %err, "client write failed");
            }
        }
        _ = &mut read_task => {
            write_task.abort();
        }
    }

    session.close().await;
}

/// Drain the session's outbound queue into the socket, one JSON text
/// message per event. A failed write is fatal for this recipient only.
async fn forward_events(
    mut outbound: mpsc::UnboundedReceiver<EventEnvelope>,
    mut sink: SplitSink<WebSocket, Message>,
) -> Result<(), BoardHubError> {
    while let Some(event) = outbound.recv().await {
        let text = serde_json::to_string(&event).map_err(|err| DeliveryError {
            reason: err.to_string(),
        })?;
        sink.send(Message::Text(text.into()))
            .await
            .map_err(|err| DeliveryError {
                reason: err.to_string(),
            })?;
    }
    Ok(())
}

/// Consume inbound frames until the client closes or the transport
/// errors. The hub is broadcast-only; client frames carry no meaning.
async fn drain_client(mut stream: SplitStream<WebSocket>) {
    while let Some(Ok(message)) = stream.next().await {
        if matches!(message, Message::Close(_)) {
            break;
        }
    }
}
