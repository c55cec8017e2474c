//! WebSocket connection handler.
//!
//! Bridges one client socket to the real-time core. The credential is checked
//! before the upgrade, so a rejected client never touches presence state.
//! After the upgrade three pieces run per socket:
//!
//! - the reader (this task) parses frames and feeds the connection actor
//! - the actor handles events in order and runs disconnect when fed no more
//! - the writer drains the connection's outbound queue into the socket and
//!   pings the client, so that a live but quiet client keeps answering with
//!   pongs and never hits the idle timeout

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

use parley_auth::JwtValidator;
use parley_core::UserId;
use parley_realtime::{actor, ConnectionCommand, OutboundEvent};
use parley_store::Store;

use crate::auth::connection_token;
use crate::error::ApiError;
use crate::state::GatewayState;

/// Query parameters accepted on the upgrade request.
#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    /// Bearer credential, as an alternative to the `Authorization` header.
    #[serde(default)]
    pub token: Option<String>,
}

/// WebSocket upgrade handler.
///
/// # Errors
///
/// Returns 401 if no valid credential was presented.
pub async fn websocket_handler<S, V>(
    ws: WebSocketUpgrade,
    State(state): State<Arc<GatewayState<S, V>>>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError>
where
    S: Store + 'static,
    V: JwtValidator + 'static,
{
    let token = connection_token(query.token.as_deref(), &headers);
    let user_id = state.realtime.authenticate(token).await?;

    tracing::info!(user_id = %user_id, "WebSocket connection initiated");

    Ok(ws.on_upgrade(move |socket| handle_websocket(socket, state, user_id)))
}

/// Run an upgraded socket until either side goes away.
async fn handle_websocket<S, V>(socket: WebSocket, state: Arc<GatewayState<S, V>>, user_id: UserId)
where
    S: Store + 'static,
    V: JwtValidator + 'static,
{
    let realtime = Arc::clone(&state.realtime);
    let idle_timeout = state.config.websocket_timeout();
    let ping_interval = state.config.ping_interval();

    let (outbox_tx, outbox_rx) = mpsc::channel(realtime.config().outbox_capacity.max(1));
    let connection = realtime.connect(user_id, outbox_tx);
    let connection_id = connection.id();
    let (commands, actor) = actor::spawn(Arc::clone(&realtime), connection);

    let (client_write, mut client_read) = socket.split();
    let mut writer = tokio::spawn(forward_events_to_client(
        client_write,
        outbox_rx,
        ping_interval,
    ));
    let mut writer_done = false;

    loop {
        let frame = tokio::select! {
            frame = tokio::time::timeout(idle_timeout, client_read.next()) => frame,
            _ = &mut writer => {
                writer_done = true;
                break;
            }
        };

        match frame {
            // Any frame resets the timer, including pongs to our pings
            Err(_) => {
                tracing::debug!(user_id = %user_id, "WebSocket idle timeout");
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                tracing::debug!(user_id = %user_id, error = %e, "Error reading from client");
                break;
            }
            Ok(Some(Ok(msg))) => match msg {
                Message::Text(text) => {
                    if commands
                        .send(ConnectionCommand::from_text(&text))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Message::Close(_) => {
                    tracing::debug!(user_id = %user_id, "Client closed connection");
                    break;
                }
                // Pings are answered by the transport
                Message::Binary(_) | Message::Ping(_) | Message::Pong(_) => {}
            },
        }
    }

    // Closing the command channel lets the actor finish queued events and
    // run disconnect. Once it exits, the outbound queue has no senders left
    // and the writer drains and stops.
    drop(commands);
    if let Err(e) = actor.await {
        tracing::error!(user_id = %user_id, error = %e, "Connection actor failed");
    }
    if !writer_done {
        if let Err(e) = writer.await {
            tracing::error!(user_id = %user_id, error = %e, "Connection writer failed");
        }
    }

    tracing::info!(
        user_id = %user_id,
        connection_id = %connection_id,
        "WebSocket connection ended"
    );
}

/// Write queued events to the client as JSON text frames, pinging it every
/// `ping_interval`.
async fn forward_events_to_client(
    mut client_write: SplitSink<WebSocket, Message>,
    mut outbox: mpsc::Receiver<OutboundEvent>,
    ping_interval: Duration,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + ping_interval, ping_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let frame = tokio::select! {
            event = outbox.recv() => {
                let Some(event) = event else { break };
                match event.to_text() {
                    Ok(text) => Message::Text(text),
                    Err(e) => {
                        tracing::warn!(event = event.name(), error = %e, "Failed to encode event");
                        continue;
                    }
                }
            }
            _ = ticker.tick() => Message::Ping(Vec::new()),
        };

        if let Err(e) = client_write.send(frame).await {
            tracing::debug!(error = %e, "Failed to send to client");
            return;
        }
    }

    let _ = client_write.close().await;
}
