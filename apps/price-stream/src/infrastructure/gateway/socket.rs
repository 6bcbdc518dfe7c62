//! WebSocket transport for the gateway.
//!
//! Each socket gets one reader loop (this task) and one writer task. The
//! writer drains the connection's outbound queue and sends heartbeat pings.
//! Either side finishing ends the connection, as does a socket write that
//! misses the send deadline.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures_util::stream::SplitSink;
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::mpsc;

use super::connection_gateway::ConnectionGateway;
use super::heartbeat::{Heartbeat, HeartbeatConfig, HeartbeatEvent, HeartbeatState};
use crate::domain::subscription::ConnectionId;
use crate::infrastructure::protocol::{JsonCodec, ServerMessage};

/// Upgrade an HTTP request to a gateway WebSocket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(gateway): State<Arc<ConnectionGateway>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, gateway))
}

async fn handle_socket(socket: WebSocket, gateway: Arc<ConnectionGateway>) {
    let (sender, mut receiver) = socket.split();
    let (mut session, outbound) = gateway.on_connect().await;
    let connection = session.id();

    let heartbeat_state = Arc::new(HeartbeatState::new());
    let mut writer = tokio::spawn(write_loop(
        connection,
        sender,
        outbound,
        gateway.codec(),
        gateway.heartbeat(),
        gateway.send_timeout(),
        Arc::clone(&heartbeat_state),
    ));

    loop {
        tokio::select! {
            frame = receiver.next() => {
                let Some(Ok(frame)) = frame else { break };
                heartbeat_state.record_activity();
                match frame {
                    Message::Text(text) => gateway.on_message(&session, text.as_str()).await,
                    Message::Binary(_) => gateway.on_binary(&session).await,
                    Message::Close(_) => break,
                    // axum answers pings itself; pongs only count as activity.
                    Message::Ping(_) | Message::Pong(_) => {}
                }
            }
            _ = &mut writer => break,
        }
    }

    gateway.on_disconnect(&mut session);
    writer.abort();
}

async fn write_loop(
    connection: ConnectionId,
    mut sender: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<ServerMessage>,
    codec: JsonCodec,
    heartbeat: HeartbeatConfig,
    send_timeout: Duration,
    heartbeat_state: Arc<HeartbeatState>,
) {
    let mut heartbeat = Heartbeat::new(heartbeat);

    loop {
        tokio::select! {
            message = outbound.recv() => {
                // Queue dropped: the connection was evicted.
                let Some(message) = message else { break };
                let text = match codec.encode(&message) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(connection, error = %e, "Failed to encode message");
                        continue;
                    }
                };
                let frame = Message::Text(text.into());
                if !send_frame(connection, &mut sender, frame, send_timeout).await {
                    break;
                }
            }
            event = heartbeat.tick(&heartbeat_state) => match event {
                HeartbeatEvent::SendPing => {
                    let ping = Message::Ping(Vec::new().into());
                    if !send_frame(connection, &mut sender, ping, send_timeout).await {
                        break;
                    }
                }
                HeartbeatEvent::Timeout => {
                    tracing::warn!(connection, "Client heartbeat timed out");
                    break;
                }
            },
        }
    }

    let _ = sender.close().await;
}

/// Write one frame within the deadline. Returns false when the socket is
/// gone or too slow to keep.
async fn send_frame<S>(
    connection: ConnectionId,
    sender: &mut S,
    frame: Message,
    deadline: Duration,
) -> bool
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    match tokio::time::timeout(deadline, sender.send(frame)).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::debug!(connection, error = %e, "Socket write failed");
            false
        }
        Err(_) => {
            tracing::warn!(connection, ?deadline, "Socket write missed send deadline");
            false
        }
    }
}
