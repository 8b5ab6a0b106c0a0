//! Per-connection session lifecycle — drives a single client from accept
//! through disconnect.

use std::sync::Arc;

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge};
use pulse_session::SessionStore;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::metrics::{
    WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_DISCONNECTIONS_TOTAL, WS_ERRORS_TOTAL,
    WS_MESSAGES_TOTAL,
};
use crate::state::GatewayState;

use super::broadcast::BroadcastGroup;
use super::connection::ClientConnection;

/// Build the ack frame sent after each inbound message.
fn ack_frame(count: u64) -> String {
    serde_json::json!({ "count": count }).to_string()
}

/// Build the optional disconnect summary frame.
fn goodbye_frame(total: u64) -> String {
    serde_json::json!({ "bye": true, "total": total }).to_string()
}

/// Normalize the reported close code.
///
/// Operator-driven shutdown is reported as Going Away (1001) regardless of
/// the code the transport supplied, so it stays distinguishable from a
/// client-driven close.
fn normalized_close_code(code: u16, termination_observed: bool) -> u16 {
    if termination_observed {
        close_code::AWAY
    } else {
        code
    }
}

/// Run a WebSocket session for a connected client.
///
/// 1. Loads the session counter (a store failure degrades to a fresh count)
/// 2. Joins the broadcast group
/// 3. Counts each inbound frame, persists on durable backends, acks
///    `{"count": N}`, and forwards heartbeat frames from the group queue
/// 4. On close: leaves the group, persists best-effort, optionally sends a
///    goodbye summary, and normalizes the close code under shutdown
///
/// One `select!` loop owns both socket halves, so message handling for a
/// single connection is strictly sequential.
#[instrument(skip_all, fields(session_id = %session_id))]
pub async fn run_ws_session(
    ws: WebSocket,
    session_id: String,
    store: Arc<dyn SessionStore>,
    group: Arc<BroadcastGroup>,
    state: Arc<GatewayState>,
    send_goodbye: bool,
    queue_size: usize,
) {
    let mut count = match store.load(&session_id).await {
        Ok(n) => n,
        Err(e) => {
            counter!(WS_ERRORS_TOTAL).increment(1);
            warn!(error = %e, "failed to load session, starting at 0");
            0
        }
    };

    let (queue_tx, mut queue_rx) = mpsc::channel::<String>(queue_size);
    let connection = Arc::new(ClientConnection::new(session_id.clone(), queue_tx));
    let conn_id = connection.id.clone();

    group.join(connection.clone()).await;
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);
    info!(conn_id = %conn_id, count, "client connected");

    let (mut ws_tx, mut ws_rx) = ws.split();
    let cancel = state.shutdown_token();
    let mut close_code = close_code::NORMAL;
    let mut server_close = false;

    loop {
        tokio::select! {
            inbound = ws_rx.next() => match inbound {
                Some(Ok(Message::Text(_) | Message::Binary(_))) => {
                    // Payload content is opaque; only its arrival counts.
                    count += 1;
                    counter!(WS_MESSAGES_TOTAL).increment(1);
                    if store.durable() {
                        if let Err(e) = store.save(&session_id, count).await {
                            counter!(WS_ERRORS_TOTAL).increment(1);
                            warn!(error = %e, count, "failed to persist count");
                        }
                    }
                    if let Err(e) = ws_tx.send(Message::Text(ack_frame(count).into())).await {
                        counter!(WS_ERRORS_TOTAL).increment(1);
                        warn!(error = %e, "failed to send ack");
                    }
                    debug!(count, "message received");
                }
                Some(Ok(Message::Close(frame))) => {
                    if let Some(frame) = frame {
                        close_code = frame.code;
                    }
                    break;
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Err(e)) => {
                    counter!(WS_ERRORS_TOTAL).increment(1);
                    warn!(error = %e, "transport error");
                    break;
                }
                None => break,
            },
            outbound = queue_rx.recv() => match outbound {
                Some(frame) => {
                    if let Err(e) = ws_tx.send(Message::Text(frame.into())).await {
                        warn!(error = %e, "failed to forward group frame");
                    }
                }
                None => break,
            },
            () = cancel.cancelled() => {
                server_close = true;
                break;
            }
        }
    }

    // Leave first so no further fan-out targets this connection.
    group.leave(&conn_id).await;

    if let Err(e) = store.save(&session_id, count).await {
        counter!(WS_ERRORS_TOTAL).increment(1);
        warn!(error = %e, count, "failed to persist final count");
    }

    if send_goodbye {
        if let Err(e) = ws_tx.send(Message::Text(goodbye_frame(count).into())).await {
            warn!(error = %e, "could not send goodbye frame");
        }
    }

    close_code = normalized_close_code(close_code, state.termination_observed());
    if server_close || state.termination_observed() {
        let frame = CloseFrame {
            code: close_code,
            reason: "server shutting down".into(),
        };
        if let Err(e) = ws_tx.send(Message::Close(Some(frame))).await {
            debug!(error = %e, "close frame not delivered");
        }
    }

    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    if connection.drop_count() > 0 {
        warn!(dropped = connection.drop_count(), "connection dropped frames");
    }
    info!(conn_id = %conn_id, close_code, count, "client disconnected");
}

#[cfg(test)]
mod tests {
    // The full session loop needs a real WebSocket and is covered by
    // tests/integration.rs. Unit tests here validate the helper logic.

    use super::*;

    #[test]
    fn ack_frame_shape() {
        let frame = ack_frame(3);
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["count"], 3);
    }

    #[test]
    fn ack_frame_zero() {
        let value: serde_json::Value = serde_json::from_str(&ack_frame(0)).unwrap();
        assert_eq!(value["count"], 0);
    }

    #[test]
    fn goodbye_frame_shape() {
        let frame = goodbye_frame(12);
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["bye"], true);
        assert_eq!(value["total"], 12);
    }

    #[test]
    fn close_code_passes_through_without_termination() {
        assert_eq!(normalized_close_code(close_code::NORMAL, false), 1000);
        assert_eq!(normalized_close_code(1006, false), 1006);
    }

    #[test]
    fn close_code_normalized_under_termination() {
        assert_eq!(normalized_close_code(close_code::NORMAL, true), 1001);
        assert_eq!(normalized_close_code(1006, true), 1001);
        assert_eq!(normalized_close_code(close_code::AWAY, true), 1001);
    }
}
