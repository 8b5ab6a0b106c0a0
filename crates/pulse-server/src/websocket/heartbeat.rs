//! Periodic liveness broadcast.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics::counter;
use tokio::time;
use tracing::{debug, info};

use crate::metrics::HEARTBEATS_SENT_TOTAL;
use crate::state::GatewayState;

use super::broadcast::BroadcastGroup;

/// Build one heartbeat frame carrying the given timestamp.
fn heartbeat_frame(ts: &str) -> String {
    serde_json::json!({
        "type": "heartbeat",
        "message": { "ts": ts },
    })
    .to_string()
}

/// Publish periodic ticks to the broadcast group while the gateway is ready.
///
/// One instance runs per process, spawned at startup. The loop exits
/// promptly when the shutdown token cancels, and within one interval if
/// readiness drops without a cancellation, so at most one in-flight sleep is
/// pending at shutdown. This is the only liveness signal independent of
/// per-connection traffic.
pub async fn run_heartbeat(
    group: Arc<BroadcastGroup>,
    state: Arc<GatewayState>,
    interval: Duration,
) {
    let cancel = state.shutdown_token();
    while state.is_ready() {
        tokio::select! {
            () = time::sleep(interval) => {
                if !state.is_ready() {
                    break;
                }
                let ts = Utc::now().to_rfc3339();
                group.publish(&heartbeat_frame(&ts)).await;
                counter!(HEARTBEATS_SENT_TOTAL).increment(1);
                debug!(%ts, "heartbeat published");
            }
            () = cancel.cancelled() => break,
        }
    }
    info!("heartbeat task stopped");
}
