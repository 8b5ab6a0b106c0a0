//! WebSocket client connection state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use uuid::Uuid;

/// Represents a connected WebSocket client.
///
/// The connection is ephemeral: created on accept, destroyed when the
/// disconnect completes. Outbound frames go through a bounded send queue
/// drained by the connection's session loop, so fan-out never blocks on a
/// slow socket.
pub struct ClientConnection {
    /// Unique connection ID.
    pub id: String,
    /// The session this connection is counting for.
    pub session_id: String,
    /// Send queue to the connection's socket writer.
    tx: mpsc::Sender<String>,
    /// When this connection was established.
    pub connected_at: Instant,
    /// Count of frames dropped due to a full or closed queue.
    dropped_messages: AtomicU64,
}

impl ClientConnection {
    /// Create a new connection bound to `session_id`.
    pub fn new(session_id: String, tx: mpsc::Sender<String>) -> Self {
        Self {
            id: format!("conn_{}", Uuid::now_v7()),
            session_id,
            tx,
            connected_at: Instant::now(),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Enqueue a text frame for the client.
    ///
    /// Returns `false` if the queue is full or closed, and increments the
    /// dropped frame counter.
    pub fn send(&self, message: String) -> bool {
        if self.tx.try_send(message).is_ok() {
            true
        } else {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Total frames dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
