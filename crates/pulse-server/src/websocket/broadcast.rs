//! Heartbeat fan-out to connected WebSocket clients.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::counter;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::metrics::WS_BROADCAST_DROPS_TOTAL;

use super::connection::ClientConnection;

/// The single fixed broadcast group every connection joins.
pub const GROUP_NAME: &str = "chat";

/// Dynamic membership set of active connections plus fan-out publish.
///
/// Membership exactly mirrors accepted-but-not-yet-disconnected connections:
/// the session loop joins on accept and leaves on close, both idempotent.
pub struct BroadcastGroup {
    name: &'static str,
    /// Joined connections indexed by connection ID.
    members: RwLock<HashMap<String, Arc<ClientConnection>>>,
}

impl BroadcastGroup {
    /// Create the group.
    pub fn new() -> Self {
        Self {
            name: GROUP_NAME,
            members: RwLock::new(HashMap::new()),
        }
    }

    /// Add a connection. Re-joining with the same ID is a no-op overwrite.
    pub async fn join(&self, connection: Arc<ClientConnection>) {
        let mut members = self.members.write().await;
        let _ = members.insert(connection.id.clone(), connection);
    }

    /// Remove a connection by ID. Removing an absent ID is a no-op.
    pub async fn leave(&self, connection_id: &str) {
        let mut members = self.members.write().await;
        let _ = members.remove(connection_id);
    }

    /// Deliver a frame to every joined connection.
    ///
    /// Each member receives independently through its own queue: a full or
    /// closed queue drops the frame for that member only, and delivery order
    /// to any single member matches publish order.
    pub async fn publish(&self, frame: &str) {
        let members = self.members.read().await;
        debug!(group = self.name, recipients = members.len(), "publishing frame");
        for conn in members.values() {
            if !conn.send(frame.to_owned()) {
                counter!(WS_BROADCAST_DROPS_TOTAL).increment(1);
                warn!(
                    group = self.name,
                    conn_id = %conn.id,
                    session_id = %conn.session_id,
                    "failed to deliver frame to member"
                );
            }
        }
    }

    /// Number of joined connections.
    pub async fn member_count(&self) -> usize {
        self.members.read().await.len()
    }
}

impl Default for BroadcastGroup {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn make_member(session: &str) -> (Arc<ClientConnection>, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(32);
        let conn = ClientConnection::new(session.into(), tx);
        (Arc::new(conn), rx)
    }

    #[tokio::test]
    async fn join_adds_member() {
        let group = BroadcastGroup::new();
        let (conn, _rx) = make_member("a");
        group.join(conn).await;
        assert_eq!(group.member_count().await, 1);
    }

    #[tokio::test]
    async fn join_is_idempotent() {
        let group = BroadcastGroup::new();
        let (conn, _rx) = make_member("a");
        group.join(conn.clone()).await;
        group.join(conn).await;
        assert_eq!(group.member_count().await, 1);
    }

    #[tokio::test]
    async fn leave_removes_member() {
        let group = BroadcastGroup::new();
        let (conn, _rx) = make_member("a");
        let id = conn.id.clone();
        group.join(conn).await;
        group.leave(&id).await;
        assert_eq!(group.member_count().await, 0);
    }

    #[tokio::test]
    async fn leave_twice_is_harmless() {
        let group = BroadcastGroup::new();
        let (conn, _rx) = make_member("a");
        let id = conn.id.clone();
        group.join(conn).await;
        group.leave(&id).await;
        group.leave(&id).await;
        assert_eq!(group.member_count().await, 0);
    }

    #[tokio::test]
    async fn leave_unknown_id_is_harmless() {
        let group = BroadcastGroup::new();
        group.leave("conn_never_joined").await;
        assert_eq!(group.member_count().await, 0);
    }

    #[tokio::test]
    async fn publish_reaches_every_member() {
        let group = BroadcastGroup::new();
        let (c1, mut rx1) = make_member("a");
        let (c2, mut rx2) = make_member("b");
        group.join(c1).await;
        group.join(c2).await;

        group.publish(r#"{"type":"heartbeat"}"#).await;

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn publish_after_leave_skips_removed_member() {
        let group = BroadcastGroup::new();
        let (c1, mut rx1) = make_member("a");
        let (c2, mut rx2) = make_member("b");
        let removed = c1.id.clone();
        group.join(c1).await;
        group.join(c2).await;
        group.leave(&removed).await;

        group.publish("tick").await;

        assert!(rx1.try_recv().is_err());
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn one_dead_member_never_blocks_the_rest() {
        let group = BroadcastGroup::new();
        let (dead_tx, dead_rx) = mpsc::channel(32);
        let dead = Arc::new(ClientConnection::new("dead".into(), dead_tx));
        drop(dead_rx);
        let (live, mut live_rx) = make_member("live");
        group.join(dead).await;
        group.join(live).await;

        group.publish("tick").await;

        assert_eq!(live_rx.try_recv().unwrap(), "tick");
    }

    #[tokio::test]
    async fn per_member_delivery_order_matches_publish_order() {
        let group = BroadcastGroup::new();
        let (conn, mut rx) = make_member("a");
        group.join(conn).await;

        group.publish("first").await;
        group.publish("second").await;
        group.publish("third").await;

        assert_eq!(rx.try_recv().unwrap(), "first");
        assert_eq!(rx.try_recv().unwrap(), "second");
        assert_eq!(rx.try_recv().unwrap(), "third");
    }

    #[tokio::test]
    async fn publish_to_empty_group_is_harmless() {
        let group = BroadcastGroup::new();
        group.publish("tick").await;
        assert_eq!(group.member_count().await, 0);
    }

    #[tokio::test]
    async fn default_group() {
        let group = BroadcastGroup::default();
        assert_eq!(group.member_count().await, 0);
    }
}
