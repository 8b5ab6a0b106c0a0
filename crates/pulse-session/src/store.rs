//! The session persistence seam.

use async_trait::async_trait;

use crate::errors::Result;

/// Persists per-session message counters across reconnects.
///
/// Implementations are chosen at configuration time and shared behind an
/// `Arc<dyn SessionStore>`. The contract is non-transactional: concurrent
/// writers for the same `session_id` race under last-writer-wins, and a
/// crash between increment and save loses at most the most recent update.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the message counter for a session. Unknown sessions yield 0.
    async fn load(&self, session_id: &str) -> Result<u64>;

    /// Persist the message counter for a session.
    async fn save(&self, session_id: &str, count: u64) -> Result<()>;

    /// Whether saves survive a process restart.
    ///
    /// Durable backends are written on every message, volatile ones only on
    /// disconnect.
    fn durable(&self) -> bool;
}
