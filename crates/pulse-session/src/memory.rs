//! In-process session store.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::errors::Result;
use crate::store::SessionStore;

/// Volatile session store backed by a process-local map.
///
/// Counters live exactly as long as the process; nothing is shared across
/// instances.
#[derive(Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<String, u64>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions currently tracked.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Whether the store holds no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self, session_id: &str) -> Result<u64> {
        Ok(self.sessions.read().get(session_id).copied().unwrap_or(0))
    }

    async fn save(&self, session_id: &str, count: u64) -> Result<()> {
        let _ = self.sessions.write().insert(session_id.to_owned(), count);
        Ok(())
    }

    fn durable(&self) -> bool {
        false
    }
}
