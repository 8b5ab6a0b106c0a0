//! # pulse-session
//!
//! Pluggable persistence for per-session message counters.
//!
//! A [`SessionStore`] maps a `session_id` to the number of messages the
//! session has sent so far, so the count survives reconnects. Two backends:
//!
//! - [`MemoryStore`]: process-local map, lost on restart
//! - [`RedisStore`]: external TTL-bound cache, shared across processes
//!
//! The store is deliberately non-transactional: two connections sharing a
//! `session_id` race under last-writer-wins.

#![deny(unsafe_code)]

pub mod errors;
pub mod memory;
pub mod redis;
pub mod store;

pub use errors::StoreError;
pub use memory::MemoryStore;
pub use self::redis::RedisStore;
pub use store::SessionStore;
