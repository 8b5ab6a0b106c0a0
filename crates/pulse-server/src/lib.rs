//! # pulse-server
//!
//! Axum HTTP + `WebSocket` gateway server.
//!
//! - `WebSocket` endpoint: per-connection message counting with acks,
//!   session resume via `pulse-session`
//! - Broadcast group: heartbeat fan-out to every connected client
//! - HTTP surface: liveness, readiness, Prometheus metrics
//! - Process-wide readiness/shutdown coordination via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod health;
pub mod metrics;
pub mod server;
pub mod state;
pub mod websocket;
