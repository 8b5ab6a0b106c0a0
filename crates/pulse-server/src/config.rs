//! Gateway configuration.
//!
//! Defaults, then `PULSE_*` environment overrides, then CLI flags (applied
//! by the binary). Each env var has strict parsing rules; invalid values are
//! logged and ignored rather than aborting startup.

use serde::{Deserialize, Serialize};

/// Configuration for the gateway server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Seconds between heartbeat broadcasts.
    pub heartbeat_interval_secs: u64,
    /// Inactivity TTL for durable sessions, refreshed on every save.
    pub session_ttl_secs: u64,
    /// Redis URL for the durable session store. `None` keeps sessions
    /// in-process.
    pub redis_url: Option<String>,
    /// Send a `{"bye":true,"total":N}` summary frame on disconnect.
    pub send_goodbye: bool,
    /// Seconds to wait after flipping readiness before tearing down, so
    /// in-flight sends and persists can finish.
    pub shutdown_grace_secs: u64,
    /// Per-connection outbound queue capacity.
    pub send_queue_size: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            heartbeat_interval_secs: 2,
            session_ttl_secs: 3600,
            redis_url: None,
            send_goodbye: false,
            shutdown_grace_secs: 1,
            send_queue_size: 256,
        }
    }
}

impl GatewayConfig {
    /// Defaults with environment variable overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply `PULSE_*` environment overrides to this configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = read_env_string("PULSE_HOST") {
            self.host = v;
        }
        if let Some(v) = read_env_u16("PULSE_PORT", 0, 65535) {
            self.port = v;
        }
        if let Some(v) = read_env_u64("PULSE_HEARTBEAT_INTERVAL", 1, 3600) {
            self.heartbeat_interval_secs = v;
        }
        if let Some(v) = read_env_u64("PULSE_SESSION_TTL", 1, 86_400_000) {
            self.session_ttl_secs = v;
        }
        if let Some(v) = read_env_string("PULSE_REDIS_URL") {
            self.redis_url = Some(v);
        }
        if let Some(v) = read_env_bool("PULSE_SEND_GOODBYE") {
            self.send_goodbye = v;
        }
        if let Some(v) = read_env_u64("PULSE_SHUTDOWN_GRACE", 0, 600) {
            self.shutdown_grace_secs = v;
        }
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_bool(name: &str) -> Option<bool> {
    let val = std::env::var(name).ok()?;
    let result = parse_bool(&val);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
    }
    result
}

fn read_env_u16(name: &str, min: u16, max: u16) -> Option<u16> {
    let val = std::env::var(name).ok()?;
    let result = parse_u16_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u16 env var, ignoring");
    }
    result
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}
