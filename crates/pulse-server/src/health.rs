//! `/healthz` and `/readyz` bodies.

use axum::http::StatusCode;

/// Body returned while the process is alive or ready.
pub const OK: &str = "OK";

/// Body returned while the gateway is not ready.
pub const NOT_READY: &str = "NOT READY";

/// Map readiness onto the probe response.
pub fn readiness(ready: bool) -> (StatusCode, &'static str) {
    if ready {
        (StatusCode::OK, OK)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, NOT_READY)
    }
}
