//! Process-wide readiness and shutdown coordination.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;

/// Readiness and termination flags shared by every part of the gateway.
///
/// There are exactly two transition points: [`mark_ready`](Self::mark_ready)
/// at startup and [`begin_shutdown`](Self::begin_shutdown) at shutdown.
/// A separate termination flag records that an operator-driven signal was
/// observed, which close-code reporting consults independently of readiness.
pub struct GatewayState {
    ready: AtomicBool,
    terminating: AtomicBool,
    shutdown: CancellationToken,
}

impl GatewayState {
    /// Create a new state object. Readiness starts false.
    pub fn new() -> Self {
        Self {
            ready: AtomicBool::new(false),
            terminating: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        }
    }

    /// Startup transition: the gateway is accepting traffic.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// Whether the gateway reports ready.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Record that a process-termination signal was observed.
    pub fn observe_termination(&self) {
        self.terminating.store(true, Ordering::Release);
    }

    /// Whether a termination signal has been observed.
    pub fn termination_observed(&self) -> bool {
        self.terminating.load(Ordering::Acquire)
    }

    /// Shutdown transition: flips readiness off and cancels the shutdown
    /// token, stopping the heartbeat task and the accept loop.
    pub fn begin_shutdown(&self) {
        self.ready.store(false, Ordering::Release);
        self.shutdown.cancel();
    }

    /// Whether a shutdown has been initiated.
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Get a clone of the shutdown token.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}

impl Default for GatewayState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_not_ready() {
        let state = GatewayState::new();
        assert!(!state.is_ready());
        assert!(!state.termination_observed());
        assert!(!state.is_shutting_down());
    }

    #[test]
    fn mark_ready_sets_flag() {
        let state = GatewayState::new();
        state.mark_ready();
        assert!(state.is_ready());
    }

    #[test]
    fn begin_shutdown_clears_readiness() {
        let state = GatewayState::new();
        state.mark_ready();
        state.begin_shutdown();
        assert!(!state.is_ready());
        assert!(state.is_shutting_down());
    }

    #[test]
    fn termination_flag_is_independent_of_readiness() {
        let state = GatewayState::new();
        state.mark_ready();
        state.observe_termination();
        assert!(state.termination_observed());
        assert!(state.is_ready());
    }

    #[test]
    fn token_propagates_cancellation() {
        let state = GatewayState::new();
        let t1 = state.shutdown_token();
        let t2 = state.shutdown_token();
        assert!(!t1.is_cancelled());
        state.begin_shutdown();
        assert!(t1.is_cancelled());
        assert!(t2.is_cancelled());
    }

    #[test]
    fn begin_shutdown_is_idempotent() {
        let state = GatewayState::new();
        state.begin_shutdown();
        state.begin_shutdown();
        assert!(state.is_shutting_down());
    }

    #[tokio::test]
    async fn cancelled_future_resolves() {
        let state = GatewayState::new();
        let token = state.shutdown_token();

        let handle = tokio::spawn(async move {
            token.cancelled().await;
            true
        });

        state.begin_shutdown();
        assert!(handle.await.unwrap());
    }

    #[test]
    fn default_matches_new() {
        let state = GatewayState::default();
        assert!(!state.is_ready());
    }
}
