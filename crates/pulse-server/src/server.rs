//! `GatewayServer` — Axum HTTP + WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use pulse_session::SessionStore;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::health;
use crate::state::GatewayState;
use crate::websocket::broadcast::BroadcastGroup;
use crate::websocket::heartbeat::run_heartbeat;
use crate::websocket::session::run_ws_session;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Broadcast group for heartbeat fan-out.
    pub group: Arc<BroadcastGroup>,
    /// Readiness and shutdown coordination.
    pub gateway: Arc<GatewayState>,
    /// Session counter persistence.
    pub store: Arc<dyn SessionStore>,
    /// Handle used to render the `/metrics` endpoint.
    pub metrics: PrometheusHandle,
    /// Gateway configuration.
    pub config: GatewayConfig,
}

/// The gateway server.
pub struct GatewayServer {
    config: GatewayConfig,
    gateway: Arc<GatewayState>,
    group: Arc<BroadcastGroup>,
    store: Arc<dyn SessionStore>,
    metrics: PrometheusHandle,
}

impl GatewayServer {
    /// Create a new server.
    pub fn new(
        config: GatewayConfig,
        store: Arc<dyn SessionStore>,
        metrics: PrometheusHandle,
    ) -> Self {
        Self {
            config,
            gateway: Arc::new(GatewayState::new()),
            group: Arc::new(BroadcastGroup::new()),
            store,
            metrics,
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            group: self.group.clone(),
            gateway: self.gateway.clone(),
            store: self.store.clone(),
            metrics: self.metrics.clone(),
            config: self.config.clone(),
        };

        Router::new()
            .route("/ws", get(ws_handler))
            .route("/healthz", get(healthz_handler))
            .route("/readyz", get(readyz_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(state)
            .layer(CorsLayer::permissive())
    }

    /// Bind the listener, mark the gateway ready, spawn the heartbeat task,
    /// and serve until shutdown.
    ///
    /// Returns the bound address (port 0 resolves here) and the serve task
    /// handle. Shutdown is driven by [`GatewayState::begin_shutdown`]: the
    /// accept loop stops and in-flight connections drain.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener =
            tokio::net::TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        let addr = listener.local_addr()?;
        let router = self.router();

        self.gateway.mark_ready();
        let heartbeat = tokio::spawn(run_heartbeat(
            self.group.clone(),
            self.gateway.clone(),
            Duration::from_secs(self.config.heartbeat_interval_secs),
        ));

        let token = self.gateway.shutdown_token();
        let grace = Duration::from_secs(self.config.shutdown_grace_secs);
        let handle = tokio::spawn(async move {
            // Keep accepting (and answering readiness probes with 503) for
            // the grace window after shutdown begins, so in-flight sends and
            // persists can finish before teardown.
            let serve = axum::serve(listener, router).with_graceful_shutdown(async move {
                token.cancelled().await;
                tokio::time::sleep(grace).await;
            });
            if let Err(e) = serve.await {
                error!(error = %e, "server error");
            }
            // The heartbeat watches the same token and exits on its own.
            let _ = heartbeat.await;
        });

        info!(%addr, "gateway listening");
        Ok((addr, handle))
    }

    /// Get the readiness/shutdown state.
    pub fn state(&self) -> &Arc<GatewayState> {
        &self.gateway
    }

    /// Get the broadcast group.
    pub fn group(&self) -> &Arc<BroadcastGroup> {
        &self.group
    }

    /// Get the server configuration.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Query parameters accepted by the `/ws` endpoint.
#[derive(Debug, Deserialize)]
struct WsQuery {
    session_id: Option<String>,
}

/// GET /ws — upgrade and hand the socket to the session loop.
async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let session_id = query
        .session_id
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| Uuid::now_v7().to_string());
    ws.on_upgrade(move |socket| {
        run_ws_session(
            socket,
            session_id,
            state.store,
            state.group,
            state.gateway,
            state.config.send_goodbye,
            state.config.send_queue_size,
        )
    })
}

/// GET /healthz — alive whenever the process can answer.
async fn healthz_handler() -> &'static str {
    health::OK
}

/// GET /readyz
async fn readyz_handler(State(state): State<AppState>) -> impl IntoResponse {
    health::readiness(state.gateway.is_ready())
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> String {
    crate::metrics::render(&state.metrics)
}
