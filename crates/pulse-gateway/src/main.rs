//! # pulse-gateway
//!
//! Gateway server binary — wires configuration, session store, and server,
//! and owns process signal handling.

#![deny(unsafe_code)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use pulse_server::config::GatewayConfig;
use pulse_server::server::GatewayServer;
use pulse_session::{MemoryStore, RedisStore, SessionStore};
use tracing_subscriber::EnvFilter;

/// Pulse gateway server.
#[derive(Parser, Debug)]
#[command(name = "pulse-gateway", about = "Real-time connection gateway")]
struct Cli {
    /// Host to bind.
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (0 for auto-assign).
    #[arg(long)]
    port: Option<u16>,

    /// Redis URL for durable sessions (default: in-process store).
    #[arg(long)]
    redis_url: Option<String>,

    /// Seconds between heartbeat broadcasts.
    #[arg(long)]
    heartbeat_interval: Option<u64>,

    /// Send a goodbye summary frame on disconnect.
    #[arg(long)]
    goodbye: bool,
}

impl Cli {
    /// Layer CLI flags over the environment-derived configuration.
    fn into_config(self) -> GatewayConfig {
        let mut config = GatewayConfig::from_env();
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if self.redis_url.is_some() {
            config.redis_url = self.redis_url;
        }
        if let Some(interval) = self.heartbeat_interval {
            config.heartbeat_interval_secs = interval;
        }
        if self.goodbye {
            config.send_goodbye = true;
        }
        config
    }
}

/// Build the configured session store.
///
/// An unreachable cache is fatal here: a gateway configured for durable
/// sessions must not come up without it.
async fn build_store(config: &GatewayConfig) -> Result<Arc<dyn SessionStore>> {
    match &config.redis_url {
        Some(url) => {
            let ttl = Duration::from_secs(config.session_ttl_secs);
            let store = RedisStore::connect(url, ttl)
                .await
                .context("Failed to connect to session cache")?;
            tracing::info!(ttl_secs = config.session_ttl_secs, "durable session store enabled");
            Ok(Arc::new(store))
        }
        None => {
            tracing::info!("volatile session store enabled");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Wait for a process-termination signal (SIGTERM or ctrl-c).
async fn wait_for_termination() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sig = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");
        let _ = sig.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = args.into_config();
    let metrics = pulse_server::metrics::install_recorder();
    let store = build_store(&config).await?;

    let server = GatewayServer::new(config, store, metrics);
    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    tracing::info!("gateway listening on http://{addr}");

    wait_for_termination().await;

    tracing::info!("termination signal received, shutting down");
    server.state().observe_termination();
    server.state().begin_shutdown();
    // The serve task holds the grace window and drains in-flight work.
    let _ = handle.await;

    tracing::info!("shutdown complete");
    Ok(())
}
