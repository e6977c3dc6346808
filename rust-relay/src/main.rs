//! Relay Web Server - verifies, re-signs and fans out Twilio webhooks.
//!
//! This binary provides a thin web server that:
//! - Receives signed Twilio messaging callbacks
//! - Verifies the inbound HMAC-SHA1 signature
//! - Re-signs and forwards the payload to every configured destination
//! - Answers Twilio with the empty TwiML acknowledgement

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use tokio::{net::TcpListener, signal};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use relay::report::LogReporter;
use relay::web::{health, proxy_status_webhook, proxy_webhook, AppState};
use relay::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("relay_server_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        domain_name = %config.domain_name,
        auth_token_configured = !config.auth_token.is_empty(),
        dispatch_mode = ?config.dispatch_mode,
        request_timeout_ms = config.request_timeout_ms,
        "config_loaded"
    );

    // Create a shared HTTP client for all outbound calls
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(config.request_timeout_ms))
        .build()
        .context("Failed to create HTTP client")?;

    // Create application state
    let port = config.port;
    let state = AppState::new(config, client, Arc::new(LogReporter));
    info!(
        proxy_destinations = state.proxy_destinations.len(),
        proxy_status_destinations = state.proxy_status_destinations.len(),
        "destination_tables_loaded"
    );

    // Build the router
    let app = Router::new()
        .route("/health", get(health))
        .route("/proxy", post(proxy_webhook))
        .route("/proxy-status", post(proxy_status_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "relay_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("relay_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("relay_server_shutting_down");
}
