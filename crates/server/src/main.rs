mod bootstrap;
mod chat;
mod conversation;
mod health;

use std::time::Duration;

use anyhow::Result;
use axum::{http::HeaderValue, Router};
use shopdesk_core::config::{AppConfig, LoadOptions};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::warn;

use crate::bootstrap::Application;

fn init_logging(config: &AppConfig) {
    use shopdesk_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        model = app.agent.model(),
        "shopdesk-server listening"
    );

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let pool = app.db_pool.clone();
    axum::serve(listener, routes(&app)).with_graceful_shutdown(wait_for_shutdown()).await?;

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "shopdesk-server stopping"
    );
    if tokio::time::timeout(grace, pool.close()).await.is_err() {
        warn!(
            event_name = "system.server.pool_close_timeout",
            correlation_id = "shutdown",
            grace_secs = grace.as_secs(),
            "database pool did not close within the grace period"
        );
    }

    Ok(())
}

fn routes(app: &Application) -> Router {
    chat::router(app.conversations.clone())
        .merge(health::router(app.db_pool.clone()))
        .layer(cors_layer(&app.config.server.cors_allowed_origins))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(
                    event_name = "system.server.cors_origin_invalid",
                    correlation_id = "bootstrap",
                    origin = %origin,
                    "ignoring cors origin that is not a valid header value"
                );
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(
            event_name = "system.server.signal_error",
            correlation_id = "shutdown",
            error = %error,
            "failed to listen for ctrl-c; shutting down"
        );
    }
}
