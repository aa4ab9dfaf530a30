//! vortex-gateway server entry point.
//!
//! Starts the Axum HTTP server with the webhook, REST and WebSocket endpoints.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use vortex_gateway::api;
use vortex_gateway::app_state::AppState;
use vortex_gateway::config::{GatewayConfig, LogFormat};
use vortex_gateway::domain::EventBus;
use vortex_gateway::persistence::{MemoryStore, PostgresStore, VerificationStore};
use vortex_gateway::service::VerificationService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = GatewayConfig::from_env().context("loading configuration")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    tracing::info!(
        addr = %config.listen_addr,
        persistence = config.persistence_enabled,
        packages = config.catalog.list().len(),
        "starting vortex-gateway"
    );

    // Build persistence layer
    let store: Arc<dyn VerificationStore> = if config.persistence_enabled {
        Arc::new(
            PostgresStore::connect(&config)
                .await
                .context("connecting to postgres")?,
        )
    } else {
        tracing::warn!("persistence disabled; using in-memory store");
        Arc::new(MemoryStore::new())
    };

    // Build service layer
    let event_bus = EventBus::new(config.event_bus_capacity);
    let service = VerificationService::new(store, Arc::new(config.catalog.clone()), event_bus)
        .with_whatsapp_admin_number(config.whatsapp_admin_number.clone());

    // Build router
    let app = api::build_app(
        AppState::new(service),
        Duration::from_secs(config.request_timeout_secs),
    );

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
