//! # Chat Coordinator
//!
//! Entry point that initializes:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - Persistent store and connection registry backends
//! - HTTP/WebSocket server

use anyhow::Result;
use tracing::info;

use chat_coordinator::config::Settings;
use chat_coordinator::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for structured logging
    chat_coordinator::telemetry::init_tracing();

    info!("Starting Chat Coordinator...");

    // Load configuration from environment and config files
    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        storage = ?settings.storage.backend,
        presence = ?settings.presence.backend,
        "Configuration loaded"
    );

    // Build and run the application
    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}
