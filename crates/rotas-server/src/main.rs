//! Main entry point for the rotas API server.
//!
//! Loads configuration, initializes logging, seeds the application state
//! and serves the HTTP API until shutdown.

use std::sync::Arc;

use rotas_server::model::{AppState, Configuration};
use rotas_server::startup;
use tracing::info;

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let configuration = Configuration::new();

    let logging_config = configuration.logging_config();
    let _logging_guard = startup::init_logging(&logging_config)?;

    let address = configuration.server_address();
    let port = configuration.server_port();
    let context_path = configuration.context_path();

    let app_state = Arc::new(AppState::from_configuration(&configuration));
    info!(
        tokens = app_state.tokens.len(),
        timeline_limit = app_state.timeline_limit,
        site_offset = app_state.site_offset.local_minus_utc(),
        "application state initialized"
    );

    info!("Starting rotas API server on {}:{}", address, port);
    let server = startup::api_server(app_state, context_path, address, port)?;
    server.await?;

    info!("rotas server shutdown complete");
    Ok(())
}
