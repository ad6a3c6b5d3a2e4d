// src/main.rs
// Aura backend entry point.

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use aura_backend::api::http::router::create_router;
use aura_backend::config::AppConfig;
use aura_backend::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();
    if let Err(e) = config.validate() {
        error!("FATAL: {}", e);
        eprintln!("================================================================");
        eprintln!("AURA BACKEND: FATAL ERROR - MISSING ENVIRONMENT VARIABLES");
        eprintln!("{}", e);
        eprintln!("Set the variables above and restart the service.");
        eprintln!("================================================================");
        std::process::exit(1);
    }

    let bind_address = config.bind_address();
    let state = Arc::new(AppState::new(config).await?);
    let app = create_router(state);

    info!("Aura backend listening on {}", bind_address);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
