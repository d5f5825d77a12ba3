use std::sync::Arc;

use clap::Parser;
use flagtree::{
    api::{self, AppState},
    config::{CliArgs, Config},
    telemetry, InMemoryStore,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliArgs::parse();
    let config = Config::load(&cli);

    telemetry::init_tracing(&config.logging);
    let metrics = telemetry::init_metrics();

    let store = Arc::new(InMemoryStore::with_policy(config.store.duplicate_policy));
    let app = api::router(AppState::new(store, metrics));

    let addr = config.listen_addr()?;
    tracing::info!(%addr, duplicate_policy = %config.store.duplicate_policy, "API listening");

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
