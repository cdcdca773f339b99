mod handlers;
mod metrics;
mod routes;

use anyhow::{Context, Result};
use assessor_common::config::EngineConfig;
use assessor_engine::config::LanguageConfigManager;
use assessor_engine::engine::PistonClient;
use assessor_engine::executor::Orchestrator;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::metrics::Metrics;

pub struct AppState {
    pub orchestrator: Orchestrator,
    pub config: EngineConfig,
    pub metrics: Metrics,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new().merge(routes::routes()).with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!("Assessor API booting...");

    let config = EngineConfig::from_env().context("Invalid engine configuration")?;
    let languages = LanguageConfigManager::load_or_default(&config.languages_config)?;
    info!(languages = ?languages.list_languages(), "Runtime mapping loaded");

    let client = PistonClient::from_config(&config, languages)?;
    let orchestrator = Orchestrator::new(Arc::new(client), config.execution_timeout());

    let state = Arc::new(AppState {
        orchestrator,
        metrics: Metrics::new()?,
        config: config.clone(),
    });

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!(
        addr = %config.bind_addr,
        execution_api = %config.execution_api_url,
        timeout_ms = config.execution_timeout_ms,
        "HTTP server listening"
    );

    axum::serve(listener, app(state)).await.context("Server error")?;
    Ok(())
}
