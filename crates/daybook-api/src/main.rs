//! Daybook API Server
//!
//! Loads configuration, connects to SurrealDB and serves the REST API.

use anyhow::Context;
use daybook_api::auth::SurrealUserRepository;
use daybook_api::{create_router, shutdown_signal, state::AppState};
use daybook_core::config::{AppConfig, LoggingConfig};
use daybook_store::SurrealDbStore;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{level},daybook_api={level},tower_http=debug",
            level = logging.level
        ))
    });

    if logging.json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; real environment variables still apply
    let dotenv = dotenvy::dotenv();

    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.logging);

    if let Err(e) = dotenv {
        tracing::debug!(error = %e, "no .env file loaded");
    }

    let store = SurrealDbStore::connect(&config.database)
        .await
        .context("failed to connect to SurrealDB")?;
    store
        .init_schema()
        .await
        .context("failed to initialize schema")?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let users = Arc::new(SurrealUserRepository::new(store));
    let state = Arc::new(AppState::new(config, users));

    let app = create_router(state.clone());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Daybook API Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);
    tracing::info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state, tokio::signal::ctrl_c()))
        .await?;

    Ok(())
}
