mod binder;
mod card_source;
mod config;
mod db;
mod errors;
mod layout;
mod models;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::binder::persistence::{BinderRepository, MemoryBinderRepository, PgBinderRepository};
use crate::binder::service::{BinderDefaults, BinderService};
use crate::card_source::HttpCardSource;
use crate::config::{Config, StorageBackend};
use crate::db::create_pool;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Binder API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize binder storage
    let repo: Arc<dyn BinderRepository> = match &config.storage {
        StorageBackend::Postgres { database_url } => {
            Arc::new(PgBinderRepository::new(create_pool(database_url).await?))
        }
        StorageBackend::Memory => {
            warn!("Using in-memory binder storage; binders are lost on restart");
            Arc::new(MemoryBinderRepository::new())
        }
    };

    // Initialize card catalogue client
    let cards = Arc::new(HttpCardSource::new(
        &config.card_api_url,
        config.card_api_key.clone(),
    )?);
    info!("Card source initialized ({})", config.card_api_url);

    let binders = BinderService::new(
        repo,
        cards,
        BinderDefaults {
            grid_size: config.default_grid_size.clone(),
            min_pages: config.default_min_pages,
            max_pages: config.default_max_pages,
        },
    );
    info!(
        "Binder defaults: grid {} pages {}..={}",
        config.default_grid_size, config.default_min_pages, config.default_max_pages
    );

    let state = AppState { binders };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict CORS origins once the web client has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
