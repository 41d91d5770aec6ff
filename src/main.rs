//! Log Ingestor Service
//!
//! Ingests structured log records, tags each as anomaly or normal via a
//! keyword classifier, persists them, and serves filtered queries and
//! deletions over HTTP.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                    LOG INGESTOR                        │
//! ├────────────────────────────────────────────────────────┤
//! │  ┌──────────┐  ┌────────────┐  ┌───────────────────┐  │
//! │  │  API     │  │  Keyword   │  │  Filter Builder   │  │
//! │  │  (Axum)  │  │ Classifier │  │  (ad-hoc params)  │  │
//! │  └────┬─────┘  └─────┬──────┘  └─────────┬─────────┘  │
//! │       └──────────────┼───────────────────┘            │
//! │                      ▼                                 │
//! │               ┌─────────────┐                          │
//! │               │ PostgreSQL  │                          │
//! │               └─────────────┘                          │
//! └────────────────────────────────────────────────────────┘
//! ```

mod classifier;
mod config;
mod db;
mod error;
mod filter;
mod handlers;
mod models;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use classifier::LogClassifier;
use db::Backend;
pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "log_ingestor=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    tracing::info!("Log ingestor starting...");

    // Reach the database; a failure degrades the service instead of
    // aborting startup
    let backend = db::connect(config.database_url.as_deref()).await;
    match &backend {
        Backend::Connected(_) => tracing::info!("Database connected successfully"),
        Backend::Degraded(reason) => {
            tracing::warn!("Starting degraded, database unavailable: {}", reason);
        }
    }

    // Build application state
    let state = AppState {
        backend,
        classifier: Arc::new(LogClassifier::default()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub backend: Backend,
    pub classifier: Arc<LogClassifier>,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::check))
        .route("/ingest", post(handlers::logs::ingest))
        .route("/logs", get(handlers::logs::list))
        .route("/logs/:id", delete(handlers::logs::delete))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
