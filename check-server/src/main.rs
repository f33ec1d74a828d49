//! PhishGuard HTTP Server
//!
//! Thin HTTP layer over the evaluation core.
//!
//! # Routes
//!
//! ```text
//! POST /check_url   { "url": "..." } -> { url, is_phishing, confidence, pending }
//! GET  /health      liveness + cache size
//! ```

mod config;
mod error;
mod handlers;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use phishguard_core::logic::cache::ResultCache;
use phishguard_core::logic::config::EvaluatorConfig;
use phishguard_core::logic::evaluator::Evaluator;
use phishguard_core::logic::features::FeatureSchema;
use phishguard_core::logic::model::OnnxClassifier;
use phishguard_core::logic::render::HttpRenderer;
use phishguard_core::logic::reputation::HttpLookups;

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; core `log` records are forwarded into tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "phishguard_server=debug,phishguard_core=info,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    tracing::info!("PhishGuard server starting ({})...", config.environment);

    let schema = FeatureSchema::by_name(&config.schema)
        .with_context(|| format!("Unknown feature schema '{}'", config.schema))?;

    // A model trained on another layout is fatal here, before any request
    let classifier = OnnxClassifier::load(Path::new(&config.model_path), schema)
        .context("Failed to load classifier")?;
    let metadata = classifier.metadata();
    tracing::info!(
        "Classifier: {} trained on {} v{} ({} features), trained at {}",
        if metadata.model_type.is_empty() { "unknown model" } else { metadata.model_type.as_str() },
        metadata.layout.schema,
        metadata.layout.version,
        metadata.layout.feature_count,
        metadata
            .trained_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "unknown".to_string())
    );

    let evaluator_config = EvaluatorConfig::from_env();
    let evaluator = Evaluator::new(
        Arc::new(ResultCache::new()),
        Arc::new(HttpRenderer::new()),
        Arc::new(HttpLookups::new(evaluator_config.reputation.clone())),
        Arc::new(classifier),
        evaluator_config,
    );

    // Build application state
    let state = AppState {
        evaluator: Arc::new(evaluator),
        config: config.clone(),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub evaluator: Arc<Evaluator>,
    pub config: config::Config,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    if state.config.is_production() {
        tracing::info!("Running in production mode");
    }

    Router::new()
        .route("/health", get(handlers::health::check))
        .route("/check_url", post(handlers::check::check_url))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
