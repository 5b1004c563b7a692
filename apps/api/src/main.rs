mod config;
mod db;
mod embedding;
mod errors;
mod llm_client;
mod models;
mod patterns;
mod routes;
mod state;
mod suggestions;
mod synthesis;
mod telemetry;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::embedding::client::EmbeddingClient;
use crate::embedding::index::RestVectorIndex;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::synthesis::pipeline::MultiStageSynthesis;

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

    info!("Starting Cadence API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone());
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Initialize embedding provider and vector index
    let embedder = Arc::new(EmbeddingClient::new(config.openai_api_key.clone()));
    let index = Arc::new(RestVectorIndex::new(
        config.vector_index_url.clone(),
        config.vector_index_token.clone(),
        Box::new(EmbeddingClient::new(config.openai_api_key.clone())),
    ));
    info!(
        "Vector index client initialized (embedding model: {})",
        embedding::client::EMBEDDING_MODEL
    );

    // Initialize the synthesis pipeline (multi-stage with retrieval)
    let synthesis = Arc::new(MultiStageSynthesis::new(llm, index.clone()));

    // Build app state
    let state = AppState {
        db,
        embedder,
        index,
        synthesis,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
