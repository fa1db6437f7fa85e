mod book;
mod chat;
mod config;
mod credentials;
mod errors;
mod extract;
mod llm_client;
mod models;
mod routes;
mod state;
#[cfg(test)]
mod test_support;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::book::studio::BookStudio;
use crate::book::workflow::BookWorkflow;
use crate::chat::session::ChatSession;
use crate::config::Config;
use crate::credentials::KeyStore;
use crate::llm_client::GeminiClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Magic Color Creator API v{}", env!("CARGO_PKG_VERSION"));

    let keys = Arc::new(KeyStore::new(config.gemini_api_key.clone()));
    if config.gemini_api_key.is_none() {
        warn!("No GEMINI_API_KEY set; the first book will request key selection");
    }

    let llm = Arc::new(GeminiClient::new(&config.gemini_base_url, keys.clone())?);
    info!(
        "Gemini client initialized (text: {}, image: {})",
        llm_client::TEXT_MODEL,
        llm_client::IMAGE_MODEL
    );

    let workflow = Arc::new(BookWorkflow::new(
        llm.clone(),
        keys.clone(),
        Arc::new(BookStudio::new()),
    ));

    let state = AppState {
        llm,
        keys,
        workflow,
        chat: Arc::new(RwLock::new(ChatSession::new())),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web front end has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
