mod config;
mod errors;
mod extraction;
mod form;
mod llm_client;
mod routes;
mod state;
mod summary;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, SummaryBackend};
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::summary::{LlmSummaryService, RemoteSummaryService, SummaryService};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on a missing summary backend)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CV Summary API v{}", env!("CARGO_PKG_VERSION"));

    let summarizer = build_summarizer(&config)?;
    let state = AppState::new(config.clone(), summarizer);

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict CORS to the form's origin once it is hosted

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Picks the summary backend from config.
fn build_summarizer(config: &Config) -> Result<Arc<dyn SummaryService>> {
    Ok(match &config.summary_backend {
        SummaryBackend::Anthropic { api_key } => {
            let llm = LlmClient::new(api_key.clone())?;
            info!("LLM summary backend initialized (model: {})", llm_client::MODEL);
            Arc::new(LlmSummaryService(llm))
        }
        SummaryBackend::Remote { url } => {
            info!("Remote summary backend initialized ({url})");
            Arc::new(RemoteSummaryService::new(url.clone())?)
        }
    })
}
