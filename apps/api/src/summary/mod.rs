//! Summary requester.
//!
//! `SummaryService` is the seam to whatever produces the summary. It returns
//! a byte stream that callers decode incrementally with `Utf8ChunkDecoder`.
//!
//! `AppState` holds an `Arc<dyn SummaryService>`, chosen at startup from config.

pub mod decoder;
pub mod handlers;
pub mod prompts;

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt, TryStreamExt};
use reqwest::Client;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::llm_client::{LlmClient, LlmError};

/// Shown to the user when a summary request fails. Details go to the log.
pub const SUMMARY_FAILED_MESSAGE: &str =
    "An error occurred while generating the summary. Please try again.";

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Summary service returned status {status}: {message}")]
    Remote { status: u16, message: String },
}

pub type SummaryStream = Pin<Box<dyn Stream<Item = Result<Bytes, SummaryError>> + Send>>;

/// Opens a streamed summary of a CV. Implement this to swap backends without
/// touching the controller or the handlers.
#[async_trait]
pub trait SummaryService: Send + Sync {
    async fn open_stream(&self, cv_text: &str) -> Result<SummaryStream, SummaryError>;
}

// ────────────────────────────────────────────────────────────────────────────
// LlmSummaryService — default backend
// ────────────────────────────────────────────────────────────────────────────

pub struct LlmSummaryService(pub LlmClient);

#[async_trait]
impl SummaryService for LlmSummaryService {
    async fn open_stream(&self, cv_text: &str) -> Result<SummaryStream, SummaryError> {
        let prompt = prompts::summary_prompt(cv_text);
        let deltas = self.0.stream(&prompt, &prompts::summary_system()).await?;

        Ok(deltas
            .map_ok(Bytes::from)
            .map_err(SummaryError::from)
            .boxed())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// RemoteSummaryService — external HTTP endpoint returning a text body stream
// ────────────────────────────────────────────────────────────────────────────

pub struct RemoteSummaryService {
    client: Client,
    url: String,
}

impl RemoteSummaryService {
    pub fn new(url: String) -> Result<Self, SummaryError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()?,
            url,
        })
    }
}

#[async_trait]
impl SummaryService for RemoteSummaryService {
    async fn open_stream(&self, cv_text: &str) -> Result<SummaryStream, SummaryError> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "cv": cv_text }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SummaryError::Remote {
                status: status.as_u16(),
                message,
            });
        }

        debug!("Remote summary stream opened: {}", self.url);
        Ok(response.bytes_stream().map_err(SummaryError::from).boxed())
    }
}
