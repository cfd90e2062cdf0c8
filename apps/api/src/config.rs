use anyhow::{bail, Context, Result};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Where CV summaries come from.
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryBackend {
    /// Anthropic Messages API, streamed through `LlmClient`.
    Anthropic { api_key: String },
    /// Any HTTP endpoint that answers `POST {"cv": ...}` with a streamed text body.
    Remote { url: String },
}

/// Application configuration loaded from environment variables.
/// Fails at startup if no summary backend can be configured.
#[derive(Debug, Clone)]
pub struct Config {
    pub summary_backend: SummaryBackend,
    pub port: u16,
    pub max_upload_bytes: usize,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let summary_backend = match (
            non_empty("SUMMARY_SERVICE_URL"),
            non_empty("ANTHROPIC_API_KEY"),
        ) {
            (Some(url), _) => SummaryBackend::Remote { url },
            (None, Some(api_key)) => SummaryBackend::Anthropic { api_key },
            (None, None) => bail!(
                "Required environment variable 'ANTHROPIC_API_KEY' is not set \
                 (or set 'SUMMARY_SERVICE_URL' to use a remote summary service)"
            ),
        };

        let port = match non_empty("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            None => DEFAULT_PORT,
        };

        let max_upload_bytes = match non_empty("MAX_UPLOAD_BYTES") {
            Some(raw) => raw
                .parse::<usize>()
                .context("MAX_UPLOAD_BYTES must be a positive integer")?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Config {
            summary_backend,
            port,
            max_upload_bytes,
            rust_log: non_empty("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}
