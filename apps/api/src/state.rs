use std::sync::Arc;

use crate::config::Config;
use crate::form::FormRegistry;
use crate::summary::SummaryService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Pluggable summary backend. Default: LlmSummaryService. Swap via SUMMARY_SERVICE_URL.
    pub summarizer: Arc<dyn SummaryService>,
    pub forms: FormRegistry,
}

impl AppState {
    pub fn new(config: Config, summarizer: Arc<dyn SummaryService>) -> Self {
        Self {
            config,
            summarizer,
            forms: FormRegistry::default(),
        }
    }
}
