//! Submission controller for one form instance.
//!
//! Every state change is published on a `watch` channel; subscribers always
//! see the latest state and may skip intermediate ones. At most one
//! submission streams into the summary at a time: a new `submit` cancels the
//! in-flight one and waits for its task to finish before clearing state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::extraction::{extract_document, ExtractedText, ExtractionError, UploadedDocument};
use crate::form::state::{FormState, SubmitRejected};
use crate::summary::decoder::Utf8ChunkDecoder;
use crate::summary::{SummaryError, SummaryService};

struct InFlight {
    submission: u64,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl InFlight {
    async fn cancel(self) {
        self.token.cancel();
        if let Err(e) = self.task.await {
            warn!("Submission #{} task ended abnormally: {}", self.submission, e);
        }
    }
}

pub struct SummaryForm {
    id: Uuid,
    created_at: DateTime<Utc>,
    state: watch::Sender<FormState>,
    summarizer: Arc<dyn SummaryService>,
    in_flight: Mutex<Option<InFlight>>,
}

impl SummaryForm {
    pub fn new(summarizer: Arc<dyn SummaryService>) -> Arc<Self> {
        let (state, _) = watch::channel(FormState::default());
        Arc::new(Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            state,
            summarizer,
            in_flight: Mutex::new(None),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn snapshot(&self) -> FormState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FormState> {
        self.state.subscribe()
    }

    pub fn set_cv_text(&self, text: String) {
        self.state.send_modify(|s| s.set_cv_text(text));
    }

    /// Extracts the document and, on success, replaces the CV text with it.
    /// On failure the previous CV text stays and the error slot is set.
    pub async fn load_document(
        &self,
        document: UploadedDocument,
    ) -> Result<ExtractedText, ExtractionError> {
        let file_name = document.name.clone();
        self.state.send_modify(|s| s.select_file(file_name));

        let result = extract_document(document).await;
        self.state.send_modify(|s| s.apply_extraction(&result));
        result
    }

    /// Starts a new submission, cancelling any in-flight one first.
    /// Returns the submission number once streaming has been spawned.
    pub async fn submit(self: &Arc<Self>) -> Result<u64, SubmitRejected> {
        let mut in_flight = self.in_flight.lock().await;

        if let Some(previous) = in_flight.take() {
            info!(
                "Form {}: cancelling submission #{} before resubmitting",
                self.id, previous.submission
            );
            previous.cancel().await;
        }

        let mut begun = Err(SubmitRejected::EmptyCv);
        self.state.send_modify(|s| {
            begun = s
                .begin_submission()
                .map(|submission| (submission, s.cv_text.clone()));
        });

        let (submission, cv_text) = match begun {
            Ok(started) => started,
            Err(rejected) => {
                info!("Form {}: submission rejected: {}", self.id, rejected);
                return Err(rejected);
            }
        };

        let token = CancellationToken::new();
        let form = Arc::clone(self);
        let task_token = token.clone();
        let task = tokio::spawn(async move {
            form.run_submission(submission, cv_text, task_token).await;
        });

        *in_flight = Some(InFlight {
            submission,
            token,
            task,
        });
        Ok(submission)
    }

    /// Waits until the current submission, if any, has finished.
    #[cfg(test)]
    pub async fn wait_idle(&self) {
        let mut in_flight = self.in_flight.lock().await;
        if let Some(current) = in_flight.take() {
            if let Err(e) = current.task.await {
                warn!(
                    "Submission #{} task ended abnormally: {}",
                    current.submission, e
                );
            }
        }
    }

    /// Cancels any in-flight submission. Called when the form goes away.
    pub async fn close(&self) {
        if let Some(current) = self.in_flight.lock().await.take() {
            current.cancel().await;
        }
        debug!("Form {} closed", self.id);
    }

    async fn run_submission(&self, submission: u64, cv_text: String, token: CancellationToken) {
        info!(
            "Form {}: submission #{} started ({} chars)",
            self.id,
            submission,
            cv_text.len()
        );

        let outcome = tokio::select! {
            _ = token.cancelled() => None,
            result = self.stream_summary(submission, &cv_text) => Some(result),
        };

        match outcome {
            None => {
                info!("Form {}: submission #{} cancelled", self.id, submission);
                self.state
                    .send_modify(|s| s.abandon_submission(submission));
            }
            Some(result) => {
                match &result {
                    Ok(()) => info!("Form {}: submission #{} completed", self.id, submission),
                    Err(e) => error!(
                        "Form {}: submission #{} failed: {}",
                        self.id, submission, e
                    ),
                }
                self.state
                    .send_modify(|s| s.finish_submission(submission, &result));
            }
        }
    }

    async fn stream_summary(&self, submission: u64, cv_text: &str) -> Result<(), SummaryError> {
        let mut stream = self.summarizer.open_stream(cv_text).await?;
        let mut decoder = Utf8ChunkDecoder::default();
        let mut chunks = 0usize;

        while let Some(chunk) = stream.next().await {
            let text = decoder.decode(&chunk?);
            chunks += 1;
            if !text.is_empty() {
                self.state.send_modify(|s| s.append_summary(submission, &text));
            }
        }

        let tail = decoder.finish();
        if !tail.is_empty() {
            self.state.send_modify(|s| s.append_summary(submission, &tail));
        }

        debug!("Form {}: summary stream ended after {} chunk(s)", self.id, chunks);
        Ok(())
    }
}
