//! The state of one CV summary form and its transitions.
//!
//! Pure data: no I/O, no channels. `SummaryForm` drives these transitions and
//! publishes the result.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::extraction::{ExtractedText, ExtractionError, EXTRACTION_FAILED_MESSAGE};
use crate::summary::{SummaryError, SUMMARY_FAILED_MESSAGE};

pub const EMPTY_CV_MESSAGE: &str =
    "Please upload or extract your CV before generating a summary.";

const ERROR_TITLE: &str = "Error";
const SUMMARY_PLACEHOLDER: &str = "Your summary will appear here...";
const SUBMIT_LABEL: &str = "Generate Summary";
const SUBMIT_LABEL_BUSY: &str = "Generating...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Idle,
    Submitting,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBanner {
    pub title: String,
    pub description: String,
}

impl ErrorBanner {
    fn new(description: &str) -> Self {
        Self {
            title: ERROR_TITLE.to_string(),
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitRejected {
    #[error("{}", EMPTY_CV_MESSAGE)]
    EmptyCv,
}

#[derive(Debug, Clone, Serialize)]
pub struct FormState {
    pub file_name: Option<String>,
    pub cv_text: String,
    pub summary: String,
    pub error: Option<ErrorBanner>,
    pub status: SubmissionStatus,
    /// Number of submissions that passed the empty-CV guard.
    pub submission: u64,
    pub updated_at: DateTime<Utc>,
}

/// What a client renders for the current state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormView {
    pub selected_file: Option<String>,
    pub submit_label: &'static str,
    pub submit_enabled: bool,
    pub summary: String,
    pub summary_is_placeholder: bool,
    pub error: Option<ErrorBanner>,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            file_name: None,
            cv_text: String::new(),
            summary: String::new(),
            error: None,
            status: SubmissionStatus::Idle,
            submission: 0,
            updated_at: Utc::now(),
        }
    }
}

impl FormState {
    pub fn is_submitting(&self) -> bool {
        self.status == SubmissionStatus::Submitting
    }

    pub fn set_cv_text(&mut self, text: impl Into<String>) {
        self.cv_text = text.into();
        self.touch();
    }

    /// A file was picked; extraction is about to start.
    pub fn select_file(&mut self, name: impl Into<String>) {
        self.file_name = Some(name.into());
        self.error = None;
        self.touch();
    }

    /// A failed extraction keeps whatever CV text was there before.
    pub fn apply_extraction(&mut self, result: &Result<ExtractedText, ExtractionError>) {
        match result {
            Ok(extracted) => self.cv_text = extracted.text.clone(),
            Err(_) => self.error = Some(ErrorBanner::new(EXTRACTION_FAILED_MESSAGE)),
        }
        self.touch();
    }

    /// Clears the previous error and summary, then checks the CV guard.
    /// On success the form is `Submitting` and the submission number is returned.
    pub fn begin_submission(&mut self) -> Result<u64, SubmitRejected> {
        self.error = None;
        self.summary.clear();
        self.touch();

        if self.cv_text.trim().is_empty() {
            self.error = Some(ErrorBanner::new(EMPTY_CV_MESSAGE));
            return Err(SubmitRejected::EmptyCv);
        }

        self.submission += 1;
        self.status = SubmissionStatus::Submitting;
        Ok(self.submission)
    }

    /// The transitions below take the submission number they belong to and
    /// are ignored once a newer submission has begun.
    fn is_current(&self, submission: u64) -> bool {
        self.submission == submission
    }

    pub fn append_summary(&mut self, submission: u64, text: &str) {
        if !self.is_current(submission) {
            return;
        }
        self.summary.push_str(text);
        self.touch();
    }

    /// Back to `Idle`. A failure keeps the partial summary and sets the error.
    pub fn finish_submission(&mut self, submission: u64, outcome: &Result<(), SummaryError>) {
        if !self.is_current(submission) {
            return;
        }
        self.status = SubmissionStatus::Idle;
        if outcome.is_err() {
            self.error = Some(ErrorBanner::new(SUMMARY_FAILED_MESSAGE));
        }
        self.touch();
    }

    /// Back to `Idle` after a cancellation; summary and error are left as is.
    pub fn abandon_submission(&mut self, submission: u64) {
        if !self.is_current(submission) {
            return;
        }
        self.status = SubmissionStatus::Idle;
        self.touch();
    }

    pub fn view(&self) -> FormView {
        let submitting = self.is_submitting();
        let summary_is_placeholder = self.summary.is_empty();

        FormView {
            selected_file: self
                .file_name
                .as_ref()
                .map(|name| format!("Selected file:{name}")),
            submit_label: if submitting {
                SUBMIT_LABEL_BUSY
            } else {
                SUBMIT_LABEL
            },
            submit_enabled: !submitting,
            summary: if summary_is_placeholder {
                SUMMARY_PLACEHOLDER.to_string()
            } else {
                self.summary.clone()
            },
            summary_is_placeholder,
            error: self.error.clone(),
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
