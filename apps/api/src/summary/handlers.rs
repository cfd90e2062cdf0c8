use axum::{
    body::Body,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use futures::TryStreamExt;
use serde::Deserialize;
use tracing::{error, info};

use crate::errors::AppError;
use crate::form::EMPTY_CV_MESSAGE;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SummaryRequest {
    pub cv_text: String,
}

/// POST /api/v1/cv/summary
///
/// Streams the summary back as `text/plain` while it is being generated.
/// A blank CV is rejected before any call to the summary service.
pub async fn handle_summary(
    State(state): State<AppState>,
    Json(request): Json<SummaryRequest>,
) -> Result<Response, AppError> {
    if request.cv_text.trim().is_empty() {
        return Err(AppError::Validation(EMPTY_CV_MESSAGE.to_string()));
    }

    info!("Streaming summary for {} chars of CV text", request.cv_text.len());
    let stream = state.summarizer.open_stream(&request.cv_text).await?;
    let body = Body::from_stream(
        stream.inspect_err(|e| error!("Summary stream failed mid-response: {e}")),
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response())
}
