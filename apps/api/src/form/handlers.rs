//! Axum route handlers for the form API.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::WatchStream;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::upload::read_pdf_upload;
use crate::form::{FormState, FormView, SummaryForm};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct FormSnapshot {
    pub form_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub state: FormState,
    pub view: FormView,
}

impl FormSnapshot {
    fn from_parts(form_id: Uuid, created_at: DateTime<Utc>, state: FormState) -> Self {
        let view = state.view();
        Self {
            form_id,
            created_at,
            state,
            view,
        }
    }

    pub fn of(form: &SummaryForm) -> Self {
        Self::from_parts(form.id(), form.created_at(), form.snapshot())
    }
}

#[derive(Debug, Deserialize)]
pub struct CvTextRequest {
    pub cv_text: String,
}

fn find_form(state: &AppState, id: Uuid) -> Result<Arc<SummaryForm>, AppError> {
    state
        .forms
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("Form {id} not found")))
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/forms
pub async fn handle_create_form(
    State(state): State<AppState>,
) -> (StatusCode, Json<FormSnapshot>) {
    let form = SummaryForm::new(state.summarizer.clone());
    let snapshot = FormSnapshot::of(&form);
    state.forms.insert(form);
    info!("Form {} created ({} open)", snapshot.form_id, state.forms.len());
    (StatusCode::CREATED, Json(snapshot))
}

/// GET /api/v1/forms/:id
pub async fn handle_get_form(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FormSnapshot>, AppError> {
    let form = find_form(&state, id)?;
    Ok(Json(FormSnapshot::of(&form)))
}

/// PUT /api/v1/forms/:id/cv
pub async fn handle_set_cv(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CvTextRequest>,
) -> Result<Json<FormSnapshot>, AppError> {
    let form = find_form(&state, id)?;
    form.set_cv_text(request.cv_text);
    Ok(Json(FormSnapshot::of(&form)))
}

/// POST /api/v1/forms/:id/document
///
/// Extracts the uploaded PDF into the form's CV text. On failure the error is
/// also recorded in the form state and the previous CV text is kept.
pub async fn handle_upload_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<FormSnapshot>, AppError> {
    let form = find_form(&state, id)?;
    let document = read_pdf_upload(multipart).await?;
    form.load_document(document).await?;
    Ok(Json(FormSnapshot::of(&form)))
}

/// POST /api/v1/forms/:id/submit
///
/// Starts streaming a summary into the form, cancelling any in-flight one.
/// Progress is observed through GET /api/v1/forms/:id or the events stream.
pub async fn handle_submit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<FormSnapshot>), AppError> {
    let form = find_form(&state, id)?;
    form.submit()
        .await
        .map_err(|rejected| AppError::Validation(rejected.to_string()))?;
    Ok((StatusCode::ACCEPTED, Json(FormSnapshot::of(&form))))
}

/// GET /api/v1/forms/:id/events
///
/// Server-sent events, one `state` event per published snapshot. The stream
/// ends when the form is deleted.
pub async fn handle_form_events(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let form = find_form(&state, id)?;
    let form_id = form.id();
    let created_at = form.created_at();

    let events = WatchStream::new(form.subscribe()).filter_map(move |state| async move {
        let snapshot = FormSnapshot::from_parts(form_id, created_at, state);
        match Event::default().event("state").json_data(&snapshot) {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                warn!("Dropping unserializable snapshot for form {}: {}", form_id, e);
                None
            }
        }
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// DELETE /api/v1/forms/:id
pub async fn handle_delete_form(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let form = state
        .forms
        .remove(&id)
        .ok_or_else(|| AppError::NotFound(format!("Form {id} not found")))?;
    form.close().await;
    info!("Form {} deleted", id);
    Ok(StatusCode::NO_CONTENT)
}
