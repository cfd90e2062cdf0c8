pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::extraction::handlers as extraction;
use crate::form::handlers as form;
use crate::state::AppState;
use crate::summary::handlers as summary;

pub fn build_router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    Router::new()
        .route("/health", get(health::health_handler))
        // One-shot CV API
        .route("/api/v1/cv/extract", post(extraction::handle_extract))
        .route("/api/v1/cv/summary", post(summary::handle_summary))
        // Form API
        .route("/api/v1/forms", post(form::handle_create_form))
        .route(
            "/api/v1/forms/:id",
            get(form::handle_get_form).delete(form::handle_delete_form),
        )
        .route("/api/v1/forms/:id/cv", put(form::handle_set_cv))
        .route(
            "/api/v1/forms/:id/document",
            post(form::handle_upload_document),
        )
        .route("/api/v1/forms/:id/submit", post(form::handle_submit))
        .route("/api/v1/forms/:id/events", get(form::handle_form_events))
        .layer(body_limit)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use futures::StreamExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::config::{Config, SummaryBackend};
    use crate::extraction::pdf::test_support::build_pdf;
    use crate::summary::testing::ScriptedSummary;
    use crate::summary::SummaryService;

    const BOUNDARY: &str = "cv-summary-test-boundary";

    fn test_state(summarizer: Arc<dyn SummaryService>, max_upload_bytes: usize) -> AppState {
        let config = Config {
            summary_backend: SummaryBackend::Remote {
                url: "http://127.0.0.1:9/unused".to_string(),
            },
            port: 0,
            max_upload_bytes,
            rust_log: "info".to_string(),
        };
        AppState::new(config, summarizer)
    }

    fn multipart_request(uri: &str, file_name: &str, content_type: &str, content: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create_form(state: &AppState) -> Uuid {
        let response = build_router(state.clone())
            .oneshot(empty_request("POST", "/api/v1/forms"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        body["form_id"].as_str().unwrap().parse().unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let state = test_state(Arc::new(ScriptedSummary::default()), 1024);
        let response = build_router(state)
            .oneshot(empty_request("GET", "/health"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_extract_two_page_pdf() {
        let state = test_state(Arc::new(ScriptedSummary::default()), 1024 * 1024);
        let pdf = build_pdf(&[&["Hello"], &["World"]]);

        let response = build_router(state)
            .oneshot(multipart_request(
                "/api/v1/cv/extract",
                "cv.pdf",
                "application/pdf",
                &pdf,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["file_name"], "cv.pdf");
        assert_eq!(body["text"], "Hello\nWorld\n");
        assert_eq!(body["page_count"], 2);
    }

    #[tokio::test]
    async fn test_extract_rejects_non_pdf() {
        let state = test_state(Arc::new(ScriptedSummary::default()), 1024 * 1024);
        let response = build_router(state)
            .oneshot(multipart_request(
                "/api/v1/cv/extract",
                "cv.docx",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                b"PK\x03\x04",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_extract_corrupt_pdf_is_unprocessable() {
        let state = test_state(Arc::new(ScriptedSummary::default()), 1024 * 1024);
        let response = build_router(state)
            .oneshot(multipart_request(
                "/api/v1/cv/extract",
                "cv.pdf",
                "application/pdf",
                b"this is not a pdf",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "EXTRACTION_FAILED");
        assert_eq!(
            body["error"]["message"],
            "Failed to extract text from the PDF. Please try again."
        );
    }

    #[tokio::test]
    async fn test_extract_over_body_limit() {
        let state = test_state(Arc::new(ScriptedSummary::default()), 64);
        let pdf = build_pdf(&[&["Hello"], &["World"]]);
        let response = build_router(state)
            .oneshot(multipart_request(
                "/api/v1/cv/extract",
                "cv.pdf",
                "application/pdf",
                &pdf,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_summary_streams_text_body() {
        let service = Arc::new(ScriptedSummary::chunks(&[b"Experienced ", b"engineer."]));
        let state = test_state(service.clone(), 1024);

        let response = build_router(state)
            .oneshot(json_request(
                "POST",
                "/api/v1/cv/summary",
                json!({ "cv_text": "Jane Doe, Rust engineer" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"Experienced engineer.");
        assert_eq!(service.last_cv().as_deref(), Some("Jane Doe, Rust engineer"));
    }

    #[tokio::test]
    async fn test_summary_blank_cv_makes_no_call() {
        let service = Arc::new(ScriptedSummary::chunks(&[b"unused"]));
        let state = test_state(service.clone(), 1024);

        let response = build_router(state)
            .oneshot(json_request(
                "POST",
                "/api/v1/cv/summary",
                json!({ "cv_text": "  \n " }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(
            body["error"]["message"],
            "Please upload or extract your CV before generating a summary."
        );
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn test_summary_service_unavailable() {
        let state = test_state(Arc::new(ScriptedSummary::failing_to_open()), 1024);
        let response = build_router(state)
            .oneshot(json_request(
                "POST",
                "/api/v1/cv/summary",
                json!({ "cv_text": "Jane Doe" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(response).await["error"]["code"], "SUMMARY_FAILED");
    }

    #[tokio::test]
    async fn test_summary_failure_mid_stream_aborts_body() {
        let state = test_state(
            Arc::new(ScriptedSummary::failing_after(&[b"Experienced "])),
            1024,
        );
        let response = build_router(state)
            .oneshot(json_request(
                "POST",
                "/api/v1/cv/summary",
                json!({ "cv_text": "Jane Doe" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(to_bytes(response.into_body(), usize::MAX).await.is_err());
    }

    #[tokio::test]
    async fn test_form_lifecycle() {
        let service = Arc::new(ScriptedSummary::chunks(&[b"Experienced ", b"engineer."]));
        let state = test_state(service.clone(), 1024 * 1024);
        let id = create_form(&state).await;

        let response = build_router(state.clone())
            .oneshot(json_request(
                "PUT",
                &format!("/api/v1/forms/{id}/cv"),
                json!({ "cv_text": "Jane Doe" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["state"]["cv_text"], "Jane Doe");

        let response = build_router(state.clone())
            .oneshot(empty_request("POST", &format!("/api/v1/forms/{id}/submit")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = body_json(response).await;
        assert_eq!(body["state"]["submission"], 1);

        state.forms.get(&id).unwrap().wait_idle().await;

        let response = build_router(state.clone())
            .oneshot(empty_request("GET", &format!("/api/v1/forms/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["state"]["summary"], "Experienced engineer.");
        assert_eq!(body["state"]["status"], "idle");
        assert!(body["state"]["error"].is_null());
        assert_eq!(body["view"]["submit_label"], "Generate Summary");
        assert_eq!(body["view"]["submit_enabled"], true);

        let response = build_router(state.clone())
            .oneshot(empty_request("DELETE", &format!("/api/v1/forms/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = build_router(state)
            .oneshot(empty_request("GET", &format!("/api/v1/forms/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_form_submit_empty_cv() {
        let service = Arc::new(ScriptedSummary::chunks(&[b"unused"]));
        let state = test_state(service.clone(), 1024);
        let id = create_form(&state).await;

        let response = build_router(state.clone())
            .oneshot(empty_request("POST", &format!("/api/v1/forms/{id}/submit")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let snapshot = state.forms.get(&id).unwrap().snapshot();
        assert_eq!(
            snapshot.error.unwrap().description,
            "Please upload or extract your CV before generating a summary."
        );
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn test_form_document_upload() {
        let state = test_state(Arc::new(ScriptedSummary::default()), 1024 * 1024);
        let id = create_form(&state).await;
        let pdf = build_pdf(&[&["Hello"], &["World"]]);

        let response = build_router(state.clone())
            .oneshot(multipart_request(
                &format!("/api/v1/forms/{id}/document"),
                "jane.pdf",
                "application/pdf",
                &pdf,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["state"]["cv_text"], "Hello\nWorld\n");
        assert_eq!(body["view"]["selected_file"], "Selected file:jane.pdf");
    }

    #[tokio::test]
    async fn test_form_document_failure_keeps_cv() {
        let state = test_state(Arc::new(ScriptedSummary::default()), 1024 * 1024);
        let id = create_form(&state).await;
        state
            .forms
            .get(&id)
            .unwrap()
            .set_cv_text("typed CV".to_string());

        let response = build_router(state.clone())
            .oneshot(multipart_request(
                &format!("/api/v1/forms/{id}/document"),
                "broken.pdf",
                "application/pdf",
                b"garbage",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let snapshot = state.forms.get(&id).unwrap().snapshot();
        assert_eq!(snapshot.cv_text, "typed CV");
        assert_eq!(
            snapshot.error.unwrap().description,
            "Failed to extract text from the PDF. Please try again."
        );
    }

    #[tokio::test]
    async fn test_unknown_form_is_not_found() {
        let state = test_state(Arc::new(ScriptedSummary::default()), 1024);
        let id = Uuid::new_v4();

        for request in [
            empty_request("GET", &format!("/api/v1/forms/{id}")),
            empty_request("POST", &format!("/api/v1/forms/{id}/submit")),
            empty_request("GET", &format!("/api/v1/forms/{id}/events")),
            empty_request("DELETE", &format!("/api/v1/forms/{id}")),
        ] {
            let response = build_router(state.clone()).oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }
    }

    #[tokio::test]
    async fn test_form_events_streams_state_snapshots() {
        let state = test_state(Arc::new(ScriptedSummary::default()), 1024);
        let id = create_form(&state).await;
        state
            .forms
            .get(&id)
            .unwrap()
            .set_cv_text("Jane Doe".to_string());

        let response = build_router(state)
            .oneshot(empty_request("GET", &format!("/api/v1/forms/{id}/events")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );

        let mut frames = response.into_body().into_data_stream();
        let frame = tokio::time::timeout(Duration::from_secs(5), frames.next())
            .await
            .expect("no event within timeout")
            .expect("event stream ended")
            .unwrap();
        let frame = String::from_utf8(frame.to_vec()).unwrap();

        let mut lines = frame.lines();
        assert_eq!(lines.next(), Some("event: state"));
        let data = lines
            .next()
            .and_then(|line| line.strip_prefix("data: "))
            .expect("data line");
        let snapshot: Value = serde_json::from_str(data).unwrap();
        assert_eq!(snapshot["form_id"], id.to_string());
        assert_eq!(snapshot["state"]["cv_text"], "Jane Doe");
        assert_eq!(snapshot["view"]["submit_label"], "Generate Summary");
    }
}
