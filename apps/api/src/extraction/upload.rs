use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;

use super::UploadedDocument;
use crate::errors::AppError;

/// Multipart field carrying the CV file.
pub const FILE_FIELD: &str = "file";

/// `.pdf` by extension or `application/pdf` by declared type. The content is
/// not inspected; the extractor decides whether it is really a PDF.
pub fn is_pdf_upload(file_name: &str, content_type: Option<&str>) -> bool {
    let by_extension = file_name.to_ascii_lowercase().ends_with(".pdf");
    let by_type = content_type
        .map(|ct| ct.trim().eq_ignore_ascii_case("application/pdf"))
        .unwrap_or(false);
    by_extension || by_type
}

/// Reads the first `file` field of a multipart body into an `UploadedDocument`.
pub async fn read_pdf_upload(mut multipart: Multipart) -> Result<UploadedDocument, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        let name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| "upload.pdf".to_string());

        if !is_pdf_upload(&name, content_type.as_deref()) {
            return Err(AppError::Validation(format!(
                "Only .pdf files are accepted (got '{name}')"
            )));
        }

        let content = field.bytes().await.map_err(multipart_error)?;
        return Ok(UploadedDocument { name, content });
    }

    Err(AppError::Validation(format!(
        "Multipart field '{FILE_FIELD}' is required"
    )))
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::Validation(format!("Invalid multipart body: {}", e.body_text()))
    }
}
