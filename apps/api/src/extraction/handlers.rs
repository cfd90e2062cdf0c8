use axum::{extract::Multipart, Json};
use serde::Serialize;

use crate::errors::AppError;
use crate::extraction::extract_document;
use crate::extraction::upload::read_pdf_upload;

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub file_name: String,
    pub text: String,
    pub page_count: u32,
}

/// POST /api/v1/cv/extract
///
/// Multipart upload with a `file` field. Returns the extracted CV text.
pub async fn handle_extract(multipart: Multipart) -> Result<Json<ExtractResponse>, AppError> {
    let document = read_pdf_upload(multipart).await?;
    let file_name = document.name.clone();
    let extracted = extract_document(document).await?;

    Ok(Json(ExtractResponse {
        file_name,
        text: extracted.text,
        page_count: extracted.page_count,
    }))
}
