use std::collections::HashMap;

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentTeacher;
use crate::api::validation::validate_pdf_upload;
use crate::core::state::AppState;
use crate::schemas::UploadResponse;
use crate::services::storage::sanitized_filename;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/quiz-pdf", post(upload_quiz_pdf))
}

/// A validated PDF read from a multipart form, plus the form's text fields.
pub(crate) struct PdfForm {
    pub(crate) filename: String,
    pub(crate) content_type: String,
    pub(crate) bytes: Vec<u8>,
    pub(crate) fields: HashMap<String, String>,
}

impl PdfForm {
    pub(crate) fn safe_filename(&self) -> String {
        sanitized_filename(&self.filename)
    }
}

/// Reads the `file` part (bounded by the configured upload size) and any text fields.
pub(crate) async fn read_pdf_form(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<PdfForm, ApiError> {
    let limit_mb = state.settings().storage().max_upload_size_mb;
    let max_bytes = state.settings().storage().max_upload_bytes();

    let mut file_bytes: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;
    let mut content_type: Option<String> = None;
    let mut fields = HashMap::new();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "file" {
            filename = field.file_name().map(|s| s.to_string());
            content_type = field.content_type().map(|s| s.to_string());
            let mut bytes = Vec::new();
            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|_| ApiError::BadRequest("Failed to read file".to_string()))?
            {
                let next_size = bytes.len() as u64 + chunk.len() as u64;
                if next_size > max_bytes {
                    return Err(ApiError::BadRequest(format!(
                        "File size exceeds {limit_mb}MB limit"
                    )));
                }
                bytes.extend_from_slice(&chunk);
            }
            file_bytes = Some(bytes);
        } else if !name.is_empty() {
            let text = field
                .text()
                .await
                .map_err(|_| ApiError::BadRequest(format!("Invalid form field '{name}'")))?;
            fields.insert(name, text.trim().to_string());
        }
    }

    let bytes = file_bytes.ok_or_else(|| ApiError::BadRequest("File is required".to_string()))?;
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
    }
    let filename = filename.unwrap_or_else(|| "document.pdf".to_string());
    let content_type = content_type.unwrap_or_else(|| "application/octet-stream".to_string());

    validate_pdf_upload(&filename, &content_type)?;

    Ok(PdfForm { filename, content_type, bytes, fields })
}

async fn upload_quiz_pdf(
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let form = read_pdf_form(&state, multipart).await?;

    let key = format!("quiz-pdfs/{}_{}", Uuid::new_v4(), form.safe_filename());
    let stored = state
        .storage()
        .store(&key, &form.content_type, form.bytes)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to store uploaded file"))?;

    tracing::info!(
        user_id = %teacher.id,
        file_path = %stored.reference,
        size = stored.size,
        sha256 = %stored.sha256,
        action = "quiz_pdf_upload",
        "Quiz PDF uploaded"
    );

    Ok(Json(UploadResponse { success: true, file_path: stored.reference }))
}
