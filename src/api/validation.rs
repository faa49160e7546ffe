use std::path::Path;

use crate::api::errors::ApiError;

pub(crate) fn validate_email(email: &str) -> Result<(), ApiError> {
    let email = email.trim();
    let valid = email.len() <= 254
        && email.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        });
    if valid {
        Ok(())
    } else {
        Err(ApiError::BadRequest("Invalid email format".to_string()))
    }
}

/// PDF uploads must carry a `.pdf` name and a PDF (or generic binary) MIME type.
pub(crate) fn validate_pdf_upload(filename: &str, content_type: &str) -> Result<(), ApiError> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .ok_or_else(|| ApiError::BadRequest("File must have an extension".to_string()))?;

    if extension != "pdf" {
        return Err(ApiError::BadRequest("Only PDF files are allowed".to_string()));
    }

    let mime = content_type.trim().to_ascii_lowercase();
    if matches!(mime.as_str(), "application/pdf" | "application/octet-stream") {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!("MIME type '{mime}' is not allowed for PDF uploads")))
    }
}
