use crate::transport::http::types::{ApiError, AppState, UserOut};
use axum::extract::Multipart;
use axum::http::{header, HeaderMap};

/// Extracts the bearer token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(ApiError::unauthorized)?;
    let (scheme, token) = value.split_once(' ').ok_or_else(ApiError::unauthorized)?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(ApiError::unauthorized());
    }
    Ok(token.trim())
}

/// Resolves the calling account or answers 401.
pub async fn current_user(state: &AppState, headers: &HeaderMap) -> Result<UserOut, ApiError> {
    let token = bearer_token(headers)?;
    let service = state.service.lock().await;
    Ok(service.authenticate(token)?)
}

pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub metadata: String,
}

/// Reads the `file` part (required) and the `metadata` part (optional, defaults to "").
pub async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut metadata = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .filter(|n| !n.trim().is_empty())
                    .ok_or_else(|| ApiError::validation("The file part needs a filename."))?;
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::validation(format!("Failed to read file: {}", e)))?;
                file = Some((filename, bytes.to_vec()));
            }
            Some("metadata") => {
                metadata = field
                    .text()
                    .await
                    .map_err(|e| ApiError::validation(format!("Invalid metadata: {}", e)))?;
            }
            _ => {}
        }
    }

    let (filename, bytes) = file.ok_or_else(|| ApiError::validation("Field 'file' is required."))?;
    Ok(Upload {
        filename,
        bytes,
        metadata,
    })
}
