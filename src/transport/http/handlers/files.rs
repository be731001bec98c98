use crate::transport::http::handlers::common::{current_user, read_upload};
use crate::transport::http::types::{ApiError, AppState, ErrorBody, FileRecordOut, VerifyResultOut};
use axum::extract::{Multipart, State};
use axum::http::HeaderMap;
use axum::Json;
use tracing::debug;

#[utoipa::path(
    get,
    path = "/files",
    responses(
        (status = 200, description = "The caller's registrations, newest first", body = [FileRecordOut]),
        (status = 401, description = "Missing or rejected token", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn list_files_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<FileRecordOut>>, ApiError> {
    let user = current_user(&state, &headers).await?;
    let service = state.service.lock().await;
    Ok(Json(service.list_files(user.id)))
}

/// Multipart body: `file` (required, with a filename) and `metadata` (optional text).
#[utoipa::path(
    post,
    path = "/files/register",
    request_body(content = String, content_type = "multipart/form-data", description = "Parts `file` and `metadata`"),
    responses(
        (status = 200, description = "File anchored on chain", body = FileRecordOut),
        (status = 401, description = "Missing or rejected token", body = ErrorBody),
        (status = 402, description = "No credits remaining", body = ErrorBody),
        (status = 422, description = "Missing file part", body = ErrorBody),
        (status = 500, description = "Chain submission failed", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn register_file_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<FileRecordOut>, ApiError> {
    let user = current_user(&state, &headers).await?;
    let upload = read_upload(multipart).await?;
    debug!(user_id = user.id, bytes = upload.bytes.len(), "register upload received");

    let mut service = state.service.lock().await;
    let record = service
        .register_file(
            &state.chain,
            &user,
            &upload.filename,
            &upload.bytes,
            &upload.metadata,
        )
        .await?;
    Ok(Json(record))
}

#[utoipa::path(
    post,
    path = "/files/verify",
    request_body(content = String, content_type = "multipart/form-data", description = "Part `file`"),
    responses(
        (status = 200, description = "Verification outcome", body = VerifyResultOut),
        (status = 401, description = "Missing or rejected token", body = ErrorBody),
        (status = 422, description = "Missing file part", body = ErrorBody),
        (status = 500, description = "Chain lookup failed", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn verify_file_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<VerifyResultOut>, ApiError> {
    let user = current_user(&state, &headers).await?;
    let upload = read_upload(multipart).await?;

    let service = state.service.lock().await;
    let result = service
        .verify_file(&state.chain, &user, &upload.filename, &upload.bytes)
        .await?;
    Ok(Json(result))
}
