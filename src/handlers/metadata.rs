use axum::{
    Json,
    extract::{Multipart, State},
};
use bytes::Bytes;
use serde::Serialize;
use utoipa::ToSchema;

use crate::AppState;
use crate::api::error::AppError;
use crate::services::engine::MetadataRecord;
use crate::services::workspace::Session;
use crate::utils::validation::{is_allowed_file, sanitize_filename};

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[utoipa::path(
    post,
    path = "/get_metadata",
    request_body(content = Object, description = "Single file in the `file` field", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Filtered metadata of the uploaded file", body = Object),
        (status = 400, description = "Missing, unnamed or disallowed file", body = ErrorResponse),
        (status = 500, description = "Metadata could not be read", body = ErrorResponse)
    ),
    tag = "metadata"
)]
pub async fn get_metadata(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<MetadataRecord>, AppError> {
    let mut upload: Option<(String, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        upload = Some((filename, data));
        break;
    }

    let (filename, data) =
        upload.ok_or_else(|| AppError::BadRequest("No file received".to_string()))?;

    if filename.is_empty() {
        return Err(AppError::BadRequest("Invalid file name".to_string()));
    }
    if !is_allowed_file(&filename) {
        return Err(AppError::BadRequest(
            "File extension not allowed".to_string(),
        ));
    }
    let filename = sanitize_filename(&filename)
        .map_err(|_| AppError::BadRequest("Invalid file name".to_string()))?;

    let session = state.workspace.create().await?;
    let result = read_in_session(&state, &session, &filename, data).await;
    session.destroy().await;

    let record = result?;
    tracing::info!("Returned {} metadata fields for {}", record.len(), filename);
    Ok(Json(record))
}

async fn read_in_session(
    state: &AppState,
    session: &Session,
    filename: &str,
    data: Bytes,
) -> Result<MetadataRecord, AppError> {
    let path = session.file_path(filename);
    tokio::fs::write(&path, &data)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to save {}: {}", filename, e)))?;

    state
        .reader
        .read_metadata(&path)
        .await
        .map_err(AppError::MetadataRead)
}
