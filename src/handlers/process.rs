use axum::{
    extract::{Multipart, State, multipart::Field},
    response::Response,
};
use bytes::{Bytes, BytesMut};

use crate::AppState;
use crate::api::error::{AppError, PlainError};
use crate::services::packager::{self, ResultArtifact};
use crate::services::stripper::UploadedFile;
use crate::services::workspace::Session;

#[utoipa::path(
    post,
    path = "/process_files",
    request_body(content = Object, description = "One or more files in the `files` field", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "The cleaned file, or a zip of all cleaned files", body = String, content_type = "application/octet-stream"),
        (status = 400, description = "Too many files, file too large, or extension not allowed", body = String, content_type = "text/plain"),
        (status = 500, description = "Metadata could not be removed", body = String, content_type = "text/plain")
    ),
    tag = "metadata"
)]
pub async fn process_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, PlainError> {
    let max_files = state.config.max_files;
    let max_file_size = state.config.max_file_size_bytes();
    let mut uploads: Vec<UploadedFile> = Vec::new();

    // Once an oversized part has pushed the body past the router limit the
    // rest is unreadable; the stripper reports that part by name instead
    let oversized = |uploads: &[UploadedFile]| uploads.iter().any(|u| u.size() > max_file_size);

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) if oversized(&uploads) => {
                tracing::debug!("Stopped reading upload after oversized part: {}", e);
                break;
            }
            Err(e) => return Err(AppError::BadRequest(e.to_string()).into()),
        };
        if field.name() != Some("files") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content = match read_capped(field, max_file_size).await {
            Ok(content) => content,
            Err(e) if oversized(&uploads) => {
                tracing::debug!("Stopped reading upload after oversized part: {}", e);
                break;
            }
            Err(e) => return Err(e.into()),
        };
        uploads.push(UploadedFile { filename, content });

        // One part past the limit is enough for the count check
        if uploads.len() > max_files {
            break;
        }
    }

    if uploads.is_empty() {
        return Err(AppError::BadRequest("No files received".to_string()).into());
    }

    let session = state.workspace.create().await?;
    tracing::info!(
        "Processing {} uploaded files in session {}",
        uploads.len(),
        session.id()
    );

    match strip_and_package(&state, &session, uploads).await {
        // The body owns the session from here; it is removed once sent
        Ok(artifact) => Ok(packager::into_response(artifact, session).await?),
        Err(e) => {
            session.destroy().await;
            Err(e)
        }
    }
}

async fn strip_and_package(
    state: &AppState,
    session: &Session,
    uploads: Vec<UploadedFile>,
) -> Result<ResultArtifact, PlainError> {
    let processed = state.stripper.strip(session, uploads).await?;
    Ok(packager::package(session, processed).await?)
}

/// Reads one part, stopping as soon as it is larger than `limit`. An
/// oversized part keeps only its first `limit` bytes plus one chunk, enough
/// for the size check to reject it by name.
async fn read_capped(mut field: Field<'_>, limit: usize) -> Result<Bytes, AppError> {
    let mut buffer = BytesMut::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        buffer.extend_from_slice(&chunk);
        if buffer.len() > limit {
            break;
        }
    }
    Ok(buffer.freeze())
}
