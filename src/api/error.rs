use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::engine::EngineError;
use crate::services::packager::PackageError;
use crate::services::stripper::StripError;
use crate::services::workspace::WorkspaceError;
use crate::utils::validation::ValidationError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Batch of {count} files exceeds the limit of {max}")]
    BatchTooLarge { count: usize, max: usize },

    #[error("Metadata read failed: {0}")]
    MetadataRead(#[source] EngineError),

    #[error("Metadata strip failed for {filename}: {source}")]
    Engine {
        filename: String,
        #[source]
        source: EngineError,
    },

    #[error("Workspace error: {0}")]
    Filesystem(#[from] WorkspaceError),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::Validation(_) | AppError::BatchTooLarge { .. } => {
                StatusCode::BAD_REQUEST
            }
            AppError::MetadataRead(_)
            | AppError::Engine { .. }
            | AppError::Filesystem(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Caller-facing text. Server-side failures are logged in full here and
    /// reduced to a generic message.
    pub fn message(&self) -> String {
        match self {
            AppError::BadRequest(msg) => msg.clone(),
            AppError::Validation(e) => e.message.clone(),
            AppError::BatchTooLarge { max, .. } => {
                format!("You cannot upload more than {} files at a time.", max)
            }
            AppError::MetadataRead(e) => {
                tracing::error!("Metadata read error: {:?}", e);
                format!("Error retrieving metadata: {}", e)
            }
            AppError::Engine { filename, source } => {
                tracing::error!("Metadata strip error on {}: {:?}", filename, source);
                format!("Error removing metadata from {}", filename)
            }
            AppError::Filesystem(e) => {
                tracing::error!("Workspace error: {:?}", e);
                "Internal Server Error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal Server Error".to_string()
            }
        }
    }
}

impl From<StripError> for AppError {
    fn from(err: StripError) -> Self {
        match err {
            StripError::BatchTooLarge { count, max } => AppError::BatchTooLarge { count, max },
            StripError::NoFiles => AppError::BadRequest("No files received".to_string()),
            StripError::Rejected(e) => AppError::Validation(e),
            StripError::Engine { filename, source } => AppError::Engine { filename, source },
            e @ StripError::Save { .. } => AppError::Internal(e.to_string()),
        }
    }
}

impl From<PackageError> for AppError {
    fn from(err: PackageError) -> Self {
        match err {
            PackageError::Empty => AppError::BadRequest("No files received".to_string()),
            e => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.message()
        }));

        (status, body).into_response()
    }
}

/// Same error, rendered as a `text/plain` body
#[derive(Debug)]
pub struct PlainError(pub AppError);

impl From<AppError> for PlainError {
    fn from(err: AppError) -> Self {
        PlainError(err)
    }
}

impl From<StripError> for PlainError {
    fn from(err: StripError) -> Self {
        PlainError(err.into())
    }
}

impl From<PackageError> for PlainError {
    fn from(err: PackageError) -> Self {
        PlainError(err.into())
    }
}

impl From<WorkspaceError> for PlainError {
    fn from(err: WorkspaceError) -> Self {
        PlainError(err.into())
    }
}

impl IntoResponse for PlainError {
    fn into_response(self) -> Response {
        (self.0.status(), self.0.message()).into_response()
    }
}
