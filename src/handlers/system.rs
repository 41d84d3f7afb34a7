use crate::AppState;
use crate::utils::validation::ALLOWED_EXTENSIONS;
use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;

/// Everything a front end needs to render the upload page
#[derive(Serialize, ToSchema)]
pub struct SettingsResponse {
    pub page_title: String,
    pub support_message: String,
    pub max_file_size_mb: usize,
    pub max_files: usize,
    pub allowed_extensions: Vec<String>,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub engine: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Upload page settings", body = SettingsResponse)
    ),
    tag = "system"
)]
pub async fn index(State(state): State<AppState>) -> Json<SettingsResponse> {
    Json(SettingsResponse {
        page_title: state.config.page_title.clone(),
        support_message: state.config.support_message.clone(),
        max_file_size_mb: state.config.max_file_size_mb,
        max_files: state.config.max_files,
        allowed_extensions: ALLOWED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
    })
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "System health status", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let engine_status = if state.engine.health_check().await {
        "available"
    } else {
        "unavailable"
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        engine: engine_status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
