pub mod api;
pub mod config;
pub mod handlers;
pub mod services;
pub mod utils;

use crate::config::CleanerConfig;
use crate::services::engine::MetadataEngine;
use crate::services::metadata::MetadataReader;
use crate::services::stripper::MetadataStripper;
use crate::services::workspace::WorkspaceManager;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::system::index,
        handlers::system::health_check,
        handlers::metadata::get_metadata,
        handlers::process::process_files,
    ),
    components(
        schemas(
            handlers::system::SettingsResponse,
            handlers::system::HealthResponse,
            handlers::metadata::ErrorResponse,
        )
    ),
    tags(
        (name = "metadata", description = "Metadata inspection and removal"),
        (name = "system", description = "Service settings and health")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<CleanerConfig>,
    pub engine: Arc<dyn MetadataEngine>,
    pub workspace: WorkspaceManager,
    pub reader: Arc<MetadataReader>,
    pub stripper: Arc<MetadataStripper>,
}

impl AppState {
    pub fn new(config: CleanerConfig, engine: Arc<dyn MetadataEngine>) -> Self {
        Self {
            workspace: WorkspaceManager::new(config.upload_root.clone()),
            reader: Arc::new(MetadataReader::new(engine.clone())),
            stripper: Arc::new(MetadataStripper::new(engine.clone(), &config)),
            config: Arc::new(config),
            engine,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health_check))
        .route("/get_metadata", post(handlers::get_metadata))
        .route("/process_files", post(handlers::process_files))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers(Any),
        )
        .layer(DefaultBodyLimit::max(state.config.request_body_limit()))
        .with_state(state)
}
