#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use http_body_util::BodyExt;
use metadata_cleaner::config::CleanerConfig;
use metadata_cleaner::services::engine::{EngineError, MetadataEngine, MetadataRecord};
use metadata_cleaner::{AppState, create_app};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tower::ServiceExt;

pub const BOUNDARY: &str = "----metadata-cleaner-test-boundary";

/// Stand-in for exiftool. Files are text: a format marker followed by
/// optional `GPS=...` data. Reading reports GPS fields when the marker is
/// present; stripping truncates everything after the first line.
#[derive(Default)]
pub struct ScriptedEngine {
    pub fail_extract: bool,
    pub fail_strip: bool,
    pub strip_calls: AtomicUsize,
}

impl ScriptedEngine {
    pub fn failing_extract() -> Self {
        Self {
            fail_extract: true,
            ..Self::default()
        }
    }

    pub fn failing_strip() -> Self {
        Self {
            fail_strip: true,
            ..Self::default()
        }
    }

    pub fn strip_calls(&self) -> usize {
        self.strip_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl MetadataEngine for ScriptedEngine {
    async fn extract_metadata(&self, path: &Path) -> Result<MetadataRecord, EngineError> {
        if self.fail_extract {
            return Err(EngineError::Exited { status: Some(2) });
        }

        let content = tokio::fs::read_to_string(path).await.unwrap_or_default();
        let filename = path.file_name().unwrap().to_string_lossy().to_string();
        let mut record = json!({
            "SourceFile": path.to_string_lossy(),
            "FileName": filename,
            "FileSize": format!("{} bytes", content.len()),
            "FileType": "JPEG",
            "MIMEType": "image/jpeg",
            "ImageWidth": 640,
            "Make": "Canon",
            "Model": "EOS 80D",
        })
        .as_object()
        .cloned()
        .unwrap();

        if content.contains("GPS=") {
            record.insert("GPSLatitude".into(), json!("40 deg 25' 1.20\" N"));
            record.insert("GPSLongitude".into(), json!("3 deg 42' 12.00\" W"));
            record.insert("GPSPosition".into(), json!("40.4170, -3.7033"));
        }
        Ok(record)
    }

    async fn strip_metadata(&self, path: &Path) -> Result<(), EngineError> {
        self.strip_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_strip {
            return Err(EngineError::Exited { status: Some(1) });
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(EngineError::Spawn)?;
        let cleaned = content.lines().next().unwrap_or_default().to_string();
        tokio::fs::write(path, cleaned)
            .await
            .map_err(EngineError::Spawn)?;
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

pub struct TestApp {
    pub app: Router,
    pub root: TempDir,
    pub engine: Arc<ScriptedEngine>,
}

impl TestApp {
    pub fn new(engine: ScriptedEngine) -> Self {
        Self::with_limits(engine, 3, 1)
    }

    pub fn with_limits(engine: ScriptedEngine, max_files: usize, max_file_size_mb: usize) -> Self {
        let root = tempfile::tempdir().unwrap();
        let config = CleanerConfig {
            max_files,
            max_file_size_mb,
            upload_root: root.path().join("uploads"),
            ..CleanerConfig::default()
        };
        let engine = Arc::new(engine);
        let app = create_app(AppState::new(config, engine.clone()));

        Self { app, root, engine }
    }

    pub fn upload_root(&self) -> std::path::PathBuf {
        self.root.path().join("uploads")
    }

    /// Entries left under the upload root (sessions or archives)
    pub fn leftovers(&self) -> usize {
        match std::fs::read_dir(self.upload_root()) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }

    /// Leftovers once background cleanup has had time to finish
    pub async fn settled_leftovers(&self) -> usize {
        for _ in 0..200 {
            if self.leftovers() == 0 {
                return 0;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        self.leftovers()
    }

    pub async fn post_multipart(&self, uri: &str, parts: &[Part<'_>]) -> Response<Body> {
        self.app
            .clone()
            .oneshot(multipart_request(uri, parts))
            .await
            .unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }
}

/// One multipart part: field name, optional filename, content
pub struct Part<'a> {
    pub field: &'a str,
    pub filename: Option<&'a str>,
    pub content: &'a [u8],
}

pub fn file<'a>(field: &'a str, filename: &'a str, content: &'a [u8]) -> Part<'a> {
    Part {
        field,
        filename: Some(filename),
        content,
    }
}

pub fn text<'a>(field: &'a str, content: &'a str) -> Part<'a> {
    Part {
        field,
        filename: None,
        content: content.as_bytes(),
    }
}

pub fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part.filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n",
                    part.field, filename
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                    part.field
                )
                .as_bytes(),
            ),
        }
        body.extend_from_slice(part.content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

pub fn header(response: &Response<Body>, name: &str) -> String {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
