use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

use crate::config::CleanerConfig;

/// Field name to value mapping describing one file's embedded metadata
pub type MetadataRecord = Map<String, Value>;

/// Tag groups removed by a strip request
pub const STRIP_ARGS: &[&str] = &["-all=", "-ICC_Profile:all=", "-XMP:all=", "-IPTC:all="];

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("failed to start metadata engine: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("metadata engine exited abnormally (status: {status:?})")]
    Exited { status: Option<i32> },

    #[error("metadata engine timed out after {0:?}")]
    TimedOut(Duration),
}

/// External metadata tool, seen as a black box that reads or rewrites one file
#[async_trait::async_trait]
pub trait MetadataEngine: Send + Sync {
    /// Read every tag of the file at `path`, unfiltered
    async fn extract_metadata(&self, path: &Path) -> Result<MetadataRecord, EngineError>;

    /// Remove metadata from the file at `path`, overwriting it without a backup
    async fn strip_metadata(&self, path: &Path) -> Result<(), EngineError>;

    /// Check if the engine is available
    async fn health_check(&self) -> bool;
}

/// Engine backed by the `exiftool` command line program
pub struct ExifToolEngine {
    binary: PathBuf,
    timeout: Option<Duration>,
}

impl ExifToolEngine {
    pub fn new(binary: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    async fn run(&self, args: &[&str], path: Option<&Path>) -> Result<Output, EngineError> {
        let mut command = Command::new(&self.binary);
        command.args(args).kill_on_drop(true);
        if let Some(path) = path {
            command.arg(path);
        }

        let output = command.output();
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, output)
                .await
                .map_err(|_| EngineError::TimedOut(limit))?
                .map_err(EngineError::Spawn),
            None => output.await.map_err(EngineError::Spawn),
        }
    }
}

#[async_trait::async_trait]
impl MetadataEngine for ExifToolEngine {
    async fn extract_metadata(&self, path: &Path) -> Result<MetadataRecord, EngineError> {
        let output = self.run(&["-j"], Some(path)).await?;

        // exiftool exits with 1 when it reports a per-file problem such as an
        // unreadable format; its JSON still describes the file in that case.
        match output.status.code() {
            Some(0) | Some(1) => {}
            status => {
                tracing::error!(
                    "exiftool read of {} failed ({:?}): {}",
                    path.display(),
                    status,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                return Err(EngineError::Exited { status });
            }
        }

        Ok(parse_json_output(&output.stdout))
    }

    async fn strip_metadata(&self, path: &Path) -> Result<(), EngineError> {
        let mut args = STRIP_ARGS.to_vec();
        args.push("-overwrite_original");
        let output = self.run(&args, Some(path)).await?;

        if !output.status.success() {
            tracing::error!(
                "exiftool strip of {} failed ({:?}): {}",
                path.display(),
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Err(EngineError::Exited {
                status: output.status.code(),
            });
        }

        tracing::debug!(
            "exiftool: {}",
            String::from_utf8_lossy(&output.stdout).trim()
        );
        Ok(())
    }

    async fn health_check(&self) -> bool {
        match self.run(&["-ver"], None).await {
            Ok(output) => output.status.success(),
            Err(_) => false,
        }
    }
}

/// Parses `exiftool -j` output: a one-element array of records.
/// Empty or malformed output means "no metadata", not a failure.
pub fn parse_json_output(stdout: &[u8]) -> MetadataRecord {
    if stdout.iter().all(u8::is_ascii_whitespace) {
        return MetadataRecord::new();
    }

    match serde_json::from_slice::<Vec<MetadataRecord>>(stdout) {
        Ok(records) => records.into_iter().next().unwrap_or_default(),
        Err(e) => {
            tracing::warn!("Discarding malformed metadata engine output: {}", e);
            MetadataRecord::new()
        }
    }
}

/// No-op engine for development/testing
pub struct NoOpEngine;

#[async_trait::async_trait]
impl MetadataEngine for NoOpEngine {
    async fn extract_metadata(&self, _path: &Path) -> Result<MetadataRecord, EngineError> {
        tracing::warn!("NoOpEngine: Skipping metadata extraction (development mode)");
        Ok(MetadataRecord::new())
    }

    async fn strip_metadata(&self, _path: &Path) -> Result<(), EngineError> {
        tracing::warn!("NoOpEngine: Skipping metadata removal (development mode)");
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// Factory function to create the engine named in the config
pub fn create_engine(config: &CleanerConfig) -> Box<dyn MetadataEngine> {
    match config.metadata_engine.to_lowercase().as_str() {
        "exiftool" => Box::new(ExifToolEngine::new(
            config.exiftool_path.clone(),
            config.engine_timeout(),
        )),
        "noop" | "none" | "disabled" => Box::new(NoOpEngine),
        other => {
            tracing::warn!("Unknown metadata engine '{}', using NoOpEngine", other);
            Box::new(NoOpEngine)
        }
    }
}
