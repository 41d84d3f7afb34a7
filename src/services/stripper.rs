use bytes::Bytes;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::config::CleanerConfig;
use crate::services::engine::{EngineError, MetadataEngine};
use crate::services::workspace::Session;
use crate::utils::validation::{
    ValidationError, sanitize_filename, validate_extension, validate_file_size,
};

/// A file as received from the client
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content: Bytes,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// A file inside a session whose metadata has been removed in place
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedFile {
    pub filename: String,
    pub path: PathBuf,
}

#[derive(Error, Debug)]
pub enum StripError {
    #[error("batch of {count} files exceeds the limit of {max}")]
    BatchTooLarge { count: usize, max: usize },

    #[error("no files to process")]
    NoFiles,

    #[error("{0}")]
    Rejected(#[from] ValidationError),

    #[error("failed to save {filename}: {source}")]
    Save {
        filename: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to strip {filename}: {source}")]
    Engine {
        filename: String,
        #[source]
        source: EngineError,
    },
}

/// Destructive side of the pipeline: saves uploads into a session and strips them
pub struct MetadataStripper {
    engine: Arc<dyn MetadataEngine>,
    max_files: usize,
    max_file_size: usize,
}

impl MetadataStripper {
    pub fn new(engine: Arc<dyn MetadataEngine>, config: &CleanerConfig) -> Self {
        Self {
            engine,
            max_files: config.max_files,
            max_file_size: config.max_file_size_bytes(),
        }
    }

    pub fn ensure_batch_size(&self, count: usize) -> Result<(), StripError> {
        if count > self.max_files {
            return Err(StripError::BatchTooLarge {
                count,
                max: self.max_files,
            });
        }
        Ok(())
    }

    /// Strips a batch file by file, in upload order.
    ///
    /// The batch is not transactional: each file is validated right before it
    /// is saved and stripped, so a rejection part-way through leaves the
    /// earlier files already stripped inside the session. Parts with an empty
    /// filename (no file selected in the form) are skipped.
    pub async fn strip(
        &self,
        session: &Session,
        files: Vec<UploadedFile>,
    ) -> Result<Vec<ProcessedFile>, StripError> {
        self.ensure_batch_size(files.len())?;

        let mut processed = Vec::with_capacity(files.len());
        for file in files {
            if file.filename.is_empty() {
                continue;
            }

            // Checked on the name as sent, before sanitizing can trim it
            validate_extension(&file.filename)?;
            let filename = sanitize_filename(&file.filename)?;
            validate_file_size(&filename, file.size(), self.max_file_size)?;

            let path = session.file_path(&filename);
            tokio::fs::write(&path, &file.content)
                .await
                .map_err(|source| StripError::Save {
                    filename: filename.clone(),
                    source,
                })?;

            self.engine
                .strip_metadata(&path)
                .await
                .map_err(|source| StripError::Engine {
                    filename: filename.clone(),
                    source,
                })?;

            tracing::info!(
                "Stripped metadata from {} ({} bytes) in session {}",
                filename,
                file.size(),
                session.id()
            );
            processed.push(ProcessedFile { filename, path });
        }

        if processed.is_empty() {
            return Err(StripError::NoFiles);
        }
        Ok(processed)
    }
}
