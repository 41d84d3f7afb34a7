use std::env;
use std::path::PathBuf;
use std::time::Duration;

const MB: usize = 1024 * 1024;

/// Multipart framing allowance added on top of the raw file budget
const MULTIPART_OVERHEAD: usize = 10 * MB;

/// Runtime configuration for the cleaning service
#[derive(Debug, Clone)]
pub struct CleanerConfig {
    /// Maximum number of files accepted by one `/process_files` request (default: 10)
    pub max_files: usize,

    /// Maximum size of a single file in megabytes (default: 50)
    pub max_file_size_mb: usize,

    /// Root directory under which per-request sessions are created (default: "temp_uploads")
    pub upload_root: PathBuf,

    /// Title shown by the front end (default: "Metadata Cleaner")
    pub page_title: String,

    /// Support text shown by the front end
    pub support_message: String,

    /// Metadata engine type: "exiftool" or "noop" (default: "exiftool")
    pub metadata_engine: String,

    /// Path or name of the exiftool binary (default: "exiftool")
    pub exiftool_path: PathBuf,

    /// Upper bound for one engine invocation in seconds, 0 disables it (default: 120)
    pub engine_timeout_secs: u64,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            max_files: 10,
            max_file_size_mb: 50,
            upload_root: PathBuf::from("temp_uploads"),
            page_title: "Metadata Cleaner".to_string(),
            support_message: "For support, please contact your IT Service or SATI.".to_string(),
            metadata_engine: "exiftool".to_string(),
            exiftool_path: PathBuf::from("exiftool"),
            engine_timeout_secs: 120,
        }
    }
}

impl CleanerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            max_files: env::var("MAX_FILES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_files),

            max_file_size_mb: env::var("MAX_FILE_SIZE_MB")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size_mb),

            upload_root: env::var("UPLOAD_ROOT")
                .map(PathBuf::from)
                .unwrap_or(default.upload_root),

            page_title: env::var("PAGE_TITLE").unwrap_or(default.page_title),

            support_message: env::var("SUPPORT_MESSAGE").unwrap_or(default.support_message),

            metadata_engine: env::var("METADATA_ENGINE").unwrap_or(default.metadata_engine),

            exiftool_path: env::var("EXIFTOOL_PATH")
                .map(PathBuf::from)
                .unwrap_or(default.exiftool_path),

            engine_timeout_secs: env::var("ENGINE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.engine_timeout_secs),
        }
    }

    /// Create config for development (no exiftool required, relaxed limits)
    pub fn development() -> Self {
        Self {
            max_files: 50,
            max_file_size_mb: 200,
            metadata_engine: "noop".to_string(),
            ..Self::default()
        }
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.max_file_size_mb * MB
    }

    /// Largest request body the router accepts: a full batch plus multipart framing
    pub fn request_body_limit(&self) -> usize {
        self.max_files
            .saturating_mul(self.max_file_size_bytes())
            .saturating_add(MULTIPART_OVERHEAD)
    }

    pub fn engine_timeout(&self) -> Option<Duration> {
        (self.engine_timeout_secs > 0).then(|| Duration::from_secs(self.engine_timeout_secs))
    }
}
