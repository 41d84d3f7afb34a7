use axum::{
    body::Body,
    http::header,
    response::{IntoResponse, Response},
};
use futures::Stream;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio_util::io::ReaderStream;
use zip::{CompressionMethod, ZipWriter, write::FileOptions};

use crate::services::stripper::ProcessedFile;
use crate::services::workspace::Session;
use crate::utils::validation::file_extension;

#[derive(Error, Debug)]
pub enum PackageError {
    #[error("nothing to package")]
    Empty,

    #[error("archive I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("archive task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// What the caller downloads after a strip request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultArtifact {
    /// Exactly one file was processed: it is returned as-is
    Single(ProcessedFile),
    /// Several files, bundled flat into one zip
    Archive {
        path: PathBuf,
        filename: String,
        entries: usize,
    },
}

impl ResultArtifact {
    pub fn path(&self) -> &Path {
        match self {
            ResultArtifact::Single(file) => &file.path,
            ResultArtifact::Archive { path, .. } => path,
        }
    }

    pub fn filename(&self) -> &str {
        match self {
            ResultArtifact::Single(file) => &file.filename,
            ResultArtifact::Archive { filename, .. } => filename,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ResultArtifact::Single(file) => content_type_for(&file.filename),
            ResultArtifact::Archive { .. } => "application/zip",
        }
    }
}

/// Decides between a single download and an archive for one session
pub async fn package(
    session: &Session,
    processed: Vec<ProcessedFile>,
) -> Result<ResultArtifact, PackageError> {
    match processed.len() {
        0 => Err(PackageError::Empty),
        1 => Ok(ResultArtifact::Single(
            processed.into_iter().next().ok_or(PackageError::Empty)?,
        )),
        _ => {
            let path = session.archive_path().to_path_buf();
            let filename = format!("cleaned_files_{}.zip", session.id());
            let target = path.clone();
            let entries =
                tokio::task::spawn_blocking(move || build_archive(&target, &processed)).await??;

            tracing::info!(
                "Packaged {} files into {} for session {}",
                entries,
                filename,
                session.id()
            );
            Ok(ResultArtifact::Archive {
                path,
                filename,
                entries,
            })
        }
    }
}

/// Writes a flat zip: one entry per distinct filename, no directories.
/// Returns the number of entries written.
pub fn build_archive(target: &Path, files: &[ProcessedFile]) -> Result<usize, PackageError> {
    let mut zip = ZipWriter::new(BufWriter::new(File::create(target)?));
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    // Same-name uploads share one file on disk (last write wins)
    let mut seen = HashSet::new();
    for file in files {
        if !seen.insert(file.filename.as_str()) {
            continue;
        }
        zip.start_file(file.filename.as_str(), options)?;
        let mut reader = BufReader::new(File::open(&file.path)?);
        std::io::copy(&mut reader, &mut zip)?;
    }

    zip.finish()?;
    Ok(seen.len())
}

/// Builds the attachment response. The session travels inside the body and
/// is dropped, removing every temporary file, only once the body is done:
/// fully sent, or abandoned by a disconnecting client.
pub async fn into_response(
    artifact: ResultArtifact,
    session: Session,
) -> Result<Response, PackageError> {
    let file = tokio::fs::File::open(artifact.path()).await?;
    let length = file.metadata().await?.len();

    let body = Body::from_stream(SessionBody {
        inner: ReaderStream::new(file),
        _session: session,
    });

    let headers = [
        (header::CONTENT_TYPE, artifact.content_type().to_string()),
        (header::CONTENT_LENGTH, length.to_string()),
        (
            header::CONTENT_DISPOSITION,
            content_disposition(artifact.filename()),
        ),
    ];

    Ok((headers, body).into_response())
}

/// Body stream that keeps its session alive until the stream is dropped
struct SessionBody<S> {
    inner: S,
    _session: Session,
}

impl<S: Stream + Unpin> Stream for SessionBody<S> {
    type Item = S::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 UTF-8 name
pub fn content_disposition(filename: &str) -> String {
    let ascii_filename = filename
        .chars()
        .filter(|c| c.is_ascii() && !c.is_control() && *c != '"' && *c != '\\' && *c != ';')
        .collect::<String>();
    let fallback_filename = if ascii_filename.is_empty() {
        "file"
    } else {
        &ascii_filename
    };

    let encoded_filename = utf8_percent_encode(filename, NON_ALPHANUMERIC).to_string();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback_filename, encoded_filename
    )
}

fn content_type_for(filename: &str) -> &'static str {
    match file_extension(filename).as_deref() {
        Some("jpg" | "jpeg" | "jpe") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("tif" | "tiff") => "image/tiff",
        Some("heic") => "image/heic",
        Some("heif" | "hif") => "image/heif",
        Some("avif") => "image/avif",
        Some("jxl") => "image/jxl",
        Some("jp2") => "image/jp2",
        Some("psd") => "image/vnd.adobe.photoshop",
        Some("pdf") => "application/pdf",
        Some("ps" | "eps" | "epsf" | "ai") => "application/postscript",
        Some("xmp") => "application/rdf+xml",
        Some("mp4" | "m4v") => "video/mp4",
        Some("mov" | "qt") => "video/quicktime",
        Some("3gp" | "3gpp") => "video/3gpp",
        Some("3g2") => "video/3gpp2",
        Some("m4a" | "m4b" | "m4p") => "audio/mp4",
        _ => "application/octet-stream",
    }
}
