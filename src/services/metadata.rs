use std::path::Path;
use std::sync::Arc;

use crate::services::engine::{EngineError, MetadataEngine, MetadataRecord};

/// Technical and structural fields that say nothing about who made a file or
/// where: file-system attributes, container bookkeeping, codec and colour
/// housekeeping. They are dropped from every read response.
pub const EXCLUDED_FIELDS: &[&str] = &[
    // File system and tool
    "Directory", "ExifToolVersion", "FileAccessDate", "FileInodeChangeDate", "FileModifyDate",
    "FileName", "FilePermissions", "FileSize", "FileType", "FileTypeExtension", "MIMEType",
    "SourceFile",
    // Documents
    "Linearized", "PDFVersion", "PageCount", "Language", "TaggedPDF",
    // Raster layout
    "BitDepth", "ColorType", "Compression", "Filter", "ImageSize", "ImageWidth", "ImageHeight",
    "Interlace", "Megapixels", "XResolution", "YResolution", "BitsPerSample", "ColorComponents",
    "ColorTransform", "DCTEncodeVersion", "EncodingProcess", "YCbCrSubSampling", "APP14Flags0",
    "APP14Flags1",
    // Chromaticity
    "BlueX", "BlueY", "GreenX", "GreenY", "RedX", "RedY", "WhitePointX", "WhitePointY",
    // Audio/video containers
    "AudioBitsPerSample", "AudioChannels", "AudioFormat", "AudioSampleRate", "AvgBitrate",
    "Balance", "CompatibleBrands", "CompressorID", "CreateDate", "CurrentTime", "Duration",
    "GraphicsMode", "HandlerType", "MajorBrand", "MatrixStructure", "MediaCreateDate",
    "MediaDataOffset", "MediaDataSize", "MediaDuration", "MediaHeaderVersion",
    "MediaLanguageCode", "MediaModifyDate", "MediaTimeScale", "MinorVersion", "ModifyDate",
    "MovieHeaderVersion", "NextTrackID", "OpColor", "PosterTime", "PreferredRate",
    "PreferredVolume", "PreviewDuration", "PreviewTime", "Rotation", "SelectionDuration",
    "SelectionTime", "SourceImageHeight", "SourceImageWidth", "TimeScale", "TrackCreateDate",
    "TrackDuration", "TrackHeaderVersion", "TrackID", "TrackLayer", "TrackModifyDate",
    "TrackVolume", "VideoFrameRate",
];

/// Removes every [`EXCLUDED_FIELDS`] key, leaving the rest untouched
pub fn filter_metadata(mut record: MetadataRecord) -> MetadataRecord {
    record.retain(|key, _| !EXCLUDED_FIELDS.contains(&key.as_str()));
    record
}

/// Read-only side of the pipeline
pub struct MetadataReader {
    engine: Arc<dyn MetadataEngine>,
}

impl MetadataReader {
    pub fn new(engine: Arc<dyn MetadataEngine>) -> Self {
        Self { engine }
    }

    pub async fn read_metadata(&self, path: &Path) -> Result<MetadataRecord, EngineError> {
        let raw = self.engine.extract_metadata(path).await?;
        let total = raw.len();
        let filtered = filter_metadata(raw);

        tracing::debug!(
            "Read {} metadata fields from {} ({} shown)",
            total,
            path.display(),
            filtered.len()
        );
        Ok(filtered)
    }
}
