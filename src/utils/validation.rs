/// Extensions the metadata engine can read and rewrite: raster, raw, vector,
/// video, audio and document containers that carry EXIF/XMP/IPTC/ICC data.
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "3g2", "3gp2", "3gp", "3gpp", "aax", "ai", "ait", "arq", "arw", "avif", "cr2", "cr3", "crm",
    "crw", "ciff", "cs1", "dcp", "dng", "dr4", "dvb", "eps", "epsf", "ps", "erf", "exif", "exv",
    "f4a", "f4b", "f4p", "f4v", "fff", "flif", "gif", "glv", "gpr", "hdp", "wdp", "jxr", "heic",
    "heif", "hif", "icc", "icm", "iiq", "ind", "indd", "indt", "insp", "jp2", "jpf", "jpm", "jpeg",
    "jpg", "jpe", "jxl", "lrv", "m4a", "m4b", "m4p", "m4v", "mef", "mie", "mos", "mov", "qt",
    "mp4", "mpo", "mqv", "mrw", "nef", "nksc", "nrw", "orf", "ori", "pdf", "pef", "png", "jng",
    "mng", "ppm", "pbm", "pgm", "psd", "psb", "psdt", "qtif", "qti", "qif", "raf", "raw", "rw2",
    "rwl", "sr2", "srw", "thm", "tiff", "tif", "vrd", "webp", "x3f", "xmp",
];

/// Longest filename (in bytes) kept on disk
const MAX_FILENAME_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Returns the lowercased text after the final '.', if there is one
pub fn file_extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
}

/// True only when the filename has an extension from [`ALLOWED_EXTENSIONS`]
pub fn is_allowed_file(filename: &str) -> bool {
    file_extension(filename).is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

pub fn validate_extension(filename: &str) -> Result<(), ValidationError> {
    if is_allowed_file(filename) {
        return Ok(());
    }

    Err(ValidationError {
        code: "EXTENSION_NOT_ALLOWED",
        message: format!("File {} not allowed.", filename),
    })
}

/// Validates file size against maximum limit
pub fn validate_file_size(filename: &str, size: usize, max_size: usize) -> Result<(), ValidationError> {
    if size > max_size {
        return Err(ValidationError {
            code: "FILE_TOO_LARGE",
            message: format!(
                "File {} exceeds the {}MB limit.",
                filename,
                max_size / 1024 / 1024
            ),
        });
    }
    Ok(())
}

/// Reduces a client-supplied filename to a single safe path component.
///
/// Directory parts (either separator style) are dropped and reserved or
/// control characters are replaced with '_', so the result can be joined onto
/// a session directory without escaping it.
pub fn sanitize_filename(filename: &str) -> Result<String, ValidationError> {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or("").trim();

    if name.is_empty() || name == "." || name == ".." {
        return Err(ValidationError {
            code: "INVALID_FILENAME",
            message: "Invalid file name".to_string(),
        });
    }

    if name.len() != filename.len() {
        tracing::warn!("Path components stripped from upload name: {}", filename);
    }

    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_control() || matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|' | ';') {
                '_'
            } else {
                c
            }
        })
        .collect();

    // Keep the extension intact when trimming over-long names
    if sanitized.len() > MAX_FILENAME_LEN {
        let ext = file_extension(&sanitized)
            .filter(|e| e.len() < 16)
            .map(|e| format!(".{}", e))
            .unwrap_or_default();
        let mut end = MAX_FILENAME_LEN - ext.len();
        while !sanitized.is_char_boundary(end) {
            end -= 1;
        }
        return Ok(format!("{}{}", &sanitized[..end], ext));
    }

    Ok(sanitized)
}
