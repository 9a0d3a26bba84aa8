//! Upload intake: the ordered list of files handed to the pipeline, and the
//! read-only preview of that list.

use serde::Serialize;

/// One uploaded file. Order in the surrounding `Vec` is upload order.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Build an upload whose content type is guessed from the filename.
    pub fn from_name(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        let filename = filename.into();
        let content_type = guess_content_type(&filename).to_string();
        Self {
            filename,
            content_type,
            bytes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMode {
    /// All surviving images become pages of one PDF.
    #[default]
    Merge,
    /// One single-page PDF per surviving image, bundled as a ZIP.
    Split,
}

impl std::str::FromStr for MergeMode {
    type Err = crate::error::SnapMergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "merge" => Ok(MergeMode::Merge),
            "split" => Ok(MergeMode::Split),
            other => Err(crate::error::SnapMergeError::config(format!(
                "unknown mode '{other}' (expected 'merge' or 'split')"
            ))),
        }
    }
}

/// Advisory content type from the extension. Never used to reject a file.
pub fn guess_content_type(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PreviewEntry {
    pub index: usize,
    pub filename: String,
    pub content_type: String,
    pub size: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviewReport {
    pub files: Vec<PreviewEntry>,
    pub message: String,
}

/// Dry run: describe what would be processed, in order, without touching the
/// pixel data.
pub fn preview(files: &[UploadedFile]) -> PreviewReport {
    let entries: Vec<PreviewEntry> = files
        .iter()
        .enumerate()
        .map(|(index, f)| PreviewEntry {
            index,
            filename: f.filename.clone(),
            content_type: f.content_type.clone(),
            size: f.bytes.len(),
        })
        .collect();

    let message = if entries.is_empty() {
        "No files to process".to_string()
    } else {
        let order: Vec<&str> = entries.iter().map(|e| e.filename.as_str()).collect();
        format!("Files will be processed in this order: {}", order.join(" → "))
    };

    PreviewReport {
        files: entries,
        message,
    }
}
