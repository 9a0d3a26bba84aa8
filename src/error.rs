use thiserror::Error;

use crate::pipeline::batch::SkipRecord;

/// How many skip reasons are spelled out before the rest is summarised.
pub const SKIP_SAMPLE_LIMIT: usize = 3;

#[derive(Debug, Error)]
pub enum SnapMergeError {
    #[error("No files provided")]
    NoFilesProvided,

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("{}", no_valid_images_message(.skipped))]
    NoValidImages { skipped: Vec<SkipRecord> },

    #[error("PDF creation failed: {0}")]
    PdfCreationFailed(String),

    #[error("Compression failed: {0}")]
    CompressionFailed(String),

    #[error("Output is empty: {0}")]
    EmptyOutput(String),

    #[error("Output is missing: {0}")]
    MissingOutput(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("JPEG encode error: {0}")]
    JpegEncodeError(String),

    #[error("Archive error: {0}")]
    ArchiveError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Generates factory methods for [`SnapMergeError`] variants that wrap a `String`.
macro_rules! error_constructors {
    ($(
        $(#[doc = $doc:expr])*
        $method:ident => $variant:ident
    ),* $(,)?) => {
        impl SnapMergeError {
            $(
                $(#[doc = $doc])*
                pub fn $method(msg: impl Into<String>) -> Self {
                    Self::$variant(msg.into())
                }
            )*
        }
    };
}

error_constructors! {
    /// Create a per-file decode error.
    decode => DecodeError,
    /// Create a PDF creation error.
    pdf_creation => PdfCreationFailed,
    /// Create a compression error.
    compression => CompressionFailed,
    /// Create an empty-output error.
    empty_output => EmptyOutput,
    /// Create a missing-output error.
    missing_output => MissingOutput,
    /// Create a configuration error.
    config => ConfigError,
    /// Create a JPEG encode error.
    jpeg_encode => JpegEncodeError,
    /// Create an archive error.
    archive => ArchiveError,
}

impl SnapMergeError {
    /// Files that were skipped, when the error carries them.
    pub fn skipped_files(&self) -> Option<&[SkipRecord]> {
        match self {
            Self::NoValidImages { skipped } => Some(skipped),
            _ => None,
        }
    }
}

fn no_valid_images_message(skipped: &[SkipRecord]) -> String {
    if skipped.is_empty() {
        return "No valid images could be processed".to_string();
    }

    let sample: Vec<String> = skipped
        .iter()
        .take(SKIP_SAMPLE_LIMIT)
        .map(|s| format!("{} ({})", s.filename, s.reason))
        .collect();
    let mut message = format!(
        "No valid images could be processed. Skipped: {}",
        sample.join("; ")
    );
    if skipped.len() > SKIP_SAMPLE_LIMIT {
        message.push_str(&format!(" and {} more", skipped.len() - SKIP_SAMPLE_LIMIT));
    }
    message
}

impl From<lopdf::Error> for SnapMergeError {
    fn from(e: lopdf::Error) -> Self {
        Self::PdfCreationFailed(e.to_string())
    }
}

impl From<serde_yml::Error> for SnapMergeError {
    fn from(e: serde_yml::Error) -> Self {
        Self::ConfigError(e.to_string())
    }
}

impl From<zip::result::ZipError> for SnapMergeError {
    fn from(e: zip::result::ZipError) -> Self {
        Self::ArchiveError(e.to_string())
    }
}

impl From<image::ImageError> for SnapMergeError {
    fn from(e: image::ImageError) -> Self {
        Self::JpegEncodeError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SnapMergeError>;
