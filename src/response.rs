//! Transport-facing view of a pipeline result: headers for a successful
//! document, structured payloads for failures.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;

use crate::error::SnapMergeError;
use crate::pipeline::batch::SkipRecord;

/// RFC 5987 `attr-char` set: everything outside it is percent-encoded.
const FILENAME_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

pub const HEADER_PROCESSED: &str = "X-Processed-Images";
pub const HEADER_TOTAL: &str = "X-Total-Files";
pub const HEADER_SKIPPED: &str = "X-Skipped-Files";

/// Metadata sent alongside a successful document.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ResponseMetadata {
    pub processed_images: usize,
    pub total_files: usize,
    pub skipped_files: usize,
    pub suggested_filename: String,
    pub media_type: &'static str,
    pub skipped: Vec<SkipRecord>,
}

impl ResponseMetadata {
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Content-Type", self.media_type.to_string()),
            (
                "Content-Disposition",
                content_disposition(&self.suggested_filename),
            ),
            (HEADER_PROCESSED, self.processed_images.to_string()),
            (HEADER_TOTAL, self.total_files.to_string()),
            (HEADER_SKIPPED, self.skipped_files.to_string()),
        ]
    }
}

/// `attachment` disposition with an ASCII fallback and a UTF-8 `filename*`.
pub fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let encoded = utf8_percent_encode(filename, FILENAME_ENCODE_SET);
    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

/// Body returned for a failed request.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorPayload {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped_files: Option<Vec<SkipRecord>>,
}

impl From<&SnapMergeError> for ErrorPayload {
    fn from(err: &SnapMergeError) -> Self {
        Self {
            error: err.to_string(),
            skipped_files: err.skipped_files().map(<[SkipRecord]>::to_vec),
        }
    }
}

impl ErrorPayload {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{{\"error\":{:?}}}", self.error))
    }
}

/// HTTP status a transport layer should use for `err`.
///
/// An empty upload is a validation problem; everything else that reaches
/// the caller is a processing failure.
pub fn status_code(err: &SnapMergeError) -> u16 {
    match err {
        SnapMergeError::NoFilesProvided | SnapMergeError::ConfigError(_) => 400,
        SnapMergeError::NoValidImages { .. } | SnapMergeError::DecodeError(_) => 422,
        _ => 500,
    }
}
