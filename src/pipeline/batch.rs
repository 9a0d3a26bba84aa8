use serde::Serialize;

use crate::imaging::DecodedImage;

/// Metadata for one file that made it into the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub original_name: String,
    /// `NNN_<name>`, the name used when the upload is persisted.
    pub ordered_name: String,
    /// Position in the upload list (0-based), skipped files included.
    pub sequence_index: usize,
    /// Final (width, height) after optimization and labeling.
    pub final_size: (u32, u32),
    pub final_mode: &'static str,
}

/// A file that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkipRecord {
    pub filename: String,
    pub reason: String,
}

/// Survivors in upload order, plus whatever was skipped.
///
/// `images[i]` and `records[i]` always describe the same page.
#[derive(Debug, Default)]
pub struct Batch {
    images: Vec<DecodedImage>,
    records: Vec<FileRecord>,
    skipped: Vec<SkipRecord>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, image: DecodedImage, record: FileRecord) {
        self.images.push(image);
        self.records.push(record);
    }

    pub fn skip(&mut self, record: SkipRecord) {
        self.skipped.push(record);
    }

    pub fn images(&self) -> &[DecodedImage] {
        &self.images
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    pub fn skipped(&self) -> &[SkipRecord] {
        &self.skipped
    }

    pub fn into_skipped(self) -> Vec<SkipRecord> {
        self.skipped
    }

    /// Number of pages the batch will produce.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}
