// ファイル単位処理: 正規化 → 最適化 → ラベル付与
//
// Every per-file failure ends here as `FileOutcome::Skipped`; nothing crosses
// the per-file boundary as an error.

use ab_glyph::FontVec;
use rayon::prelude::*;
use tracing::{debug, warn};

use super::batch::{FileRecord, SkipRecord};
use super::naming::ordered_name;
use crate::imaging::DecodedImage;
use crate::imaging::label::{LabelStyle, compose_label};
use crate::imaging::normalize::normalize;
use crate::imaging::optimize::{OptimizeParams, optimize};
use crate::intake::UploadedFile;

/// Per-file stage configuration shared by every file of a request.
#[derive(Clone, Copy)]
pub struct FileStages<'a> {
    pub optimize: OptimizeParams,
    /// `None` disables labeling.
    pub label: Option<LabelStyle>,
    pub font: Option<&'a FontVec>,
}

/// Tagged result of processing one upload.
#[derive(Debug)]
pub enum FileOutcome {
    Processed {
        image: DecodedImage,
        record: FileRecord,
    },
    Skipped(SkipRecord),
}

impl FileOutcome {
    pub fn skipped(filename: &str, reason: String) -> Self {
        warn!(file = %filename, %reason, "skipping file");
        FileOutcome::Skipped(SkipRecord {
            filename: filename.to_string(),
            reason,
        })
    }
}

/// Run Normalizer → Optimizer on a single upload.
///
/// `sequence_index` is the 0-based position in the upload list. Labels are
/// added afterwards by [`label_pages`], once page positions are known.
pub fn process_file(
    sequence_index: usize,
    file: &UploadedFile,
    stages: &FileStages<'_>,
) -> FileOutcome {
    let normalized = match normalize(&file.bytes, &file.filename) {
        Ok(img) => img,
        Err(e) => return FileOutcome::skipped(&file.filename, e.to_string()),
    };

    let image = match optimize(&normalized, &stages.optimize) {
        Ok(img) => img,
        Err(e) => return FileOutcome::skipped(&file.filename, e.to_string()),
    };

    debug!(
        file = %file.filename,
        index = sequence_index,
        size = ?image.dimensions(),
        "file processed"
    );

    let record = FileRecord {
        original_name: file.filename.clone(),
        ordered_name: ordered_name(sequence_index, &file.filename),
        sequence_index,
        final_size: image.dimensions(),
        final_mode: "RGB",
    };
    FileOutcome::Processed { image, record }
}

/// 1-based page number of each processed outcome; skipped uploads get `None`.
pub fn page_ordinals(outcomes: &[FileOutcome]) -> Vec<Option<usize>> {
    let mut page = 0;
    outcomes
        .iter()
        .map(|outcome| match outcome {
            FileOutcome::Processed { .. } => {
                page += 1;
                Some(page)
            }
            FileOutcome::Skipped(_) => None,
        })
        .collect()
}

/// Caption every processed image, numbering pages after skips are removed.
///
/// Order is preserved. A no-op when labeling is disabled.
pub fn label_pages(outcomes: Vec<FileOutcome>, stages: &FileStages<'_>) -> Vec<FileOutcome> {
    let Some(style) = stages.label else {
        return outcomes;
    };
    let font = stages.font;

    let ordinals = page_ordinals(&outcomes);
    outcomes
        .into_par_iter()
        .zip(ordinals)
        .map(|(outcome, ordinal)| match (outcome, ordinal) {
            (FileOutcome::Processed { image, mut record }, Some(page)) => {
                let image = compose_label(&image, &record.original_name, page, &style, font);
                record.final_size = image.dimensions();
                FileOutcome::Processed { image, record }
            }
            (other, _) => other,
        })
        .collect()
}
