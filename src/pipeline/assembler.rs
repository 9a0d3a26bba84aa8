// リクエスト単位: 受付 → ファイル単位処理 → PDF組立 → 圧縮 → 出力検証

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ab_glyph::FontVec;
use rayon::prelude::*;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use super::batch::{Batch, FileRecord, SkipRecord};
use super::file_processor::{FileOutcome, FileStages, label_pages, process_file};
use super::naming::{derive_output_filename, derive_output_stem, ordered_name};
use super::workspace::{CleanupHandle, RequestWorkspace};
use crate::config::merged::MergedConfig;
use crate::config::settings::Settings;
use crate::error::SnapMergeError;
use crate::imaging::font::resolve_label_font;
use crate::imaging::label::LabelStyle;
use crate::imaging::optimize::OptimizeParams;
use crate::intake::{MergeMode, UploadedFile};
use crate::pdf::archive::{ArchiveEntry, unique_entry_names, write_archive};
use crate::pdf::optimizer::{compress_document, compress_file_in_place};
use crate::pdf::writer::{PageLayout, render_document};
use crate::response::ResponseMetadata;

const MERGED_OUTPUT: &str = "output.pdf";
const SPLIT_OUTPUT: &str = "documents.zip";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyState {
    Idle,
    Receiving,
    PerFileProcessing,
    Rendering,
    Compressing,
    Done,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Zip,
}

impl DocumentKind {
    pub fn media_type(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "application/pdf",
            DocumentKind::Zip => "application/zip",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Zip => "zip",
        }
    }
}

/// Result of a successful request.
///
/// The document lives inside the request workspace; call
/// [`MergeOutcome::schedule_cleanup`] once it has been delivered. Dropping
/// the outcome removes the workspace immediately.
pub struct MergeOutcome {
    pub document_path: PathBuf,
    pub kind: DocumentKind,
    pub metadata: ResponseMetadata,
    pub records: Vec<FileRecord>,
    /// Whether post-compression replaced the rendered output.
    pub compressed: bool,
    workspace: RequestWorkspace,
}

impl MergeOutcome {
    pub fn read_document(&self) -> crate::error::Result<Vec<u8>> {
        Ok(std::fs::read(&self.document_path)?)
    }

    /// Copy the document out of the workspace.
    pub fn save_document(&self, target: &Path) -> crate::error::Result<u64> {
        Ok(std::fs::copy(&self.document_path, target)?)
    }

    pub fn schedule_cleanup(self, grace: Duration) -> CleanupHandle {
        self.workspace.schedule_cleanup(grace)
    }
}

/// Drives one request through the pipeline.
pub struct Assembler {
    settings: Settings,
    font: Option<Arc<FontVec>>,
    pool: Option<rayon::ThreadPool>,
    state: AssemblyState,
}

impl Assembler {
    /// Build an assembler, resolving the label font when labels are enabled.
    pub fn new(config: MergedConfig) -> crate::error::Result<Self> {
        let font = if config.settings().add_labels {
            resolve_label_font(config.settings().label_font_path.as_deref())
        } else {
            None
        };
        Self::with_font(config, font)
    }

    /// Build an assembler with an explicit label font (`None` draws blank strips).
    pub fn with_font(
        config: MergedConfig,
        font: Option<Arc<FontVec>>,
    ) -> crate::error::Result<Self> {
        let settings = config.into_settings();
        let pool = if settings.parallel_workers > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(settings.parallel_workers)
                .build()
                .map_err(|e| SnapMergeError::config(format!("cannot build worker pool: {e}")))?;
            Some(pool)
        } else {
            None
        };

        Ok(Self {
            settings,
            font,
            pool,
            state: AssemblyState::Idle,
        })
    }

    pub fn state(&self) -> AssemblyState {
        self.state
    }

    /// Grace period before a delivered request's workspace is removed.
    pub fn cleanup_grace(&self) -> Duration {
        Duration::from_secs(self.settings.cleanup_grace_secs)
    }

    fn transition(&mut self, next: AssemblyState) {
        debug!(from = ?self.state, to = ?next, "state transition");
        self.state = next;
    }

    /// Process `files` in upload order and produce one PDF (merge) or a ZIP of
    /// single-page PDFs (split).
    pub fn run(
        &mut self,
        files: &[UploadedFile],
        mode: MergeMode,
    ) -> crate::error::Result<MergeOutcome> {
        self.transition(AssemblyState::Receiving);
        if files.is_empty() {
            self.transition(AssemblyState::Failed);
            return Err(SnapMergeError::NoFilesProvided);
        }

        let request_id = Uuid::new_v4();
        let span = info_span!("request", %request_id, files = files.len(), ?mode);
        let _enter = span.enter();
        info!("request received");

        let (workspace, store_failures) = match self.prepare_workspace(files, request_id) {
            Ok(prepared) => prepared,
            Err(e) => {
                self.transition(AssemblyState::Failed);
                return Err(e);
            }
        };

        self.transition(AssemblyState::PerFileProcessing);
        let batch = self.process_files(files, &store_failures);
        if batch.is_empty() {
            self.transition(AssemblyState::Failed);
            workspace.discard();
            return Err(SnapMergeError::NoValidImages {
                skipped: batch.into_skipped(),
            });
        }
        info!(
            processed = batch.len(),
            skipped = batch.skipped().len(),
            "per-file processing finished"
        );

        let assembled = match mode {
            MergeMode::Merge => self.assemble_merged(&batch, &workspace),
            MergeMode::Split => self.assemble_split(&batch, &workspace),
        };
        let (document_path, kind, compressed) = match assembled {
            Ok(done) => done,
            Err(e) => {
                self.transition(AssemblyState::Failed);
                workspace.discard();
                return Err(e);
            }
        };

        if let Err(e) = verify_output(&document_path) {
            self.transition(AssemblyState::Failed);
            workspace.discard();
            return Err(e);
        }
        self.transition(AssemblyState::Done);

        let metadata = build_metadata(&batch, files.len(), kind);
        info!(
            filename = %metadata.suggested_filename,
            processed = metadata.processed_images,
            skipped = metadata.skipped_files,
            "request done"
        );

        Ok(MergeOutcome {
            document_path,
            kind,
            metadata,
            records: batch.records().to_vec(),
            compressed,
            workspace,
        })
    }

    /// Create the request workspace and store every upload in it.
    ///
    /// Only a workspace that cannot be created fails the request. An upload
    /// that cannot be written comes back as a skip at its index.
    fn prepare_workspace(
        &self,
        files: &[UploadedFile],
        request_id: Uuid,
    ) -> crate::error::Result<(RequestWorkspace, Vec<Option<SkipRecord>>)> {
        let workspace = RequestWorkspace::create(self.settings.temp_dir.as_deref(), request_id)?;
        let failures = files
            .iter()
            .enumerate()
            .map(|(index, file)| {
                let name = ordered_name(index, &file.filename);
                match workspace.persist_upload(&name, &file.bytes) {
                    Ok(_) => None,
                    Err(e) => {
                        warn!(file = %file.filename, error = %e, "cannot store upload");
                        Some(SkipRecord {
                            filename: file.filename.clone(),
                            reason: format!("cannot store upload: {e}"),
                        })
                    }
                }
            })
            .collect();
        Ok((workspace, failures))
    }

    fn stages(&self) -> FileStages<'_> {
        FileStages {
            optimize: OptimizeParams {
                max_width: self.settings.max_width,
                max_height: self.settings.max_height,
                quality: self.settings.optimize_quality,
            },
            label: self.settings.add_labels.then_some(LabelStyle {
                margin_px: self.settings.label_margin_px,
                font_min: self.settings.label_font_min,
                font_max: self.settings.label_font_max,
            }),
            font: self.font.as_deref(),
        }
    }

    /// Per-file stages run in parallel; results are collected in upload order.
    fn process_files(&self, files: &[UploadedFile], store_failures: &[Option<SkipRecord>]) -> Batch {
        let stages = self.stages();
        let run = || -> Vec<FileOutcome> {
            let outcomes: Vec<FileOutcome> = files
                .par_iter()
                .enumerate()
                .map(|(index, file)| match store_failures.get(index).cloned().flatten() {
                    Some(skip) => FileOutcome::Skipped(skip),
                    None => process_file(index, file, &stages),
                })
                .collect();
            label_pages(outcomes, &stages)
        };
        let outcomes = match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        };

        let mut batch = Batch::new();
        for outcome in outcomes {
            match outcome {
                FileOutcome::Processed { image, record } => batch.push(image, record),
                FileOutcome::Skipped(skip) => batch.skip(skip),
            }
        }
        batch
    }

    fn page_layout(&self) -> PageLayout {
        PageLayout {
            width: self.settings.page_width_pt,
            height: self.settings.page_height_pt,
            margin: self.settings.page_margin_pt,
        }
    }

    fn assemble_merged(
        &mut self,
        batch: &Batch,
        workspace: &RequestWorkspace,
    ) -> crate::error::Result<(PathBuf, DocumentKind, bool)> {
        self.transition(AssemblyState::Rendering);
        let pdf = render_document(batch.images(), self.page_layout(), self.settings.embed_quality)
            .map_err(|e| SnapMergeError::pdf_creation(e.to_string()))?;
        let path = workspace.file(MERGED_OUTPUT);
        std::fs::write(&path, &pdf)?;

        let mut compressed = false;
        if self.settings.compress {
            self.transition(AssemblyState::Compressing);
            match compress_file_in_place(&path) {
                Ok(report) => {
                    debug!(?report, "post-compression applied");
                    compressed = true;
                }
                Err(e) => warn!(error = %e, "post-compression skipped, keeping uncompressed PDF"),
            }
        }

        Ok((path, DocumentKind::Pdf, compressed))
    }

    fn assemble_split(
        &mut self,
        batch: &Batch,
        workspace: &RequestWorkspace,
    ) -> crate::error::Result<(PathBuf, DocumentKind, bool)> {
        self.transition(AssemblyState::Rendering);
        let layout = self.page_layout();
        let mut documents = Vec::with_capacity(batch.len());
        for image in batch.images() {
            let pdf = render_document(std::slice::from_ref(image), layout, self.settings.embed_quality)
                .map_err(|e| SnapMergeError::pdf_creation(e.to_string()))?;
            documents.push(pdf);
        }

        let mut all_compressed = self.settings.compress;
        if self.settings.compress {
            self.transition(AssemblyState::Compressing);
            for (pdf, record) in documents.iter_mut().zip(batch.records()) {
                match compress_document(pdf) {
                    Ok(smaller) => *pdf = smaller,
                    Err(e) => {
                        all_compressed = false;
                        warn!(
                            file = %record.original_name,
                            error = %e,
                            "post-compression skipped for split document"
                        );
                    }
                }
            }
        }

        let stems: Vec<String> = batch
            .records()
            .iter()
            .map(|r| derive_output_stem(std::slice::from_ref(r), 1))
            .collect();
        let entries: Vec<ArchiveEntry> = unique_entry_names(&stems, "pdf")
            .into_iter()
            .zip(documents)
            .map(|(name, bytes)| ArchiveEntry { name, bytes })
            .collect();

        let archive = write_archive(&entries)?;
        let path = workspace.file(SPLIT_OUTPUT);
        std::fs::write(&path, archive)?;

        Ok((path, DocumentKind::Zip, all_compressed))
    }
}

/// The delivered file must exist and be non-empty.
pub fn verify_output(path: &Path) -> crate::error::Result<()> {
    let meta = std::fs::metadata(path).map_err(|e| {
        SnapMergeError::missing_output(format!("{}: {e}", path.display()))
    })?;
    if meta.len() == 0 {
        return Err(SnapMergeError::empty_output(format!(
            "{} is zero bytes",
            path.display()
        )));
    }
    Ok(())
}

fn build_metadata(batch: &Batch, total_files: usize, kind: DocumentKind) -> ResponseMetadata {
    let skipped: Vec<SkipRecord> = batch.skipped().to_vec();
    ResponseMetadata {
        processed_images: batch.len(),
        total_files,
        skipped_files: skipped.len(),
        suggested_filename: derive_output_filename(batch.records(), batch.len(), kind.extension()),
        media_type: kind.media_type(),
        skipped,
    }
}
