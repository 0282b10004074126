//! Packaging orchestrator: PDFs + sidecars → one CBZ per chapter.
//!
//! ## Document lifecycle
//!
//! ```text
//! Discovered ──▶ InfoLoaded ──▶ SplitPlanned ─┬─▶ RangesProcessed ──▶ Cleaned ──▶ Done
//!                          └──▶ SinglePlanned ┘
//!            (any state) ──▶ Failed
//! ```
//!
//! Documents are processed one at a time and ranges one at a time, in page
//! order. A failing range never stops the document, and a failing document
//! never stops the batch: every outcome lands in a [`DocumentReport`].
//!
//! ## Why keep the source when a range fails?
//!
//! The source PDF and its sidecars are the only way to regenerate a missing
//! chapter. Cleanup therefore only runs when every range either produced an
//! archive or was legitimately empty, and at least one archive exists.
//!
//! ## Why re-check existing archives before rendering?
//!
//! Rendering is by far the slowest step. When overwriting is off, a range
//! whose archive (or its prefix-stripped twin, produced by an earlier run's
//! post-pass) already exists is skipped before any page is rasterised, which
//! makes re-running over a half-finished library cheap.

use crate::config::PipelineConfig;
use crate::error::{Book2CbzError, RangeError};
use crate::output::{
    DocumentOutcome, DocumentReport, DocumentState, RangeOutcome, RangeReport, RenameOutcome,
    RenameReport, RunSummary,
};
use crate::pipeline::archive::{plan_archive, write_archive, ArchivePlan};
use crate::pipeline::comicinfo::render_comic_info;
use crate::pipeline::crop::{crop_margins, CropOutcome};
use crate::pipeline::outline::chapter_starts;
use crate::pipeline::ranges::{plan_ranges, PageRange, SplitPlan};
use crate::pipeline::rasterize::{resolve_rasterizer, Rasterizer};
use crate::pipeline::{input, sidecar};
use crate::prepare::prepare_directory;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

// ── Planning ─────────────────────────────────────────────────────────────

/// One chapter range and the archive it produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRange {
    /// 1-based chapter number.
    pub chapter: usize,
    pub range: PageRange,
    pub archive: PathBuf,
}

/// Everything decided about a document before any page is rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPlan {
    pub source: PathBuf,
    pub chapters_sidecar: PathBuf,
    pub metadata_sidecar: PathBuf,
    pub chapter_starts: Vec<u32>,
    pub split: SplitPlan,
    pub ranges: Vec<PlannedRange>,
}

/// All `*.pdf` files under `root`, sorted.
pub fn discover_documents(root: &Path) -> Result<Vec<PathBuf>, Book2CbzError> {
    input::discover_files(root, "pdf")
}

/// Archive file name for a chapter, or for the whole book when `chapter` is `None`.
pub fn archive_name(stem: &str, chapter: Option<usize>) -> String {
    match chapter {
        Some(n) => format!("{stem} Chapter {n}.cbz"),
        None => format!("{stem}.cbz"),
    }
}

/// Plan a document from its sidecars.
///
/// A missing chapters sidecar means "no chapters"; a malformed one is
/// logged and treated the same way.
pub fn plan_document(pdf: &Path, config: &PipelineConfig) -> DocumentPlan {
    let chapters_sidecar = sidecar::chapters_path(pdf);
    let metadata_sidecar = sidecar::metadata_path(pdf);

    let entries = match sidecar::read_chapters(&chapters_sidecar) {
        Ok(Some(entries)) => entries,
        Ok(None) => {
            warn!("Chapter info file not found: {}", chapters_sidecar.display());
            Vec::new()
        }
        Err(e) => {
            warn!("Ignoring chapter info: {}", e);
            Vec::new()
        }
    };

    let starts = chapter_starts(&entries, config.chapter_page_threshold);
    let split = plan_ranges(&starts, config.min_chapters_for_split);
    debug!("{}: chapter starts {:?}", pdf.display(), starts);

    let dir = pdf.parent().unwrap_or_else(|| Path::new(""));
    let stem = sidecar::document_stem(pdf);
    let ranges = match &split {
        SplitPlan::Whole(range) => vec![PlannedRange {
            chapter: 1,
            range: *range,
            archive: dir.join(archive_name(&stem, None)),
        }],
        SplitPlan::Chapters(ranges) => ranges
            .iter()
            .enumerate()
            .map(|(i, range)| PlannedRange {
                chapter: i + 1,
                range: *range,
                archive: dir.join(archive_name(&stem, Some(i + 1))),
            })
            .collect(),
    };

    DocumentPlan {
        source: pdf.to_path_buf(),
        chapters_sidecar,
        metadata_sidecar,
        chapter_starts: starts,
        split,
        ranges,
    }
}

/// `target` with `prefix` removed from its file name, if it starts with it.
pub fn stripped_twin(target: &Path, prefix: &str) -> Option<PathBuf> {
    if prefix.is_empty() {
        return None;
    }
    let name = target.file_name()?.to_str()?;
    let rest = name.strip_prefix(prefix)?;
    if rest.is_empty() {
        return None;
    }
    Some(target.with_file_name(rest))
}

fn archive_already_present(target: &Path, config: &PipelineConfig) -> bool {
    if target.exists() {
        return true;
    }
    config.strip_prefix
        && stripped_twin(target, &config.archive_prefix).is_some_and(|twin| twin.exists())
}

// ── Execution ────────────────────────────────────────────────────────────

/// Package one document. Never returns an error: failures are recorded in
/// the report.
pub async fn package_document(pdf: &Path, config: &PipelineConfig) -> DocumentReport {
    let rasterizer = resolve_rasterizer(config);
    package_document_with(pdf, config, &rasterizer, 1).await
}

pub(crate) async fn package_document_with(
    pdf: &Path,
    config: &PipelineConfig,
    rasterizer: &Arc<dyn Rasterizer>,
    index: usize,
) -> DocumentReport {
    let start = Instant::now();
    let mut report = DocumentReport::new(pdf.to_path_buf());
    let doc_name = pdf
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if !pdf.exists() {
        report.outcome = DocumentOutcome::Skipped {
            reason: "source no longer exists".to_string(),
        };
        return finish(report, start, config, &doc_name);
    }
    if let Err(e) = input::validate_pdf(pdf) {
        error!("Cannot package {}: {}", pdf.display(), e);
        return fail(report, e.to_string(), start, config, &doc_name);
    }

    // ── Plan ─────────────────────────────────────────────────────────────
    let plan = plan_document(pdf, config);
    advance(&mut report, DocumentState::InfoLoaded);
    report.chapter_starts = plan.chapter_starts.clone();
    report.split = plan.split.is_split();
    let planned_state = if report.split {
        info!(
            "Found {} chapter breaks in {}",
            plan.chapter_starts.len(),
            doc_name
        );
        DocumentState::SplitPlanned
    } else {
        info!("No chapter split for {}; packaging as one archive", doc_name);
        DocumentState::SinglePlanned
    };
    advance(&mut report, planned_state);

    let total = plan.ranges.len();
    if let Some(cb) = &config.progress_callback {
        cb.on_document_start(&doc_name, index, total);
    }

    let dir = pdf.parent().unwrap_or_else(|| Path::new("."));
    let scratch = match tempfile::Builder::new()
        .prefix(".book2cbz-")
        .tempdir_in(dir)
    {
        Ok(t) => t,
        Err(e) => {
            let reason = format!("cannot create scratch directory in {}: {}", dir.display(), e);
            return fail(report, reason, start, config, &doc_name);
        }
    };
    debug!("Created temporary directory: {}", scratch.path().display());

    // ── Ranges ───────────────────────────────────────────────────────────
    for planned in &plan.ranges {
        if let Some(cb) = &config.progress_callback {
            cb.on_range_start(&doc_name, planned.chapter, total);
        }
        let images_dir = scratch.path().join(format!("chapter_{}", planned.chapter));
        let outcome = process_range(pdf, planned, &plan, config, rasterizer, &images_dir).await;
        remove_dir_quietly(&images_dir);

        if let Some(cb) = &config.progress_callback {
            match &outcome {
                RangeOutcome::Failed { error } => {
                    cb.on_range_error(&doc_name, planned.chapter, total, &error.to_string())
                }
                RangeOutcome::Written { images, .. } => {
                    cb.on_range_complete(&doc_name, planned.chapter, total, *images)
                }
                _ => cb.on_range_complete(&doc_name, planned.chapter, total, 0),
            }
        }

        report.ranges.push(RangeReport {
            chapter: planned.chapter,
            range: planned.range,
            archive: planned.archive.clone(),
            outcome,
        });
    }
    advance(&mut report, DocumentState::RangesProcessed);

    if let Err(e) = scratch.close() {
        warn!("Could not remove scratch directory: {}", e);
    }

    // ── Cleanup ──────────────────────────────────────────────────────────
    let failed = report.ranges_failed();
    let archived = report.ranges.iter().any(|r| {
        matches!(
            r.outcome,
            RangeOutcome::Written { .. } | RangeOutcome::SkippedExisting
        )
    });
    if failed > 0 {
        warn!(
            "{} of {} ranges failed for {}; keeping source and sidecars",
            failed, total, doc_name
        );
    } else if !archived {
        warn!("No archive produced for {}; keeping source and sidecars", doc_name);
    } else {
        report.removed = cleanup_inputs(&plan, config);
    }
    advance(&mut report, DocumentState::Cleaned);
    advance(&mut report, DocumentState::Done);
    finish(report, start, config, &doc_name)
}

async fn process_range(
    pdf: &Path,
    planned: &PlannedRange,
    plan: &DocumentPlan,
    config: &PipelineConfig,
    rasterizer: &Arc<dyn Rasterizer>,
    images_dir: &Path,
) -> RangeOutcome {
    let chapter = planned.chapter;

    if !config.overwrite_existing && archive_already_present(&planned.archive, config) {
        warn!(
            "CBZ file already exists: {}. Skipping creation.",
            planned.archive.display()
        );
        return RangeOutcome::SkippedExisting;
    }

    info!(
        "Processing Chapter {}: pages {}",
        chapter, planned.range
    );

    // ── Rasterise + crop (blocking) ──────────────────────────────────────
    let images = {
        let rasterizer = Arc::clone(rasterizer);
        let source = pdf.to_path_buf();
        let out_dir = images_dir.to_path_buf();
        let range = planned.range;
        let crop = config.crop_settings();
        tokio::task::spawn_blocking(move || -> Result<Vec<PathBuf>, Book2CbzError> {
            let images = rasterizer.rasterize(&source, range, &out_dir)?;
            for image in &images {
                match crop_margins(image, &crop) {
                    Ok(CropOutcome::Cropped { .. }) | Ok(CropOutcome::Disabled) => {}
                    Ok(other) => debug!("{}: {:?}", image.display(), other),
                    Err(e) => warn!("Leaving {} uncropped: {}", image.display(), e),
                }
            }
            Ok(images)
        })
        .await
        .map_err(|e| Book2CbzError::Internal(format!("Render task panicked: {}", e)))
        .and_then(|r| r)
    };

    let images = match images {
        Ok(images) => images,
        Err(e) => {
            error!("Chapter {} of {}: {}", chapter, pdf.display(), e);
            return RangeOutcome::Failed {
                error: RangeError::RenderFailed {
                    chapter,
                    detail: e.to_string(),
                },
            };
        }
    };

    // ── ComicInfo ────────────────────────────────────────────────────────
    let comic_info = if config.write_comic_info {
        let metadata = match sidecar::read_metadata(&plan.metadata_sidecar) {
            Ok(m) => m.unwrap_or_default(),
            Err(e) => {
                warn!("Ignoring metadata: {}", e);
                Default::default()
            }
        };
        match render_comic_info(&metadata, chapter) {
            Ok(xml) => Some(xml),
            Err(e) => {
                warn!("Skipping ComicInfo for chapter {}: {}", chapter, e);
                None
            }
        }
    } else {
        None
    };

    // ── Archive ──────────────────────────────────────────────────────────
    match plan_archive(
        images,
        planned.archive.exists(),
        config.overwrite_existing,
        comic_info,
    ) {
        ArchivePlan::SkipExisting => RangeOutcome::SkippedExisting,
        ArchivePlan::SkipEmpty => {
            info!("Chapter {} produced no images; no archive written", chapter);
            RangeOutcome::Empty
        }
        ArchivePlan::Write(manifest) => {
            let target = planned.archive.clone();
            let written = tokio::task::spawn_blocking(move || write_archive(&target, &manifest))
                .await
                .map_err(|e| Book2CbzError::Internal(format!("Archive task panicked: {}", e)))
                .and_then(|r| r);
            match written {
                Ok(stats) => {
                    info!("Created CBZ archive: {}", planned.archive.display());
                    RangeOutcome::Written {
                        images: stats.images,
                        bytes: stats.bytes,
                    }
                }
                Err(e) => {
                    error!("Chapter {}: {}", chapter, e);
                    RangeOutcome::Failed {
                        error: RangeError::ArchiveFailed {
                            chapter,
                            detail: e.to_string(),
                        },
                    }
                }
            }
        }
    }
}

/// Delete the source and sidecars as configured. Returns what was removed.
fn cleanup_inputs(plan: &DocumentPlan, config: &PipelineConfig) -> Vec<PathBuf> {
    let mut targets: Vec<&Path> = Vec::new();
    if config.delete_source {
        targets.push(&plan.source);
    }
    if config.delete_sidecars {
        targets.push(&plan.chapters_sidecar);
        targets.push(&plan.metadata_sidecar);
    }

    let mut removed = Vec::new();
    for path in targets {
        match std::fs::remove_file(path) {
            Ok(()) => {
                info!("Removed {}", path.display());
                removed.push(path.to_path_buf());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove {}: {}", path.display(), e),
        }
    }
    removed
}

fn advance(report: &mut DocumentReport, state: DocumentState) {
    debug!(
        "{}: {:?} → {:?}",
        report.source.display(),
        report.state,
        state
    );
    report.state = state;
}

fn remove_dir_quietly(dir: &Path) {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => debug!("Cleaned up image directory: {}", dir.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove {}: {}", dir.display(), e),
    }
}

fn fail(
    mut report: DocumentReport,
    reason: String,
    start: Instant,
    config: &PipelineConfig,
    doc_name: &str,
) -> DocumentReport {
    report.outcome = DocumentOutcome::Failed {
        state: report.state,
        reason,
    };
    advance(&mut report, DocumentState::Failed);
    finish(report, start, config, doc_name)
}

fn finish(
    mut report: DocumentReport,
    start: Instant,
    config: &PipelineConfig,
    doc_name: &str,
) -> DocumentReport {
    report.duration_ms = start.elapsed().as_millis() as u64;
    if let Some(cb) = &config.progress_callback {
        cb.on_document_complete(
            doc_name,
            report.archives_written(),
            report.is_failed() || report.ranges_failed() > 0,
        );
    }
    report
}

// ── Batch ────────────────────────────────────────────────────────────────

/// Package every PDF under `root`, sequentially.
///
/// # Errors
/// Only when `root` cannot be listed. Per-document failures are reported
/// inside the summary.
pub async fn package_directory(
    root: &Path,
    config: &PipelineConfig,
) -> Result<RunSummary, Book2CbzError> {
    let start = Instant::now();
    let documents = discover_documents(root)?;
    info!("Found {} PDF documents under {}", documents.len(), root.display());

    if let Some(cb) = &config.progress_callback {
        cb.on_run_start(documents.len());
    }

    let rasterizer = resolve_rasterizer(config);
    let mut summary = RunSummary::default();
    for (i, pdf) in documents.iter().enumerate() {
        info!("Processing PDF file: {}", pdf.display());
        let report = package_document_with(pdf, config, &rasterizer, i + 1).await;
        summary.documents.push(report);
    }

    summary.stats.total_duration_ms = start.elapsed().as_millis() as u64;
    summary.recount();

    if let Some(cb) = &config.progress_callback {
        cb.on_run_complete(summary.stats.documents, summary.stats.documents_failed);
    }
    Ok(summary)
}

/// Rename every `*.cbz` under `root` whose name starts with `prefix`.
///
/// An existing file at the new name is replaced only when `overwrite` is
/// set. Failures are logged and reported, never fatal.
pub fn strip_archive_prefixes(
    root: &Path,
    prefix: &str,
    overwrite: bool,
) -> Result<Vec<RenameReport>, Book2CbzError> {
    let mut reports = Vec::new();
    for archive in input::discover_files(root, "cbz")? {
        let Some(to) = stripped_twin(&archive, prefix) else {
            continue;
        };

        let outcome = if to.exists() && !overwrite {
            warn!(
                "Not renaming '{}': '{}' already exists",
                archive.display(),
                to.display()
            );
            RenameOutcome::SkippedExisting
        } else {
            match std::fs::rename(&archive, &to) {
                Ok(()) => {
                    info!("Renamed '{}' to '{}'", archive.display(), to.display());
                    RenameOutcome::Renamed
                }
                Err(e) => {
                    error!("Error renaming '{}': {}", archive.display(), e);
                    RenameOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            }
        };
        reports.push(RenameReport {
            from: archive,
            to,
            outcome,
        });
    }
    Ok(reports)
}

// ── Entry points ─────────────────────────────────────────────────────────

/// Run the configured stages over a library folder.
///
/// Preparation (EPUB conversion and sidecars), then packaging, then the
/// prefix post-pass, each gated by [`PipelineConfig::stages`] and
/// [`PipelineConfig::strip_prefix`].
///
/// # Errors
/// Only for fatal setup problems (root missing or unreadable).
pub async fn run(root: impl AsRef<Path>, config: &PipelineConfig) -> Result<RunSummary, Book2CbzError> {
    let start = Instant::now();
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(Book2CbzError::FileNotFound {
            path: root.to_path_buf(),
        });
    }

    let prepare = if config.stages.runs_prepare() {
        Some(prepare_directory(root, config).await?)
    } else {
        None
    };

    let mut summary = if config.stages.runs_package() {
        package_directory(root, config).await?
    } else {
        RunSummary::default()
    };
    summary.prepare = prepare;

    if config.stages.runs_package() && config.strip_prefix {
        summary.renames =
            strip_archive_prefixes(root, &config.archive_prefix, config.overwrite_existing)?;
    }

    summary.stats.total_duration_ms = start.elapsed().as_millis() as u64;
    summary.recount();
    info!(
        "Run complete: {} documents, {} archives written, {} failed ranges, {}ms",
        summary.stats.documents,
        summary.stats.archives_written,
        summary.stats.ranges_failed,
        summary.stats.total_duration_ms
    );
    Ok(summary)
}

/// Synchronous wrapper around [`run`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_sync(root: impl AsRef<Path>, config: &PipelineConfig) -> Result<RunSummary, Book2CbzError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Book2CbzError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run(root, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::outline::OutlineEntry;
    use tempfile::TempDir;

    #[test]
    fn archive_names() {
        assert_eq!(archive_name("V Dune", Some(3)), "V Dune Chapter 3.cbz");
        assert_eq!(archive_name("Dune", None), "Dune.cbz");
    }

    #[test]
    fn stripped_twin_only_for_prefixed_names() {
        assert_eq!(
            stripped_twin(Path::new("/l/V Dune.cbz"), "V "),
            Some(PathBuf::from("/l/Dune.cbz"))
        );
        assert_eq!(stripped_twin(Path::new("/l/Dune.cbz"), "V "), None);
        assert_eq!(stripped_twin(Path::new("/l/V Dune.cbz"), ""), None);
    }

    #[test]
    fn plan_without_sidecar_is_whole_document() {
        let dir = TempDir::new().unwrap();
        let pdf = dir.path().join("Book.pdf");
        let plan = plan_document(&pdf, &PipelineConfig::default());
        assert!(!plan.split.is_split());
        assert_eq!(plan.ranges.len(), 1);
        assert_eq!(plan.ranges[0].archive, dir.path().join("Book.cbz"));
        assert_eq!(plan.ranges[0].range, PageRange::whole());
    }

    #[test]
    fn plan_with_sidecar_splits_into_named_chapters() {
        let dir = TempDir::new().unwrap();
        let pdf = dir.path().join("Book.pdf");
        sidecar::write_chapters(
            &sidecar::chapters_path(&pdf),
            &[
                OutlineEntry::new("First Page", 1),
                OutlineEntry::new("Chapter 1", 12),
                OutlineEntry::new("Last Page", 41),
            ],
        )
        .unwrap();

        let plan = plan_document(&pdf, &PipelineConfig::default());
        assert_eq!(plan.chapter_starts, vec![1, 12, 41]);
        let names: Vec<_> = plan
            .ranges
            .iter()
            .map(|r| r.archive.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["Book Chapter 1.cbz", "Book Chapter 2.cbz", "Book Chapter 3.cbz"]
        );
        assert_eq!(plan.ranges[1].range, PageRange::closed(12, 40));
    }

    #[test]
    fn malformed_sidecar_plans_whole_document() {
        let dir = TempDir::new().unwrap();
        let pdf = dir.path().join("Book.pdf");
        std::fs::write(sidecar::chapters_path(&pdf), "{{{").unwrap();
        assert!(!plan_document(&pdf, &PipelineConfig::default()).split.is_split());
    }

    #[test]
    fn existing_twin_counts_as_present() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Book.cbz"), b"x").unwrap();
        let config = PipelineConfig::default();
        assert!(archive_already_present(&dir.path().join("V Book.cbz"), &config));
        let no_strip = PipelineConfig::builder().strip_prefix(false).build().unwrap();
        assert!(!archive_already_present(&dir.path().join("V Book.cbz"), &no_strip));
    }

    #[test]
    fn prefix_post_pass_respects_overwrite() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("V A.cbz"), b"new").unwrap();
        std::fs::write(dir.path().join("V B.cbz"), b"new").unwrap();
        std::fs::write(dir.path().join("B.cbz"), b"old").unwrap();
        std::fs::write(dir.path().join("C.cbz"), b"untouched").unwrap();

        let reports = strip_archive_prefixes(dir.path(), "V ", false).unwrap();
        assert_eq!(reports.len(), 2);
        assert!(dir.path().join("A.cbz").exists());
        assert_eq!(std::fs::read(dir.path().join("B.cbz")).unwrap(), b"old");
        assert!(dir.path().join("V B.cbz").exists());

        let reports = strip_archive_prefixes(dir.path(), "V ", true).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].outcome, RenameOutcome::Renamed);
        assert_eq!(std::fs::read(dir.path().join("B.cbz")).unwrap(), b"new");
    }

    #[tokio::test]
    async fn missing_source_is_skipped() {
        let dir = TempDir::new().unwrap();
        let report = package_document(&dir.path().join("Gone.pdf"), &PipelineConfig::default()).await;
        assert!(matches!(report.outcome, DocumentOutcome::Skipped { .. }));
    }

    #[tokio::test]
    async fn non_pdf_source_fails_in_discovered_state() {
        let dir = TempDir::new().unwrap();
        let pdf = dir.path().join("Fake.pdf");
        std::fs::write(&pdf, b"<html>").unwrap();
        let report = package_document(&pdf, &PipelineConfig::default()).await;
        assert_eq!(report.state, DocumentState::Failed);
        assert!(matches!(
            report.outcome,
            DocumentOutcome::Failed {
                state: DocumentState::Discovered,
                ..
            }
        ));
        assert!(pdf.exists());
    }

    #[test]
    fn run_on_missing_root_is_fatal() {
        let err = run_sync("/no/such/library", &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, Book2CbzError::FileNotFound { .. }));
    }
}
