//! Preparation stage: turn a library folder into PDFs plus sidecars.
//!
//! For every book under the root:
//!
//! 1. `<stem>.epub` is converted to `<stem>.pdf` with `ebook-convert`
//!    (skipped when the PDF already exists), and optionally deleted.
//! 2. `<stem> metadata.json` is written from `<stem>.opf` when calibre left
//!    one, otherwise from the PDF info dictionary.
//! 3. `<stem> chapters.json` is written from the PDF outline.
//! 4. `.opf` files whose metadata sidecar exists are optionally deleted.
//!
//! Every step is skipped when its output already exists, so the stage can be
//! re-run at will. Failures are per file: they are logged, recorded as a
//! [`PrepareIssue`], and the stage moves on.

use crate::config::PipelineConfig;
use crate::error::Book2CbzError;
use crate::output::{PrepareIssue, PrepareSummary};
use crate::pipeline::inspect::{DocumentInspector, PdfInfo, PdfInspection, PdfiumInspector};
use crate::pipeline::{input, opf, outline, sidecar};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Run the preparation stage over `root`.
///
/// # Errors
/// Only when `root` is not a readable directory.
pub async fn prepare_directory(
    root: &Path,
    config: &PipelineConfig,
) -> Result<PrepareSummary, Book2CbzError> {
    let mut summary = PrepareSummary::default();
    let inspector: Arc<dyn DocumentInspector> = config
        .inspector
        .clone()
        .unwrap_or_else(|| Arc::new(PdfiumInspector));

    // ── Step 1: EPUB → PDF ───────────────────────────────────────────────
    for epub in input::discover_files(root, "epub")? {
        convert_epub(&epub, config, &mut summary).await;
    }

    // ── Steps 2–3: sidecars per PDF ──────────────────────────────────────
    for pdf in input::discover_files(root, "pdf")? {
        prepare_pdf(&pdf, config, &inspector, &mut summary).await;
    }

    // ── Step 4: OPF cleanup ──────────────────────────────────────────────
    if config.delete_opf {
        for opf_path in input::discover_files(root, "opf")? {
            let pdf = opf_path.with_extension("pdf");
            if !sidecar::metadata_path(&pdf).exists() {
                debug!("Keeping {}: no metadata sidecar yet", opf_path.display());
                continue;
            }
            match std::fs::remove_file(&opf_path) {
                Ok(()) => {
                    info!("Removed OPF file: {}", opf_path.display());
                    summary.opf_removed += 1;
                }
                Err(e) => issue(&mut summary, &opf_path, format!("remove failed: {e}")),
            }
        }
    }

    info!(
        "Preparation complete: {} EPUBs converted, {} chapter lists, {} metadata files, {} issues",
        summary.epubs_converted,
        summary.chapter_sidecars_written,
        summary.metadata_sidecars_written,
        summary.issues.len()
    );
    Ok(summary)
}

async fn convert_epub(epub: &Path, config: &PipelineConfig, summary: &mut PrepareSummary) {
    let pdf = epub.with_extension("pdf");

    if pdf.exists() {
        debug!("Skipping conversion of {}: PDF exists", epub.display());
    } else {
        let (src, dst, font_size) = (epub.to_path_buf(), pdf.clone(), config.font_size);
        let result = tokio::task::spawn_blocking(move || {
            input::convert_epub_to_pdf(&src, &dst, font_size)
        })
        .await
        .map_err(|e| Book2CbzError::Internal(format!("Convert task panicked: {}", e)))
        .and_then(|r| r);

        match result {
            Ok(()) => summary.epubs_converted += 1,
            Err(e) => {
                warn!("EPUB conversion failed for {}: {}", epub.display(), e);
                issue(summary, epub, e.to_string());
                return;
            }
        }
    }

    if config.delete_epub && pdf.exists() {
        match std::fs::remove_file(epub) {
            Ok(()) => {
                info!("Removed original EPUB: {}", epub.display());
                summary.epubs_removed += 1;
            }
            Err(e) => issue(summary, epub, format!("remove failed: {e}")),
        }
    }
}

async fn prepare_pdf(
    pdf: &Path,
    config: &PipelineConfig,
    inspector: &Arc<dyn DocumentInspector>,
    summary: &mut PrepareSummary,
) {
    let metadata_path = sidecar::metadata_path(pdf);
    let chapters_path = sidecar::chapters_path(pdf);
    let need_metadata = !metadata_path.exists();
    let need_chapters = config.extract_toc && !chapters_path.exists();

    if !need_chapters {
        debug!("Chapter list for {} exists or extraction is off", pdf.display());
    }
    if !need_metadata && !need_chapters {
        return;
    }

    let opf_path = pdf.with_extension("opf");
    let metadata_from_opf = need_metadata && opf_path.exists();

    // The PDF is only opened when a sidecar actually depends on it.
    let inspection = if need_chapters || (need_metadata && !metadata_from_opf) {
        match inspect_pdf(pdf, inspector).await {
            Ok(insp) => Some(insp),
            Err(e) => {
                warn!("Cannot inspect {}: {}", pdf.display(), e);
                issue(summary, pdf, e.to_string());
                None
            }
        }
    } else {
        None
    };

    if need_metadata {
        let metadata = if metadata_from_opf {
            match opf::read_opf(&opf_path) {
                Ok(m) => Some(m),
                Err(e) => {
                    warn!("Ignoring unreadable OPF {}: {}", opf_path.display(), e);
                    issue(summary, &opf_path, e.to_string());
                    inspection.as_ref().map(metadata_from_pdf)
                }
            }
        } else {
            inspection.as_ref().map(metadata_from_pdf)
        };

        if let Some(metadata) = metadata {
            match sidecar::write_metadata(&metadata_path, &metadata) {
                Ok(()) => {
                    info!("Metadata saved to {}", metadata_path.display());
                    summary.metadata_sidecars_written += 1;
                }
                Err(e) => issue(summary, &metadata_path, e.to_string()),
            }
        }
    }

    if need_chapters {
        if let Some(insp) = &inspection {
            let entries = outline::select_entries(
                &insp.outline,
                insp.page_count,
                &config.keywords,
                config.add_first_page,
            );
            if entries.is_empty() {
                warn!("No chapters found in the outline of {}", pdf.display());
            }
            match sidecar::write_chapters(&chapters_path, &entries) {
                Ok(()) => {
                    info!(
                        "Saved {} chapter entries for {} → {}",
                        entries.len(),
                        pdf.display(),
                        chapters_path.display()
                    );
                    summary.chapter_sidecars_written += 1;
                }
                Err(e) => issue(summary, &chapters_path, e.to_string()),
            }
        }
    }
}

async fn inspect_pdf(
    pdf: &Path,
    inspector: &Arc<dyn DocumentInspector>,
) -> Result<PdfInspection, Book2CbzError> {
    input::validate_pdf(pdf)?;
    let inspector = Arc::clone(inspector);
    let path: PathBuf = pdf.to_path_buf();
    tokio::task::spawn_blocking(move || inspector.inspect(&path))
        .await
        .map_err(|e| Book2CbzError::Internal(format!("Inspect task panicked: {}", e)))?
}

/// Fallback metadata from the PDF info dictionary.
pub fn metadata_from_pdf(inspection: &PdfInspection) -> sidecar::Metadata {
    let PdfInfo {
        title,
        author,
        subject,
        creation_date,
        ..
    } = &inspection.info;
    let mut m = sidecar::Metadata {
        title: title.clone().unwrap_or_default(),
        writer: author.clone().unwrap_or_default(),
        genre: subject.clone().unwrap_or_default(),
        page_count: inspection.page_count.to_string(),
        ..Default::default()
    };
    if let Some((y, mo, d)) = creation_date.as_deref().and_then(parse_pdf_date) {
        m.year = y;
        m.month = mo;
        m.day = d;
    }
    m
}

/// Parse the date part of a PDF date string (`D:YYYYMMDDHHmmSS...`).
pub fn parse_pdf_date(s: &str) -> Option<(String, String, String)> {
    let digits = s.strip_prefix("D:").unwrap_or(s);
    let date = digits.get(..8)?;
    if !date.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let strip = |v: &str| v.trim_start_matches('0').to_string();
    Some((date[..4].to_string(), strip(&date[4..6]), strip(&date[6..8])))
}

fn issue(summary: &mut PrepareSummary, path: &Path, error: String) {
    summary.issues.push(PrepareIssue {
        path: path.to_path_buf(),
        error,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::outline::OutlineNode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct FakeInspector {
        calls: AtomicUsize,
        inspection: PdfInspection,
    }

    impl DocumentInspector for FakeInspector {
        fn inspect(&self, _pdf: &Path) -> Result<PdfInspection, Book2CbzError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.inspection.clone())
        }
    }

    fn fake() -> Arc<FakeInspector> {
        Arc::new(FakeInspector {
            calls: AtomicUsize::new(0),
            inspection: PdfInspection {
                page_count: 40,
                outline: vec![
                    OutlineNode::leaf("Cover", 1),
                    OutlineNode::leaf("Chapter 1", 3),
                    OutlineNode::leaf("Chapter 2", 15),
                ],
                info: PdfInfo {
                    title: Some("From PDF".into()),
                    author: Some("Anon".into()),
                    creation_date: Some("D:20210307120000Z".into()),
                    ..Default::default()
                },
            },
        })
    }

    fn config_with(inspector: Arc<FakeInspector>) -> PipelineConfig {
        PipelineConfig::builder()
            .inspector(inspector as Arc<dyn DocumentInspector>)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn writes_both_sidecars_from_pdf() {
        let dir = TempDir::new().unwrap();
        let pdf = dir.path().join("Book.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();
        let inspector = fake();

        let summary = prepare_directory(dir.path(), &config_with(Arc::clone(&inspector)))
            .await
            .unwrap();
        assert_eq!(summary.chapter_sidecars_written, 1);
        assert_eq!(summary.metadata_sidecars_written, 1);
        assert_eq!(inspector.calls.load(Ordering::SeqCst), 1);

        let entries = sidecar::read_chapters(&sidecar::chapters_path(&pdf)).unwrap().unwrap();
        let pages: Vec<u32> = entries.iter().map(|e| e.page).collect();
        assert_eq!(pages, vec![1, 3, 15, 41]);

        let meta = sidecar::read_metadata(&sidecar::metadata_path(&pdf)).unwrap().unwrap();
        assert_eq!(meta.title, "From PDF");
        assert_eq!(meta.writer, "Anon");
        assert_eq!(meta.page_count, "40");
        assert_eq!((meta.year.as_str(), meta.month.as_str()), ("2021", "3"));
    }

    #[tokio::test]
    async fn existing_sidecars_are_left_alone() {
        let dir = TempDir::new().unwrap();
        let pdf = dir.path().join("Book.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();
        std::fs::write(sidecar::chapters_path(&pdf), "[]").unwrap();
        std::fs::write(sidecar::metadata_path(&pdf), "{}").unwrap();
        let inspector = fake();

        let summary = prepare_directory(dir.path(), &config_with(Arc::clone(&inspector)))
            .await
            .unwrap();
        assert_eq!(summary.chapter_sidecars_written, 0);
        assert_eq!(inspector.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            std::fs::read_to_string(sidecar::chapters_path(&pdf)).unwrap(),
            "[]"
        );
    }

    #[tokio::test]
    async fn opf_wins_over_pdf_info_and_is_removed() {
        let dir = TempDir::new().unwrap();
        let pdf = dir.path().join("Book.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();
        let opf_path = dir.path().join("Book.opf");
        std::fs::write(
            &opf_path,
            r#"<package><metadata><dc:title>From OPF</dc:title></metadata></package>"#,
        )
        .unwrap();

        let summary = prepare_directory(dir.path(), &config_with(fake())).await.unwrap();
        let meta = sidecar::read_metadata(&sidecar::metadata_path(&pdf)).unwrap().unwrap();
        assert_eq!(meta.title, "From OPF");
        assert_eq!(summary.opf_removed, 1);
        assert!(!opf_path.exists());
    }

    #[tokio::test]
    async fn non_pdf_is_reported_not_fatal() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Fake.pdf"), b"<html>").unwrap();
        let summary = prepare_directory(dir.path(), &config_with(fake())).await.unwrap();
        assert_eq!(summary.issues.len(), 1);
        assert_eq!(summary.chapter_sidecars_written, 0);
    }

    #[test]
    fn pdf_dates() {
        assert_eq!(
            parse_pdf_date("D:19991231235959"),
            Some(("1999".into(), "12".into(), "31".into()))
        );
        assert_eq!(parse_pdf_date("D:2020"), None);
        assert_eq!(parse_pdf_date("yesterday"), None);
    }
}
