//! End-to-end integration tests for book2cbz.
//!
//! These tests use real books in `./test_cases/` and the real external tools
//! (`magick`, `ebook-convert`, libpdfium). They are gated behind the
//! `E2E_ENABLED` environment variable so they do not run in CI unless
//! explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=. cargo test --test e2e -- --nocapture
//!
//! To restrict to a specific test:
//!   E2E_ENABLED=1 cargo test --test e2e test_inspect -- --nocapture

use book2cbz::pipeline::outline::build_chapter_list;
use book2cbz::{inspect, run, PipelineConfig, RasterBackend, RangeOutcome, Stages};
use std::path::{Path, PathBuf};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

/// Copy a fixture into a fresh library folder so runs never touch `test_cases/`.
fn library_with(fixture: &Path) -> tempfile::TempDir {
    let lib = tempfile::TempDir::new().expect("temp library");
    let name = fixture.file_name().expect("fixture name");
    std::fs::copy(fixture, lib.path().join(name)).expect("copy fixture");
    lib
}

/// Skip this test if E2E_ENABLED is not set *or* no fixture at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP — test file not found: {}", p.display());
            return;
        }
        p
    }};
}

/// Assert an archive is a readable ZIP whose entries are images plus an
/// optional ComicInfo.xml, in page order.
fn assert_cbz_sane(path: &Path) {
    let file = std::fs::File::open(path).expect("open archive");
    let archive = zip::ZipArchive::new(file).expect("archive is a ZIP");
    let names: Vec<&str> = archive.file_names().collect();

    let images: Vec<&&str> = names.iter().filter(|n| n.starts_with("image-")).collect();
    assert!(!images.is_empty(), "[{}] no images", path.display());
    let mut sorted = images.clone();
    sorted.sort();
    assert_eq!(images, sorted, "[{}] images out of order", path.display());
    assert!(
        names
            .iter()
            .all(|n| n.starts_with("image-") || *n == "ComicInfo.xml"),
        "[{}] unexpected entries: {:?}",
        path.display(),
        names
    );
    println!("[{}] ✓  {} images", path.display(), images.len());
}

// ── Inspect tests (pdfium only, instant) ─────────────────────────────────────

#[tokio::test]
async fn test_inspect_novel() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("novel.pdf"));

    let info = inspect(&path).await.expect("inspect() should succeed");
    assert!(info.page_count > 0);

    let starts = build_chapter_list(&info.outline, info.page_count, &PipelineConfig::default());
    assert!(starts.windows(2).all(|w| w[0] < w[1]), "starts not ascending: {starts:?}");
    println!("Pages: {}, chapter starts: {:?}", info.page_count, starts);
}

// ── Full runs ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_pdf_with_outline_pdfium_backend() {
    let fixture = e2e_skip_unless_ready!(test_cases_dir().join("novel.pdf"));
    let lib = library_with(&fixture);

    let config = PipelineConfig::builder()
        .backend(RasterBackend::Pdfium)
        .density(72)
        .build()
        .unwrap();
    let summary = run(lib.path(), &config).await.expect("run should succeed");

    assert!(!summary.has_failures(), "{summary:#?}");
    let doc = &summary.documents[0];
    for range in doc.ranges.iter().filter(|r| r.is_written()) {
        let name = range.archive.file_name().unwrap();
        assert_cbz_sane(&lib.path().join(name));
    }
}

#[tokio::test]
async fn test_pdf_magick_backend_keeps_inputs() {
    let fixture = e2e_skip_unless_ready!(test_cases_dir().join("short_story.pdf"));
    let lib = library_with(&fixture);

    let config = PipelineConfig::builder()
        .keep_inputs()
        .density(72)
        .build()
        .unwrap();
    let summary = run(lib.path(), &config).await.expect("run should succeed");

    assert!(lib.path().join("short_story.pdf").exists());
    assert!(lib.path().join("short_story chapters.json").exists());
    assert!(summary.stats.archives_written >= 1, "{summary:#?}");
    for r in &summary.documents[0].ranges {
        if let RangeOutcome::Written { .. } = r.outcome {
            assert_cbz_sane(&r.archive);
        }
    }
}

#[tokio::test]
async fn test_epub_prepare_stage() {
    let fixture = e2e_skip_unless_ready!(test_cases_dir().join("novel.epub"));
    let lib = library_with(&fixture);

    let config = PipelineConfig::builder()
        .stages(Stages::Prepare)
        .build()
        .unwrap();
    let summary = run(lib.path(), &config).await.expect("run should succeed");

    let prep = summary.prepare.expect("prepare ran");
    assert_eq!(prep.epubs_converted, 1, "{prep:#?}");
    assert!(lib.path().join("novel.pdf").exists());
    assert!(!lib.path().join("novel.epub").exists());
    assert!(lib.path().join("novel chapters.json").exists());
    assert!(lib.path().join("novel metadata.json").exists());
    assert!(summary.documents.is_empty());
}
