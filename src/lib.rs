//! # book2cbz
//!
//! Turn a folder of e-books (EPUB and PDF) into comic-reader archives: one
//! CBZ per chapter, with page images cropped of white margins and a
//! `ComicInfo.xml` describing the book.
//!
//! ## Why this crate?
//!
//! Comic and manga readers handle image archives far better than reflowable
//! e-books: page turns are instant, zoom is predictable and libraries group
//! volumes and chapters by their `ComicInfo.xml`. This crate rasterises each
//! chapter of a book into images and packs them, using the PDF outline to
//! find where chapters start.
//!
//! ## Pipeline Overview
//!
//! ```text
//! library/
//!  │
//!  ├─ prepare  (stage 1)
//!  │   ├─ 1. Convert   EPUB → PDF via calibre's ebook-convert
//!  │   ├─ 2. Outline   PDF outline → "<name> chapters.json"
//!  │   └─ 3. Metadata  OPF (or PDF info) → "<name> metadata.json"
//!  │
//!  └─ package  (stage 2)
//!      ├─ 4. Plan      chapters.json → chapter starts → page ranges
//!      ├─ 5. Render    each range → images (ImageMagick or pdfium, spawn_blocking)
//!      ├─ 6. Crop      trim white margins in place
//!      ├─ 7. Archive   images + ComicInfo.xml → "<name> Chapter N.cbz"
//!      └─ 8. Tidy      delete inputs, strip the "V " archive prefix
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use book2cbz::{run, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Keep the EPUBs and PDFs around while trying things out.
//!     let config = PipelineConfig::builder().keep_inputs().build()?;
//!     let summary = run("/path/to/library", &config).await?;
//!     eprintln!(
//!         "{} archives written, {} ranges failed",
//!         summary.stats.archives_written, summary.stats.ranges_failed
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `book2cbz` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! book2cbz = { version = "0.3", default-features = false }
//! ```
//!
//! ## External Tools
//!
//! | Tool | Needed for | Without it |
//! |------|------------|------------|
//! | `ebook-convert` (calibre) | EPUB input | EPUBs are reported and left alone |
//! | `magick` (ImageMagick + Ghostscript) | default render backend | use `RasterBackend::Pdfium` |
//! | pdfium shared library | outlines, PDF info, pdfium backend | chapters sidecar is not written |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod prepare;
pub mod progress;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{KeywordSets, PipelineConfig, PipelineConfigBuilder, RasterBackend, Stages};
pub use convert::{
    discover_documents, package_directory, package_document, plan_document,
    strip_archive_prefixes, run, run_sync, DocumentPlan, PlannedRange,
};
pub use error::{Book2CbzError, RangeError};
pub use output::{
    DocumentOutcome, DocumentReport, DocumentState, PrepareIssue, PrepareSummary, RangeOutcome,
    RangeReport, RenameOutcome, RenameReport, RunStats, RunSummary,
};
pub use pipeline::inspect::{inspect, DocumentInspector, PdfInfo, PdfInspection};
pub use pipeline::outline::OutlineEntry;
pub use pipeline::ranges::{PageRange, RangeEnd, SplitPlan};
pub use pipeline::rasterize::Rasterizer;
pub use pipeline::sidecar::Metadata;
pub use prepare::prepare_directory;
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
pub use stream::{run_stream, ReportStream};
