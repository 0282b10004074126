//! Streaming packaging API: emit one report per document as it finishes.
//!
//! ## Why stream?
//!
//! A library of a few hundred books takes hours to rasterise. A streams-based
//! API lets callers show each finished book immediately, persist reports as
//! they arrive, or stop early by dropping the stream, instead of waiting for
//! the [`RunSummary`](crate::output::RunSummary) of [`crate::convert::run`].
//!
//! Documents are still processed one at a time, in discovery order; the
//! stream yields them in that order. The preparation stage and the prefix
//! post-pass are not part of the stream: run [`crate::prepare::prepare_directory`]
//! before and [`crate::convert::strip_archive_prefixes`] after if needed.

use crate::config::PipelineConfig;
use crate::convert::{discover_documents, package_document_with};
use crate::error::Book2CbzError;
use crate::output::DocumentReport;
use crate::pipeline::rasterize::resolve_rasterizer;
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of document reports.
pub type ReportStream = Pin<Box<dyn Stream<Item = DocumentReport> + Send>>;

/// Package every PDF under `root`, yielding a report as each document completes.
///
/// # Returns
/// - `Ok(ReportStream)` — one [`DocumentReport`] per discovered PDF
/// - `Err(Book2CbzError)` — fatal error (root missing or unreadable)
///
/// # Example
/// ```rust,no_run
/// use book2cbz::{run_stream, PipelineConfig};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = PipelineConfig::default();
/// let mut reports = run_stream("/library", &config).await?;
/// while let Some(report) = reports.next().await {
///     println!("{}: {} archives", report.source.display(), report.archives_written());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn run_stream(
    root: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<ReportStream, Book2CbzError> {
    let root = root.as_ref();
    let documents = discover_documents(root)?;
    info!(
        "Starting streaming run over {} documents in {}",
        documents.len(),
        root.display()
    );

    let rasterizer = resolve_rasterizer(config);
    let config = config.clone();

    let s = stream::iter(documents.into_iter().enumerate()).then(move |(i, pdf)| {
        let rasterizer = Arc::clone(&rasterizer);
        let cfg = config.clone();
        async move { package_document_with(&pdf, &cfg, &rasterizer, i + 1).await }
    });

    Ok(Box::pin(s))
}
