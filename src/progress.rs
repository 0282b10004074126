//! Progress-callback trait for per-document and per-chapter events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as the packaging stage works through a library.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a channel, a web UI, or a terminal progress bar without
//! the library knowing how the host application communicates. The trait is
//! `Send + Sync` because the blocking render work runs on Tokio's blocking
//! pool.
//!
//! # Example
//!
//! ```rust
//! use book2cbz::{PipelineConfig, PipelineProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     archives: AtomicUsize,
//! }
//!
//! impl PipelineProgressCallback for CountingCallback {
//!     fn on_range_complete(&self, _doc: &str, chapter: usize, total: usize, images: usize) {
//!         self.archives.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Chapter {}/{} packed ({} pages)", chapter, total, images);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { archives: AtomicUsize::new(0) });
//!
//! let config = PipelineConfig::builder()
//!     .progress_callback(counter as Arc<dyn PipelineProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the orchestrator as it processes documents and their chapters.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `doc` is the document's file name.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called once before the first document is packaged.
    fn on_run_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called when a document's split plan is known.
    ///
    /// # Arguments
    /// * `index`  — 1-indexed position of the document in the run
    /// * `ranges` — number of chapter ranges that will be attempted
    fn on_document_start(&self, doc: &str, index: usize, ranges: usize) {
        let _ = (doc, index, ranges);
    }

    /// Called just before a range is rasterised.
    fn on_range_start(&self, doc: &str, chapter: usize, total_chapters: usize) {
        let _ = (doc, chapter, total_chapters);
    }

    /// Called when a range finished without error (written, skipped or empty).
    ///
    /// `images` is the number of pages archived (0 when nothing was written).
    fn on_range_complete(&self, doc: &str, chapter: usize, total_chapters: usize, images: usize) {
        let _ = (doc, chapter, total_chapters, images);
    }

    /// Called when a range failed. The document continues with its next range.
    fn on_range_error(&self, doc: &str, chapter: usize, total_chapters: usize, error: &str) {
        let _ = (doc, chapter, total_chapters, error);
    }

    /// Called once per document after cleanup.
    ///
    /// `archives` counts archives written for this document.
    fn on_document_complete(&self, doc: &str, archives: usize, failed: bool) {
        let _ = (doc, archives, failed);
    }

    /// Called once after every document was attempted.
    fn on_run_complete(&self, total_documents: usize, failed_documents: usize) {
        let _ = (total_documents, failed_documents);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        documents: AtomicUsize,
        range_starts: AtomicUsize,
        range_completes: AtomicUsize,
        range_errors: AtomicUsize,
        archived_images: AtomicUsize,
        failed_docs: AtomicUsize,
    }

    impl PipelineProgressCallback for TrackingCallback {
        fn on_run_start(&self, total_documents: usize) {
            self.documents.store(total_documents, Ordering::SeqCst);
        }

        fn on_range_start(&self, _doc: &str, _chapter: usize, _total: usize) {
            self.range_starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_range_complete(&self, _doc: &str, _chapter: usize, _total: usize, images: usize) {
            self.range_completes.fetch_add(1, Ordering::SeqCst);
            self.archived_images.fetch_add(images, Ordering::SeqCst);
        }

        fn on_range_error(&self, _doc: &str, _chapter: usize, _total: usize, _error: &str) {
            self.range_errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_run_complete(&self, _total: usize, failed_documents: usize) {
            self.failed_docs.store(failed_documents, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start(2);
        cb.on_document_start("a.pdf", 1, 3);
        cb.on_range_start("a.pdf", 1, 3);
        cb.on_range_complete("a.pdf", 1, 3, 12);
        cb.on_range_error("a.pdf", 2, 3, "magick exited with 1");
        cb.on_document_complete("a.pdf", 1, true);
        cb.on_run_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_run_start(1);
        assert_eq!(tracker.documents.load(Ordering::SeqCst), 1);

        tracker.on_range_start("b.pdf", 1, 3);
        tracker.on_range_complete("b.pdf", 1, 3, 10);
        tracker.on_range_start("b.pdf", 2, 3);
        tracker.on_range_complete("b.pdf", 2, 3, 7);
        tracker.on_range_start("b.pdf", 3, 3);
        tracker.on_range_error("b.pdf", 3, 3, "ghostscript missing");

        assert_eq!(tracker.range_starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.range_completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.range_errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.archived_images.load(Ordering::SeqCst), 17);

        tracker.on_run_complete(1, 0);
        assert_eq!(tracker.failed_docs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_run_start(10);
        cb.on_document_start("c.pdf", 1, 1);
    }
}
