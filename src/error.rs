//! Error types for the book2cbz library.
//!
//! Two error types reflect two failure scopes:
//!
//! * [`Book2CbzError`] — the operation that returned it could not proceed
//!   (unreadable PDF, missing external tool, archive write failure). Inside
//!   the batch orchestrator these are caught per document and recorded in a
//!   [`crate::output::DocumentReport`]; they never stop other documents.
//!
//! * [`RangeError`] — a single chapter range failed (render glitch, archive
//!   write failure) while every other range of the document may be fine.
//!   Stored inside [`crate::output::RangeReport`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the book2cbz library.
#[derive(Debug, Error)]
pub enum Book2CbzError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password; encrypted books are not supported.
    #[error("PDF '{path}' is encrypted and cannot be split")]
    PasswordRequired { path: PathBuf },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: u32, detail: String },

    // ── External tools ────────────────────────────────────────────────────
    /// An external binary (`magick`, `ebook-convert`) is not on `PATH`.
    #[error("External tool '{tool}' was not found.\n{hint}")]
    ToolNotFound { tool: String, hint: String },

    /// An external binary ran but exited unsuccessfully.
    #[error("'{tool}' exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    // ── Sidecar errors ────────────────────────────────────────────────────
    /// A chapters/metadata sidecar exists but is not valid JSON of the expected shape.
    #[error("Malformed sidecar '{path}': {detail}")]
    MalformedSidecar { path: PathBuf, detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write an output file (sidecar, temp dir, archive).
    #[error("Failed to write '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The ZIP writer rejected an entry or could not be finalised.
    #[error("Failed to build archive '{path}': {detail}")]
    ArchiveFailed { path: PathBuf, detail: String },

    /// An image could not be decoded or re-encoded.
    #[error("Image '{path}' could not be processed: {detail}")]
    ImageFailed { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/dir-containing-libpdfium, place the library next\n\
to the binary, or use the ImageMagick backend (--backend magick).\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (e.g. a blocking task panicked).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single chapter range.
///
/// The document continues with its next range; the source file is kept so
/// the failed chapter can be regenerated on a later run.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum RangeError {
    /// Rasterisation of the range failed; it produced no images.
    #[error("Chapter {chapter}: rasterisation failed: {detail}")]
    RenderFailed { chapter: usize, detail: String },

    /// The CBZ for the range could not be written.
    #[error("Chapter {chapter}: archive failed: {detail}")]
    ArchiveFailed { chapter: usize, detail: String },
}

impl RangeError {
    /// The 1-based chapter number the error belongs to.
    pub fn chapter(&self) -> usize {
        match self {
            RangeError::RenderFailed { chapter, .. } | RangeError::ArchiveFailed { chapter, .. } => {
                *chapter
            }
        }
    }
}
