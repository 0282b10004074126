//! PDF inspection: page count, outline tree and info dictionary, via pdfium.
//!
//! ## Why a trait?
//!
//! Preparation only needs three facts about a PDF. Hiding pdfium behind
//! [`DocumentInspector`] lets the preparation stage be driven by a fake in
//! tests and keeps the pdfium dependency out of everything but this module
//! and the pdfium rasteriser.
//!
//! ## Why spawn_blocking?
//!
//! pdfium is a synchronous C++ library with internal global state; calls are
//! moved onto Tokio's blocking pool so async workers never stall on it.

use crate::error::Book2CbzError;
use crate::pipeline::outline::OutlineNode;
use pdfium_render::prelude::*;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, warn};

/// Hard cap on outline nodes read from one document.
const MAX_OUTLINE_NODES: usize = 10_000;

/// What preparation needs to know about a PDF.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PdfInspection {
    pub page_count: u32,
    /// Top-level outline nodes in document order, children nested.
    pub outline: Vec<OutlineNode>,
    pub info: PdfInfo,
}

/// Fields of the PDF info dictionary used as a metadata fallback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PdfInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
}

/// Reads structural facts from a PDF.
pub trait DocumentInspector: Send + Sync {
    fn inspect(&self, pdf: &Path) -> Result<PdfInspection, Book2CbzError>;
}

/// [`DocumentInspector`] backed by pdfium-render.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfiumInspector;

impl DocumentInspector for PdfiumInspector {
    fn inspect(&self, pdf: &Path) -> Result<PdfInspection, Book2CbzError> {
        let pdfium = bind_pdfium()?;
        let document = load_document(&pdfium, pdf)?;

        let page_count = document.pages().len() as u32;
        let outline = read_outline(&document);
        let info = read_info(&document);
        debug!(
            "Inspected {}: {} pages, {} top-level outline entries",
            pdf.display(),
            page_count,
            outline.len()
        );

        Ok(PdfInspection {
            page_count,
            outline,
            info,
        })
    }
}

/// Inspect a PDF with pdfium on the blocking pool.
pub async fn inspect(path: &Path) -> Result<PdfInspection, Book2CbzError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || PdfiumInspector.inspect(&path))
        .await
        .map_err(|e| Book2CbzError::Internal(format!("Inspect task panicked: {}", e)))?
}

// ── pdfium plumbing (shared with the pdfium rasteriser) ──────────────────

/// Bind to pdfium: `PDFIUM_LIB_PATH` first, then the working directory,
/// then the system library search path.
pub(crate) fn bind_pdfium() -> Result<Pdfium, Book2CbzError> {
    let mut candidates: Vec<String> = Vec::new();
    if let Ok(dir) = std::env::var("PDFIUM_LIB_PATH") {
        candidates.push(dir);
    }
    candidates.push("./".to_string());

    let mut last_err = String::new();
    for dir in &candidates {
        match Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)) {
            Ok(bindings) => return Ok(Pdfium::new(bindings)),
            Err(e) => last_err = format!("{}: {:?}", dir, e),
        }
    }

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| Book2CbzError::PdfiumBindingFailed(format!("{last_err}; system: {e:?}")))
}

pub(crate) fn load_document<'a>(
    pdfium: &'a Pdfium,
    path: &Path,
) -> Result<PdfDocument<'a>, Book2CbzError> {
    if !path.exists() {
        return Err(Book2CbzError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    pdfium.load_pdf_from_file(path, None).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            Book2CbzError::PasswordRequired {
                path: path.to_path_buf(),
            }
        } else {
            Book2CbzError::CorruptPdf {
                path: path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

fn read_outline(document: &PdfDocument<'_>) -> Vec<OutlineNode> {
    let mut budget = MAX_OUTLINE_NODES;
    let mut nodes = Vec::new();
    let mut cursor = document.bookmarks().root();
    while let Some(bookmark) = cursor {
        if budget == 0 {
            warn!("Outline truncated at {} entries", MAX_OUTLINE_NODES);
            break;
        }
        nodes.push(convert_bookmark(&bookmark, &mut budget));
        cursor = bookmark.next_sibling();
    }
    nodes
}

fn convert_bookmark(bookmark: &PdfBookmark<'_>, budget: &mut usize) -> OutlineNode {
    *budget = budget.saturating_sub(1);
    let page = bookmark
        .destination()
        .and_then(|d| d.page_index().ok())
        .map(|idx| idx as u32 + 1);

    let mut children = Vec::new();
    for child in bookmark.iter_direct_children() {
        if *budget == 0 {
            break;
        }
        children.push(convert_bookmark(&child, budget));
    }

    OutlineNode {
        title: bookmark.title().unwrap_or_default(),
        page,
        children,
    }
}

fn read_info(document: &PdfDocument<'_>) -> PdfInfo {
    let metadata = document.metadata();
    let get = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().trim().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    PdfInfo {
        title: get(PdfDocumentMetadataTagType::Title),
        author: get(PdfDocumentMetadataTagType::Author),
        subject: get(PdfDocumentMetadataTagType::Subject),
        producer: get(PdfDocumentMetadataTagType::Producer),
        creation_date: get(PdfDocumentMetadataTagType::CreationDate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedInspector(PdfInspection);

    impl DocumentInspector for FixedInspector {
        fn inspect(&self, _pdf: &Path) -> Result<PdfInspection, Book2CbzError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn inspector_is_object_safe() {
        let fixed: Box<dyn DocumentInspector> = Box::new(FixedInspector(PdfInspection {
            page_count: 12,
            ..Default::default()
        }));
        assert_eq!(fixed.inspect(Path::new("x.pdf")).unwrap().page_count, 12);
    }

    #[test]
    fn inspection_serialises() {
        let insp = PdfInspection {
            page_count: 3,
            outline: vec![OutlineNode::leaf("Chapter 1", 2)],
            info: PdfInfo {
                title: Some("T".into()),
                ..Default::default()
            },
        };
        let json = serde_json::to_string(&insp).unwrap();
        assert!(json.contains("\"page_count\":3"));
        assert!(json.contains("Chapter 1"));
    }

    #[tokio::test]
    async fn inspect_missing_file_fails() {
        // Fails on binding (no pdfium in CI) or on the missing file; either
        // way it must be an error, never a panic.
        assert!(inspect(Path::new("/nonexistent/book.pdf")).await.is_err());
    }
}
