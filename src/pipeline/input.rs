//! Input handling: find documents under a root directory, validate PDFs,
//! and convert EPUBs to PDF with calibre's `ebook-convert`.
//!
//! ## Why validate magic bytes?
//!
//! A file named `.pdf` that is really an HTML error page or a truncated
//! download makes both ImageMagick and pdfium fail with opaque messages.
//! Checking for `%PDF` up front lets the report say what actually went wrong.
//!
//! ## Why skip hidden directories?
//!
//! Per-document scratch directories are created as `.book2cbz-*` next to the
//! source. A second run started while a first one is still rendering must
//! not pick up its half-written images.

use crate::error::Book2CbzError;
use crate::pipeline::tool::run_tool;
use std::ffi::{OsStr, OsString};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

const EBOOK_CONVERT: &str = "ebook-convert";

const EBOOK_CONVERT_HINT: &str =
    "Install calibre (https://calibre-ebook.com) and make sure `ebook-convert` is on PATH.";

/// Validate that `path` exists, is readable and starts with `%PDF`.
///
/// Files shorter than four bytes are accepted here and left for the
/// PDF engine to reject.
pub fn validate_pdf(path: &Path) -> Result<(), Book2CbzError> {
    if !path.exists() {
        return Err(Book2CbzError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    match std::fs::File::open(path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(Book2CbzError::NotAPdf {
                    path: path.to_path_buf(),
                    magic,
                });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Book2CbzError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(Book2CbzError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    }

    debug!("Validated PDF: {}", path.display());
    Ok(())
}

/// Whether `path` has extension `ext` (case-insensitive, without the dot).
pub fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn is_hidden(name: &OsStr) -> bool {
    name.to_str().is_some_and(|s| s.starts_with('.'))
}

/// All files under `root` (recursively) with extension `ext`, sorted by path.
///
/// Hidden directories are not descended into. A missing root yields
/// [`Book2CbzError::FileNotFound`].
pub fn discover_files(root: &Path, ext: &str) -> Result<Vec<PathBuf>, Book2CbzError> {
    if !root.is_dir() {
        return Err(Book2CbzError::FileNotFound {
            path: root.to_path_buf(),
        });
    }

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !(e.file_type().is_dir() && is_hidden(e.file_name())))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && has_extension(e.path(), ext))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    Ok(files)
}

/// Arguments for `ebook-convert <epub> <pdf> ...`.
///
/// The body font size is forced through an extra stylesheet and the PDF
/// default font size, so reflowable books render large enough to read as
/// comic pages.
pub fn ebook_convert_args(epub: &Path, pdf: &Path, font_size: u32) -> Vec<OsString> {
    let css = format!(
        "body {{ font-size: {font_size}px !important; font-family: \"Times New Roman\", serif !important; }}"
    );
    let size = font_size.to_string();
    let mut args: Vec<OsString> = vec![epub.as_os_str().to_owned(), pdf.as_os_str().to_owned()];
    args.extend(
        [
            "--pdf-default-font-size",
            size.as_str(),
            "--margin-top",
            "0.1",
            "--margin-bottom",
            "0.1",
            "--margin-left",
            "0.1",
            "--margin-right",
            "0.1",
            "--extra-css",
            css.as_str(),
        ]
        .into_iter()
        .map(OsString::from),
    );
    args
}

/// Convert an EPUB to PDF. Blocking; call from `spawn_blocking`.
pub fn convert_epub_to_pdf(epub: &Path, pdf: &Path, font_size: u32) -> Result<(), Book2CbzError> {
    info!("Converting {} → {}", epub.display(), pdf.display());
    let args = ebook_convert_args(epub, pdf, font_size);
    run_tool(EBOOK_CONVERT, &args, EBOOK_CONVERT_HINT)?;

    if !pdf.exists() {
        return Err(Book2CbzError::ToolFailed {
            tool: EBOOK_CONVERT.to_string(),
            status: "exit status: 0".to_string(),
            stderr: format!("no output written to {}", pdf.display()),
        });
    }
    Ok(())
}
