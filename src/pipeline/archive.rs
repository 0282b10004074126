//! CBZ assembly: a Deflate-compressed ZIP of page images plus an optional
//! `ComicInfo.xml`.
//!
//! ## Why plan, then write?
//!
//! The decision of *whether* to write (target exists, overwrite off, no
//! images) is pure and unit-tested through [`plan_archive`]. Only a
//! [`ArchivePlan::Write`] reaches the I/O in [`write_archive`].
//!
//! ## Why stage in a temp file?
//!
//! The archive is built in a `NamedTempFile` in the target's directory and
//! renamed into place once complete. A crash or Ctrl-C mid-write leaves a
//! stray temp file at worst, never a truncated `.cbz` that a comic server
//! would happily index.

use crate::error::Book2CbzError;
use crate::pipeline::comicinfo::COMIC_INFO_NAME;
use serde::Serialize;
use std::ffi::OsStr;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// File extensions treated as page images (lowercase).
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// What goes into one archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveManifest {
    /// Page images, sorted by file name.
    pub images: Vec<PathBuf>,
    /// `ComicInfo.xml` document, if any.
    pub comic_info: Option<String>,
}

/// Decision for one archive target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchivePlan {
    Write(ArchiveManifest),
    /// Target exists and overwriting is disabled.
    SkipExisting,
    /// Nothing to archive.
    SkipEmpty,
}

/// Summary of a written archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArchiveStats {
    /// Image entries written.
    pub images: usize,
    /// Whether a `ComicInfo.xml` entry was written.
    pub comic_info: bool,
    /// Final archive size on disk.
    pub bytes: u64,
}

/// Decide what to do for an archive target.
///
/// The existing-target check wins over the empty check, so an existing
/// archive is reported as such even when the range produced no images.
pub fn plan_archive(
    images: Vec<PathBuf>,
    target_exists: bool,
    overwrite: bool,
    comic_info: Option<String>,
) -> ArchivePlan {
    if target_exists && !overwrite {
        return ArchivePlan::SkipExisting;
    }
    if images.is_empty() {
        return ArchivePlan::SkipEmpty;
    }
    let mut images = images;
    images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    ArchivePlan::Write(ArchiveManifest { images, comic_info })
}

/// Whether a path has one of the [`IMAGE_EXTENSIONS`] (case-insensitive).
pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Image files directly inside `dir`, sorted by file name.
///
/// A missing directory yields an empty list.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>, Book2CbzError> {
    let read = match std::fs::read_dir(dir) {
        Ok(r) => r,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(Book2CbzError::OutputWriteFailed {
                path: dir.to_path_buf(),
                source: e,
            })
        }
    };

    let mut images: Vec<PathBuf> = read
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && is_image(p))
        .collect();
    images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(images)
}

/// Write `manifest` to `target`, replacing any existing file atomically.
pub fn write_archive(target: &Path, manifest: &ArchiveManifest) -> Result<ArchiveStats, Book2CbzError> {
    let dir = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp = tempfile::Builder::new()
        .prefix(".book2cbz-")
        .suffix(".cbz.tmp")
        .tempfile_in(dir)
        .map_err(|e| Book2CbzError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

    let archive_err = |detail: String| Book2CbzError::ArchiveFailed {
        path: target.to_path_buf(),
        detail,
    };

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(BufWriter::new(tmp.as_file()));

    for image in &manifest.images {
        let name = image
            .file_name()
            .and_then(OsStr::to_str)
            .ok_or_else(|| archive_err(format!("non UTF-8 image name: {}", image.display())))?;
        let bytes = std::fs::read(image).map_err(|e| archive_err(format!("{}: {e}", image.display())))?;
        zip.start_file(name, options)
            .map_err(|e| archive_err(e.to_string()))?;
        zip.write_all(&bytes).map_err(|e| archive_err(e.to_string()))?;
    }

    if let Some(xml) = &manifest.comic_info {
        zip.start_file(COMIC_INFO_NAME, options)
            .map_err(|e| archive_err(e.to_string()))?;
        zip.write_all(xml.as_bytes())
            .map_err(|e| archive_err(e.to_string()))?;
    }

    let mut writer = zip.finish().map_err(|e| archive_err(e.to_string()))?;
    writer.flush().map_err(|e| archive_err(e.to_string()))?;
    drop(writer);

    tmp.persist(target)
        .map_err(|e| Book2CbzError::OutputWriteFailed {
            path: target.to_path_buf(),
            source: e.error,
        })?;

    let bytes = std::fs::metadata(target).map(|m| m.len()).unwrap_or(0);
    debug!(
        "Wrote {} ({} images, {} bytes)",
        target.display(),
        manifest.images.len(),
        bytes
    );

    Ok(ArchiveStats {
        images: manifest.images.len(),
        comic_info: manifest.comic_info.is_some(),
        bytes,
    })
}
