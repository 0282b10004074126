//! Sidecar JSON files that carry state between preparation and packaging.
//!
//! For a document `<dir>/<stem>.pdf` two sidecars may exist next to it:
//!
//! - `<stem> chapters.json`: a pretty-printed array of `{title, page}`
//!   entries (the persisted output of [`select_entries`](super::outline::select_entries)).
//! - `<stem> metadata.json`: a flat object of book metadata fields.
//!
//! Reading is lenient in the shapes it accepts: chapter entries with a
//! missing title or a missing, non-integer or zero page are skipped, and
//! metadata fields may be strings, numbers or null. A file that is not JSON
//! at all is reported as [`Book2CbzError::MalformedSidecar`] so the caller
//! can log it and carry on with "no data".

use crate::error::Book2CbzError;
use crate::pipeline::outline::OutlineEntry;
use serde::{Deserialize, Deserializer, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Suffix appended to a document stem for the chapters sidecar.
pub const CHAPTERS_SUFFIX: &str = " chapters.json";

/// Suffix appended to a document stem for the metadata sidecar.
pub const METADATA_SUFFIX: &str = " metadata.json";

// ── Paths ────────────────────────────────────────────────────────────────

/// File stem of a document (`"Book"` for `/x/Book.pdf`), lossily decoded.
pub fn document_stem(doc: &Path) -> String {
    doc.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn sibling(doc: &Path, suffix: &str) -> PathBuf {
    let name = format!("{}{}", document_stem(doc), suffix);
    match doc.parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

/// `<dir>/<stem> chapters.json` for a document path.
pub fn chapters_path(doc: &Path) -> PathBuf {
    sibling(doc, CHAPTERS_SUFFIX)
}

/// `<dir>/<stem> metadata.json` for a document path.
pub fn metadata_path(doc: &Path) -> PathBuf {
    sibling(doc, METADATA_SUFFIX)
}

/// Whether a file name is one of the sidecars this crate writes.
pub fn is_sidecar_name(name: &str) -> bool {
    name.ends_with(CHAPTERS_SUFFIX) || name.ends_with(METADATA_SUFFIX)
}

// ── Metadata ─────────────────────────────────────────────────────────────

/// Flat book metadata. Every field defaults to the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_string")]
    pub localized_series: String,
    #[serde(deserialize_with = "lenient_string")]
    pub series: String,
    #[serde(deserialize_with = "lenient_string")]
    pub number: String,
    #[serde(deserialize_with = "lenient_string")]
    pub count: String,
    #[serde(deserialize_with = "lenient_string")]
    pub volume: String,
    #[serde(deserialize_with = "lenient_string")]
    pub summary: String,
    #[serde(deserialize_with = "lenient_string")]
    pub publisher: String,
    #[serde(deserialize_with = "lenient_string")]
    pub year: String,
    #[serde(deserialize_with = "lenient_string")]
    pub month: String,
    #[serde(deserialize_with = "lenient_string")]
    pub day: String,
    #[serde(deserialize_with = "lenient_string")]
    pub writer: String,
    #[serde(deserialize_with = "lenient_string")]
    pub penciller: String,
    #[serde(deserialize_with = "lenient_string")]
    pub inker: String,
    #[serde(deserialize_with = "lenient_string")]
    pub colorist: String,
    #[serde(deserialize_with = "lenient_string")]
    pub letterer: String,
    #[serde(deserialize_with = "lenient_string")]
    pub cover_artist: String,
    #[serde(deserialize_with = "lenient_string")]
    pub editor: String,
    #[serde(deserialize_with = "lenient_string")]
    pub translator: String,
    #[serde(deserialize_with = "lenient_string")]
    pub genre: String,
    #[serde(deserialize_with = "lenient_string")]
    pub tags: String,
    #[serde(deserialize_with = "lenient_string")]
    pub web: String,
    #[serde(deserialize_with = "lenient_string")]
    pub page_count: String,
    #[serde(deserialize_with = "lenient_string")]
    pub language: String,
    #[serde(deserialize_with = "lenient_string")]
    pub format: String,
    #[serde(deserialize_with = "lenient_string")]
    pub series_group: String,
    #[serde(deserialize_with = "lenient_string")]
    pub age_rating: String,
    #[serde(deserialize_with = "lenient_string")]
    pub gtin: String,
}

/// Accept a string, number, bool or null and render it as a string.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    })
}

// ── Chapters sidecar ─────────────────────────────────────────────────────

/// Read chapter entries from a chapters sidecar.
///
/// Returns `Ok(None)` when the file does not exist. Entries that do not
/// have a string `title` and a positive integer `page` are skipped.
pub fn read_chapters(path: &Path) -> Result<Option<Vec<OutlineEntry>>, Book2CbzError> {
    let Some(raw) = read_optional(path)? else {
        return Ok(None);
    };
    let value: serde_json::Value =
        serde_json::from_str(&raw).map_err(|e| malformed(path, e.to_string()))?;
    let items = value
        .as_array()
        .ok_or_else(|| malformed(path, "expected a JSON array".into()))?;

    let mut entries = Vec::with_capacity(items.len());
    for item in items {
        let title = item.get("title").and_then(|t| t.as_str());
        let page = item
            .get("page")
            .and_then(|p| p.as_u64())
            .and_then(|p| u32::try_from(p).ok())
            .filter(|&p| p >= 1);
        match (title, page) {
            (Some(title), Some(page)) => entries.push(OutlineEntry::new(title, page)),
            _ => debug!("Skipping malformed chapter entry in {}: {}", path.display(), item),
        }
    }
    Ok(Some(entries))
}

/// Write chapter entries as a pretty-printed JSON array.
pub fn write_chapters(path: &Path, entries: &[OutlineEntry]) -> Result<(), Book2CbzError> {
    let json = serde_json::to_string_pretty(entries)
        .map_err(|e| Book2CbzError::Internal(format!("chapter serialisation: {e}")))?;
    write_text(path, &json)
}

// ── Metadata sidecar ─────────────────────────────────────────────────────

/// Read a metadata sidecar. `Ok(None)` when the file does not exist.
pub fn read_metadata(path: &Path) -> Result<Option<Metadata>, Book2CbzError> {
    let Some(raw) = read_optional(path)? else {
        return Ok(None);
    };
    let metadata = serde_json::from_str(&raw).map_err(|e| malformed(path, e.to_string()))?;
    Ok(Some(metadata))
}

/// Write a metadata sidecar as pretty-printed JSON.
pub fn write_metadata(path: &Path, metadata: &Metadata) -> Result<(), Book2CbzError> {
    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| Book2CbzError::Internal(format!("metadata serialisation: {e}")))?;
    write_text(path, &json)
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn read_optional(path: &Path) -> Result<Option<String>, Book2CbzError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(Book2CbzError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(e) => Err(malformed(path, e.to_string())),
    }
}

/// Write via a uniquely named temp file in the same directory, then persist.
fn write_text(path: &Path, contents: &str) -> Result<(), Book2CbzError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let write_err = |source: std::io::Error| Book2CbzError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".book2cbz-")
        .suffix(".json.tmp")
        .tempfile_in(dir)
        .map_err(write_err)?;
    tmp.write_all(contents.as_bytes()).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

fn malformed(path: &Path, detail: String) -> Book2CbzError {
    Book2CbzError::MalformedSidecar {
        path: path.to_path_buf(),
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn sidecar_paths_sit_next_to_document() {
        let doc = Path::new("/books/My Book.pdf");
        assert_eq!(chapters_path(doc), PathBuf::from("/books/My Book chapters.json"));
        assert_eq!(metadata_path(doc), PathBuf::from("/books/My Book metadata.json"));
        assert!(is_sidecar_name("My Book chapters.json"));
        assert!(!is_sidecar_name("My Book.json"));
    }

    #[test]
    fn chapters_roundtrip_through_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("B chapters.json");
        let entries = vec![OutlineEntry::new("First Page", 1), OutlineEntry::new("Ch 1", 4)];
        write_chapters(&path, &entries).unwrap();
        assert_eq!(read_chapters(&path).unwrap(), Some(entries));
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n"), "sidecar should be pretty-printed");
    }

    #[test]
    fn rewrite_replaces_sidecar_and_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("B metadata.json");
        std::fs::write(&path, "stale").unwrap();

        let m = Metadata {
            title: "Fresh".into(),
            ..Default::default()
        };
        write_metadata(&path, &m).unwrap();
        assert_eq!(read_metadata(&path).unwrap(), Some(m));

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["B metadata.json"]);
    }

    #[test]
    fn missing_chapters_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read_chapters(&dir.path().join("nope.json")).unwrap(), None);
    }

    #[test]
    fn malformed_chapter_entries_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("B chapters.json");
        std::fs::write(
            &path,
            r#"[{"title":"ok","page":3},{"title":"zero","page":0},{"page":5},
               {"title":"str","page":"7"},{"title":"neg","page":-2},"junk",{"title":"ok2","page":9}]"#,
        )
        .unwrap();
        let got = read_chapters(&path).unwrap().unwrap();
        assert_eq!(got, vec![OutlineEntry::new("ok", 3), OutlineEntry::new("ok2", 9)]);
    }

    #[test]
    fn non_json_chapters_file_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("B chapters.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            read_chapters(&path),
            Err(Book2CbzError::MalformedSidecar { .. })
        ));
        std::fs::write(&path, r#"{"title":"x"}"#).unwrap();
        assert!(read_chapters(&path).is_err());
    }

    #[test]
    fn metadata_accepts_numbers_and_nulls() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("B metadata.json");
        std::fs::write(
            &path,
            r#"{"title":"Dune","number":3,"page_count":412,"writer":null,"unknown_key":"x"}"#,
        )
        .unwrap();
        let m = read_metadata(&path).unwrap().unwrap();
        assert_eq!(m.title, "Dune");
        assert_eq!(m.number, "3");
        assert_eq!(m.page_count, "412");
        assert_eq!(m.writer, "");
        assert_eq!(m.gtin, "");
    }

    #[test]
    fn metadata_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("B metadata.json");
        let m = Metadata {
            title: "Title".into(),
            tags: "a; b".into(),
            ..Default::default()
        };
        write_metadata(&path, &m).unwrap();
        assert_eq!(read_metadata(&path).unwrap(), Some(m));
    }
}
