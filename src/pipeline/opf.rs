//! OPF (calibre metadata) parsing into [`Metadata`].
//!
//! calibre writes a `<stem>.opf` next to every book it exports. Only the
//! `<metadata>` block is read: Dublin Core elements for the basic fields and
//! calibre's `<meta name="calibre:*" content="...">` entries for series
//! information and tags. Namespace prefixes are ignored; element local
//! names are matched instead, which also covers OPF 3 files that use a
//! default namespace.

use crate::error::Book2CbzError;
use crate::pipeline::sidecar::Metadata;
use once_cell::sync::Lazy;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use std::path::Path;

static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("static regex"));
static RE_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));
static RE_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})(?:-(\d{2}))?(?:-(\d{2}))?").expect("static regex"));

/// Read and parse an OPF file.
pub fn read_opf(path: &Path) -> Result<Metadata, Book2CbzError> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Book2CbzError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => Book2CbzError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => Book2CbzError::MalformedSidecar {
            path: path.to_path_buf(),
            detail: e.to_string(),
        },
    })?;
    parse_opf(&String::from_utf8_lossy(&bytes)).map_err(|detail| Book2CbzError::MalformedSidecar {
        path: path.to_path_buf(),
        detail,
    })
}

/// Parse OPF XML text. Missing elements leave fields empty.
pub fn parse_opf(xml: &str) -> Result<Metadata, String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut m = Metadata::default();
    let mut subjects: Vec<String> = Vec::new();
    let mut in_metadata = false;
    // (local name, is ISBN identifier, accumulated text)
    let mut current: Option<(String, bool, String)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                if name == "metadata" {
                    in_metadata = true;
                } else if in_metadata {
                    if name == "meta" {
                        apply_calibre_meta(&mut m, &e);
                    }
                    let isbn = name == "identifier" && has_isbn_scheme(&e);
                    current = Some((name, isbn, String::new()));
                }
            }
            Ok(Event::Empty(e)) => {
                if in_metadata && local_name(&e) == "meta" {
                    apply_calibre_meta(&mut m, &e);
                }
            }
            Ok(Event::Text(t)) => {
                if let Some((_, _, buf)) = current.as_mut() {
                    let text = t.unescape().map_err(|e| e.to_string())?;
                    buf.push_str(&text);
                }
            }
            Ok(Event::CData(t)) => {
                if let Some((_, _, buf)) = current.as_mut() {
                    buf.push_str(&String::from_utf8_lossy(&t.into_inner()));
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_lowercase();
                if name == "metadata" {
                    in_metadata = false;
                } else if let Some((cur, isbn, text)) = current.take() {
                    if cur == name {
                        apply_dc(&mut m, &mut subjects, &cur, isbn, text.trim());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(format!(
                    "XML error at byte {}: {}",
                    reader.buffer_position(),
                    e
                ))
            }
        }
    }

    if m.genre.is_empty() {
        if let Some(first) = subjects.first() {
            m.genre = first.clone();
        }
    }
    if m.tags.is_empty() && !subjects.is_empty() {
        m.tags = subjects.join("; ");
    }
    Ok(m)
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_lowercase()
}

fn attr(e: &BytesStart<'_>, key: &str) -> Option<String> {
    e.attributes().flatten().find_map(|a| {
        let k = String::from_utf8_lossy(a.key.local_name().as_ref()).to_lowercase();
        (k == key).then(|| {
            a.unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(&a.value).into_owned())
        })
    })
}

fn has_isbn_scheme(e: &BytesStart<'_>) -> bool {
    attr(e, "scheme").is_some_and(|s| s.eq_ignore_ascii_case("isbn"))
}

fn set_once(field: &mut String, value: &str) {
    if field.is_empty() && !value.is_empty() {
        *field = value.to_string();
    }
}

fn apply_dc(m: &mut Metadata, subjects: &mut Vec<String>, name: &str, isbn: bool, text: &str) {
    match name {
        "title" => set_once(&mut m.title, text),
        "creator" => set_once(&mut m.writer, text),
        "publisher" => set_once(&mut m.publisher, text),
        "language" => set_once(&mut m.language, text),
        "series" => set_once(&mut m.series, text),
        "description" => set_once(&mut m.summary, &strip_html(text)),
        "subject" if !text.is_empty() => subjects.push(text.to_string()),
        "identifier" => {
            set_once(&mut m.web, text);
            let lower = text.to_ascii_lowercase();
            if isbn {
                set_once(&mut m.gtin, text);
            } else if let Some(rest) = lower.strip_prefix("urn:isbn:") {
                set_once(&mut m.gtin, rest);
            }
        }
        "date" => apply_date(m, text),
        _ => {}
    }
}

fn apply_calibre_meta(m: &mut Metadata, e: &BytesStart<'_>) {
    let (Some(name), Some(content)) = (attr(e, "name"), attr(e, "content")) else {
        return;
    };
    let content = content.trim();
    if content.is_empty() {
        return;
    }
    match name.to_lowercase().as_str() {
        "calibre:series_index" => set_once(&mut m.number, content),
        "calibre:series" => set_once(&mut m.localized_series, content),
        "calibre:tags" => {
            let tags: Vec<&str> = content
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect();
            m.tags = tags.join("; ");
        }
        _ => {}
    }
}

/// calibre stores "unknown" publication dates as year 0101.
fn apply_date(m: &mut Metadata, text: &str) {
    if !m.year.is_empty() {
        return;
    }
    let Some(caps) = RE_DATE.captures(text) else {
        return;
    };
    let year = &caps[1];
    if year < "1000" {
        return;
    }
    m.year = year.to_string();
    if let Some(month) = caps.get(2) {
        m.month = month.as_str().trim_start_matches('0').to_string();
    }
    if let Some(day) = caps.get(3) {
        m.day = day.as_str().trim_start_matches('0').to_string();
    }
}

/// Remove HTML markup from a description and collapse whitespace.
pub fn strip_html(text: &str) -> String {
    let no_tags = RE_TAG.replace_all(text, " ");
    let decoded = quick_xml::escape::unescape(&no_tags)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| no_tags.replace("&nbsp;", " "));
    RE_SPACE.replace_all(&decoded, " ").trim().to_string()
}
