//! `ComicInfo.xml` rendering.
//!
//! Comic readers (Komga, Kavita, ComicRack) read series/number metadata from
//! a `ComicInfo.xml` entry at the archive root. The element list is fixed:
//! every element is always written, empty when there is no value, so
//! readers that expect the full schema never see a missing node.

use crate::error::Book2CbzError;
use crate::pipeline::sidecar::Metadata;
use quick_xml::events::{BytesDecl, BytesText, Event};
use quick_xml::Writer;

/// Archive entry name of the metadata document.
pub const COMIC_INFO_NAME: &str = "ComicInfo.xml";

/// Element order of the emitted document.
pub const COMIC_INFO_ELEMENTS: &[&str] = &[
    "Title",
    "LocalizedSeries",
    "Series",
    "Number",
    "Count",
    "Volume",
    "Summary",
    "Publisher",
    "Year",
    "Month",
    "Day",
    "Writer",
    "Penciller",
    "Inker",
    "Colorist",
    "Letterer",
    "CoverArtist",
    "Editor",
    "Translator",
    "Genre",
    "Tags",
    "Web",
    "LanguageISO",
    "Format",
    "SeriesGroup",
    "AgeRating",
    "GTIN",
    "Status",
    "Price",
    "Country",
    "Barcode",
    "Imprint",
];

/// Render the `ComicInfo.xml` document for chapter `chapter` of a book.
///
/// `<Number>` is always the chapter number. `Series` and `SeriesGroup`
/// fall back to the calibre series name (`localized_series`), and `Volume`
/// falls back to the series index (`number`), when the sidecar leaves them
/// empty.
pub fn render_comic_info(metadata: &Metadata, chapter: usize) -> Result<String, Book2CbzError> {
    let chapter = chapter.to_string();
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_err)?;

    writer
        .create_element("ComicInfo")
        .write_inner_content(|w| {
            for &name in COMIC_INFO_ELEMENTS {
                let value = element_value(metadata, name, &chapter);
                w.create_element(name)
                    .write_text_content(BytesText::new(value))?;
            }
            Ok(())
        })
        .map_err(xml_err)?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| Book2CbzError::Internal(format!("ComicInfo is not UTF-8: {e}")))
}

fn element_value<'a>(m: &'a Metadata, name: &str, chapter: &'a str) -> &'a str {
    match name {
        "Title" => &m.title,
        "LocalizedSeries" => &m.localized_series,
        "Series" => or_else(&m.series, &m.localized_series),
        "Number" => chapter,
        "Count" => &m.count,
        "Volume" => or_else(&m.volume, &m.number),
        "Summary" => &m.summary,
        "Publisher" => &m.publisher,
        "Year" => &m.year,
        "Month" => &m.month,
        "Day" => &m.day,
        "Writer" => &m.writer,
        "Penciller" => &m.penciller,
        "Inker" => &m.inker,
        "Colorist" => &m.colorist,
        "Letterer" => &m.letterer,
        "CoverArtist" => &m.cover_artist,
        "Editor" => &m.editor,
        "Translator" => &m.translator,
        "Genre" => &m.genre,
        "Tags" => &m.tags,
        "Web" => &m.web,
        "LanguageISO" => &m.language,
        "Format" => &m.format,
        "SeriesGroup" => or_else(&m.series_group, &m.localized_series),
        "AgeRating" => &m.age_rating,
        "GTIN" => &m.gtin,
        // Status, Price, Country, Barcode, Imprint have no source field.
        _ => "",
    }
}

fn or_else<'a>(primary: &'a str, fallback: &'a str) -> &'a str {
    if primary.trim().is_empty() {
        fallback
    } else {
        primary
    }
}

fn xml_err(e: quick_xml::Error) -> Book2CbzError {
    Book2CbzError::Internal(format!("ComicInfo serialisation: {e}"))
}
