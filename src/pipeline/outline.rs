//! Chapter detection: turn a PDF outline into an ordered list of chapter
//! start pages.
//!
//! The work is split in two halves at the sidecar boundary:
//!
//! 1. [`select_entries`] runs at preparation time over the raw outline. It
//!    drops front matter, everything after the end marker, and excluded
//!    headings, then frames the result with synthetic first/last page
//!    markers. Its output is what gets persisted as `<stem> chapters.json`.
//! 2. [`chapter_starts`] runs at packaging time over the persisted entries.
//!    It de-duplicates pages and applies the proximity filter that merges
//!    spurious sub-chapter breaks near the start of the book into chapter 1.
//!
//! Both halves are pure; [`build_chapter_list`] composes them.

use crate::config::{KeywordSets, PipelineConfig};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Title of the synthetic marker inserted at page 1.
pub const FIRST_PAGE_TITLE: &str = "First Page";

/// Title of the synthetic marker inserted one past the last page.
pub const LAST_PAGE_TITLE: &str = "Last Page";

/// One chapter candidate: a heading and the 1-based page it jumps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineEntry {
    pub title: String,
    pub page: u32,
}

impl OutlineEntry {
    pub fn new(title: impl Into<String>, page: u32) -> Self {
        Self {
            title: title.into(),
            page,
        }
    }
}

/// A raw outline node as read from the PDF, children included.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutlineNode {
    pub title: String,
    /// 1-based destination page; `None` when the bookmark has no page target.
    pub page: Option<u32>,
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    pub fn leaf(title: impl Into<String>, page: u32) -> Self {
        Self {
            title: title.into(),
            page: Some(page),
            children: Vec::new(),
        }
    }
}

/// Full chapter detection: [`select_entries`] followed by [`chapter_starts`].
pub fn build_chapter_list(
    outline: &[OutlineNode],
    total_pages: u32,
    config: &PipelineConfig,
) -> Vec<u32> {
    let entries = select_entries(outline, total_pages, &config.keywords, config.add_first_page);
    chapter_starts(&entries, config.chapter_page_threshold)
}

/// Filter the top level of `outline` down to chapter candidates.
///
/// Returns an empty list when no real heading survives the leading-skip and
/// end-marker rules; otherwise the survivors are framed by the synthetic
/// markers, sorted by page, and stripped of excluded headings.
pub fn select_entries(
    outline: &[OutlineNode],
    total_pages: u32,
    keywords: &KeywordSets,
    add_first_page: bool,
) -> Vec<OutlineEntry> {
    let mut leading_skipped = false;
    let mut ended = false;
    let mut real: Vec<OutlineEntry> = Vec::new();

    for node in outline {
        let Some(page) = node.page.filter(|&p| p >= 1) else {
            continue;
        };
        let normalized = normalize_title(&node.title);

        if !leading_skipped {
            if keywords
                .ignore_leading
                .iter()
                .any(|k| normalized.starts_with(k.as_str()))
            {
                continue;
            }
            leading_skipped = true;
        }

        if keywords
            .end_markers
            .iter()
            .any(|k| normalized.contains(k.as_str()))
        {
            ended = true;
        }
        if ended {
            break;
        }

        real.push(OutlineEntry::new(node.title.clone(), page));
    }

    if real.is_empty() {
        return Vec::new();
    }

    // (entry, is_synthetic)
    let mut framed: Vec<(OutlineEntry, bool)> = Vec::with_capacity(real.len() + 2);
    if add_first_page {
        framed.push((OutlineEntry::new(FIRST_PAGE_TITLE, 1), true));
    }
    framed.extend(real.into_iter().map(|e| (e, false)));
    framed.push((OutlineEntry::new(LAST_PAGE_TITLE, total_pages + 1), true));

    framed.sort_by_key(|(e, _)| e.page);

    framed
        .into_iter()
        .filter(|(entry, synthetic)| *synthetic || !is_excluded(&entry.title, keywords))
        .map(|(entry, _)| entry)
        .collect()
}

/// Reduce persisted entries to strictly ascending chapter start pages.
///
/// `threshold` is the minimum distance from the first start for any start
/// that precedes the "chapter two" heading (or any start at all when no
/// such heading exists).
pub fn chapter_starts(entries: &[OutlineEntry], threshold: u32) -> Vec<u32> {
    let mut sorted: Vec<&OutlineEntry> = entries.iter().collect();
    sorted.sort_by_key(|e| e.page);

    // Position among the sorted entries, duplicates included; it indexes the
    // de-duplicated page list below and may run past its end.
    let chapter_two_index = sorted.iter().position(|e| is_chapter_two(&e.title));

    let mut seen = HashSet::new();
    let pages: Vec<u32> = sorted
        .iter()
        .map(|e| e.page)
        .filter(|p| seen.insert(*p))
        .collect();

    if pages.len() <= 1 {
        return pages;
    }

    let first = pages[0];
    let min_page = first.saturating_add(threshold);

    let mut starts = Vec::with_capacity(pages.len());
    starts.push(first);
    match chapter_two_index {
        Some(k) if k > 0 => {
            let k = k.min(pages.len());
            starts.extend(pages[1..k].iter().copied().filter(|&p| p >= min_page));
            starts.extend_from_slice(&pages[k..]);
        }
        // Not found, or found at the very first start: every later start
        // is a merge candidate.
        _ => starts.extend(pages[1..].iter().copied().filter(|&p| p >= min_page)),
    }
    starts
}

/// Lowercase and trim a heading for keyword matching.
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

fn is_excluded(title: &str, keywords: &KeywordSets) -> bool {
    let lower = title.to_lowercase();
    keywords.exclude.iter().any(|k| lower.contains(k.as_str()))
}

static RE_CHAPTER_TWO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"chapter 2|chapter two").expect("static regex"));

/// Whether a heading names the second chapter.
///
/// Matches `chapter 2` / `chapter two` anywhere in the lowercased title, or
/// a title that is exactly `two`.
pub fn is_chapter_two(title: &str) -> bool {
    let lower = title.to_lowercase();
    lower == "two" || RE_CHAPTER_TWO.is_match(&lower)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(pages: &[(&str, u32)]) -> Vec<OutlineEntry> {
        pages.iter().map(|(t, p)| OutlineEntry::new(*t, *p)).collect()
    }

    fn leaves(pages: &[(&str, u32)]) -> Vec<OutlineNode> {
        pages.iter().map(|(t, p)| OutlineNode::leaf(*t, *p)).collect()
    }

    fn pages_of(list: &[OutlineEntry]) -> Vec<u32> {
        list.iter().map(|e| e.page).collect()
    }

    // ── select_entries ───────────────────────────────────────────────────

    #[test]
    fn frames_real_entries_with_synthetic_markers() {
        let outline = leaves(&[("Chapter 1", 3), ("Chapter 2", 20)]);
        let got = select_entries(&outline, 50, &KeywordSets::default(), true);
        assert_eq!(
            got,
            entries(&[
                (FIRST_PAGE_TITLE, 1),
                ("Chapter 1", 3),
                ("Chapter 2", 20),
                (LAST_PAGE_TITLE, 51)
            ])
        );
    }

    #[test]
    fn first_page_marker_is_optional() {
        let outline = leaves(&[("Chapter 1", 3)]);
        let got = select_entries(&outline, 10, &KeywordSets::default(), false);
        assert_eq!(pages_of(&got), vec![3, 11]);
    }

    #[test]
    fn nested_entries_are_ignored() {
        let mut part = OutlineNode::leaf("Part One", 5);
        part.children = leaves(&[("Chapter 1", 6), ("Chapter 2", 15)]);
        let got = select_entries(&[part], 30, &KeywordSets::none(), true);
        assert_eq!(pages_of(&got), vec![1, 5, 31]);
    }

    #[test]
    fn leading_front_matter_is_skipped_only_until_first_chapter() {
        let outline = leaves(&[
            ("Cover", 1),
            ("  Title Page", 2),
            ("Contents", 3),
            ("Chapter 1", 5),
            ("Cover Story", 30),
        ]);
        // Exclusion off so only the leading-skip rule is exercised.
        let keywords = KeywordSets::new(&["cover", "title", "contents"], &[], &[]);
        let got = select_entries(&outline, 40, &keywords, true);
        let titles: Vec<&str> = got.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec![FIRST_PAGE_TITLE, "Chapter 1", "Cover Story", LAST_PAGE_TITLE]);
    }

    #[test]
    fn end_marker_drops_entry_and_everything_after() {
        let outline = leaves(&[
            ("Chapter 1", 3),
            ("Chapter 2", 15),
            ("Epilogue", 40),
            ("Bonus Chapter", 45),
        ]);
        let got = select_entries(&outline, 50, &KeywordSets::default(), true);
        assert_eq!(pages_of(&got), vec![1, 3, 15, 51]);
    }

    #[test]
    fn excluded_titles_are_removed_after_sorting() {
        let outline = leaves(&[
            ("Prologue", 2),
            ("Chapter 1", 5),
            ("Author's Notes", 30),
            ("About the Author", 48),
        ]);
        let got = select_entries(&outline, 50, &KeywordSets::default(), true);
        assert_eq!(pages_of(&got), vec![1, 5, 51]);
    }

    #[test]
    fn exclusion_never_removes_synthetic_markers() {
        let outline = leaves(&[("Chapter 1", 4), ("Chapter 2", 20)]);
        let keywords = KeywordSets::new(&[], &[], &["page"]);
        let got = select_entries(&outline, 30, &keywords, true);
        assert_eq!(got.first().map(|e| e.page), Some(1));
        assert_eq!(got.last().map(|e| e.page), Some(31));
    }

    #[test]
    fn unordered_outline_is_sorted_by_page() {
        let outline = leaves(&[("Chapter 3", 30), ("Chapter 1", 4), ("Chapter 2", 17)]);
        let got = select_entries(&outline, 40, &KeywordSets::none(), true);
        assert_eq!(pages_of(&got), vec![1, 4, 17, 30, 41]);
    }

    #[test]
    fn empty_or_all_front_matter_outline_yields_no_chapters() {
        assert!(select_entries(&[], 100, &KeywordSets::default(), true).is_empty());
        let only_front = leaves(&[("Cover", 1), ("Contents", 2)]);
        assert!(select_entries(&only_front, 100, &KeywordSets::default(), true).is_empty());
        let starts_with_end = leaves(&[("Epilogue", 90)]);
        assert!(select_entries(&starts_with_end, 100, &KeywordSets::default(), true).is_empty());
    }

    #[test]
    fn nodes_without_page_are_skipped() {
        let outline = vec![
            OutlineNode {
                title: "Broken".into(),
                page: None,
                children: vec![],
            },
            OutlineNode::leaf("Chapter 1", 9),
        ];
        let got = select_entries(&outline, 20, &KeywordSets::none(), true);
        assert_eq!(pages_of(&got), vec![1, 9, 21]);
    }

    // ── chapter_starts ───────────────────────────────────────────────────

    #[test]
    fn dedups_and_merges_close_starts_without_chapter_two() {
        let list = entries(&[("a", 1), ("b", 5), ("c", 5), ("d", 12), ("e", 40)]);
        assert_eq!(chapter_starts(&list, 8), vec![1, 12, 40]);
    }

    #[test]
    fn starts_before_chapter_two_are_filtered_but_later_ones_kept() {
        let list = entries(&[
            (FIRST_PAGE_TITLE, 1),
            ("Chapter 1", 3),
            ("Chapter 2", 6),
            ("Chapter 3", 7),
            (LAST_PAGE_TITLE, 60),
        ]);
        // k = 2: page 3 < 1 + 8 is merged, pages from chapter two onward stay.
        assert_eq!(chapter_starts(&list, 8), vec![1, 6, 7, 60]);
    }

    #[test]
    fn chapter_two_index_counts_duplicate_entries() {
        let list = entries(&[
            (FIRST_PAGE_TITLE, 1),
            ("Part One", 5),
            ("Chapter 1", 5),
            ("Chapter 2", 7),
            ("Chapter 3", 30),
            (LAST_PAGE_TITLE, 100),
        ]);
        // Chapter 2 is entry 3, so pages[1..3] = [5, 7] are both merge
        // candidates and 7 < 1 + 8 is dropped with 5.
        assert_eq!(chapter_starts(&list, 8), vec![1, 30, 100]);
    }

    #[test]
    fn chapter_two_index_past_deduped_pages_is_clamped() {
        let list = entries(&[
            ("a", 1),
            ("b", 1),
            ("c", 1),
            ("d", 20),
            ("Chapter 2", 20),
        ]);
        // Entry index 4 exceeds the two distinct pages; every later page is
        // filtered and nothing is taken verbatim.
        assert_eq!(chapter_starts(&list, 8), vec![1, 20]);
    }

    #[test]
    fn chapter_two_at_first_start_falls_through_to_full_filter() {
        let list = entries(&[("Chapter Two", 1), ("Chapter 3", 4), ("Chapter 4", 20)]);
        assert_eq!(chapter_starts(&list, 8), vec![1, 20]);
    }

    #[test]
    fn chapter_two_matching_forms() {
        assert!(is_chapter_two("Chapter 2"));
        assert!(is_chapter_two("CHAPTER TWO: The Road"));
        assert!(is_chapter_two("Two"));
        assert!(!is_chapter_two("Two Roads"));
        assert!(!is_chapter_two("Chapter 1"));
    }

    #[test]
    fn unsorted_entries_are_sorted_first() {
        let list = entries(&[("x", 40), ("y", 1), ("z", 20)]);
        assert_eq!(chapter_starts(&list, 8), vec![1, 20, 40]);
    }

    #[test]
    fn zero_threshold_keeps_every_distinct_page() {
        let list = entries(&[("a", 1), ("b", 2), ("c", 2), ("d", 3)]);
        assert_eq!(chapter_starts(&list, 0), vec![1, 2, 3]);
    }

    #[test]
    fn short_lists_are_returned_unchanged() {
        assert!(chapter_starts(&[], 8).is_empty());
        assert_eq!(chapter_starts(&entries(&[("only", 7)]), 8), vec![7]);
    }

    #[test]
    fn output_is_strictly_ascending_for_messy_input() {
        let list = entries(&[
            ("q", 9),
            ("Chapter 2", 30),
            ("r", 3),
            ("s", 30),
            ("t", 1),
            ("u", 55),
            ("v", 12),
            ("w", 12),
        ]);
        let starts = chapter_starts(&list, 4);
        assert!(starts.windows(2).all(|w| w[0] < w[1]), "got {starts:?}");
        assert_eq!(starts, vec![1, 9, 12, 30, 55]);
    }

    // ── composition ──────────────────────────────────────────────────────

    #[test]
    fn build_chapter_list_end_to_end() {
        let outline = leaves(&[
            ("Cover", 1),
            ("Contents", 2),
            ("Prologue", 3),
            ("Chapter 1", 5),
            ("Chapter 2", 18),
            ("Chapter 3", 35),
            ("Epilogue", 60),
            ("About the Author", 64),
        ]);
        let config = PipelineConfig::default();
        // Prologue is leading but does not start with an ignore keyword, so
        // it ends the leading skip and is later removed by exclusion.
        assert_eq!(build_chapter_list(&outline, 65, &config), vec![1, 18, 35, 66]);
    }
}
