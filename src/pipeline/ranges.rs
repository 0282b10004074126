//! Range planning: chapter start pages → inclusive page ranges.
//!
//! Range `i` runs from start `i` to one page before start `i + 1`; the last
//! range is open-ended and extends to the end of the document. A book with
//! fewer starts than the split minimum becomes one open range from page 1.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound of a [`PageRange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeEnd {
    /// Inclusive last page.
    Page(u32),
    /// Up to and including the last page of the document.
    Open,
}

/// A 1-based, inclusive page range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start: u32,
    pub end: RangeEnd,
}

impl PageRange {
    pub fn closed(start: u32, end: u32) -> Self {
        Self {
            start,
            end: RangeEnd::Page(end),
        }
    }

    pub fn open(start: u32) -> Self {
        Self {
            start,
            end: RangeEnd::Open,
        }
    }

    /// The whole document.
    pub fn whole() -> Self {
        Self::open(1)
    }

    /// Clamp the range to a document of `total_pages` pages.
    ///
    /// Returns `None` when no page of the document falls inside the range,
    /// e.g. the trailing range that starts one past the last page.
    pub fn resolve(&self, total_pages: u32) -> Option<(u32, u32)> {
        let start = self.start.max(1);
        let end = match self.end {
            RangeEnd::Page(p) => p.min(total_pages),
            RangeEnd::Open => total_pages,
        };
        (start <= end).then_some((start, end))
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            RangeEnd::Page(end) => write!(f, "{}-{}", self.start, end),
            RangeEnd::Open => write!(f, "{}-end", self.start),
        }
    }
}

/// Outcome of range planning for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "ranges")]
pub enum SplitPlan {
    /// Package the whole document as one archive.
    Whole(PageRange),
    /// One archive per range, in order; chapter N is `ranges[N - 1]`.
    Chapters(Vec<PageRange>),
}

impl SplitPlan {
    pub fn is_split(&self) -> bool {
        matches!(self, SplitPlan::Chapters(_))
    }

    /// Every planned range in order.
    pub fn ranges(&self) -> Vec<PageRange> {
        match self {
            SplitPlan::Whole(r) => vec![*r],
            SplitPlan::Chapters(rs) => rs.clone(),
        }
    }
}

/// Build the split plan from ascending chapter start pages.
///
/// `starts.len() < min_chapters_for_split` (including an empty list) yields
/// [`SplitPlan::Whole`]. Otherwise each start opens one range, so the plan
/// has exactly `starts.len()` ranges.
pub fn plan_ranges(starts: &[u32], min_chapters_for_split: usize) -> SplitPlan {
    if starts.is_empty() || starts.len() < min_chapters_for_split {
        return SplitPlan::Whole(PageRange::whole());
    }

    let ranges = starts
        .iter()
        .enumerate()
        .map(|(i, &start)| match starts.get(i + 1) {
            Some(&next) => PageRange::closed(start, next.saturating_sub(1)),
            None => PageRange::open(start),
        })
        .collect();
    SplitPlan::Chapters(ranges)
}
