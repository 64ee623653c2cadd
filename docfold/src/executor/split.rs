//! Page-range segmentation of oversized inputs.

use std::path::PathBuf;

use crate::engine::PageSpan;

/// A page-range slice of an oversized input, written into the workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitSegment {
    /// The oversized input.
    pub source: PathBuf,
    /// Pages covered, inclusive.
    pub span: PageSpan,
    /// Where the slice is written.
    pub temp_path: PathBuf,
}

/// Page ranges for an input of `size` bytes and `pages` pages.
///
/// Segment count is `ceil(size / trigger)` and every segment but the last
/// holds `ceil(pages / count)` pages. The ranges are contiguous and cover
/// `1..=pages` exactly once; fewer segments come back when there are fewer
/// pages than segments.
pub fn plan_segments(size: u64, pages: u32, trigger: u64) -> Vec<PageSpan> {
    if pages == 0 {
        return Vec::new();
    }

    let count = size.max(1).div_ceil(trigger.max(1)).max(1);
    let count = u32::try_from(count).unwrap_or(u32::MAX);
    let per_segment = pages.div_ceil(count).max(1);

    let mut spans = Vec::new();
    let mut start = 1u32;
    while start <= pages {
        let end = pages.min(start.saturating_add(per_segment - 1));
        spans.push(PageSpan::new(start, end));
        start = end + 1;
    }
    spans
}
