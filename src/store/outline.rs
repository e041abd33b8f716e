//! Pure outline helpers: page reindexing, raw-text joining and outline parsing.

use crate::types::{Page, PageType};

/// Delimiter placed between page contents in the raw outline text.
pub const PAGE_DELIMITER: &str = "\n\n<page>\n\n";

const PAGE_TAG: &str = "<page>";
const FALLBACK_SEPARATOR: &str = "---";

/// Renumber pages so that `pages[i].index == i`, preserving order.
pub fn reindex(pages: Vec<Page>) -> Vec<Page> {
    pages
        .into_iter()
        .enumerate()
        .map(|(index, page)| Page { index, ..page })
        .collect()
}

/// Join page contents in index order with [`PAGE_DELIMITER`].
pub fn join_pages(pages: &[Page]) -> String {
    pages
        .iter()
        .map(|page| page.content.as_str())
        .collect::<Vec<_>>()
        .join(PAGE_DELIMITER)
}

/// Split raw outline text into pages.
///
/// Pages are separated by `<page>` (any case); text without that tag falls back
/// to `---`. A leading `[tag]` selects the page type, defaulting to content.
pub fn parse_outline(raw: &str) -> Vec<Page> {
    let pieces = if contains_page_tag(raw) {
        split_on_page_tag(raw)
    } else {
        raw.split(FALLBACK_SEPARATOR).collect()
    };

    let pages = pieces
        .into_iter()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| Page::new(0, detect_page_type(text), text))
        .collect();
    reindex(pages)
}

fn contains_page_tag(raw: &str) -> bool {
    raw.to_ascii_lowercase().contains(PAGE_TAG)
}

// ASCII lowercasing keeps byte offsets, so positions found in the lowered copy
// are valid slice boundaries in the original.
fn split_on_page_tag(raw: &str) -> Vec<&str> {
    let lowered = raw.to_ascii_lowercase();
    let mut pieces = Vec::new();
    let mut start = 0;
    for (pos, _) in lowered.match_indices(PAGE_TAG) {
        pieces.push(&raw[start..pos]);
        start = pos + PAGE_TAG.len();
    }
    pieces.push(&raw[start..]);
    pieces
}

fn detect_page_type(text: &str) -> PageType {
    let Some(rest) = text.strip_prefix('[') else {
        return PageType::Content;
    };
    let Some(end) = rest.find(']') else {
        return PageType::Content;
    };
    let tag = &rest[..end];
    if tag.is_empty() || tag.chars().any(char::is_whitespace) {
        return PageType::Content;
    }
    PageType::from_tag(tag).unwrap_or(PageType::Content)
}
