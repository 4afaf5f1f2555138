//! Split-point calculation
//!
//! A split point is the 0-based index of the last page of an output group.
//! The final group always ends at the last page, so it never appears in the
//! returned set. Every function here returns strictly ascending indices below
//! `page_count - 1`, ready for [`crate::partition::partition`].

use crate::document::DocumentInfo;
use crate::error::{Result, SplitError};
use crate::outline::Bookmark;
use crate::params::{ChapterOptions, PageSelection, ResolvedSplitSpec, SizeOrCount};

/// Chapter titles longer than this are cut and end in "..."
const MAX_TITLE_CHARS: usize = 255;

/// Compute the split points for a resolved spec
///
/// For grid sections `info` must describe the sectioned document, where each
/// source page has already been fanned out into its section pages.
pub fn compute_split_points(spec: &ResolvedSplitSpec, info: &DocumentInfo) -> Result<Vec<usize>> {
    if info.page_count == 0 {
        return Err(SplitError::EmptyDocument);
    }

    match spec {
        ResolvedSplitSpec::ByExplicitPages(selection) => {
            explicit_page_split_points(selection, info.page_count)
        }
        ResolvedSplitSpec::ByGridSections(grid) => {
            Ok(section_split_points(info.page_count, grid.merge))
        }
        ResolvedSplitSpec::BySizeOrCount(SizeOrCount::Size { max_bytes }) => {
            Ok(size_split_points(&info.page_sizes, *max_bytes))
        }
        ResolvedSplitSpec::BySizeOrCount(SizeOrCount::PageCount(per_document)) => {
            Ok(page_count_split_points(info.page_count, *per_document))
        }
        ResolvedSplitSpec::BySizeOrCount(SizeOrCount::DocumentCount(documents)) => {
            Ok(document_count_split_points(info.page_count, *documents))
        }
        ResolvedSplitSpec::ByChapters(options) => {
            let bookmarks = info.bookmarks.as_deref().ok_or(SplitError::MissingOutline)?;
            Ok(chapter_split_points(&chapters(bookmarks, options)))
        }
    }
}

/// Each listed page closes a group; the last page never does
pub fn explicit_page_split_points(selection: &PageSelection, page_count: usize) -> Result<Vec<usize>> {
    if selection.is_every_page() {
        return Ok((0..page_count.saturating_sub(1)).collect());
    }

    if let Some(max_page) = selection.max_page() {
        if max_page > page_count {
            return Err(SplitError::OutOfRangePageReference {
                page: max_page,
                page_count,
            });
        }
    }

    Ok(selection
        .page_indices()
        .into_iter()
        .filter(|index| index + 1 < page_count)
        .collect())
}

/// Every section page is its own document unless they are merged into one
pub fn section_split_points(section_pages: usize, merge: bool) -> Vec<usize> {
    if merge {
        Vec::new()
    } else {
        (0..section_pages.saturating_sub(1)).collect()
    }
}

/// Greedy accumulation: close a group before the page that would push the
/// running total past `max_bytes`. A page larger than `max_bytes` ends up
/// alone in its group.
pub fn size_split_points(page_sizes: &[u64], max_bytes: u64) -> Vec<usize> {
    let mut points = Vec::new();
    let mut running: u64 = 0;
    let mut group_len = 0;

    for (index, &size) in page_sizes.iter().enumerate() {
        if group_len > 0 && running.saturating_add(size) > max_bytes {
            points.push(index - 1);
            running = 0;
            group_len = 0;
        }
        running = running.saturating_add(size);
        group_len += 1;
    }

    points
}

/// A group closes after every `per_document` pages
pub fn page_count_split_points(page_count: usize, per_document: usize) -> Vec<usize> {
    let per_document = per_document.max(1);
    (1..)
        .map(|group| group * per_document - 1)
        .take_while(|point| *point + 1 < page_count)
        .collect()
}

/// Divide the pages into `documents` groups whose sizes differ by at most one;
/// the first `page_count % documents` groups take the extra page. Asking for
/// more documents than pages yields one page per document.
pub fn document_count_split_points(page_count: usize, documents: usize) -> Vec<usize> {
    let documents = documents.clamp(1, page_count.max(1));
    let base = page_count / documents;
    let extra = page_count % documents;

    let mut points = Vec::with_capacity(documents.saturating_sub(1));
    let mut end = 0;
    for group in 0..documents.saturating_sub(1) {
        end += base + usize::from(group < extra);
        points.push(end - 1);
    }
    points
}

/// A chapter: the first page it starts on and the title used for its output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub start: usize,
    pub title: String,
    /// Titles of other bookmarks on the same start page, kept as separate
    /// single-page documents when duplicates are allowed
    pub duplicate_titles: Vec<String>,
}

/// Group the bookmarks at or above `options.bookmark_level` into chapters,
/// ordered by start page
pub fn chapters(bookmarks: &[Bookmark], options: &ChapterOptions) -> Vec<Chapter> {
    let mut selected: Vec<&Bookmark> = bookmarks
        .iter()
        .filter(|b| b.level <= options.bookmark_level)
        .collect();
    // Stable: bookmarks on the same page keep outline order
    selected.sort_by_key(|b| b.page_index);

    let mut chapters: Vec<Chapter> = Vec::new();
    let mut rest = selected.as_slice();
    while let Some(first) = rest.first() {
        let same_page = rest
            .iter()
            .take_while(|b| b.page_index == first.page_index)
            .count();
        let (group, tail) = rest.split_at(same_page);
        rest = tail;

        let mut titles: Vec<String> = group.iter().map(|b| b.title.clone()).collect();
        let chapter = if options.allow_duplicates {
            // The last bookmark on the page owns the chapter's page range
            let title = titles.pop().unwrap_or_default();
            Chapter {
                start: first.page_index,
                title,
                duplicate_titles: titles,
            }
        } else {
            Chapter {
                start: first.page_index,
                title: truncate_title(&titles.join(" ")),
                duplicate_titles: Vec::new(),
            }
        };
        chapters.push(chapter);
    }

    chapters
}

/// Every chapter after the first starts a new group; pages before the first
/// chapter fold into it
pub fn chapter_split_points(chapters: &[Chapter]) -> Vec<usize> {
    chapters.iter().skip(1).map(|c| c.start - 1).collect()
}

fn truncate_title(title: &str) -> String {
    if title.chars().count() <= MAX_TITLE_CHARS {
        return title.to_string();
    }
    let mut cut: String = title.chars().take(MAX_TITLE_CHARS - 2).collect();
    cut.push_str("...");
    cut
}
