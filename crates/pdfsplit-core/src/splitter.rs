//! Split orchestration
//!
//! Load, plan and materialize one source file at a time. A file's whole plan
//! is computed before its first output is built, so a failing plan never
//! leaves partial output behind.

use crate::command::{InputFile, OutputDocument};
use crate::document::{load_document, DocumentInfo, DEFAULT_PAGE_OVERHEAD_BYTES};
use crate::error::{Result, SplitError};
use crate::materialize::{materialize, MaterializeOptions};
use crate::params::{resolve, ResolvedSplitSpec, SplitParameters};
use crate::partition::partition;
use crate::sections::build_section_document;
use crate::split_points::{chapters, compute_split_points};
use lopdf::Document;
use std::collections::BTreeSet;
use std::path::Path;

/// What happens to pages an explicit selector does not list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnlistedPages {
    /// Output groups only hold listed pages; groups left empty are skipped
    #[default]
    Drop,
    /// Unlisted pages stay in the group of the listed page before them
    FoldIntoPrevious,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitOptions {
    pub unlisted_pages: UnlistedPages,
    /// Added to each page's content size when estimating output size
    pub page_overhead_bytes: u64,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            unlisted_pages: UnlistedPages::default(),
            page_overhead_bytes: DEFAULT_PAGE_OVERHEAD_BYTES,
        }
    }
}

/// Pages of one output document, as 0-based indices in output order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageGroup {
    pub pages: Vec<usize>,
    pub title: Option<String>,
}

impl PageGroup {
    fn untitled(pages: impl IntoIterator<Item = usize>) -> Self {
        Self {
            pages: pages.into_iter().collect(),
            title: None,
        }
    }
}

/// Turn a resolved spec into the page groups of each output document
pub fn plan(
    spec: &ResolvedSplitSpec,
    info: &DocumentInfo,
    options: &SplitOptions,
) -> Result<Vec<PageGroup>> {
    let split_points = compute_split_points(spec, info)?;
    let ranges = partition(info.page_count, &split_points);

    tracing::debug!(
        "Partitioned {} pages at {:?} into {} ranges",
        info.page_count,
        split_points,
        ranges.len()
    );

    let groups = match spec {
        ResolvedSplitSpec::ByExplicitPages(selection)
            if options.unlisted_pages == UnlistedPages::Drop && !selection.is_every_page() =>
        {
            let listed: BTreeSet<usize> = selection.page_indices();
            ranges
                .into_iter()
                .map(|range| PageGroup::untitled(range.filter(|page| listed.contains(page))))
                .filter(|group| !group.pages.is_empty())
                .collect()
        }
        ResolvedSplitSpec::ByChapters(chapter_options) => {
            let bookmarks = info.bookmarks.as_deref().ok_or(SplitError::MissingOutline)?;
            let chapters = chapters(bookmarks, chapter_options);
            if chapters.is_empty() {
                tracing::warn!(
                    "No bookmarks at level {} or above, keeping the document whole",
                    chapter_options.bookmark_level
                );
                return Ok(ranges.into_iter().map(PageGroup::untitled).collect());
            }

            let mut groups = Vec::with_capacity(ranges.len());
            for (chapter, range) in chapters.into_iter().zip(ranges) {
                for title in chapter.duplicate_titles {
                    groups.push(PageGroup {
                        pages: vec![chapter.start],
                        title: Some(title),
                    });
                }
                groups.push(PageGroup {
                    pages: range.collect(),
                    title: Some(chapter.title),
                });
            }
            groups
        }
        _ => ranges.into_iter().map(PageGroup::untitled).collect(),
    };

    Ok(groups)
}

/// Split one source file
pub fn split_document(
    name: &str,
    bytes: &[u8],
    spec: &ResolvedSplitSpec,
    options: &SplitOptions,
) -> Result<Vec<OutputDocument>> {
    let source = load_document(bytes)?;
    let working: Document = match spec {
        ResolvedSplitSpec::ByGridSections(grid) => build_section_document(&source, grid)?,
        _ => source,
    };

    let info = DocumentInfo::from_document(&working, options.page_overhead_bytes);
    let groups = plan(spec, &info, options)?;

    let materialize_options = MaterializeOptions {
        include_metadata: match spec {
            ResolvedSplitSpec::ByChapters(chapter_options) => chapter_options.include_metadata,
            _ => true,
        },
    };

    let mut outputs = Vec::with_capacity(groups.len());
    for (index, group) in groups.into_iter().enumerate() {
        let bytes = materialize(&working, &group.pages, &materialize_options)?;
        let filename = output_filename(name, index + 1);
        tracing::debug!(
            "Wrote {} ({} pages, {} bytes)",
            filename,
            group.pages.len(),
            bytes.len()
        );
        outputs.push(OutputDocument {
            filename,
            bytes,
            page_count: group.pages.len(),
            title: group.title,
        });
    }

    tracing::info!(
        "Split {} ({} pages) {} into {} documents",
        name,
        info.page_count,
        spec.mode(),
        outputs.len()
    );

    Ok(outputs)
}

/// Resolve raw parameters and split every file, all or nothing
pub fn split(
    params: &SplitParameters,
    files: &[InputFile],
    options: &SplitOptions,
) -> Result<Vec<OutputDocument>> {
    let spec = resolve(params)?;
    split_batch(files, &spec, options)
}

/// Split every file; the first failure fails the whole batch
///
/// Outputs are ordered by source file, then by part number.
pub fn split_batch(
    files: &[InputFile],
    spec: &ResolvedSplitSpec,
    options: &SplitOptions,
) -> Result<Vec<OutputDocument>> {
    let per_file = split_each(files, spec, options)
        .into_iter()
        .collect::<Result<Vec<_>>>()?;
    Ok(per_file.into_iter().flatten().collect())
}

/// Split every file independently, keeping each file's outcome
pub fn split_batch_lenient(
    files: &[InputFile],
    spec: &ResolvedSplitSpec,
    options: &SplitOptions,
) -> Vec<Result<Vec<OutputDocument>>> {
    let results = split_each(files, spec, options);
    for (file, result) in files.iter().zip(&results) {
        if let Err(e) = result {
            tracing::warn!("Skipping {}: {}", file.name, e);
        }
    }
    results
}

#[cfg(not(feature = "parallel"))]
fn split_each(
    files: &[InputFile],
    spec: &ResolvedSplitSpec,
    options: &SplitOptions,
) -> Vec<Result<Vec<OutputDocument>>> {
    files
        .iter()
        .map(|file| split_document(&file.name, &file.bytes, spec, options))
        .collect()
}

#[cfg(feature = "parallel")]
fn split_each(
    files: &[InputFile],
    spec: &ResolvedSplitSpec,
    options: &SplitOptions,
) -> Vec<Result<Vec<OutputDocument>>> {
    use rayon::prelude::*;

    files
        .par_iter()
        .map(|file| split_document(&file.name, &file.bytes, spec, options))
        .collect()
}

/// `{base}_{part}.pdf`, where `base` is the source name without directory or
/// final extension
pub fn output_filename(source_name: &str, part: usize) -> String {
    let base = Path::new(source_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "document".to_string());
    format!("{}_{}.pdf", base, part)
}
