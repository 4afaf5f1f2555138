//! Split parameter resolution
//!
//! Turns the loosely-typed request bag sent by a form or API client into a
//! [`ResolvedSplitSpec`]. Everything downstream works on the resolved spec and
//! never re-parses strings.

use crate::error::{Result, SplitError};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Upper bound for grid divisions on either axis
pub const MAX_DIVISIONS: u32 = 300;

lazy_static! {
    /// A single page ("5") or an inclusive range ("5-10")
    static ref PAGE_TOKEN_PATTERN: Regex = Regex::new(r"^(\d+)(?:\s*-\s*(\d+))?$").unwrap();

    /// Size thresholds such as "10MB", "1.5 gb" or "500 KB"
    static ref SIZE_PATTERN: Regex =
        Regex::new(r"(?i)^\s*(\d+(?:\.\d+)?)\s*(KB|MB|GB)\s*$").unwrap();

    /// Plain positive counts
    static ref COUNT_PATTERN: Regex = Regex::new(r"^\s*(\d+)\s*$").unwrap();
}

/// A value that may arrive as a JSON bool, a JSON number or a string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LooseValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl LooseValue {
    fn as_text(&self) -> String {
        match self {
            LooseValue::Bool(b) => b.to_string(),
            LooseValue::Number(n) => n.to_string(),
            LooseValue::Text(s) => s.trim().to_string(),
        }
    }
}

impl From<&str> for LooseValue {
    fn from(value: &str) -> Self {
        LooseValue::Text(value.to_string())
    }
}

impl From<u32> for LooseValue {
    fn from(value: u32) -> Self {
        LooseValue::Number(value.into())
    }
}

impl From<bool> for LooseValue {
    fn from(value: bool) -> Self {
        LooseValue::Bool(value)
    }
}

/// Raw split request, as submitted by a client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SplitParameters {
    pub mode: String,
    pub page_numbers: Option<String>,
    pub horizontal_divisions: Option<LooseValue>,
    pub vertical_divisions: Option<LooseValue>,
    pub merge: Option<LooseValue>,
    pub split_type: Option<LooseValue>,
    pub split_value: Option<LooseValue>,
    pub bookmark_level: Option<LooseValue>,
    pub include_metadata: Option<LooseValue>,
    pub allow_duplicates: Option<LooseValue>,
}

impl SplitParameters {
    pub fn by_pages(selector: &str) -> Self {
        Self {
            mode: SplitMode::ByPages.to_string(),
            page_numbers: Some(selector.to_string()),
            ..Default::default()
        }
    }

    pub fn by_sections(horizontal: u32, vertical: u32, merge: bool) -> Self {
        Self {
            mode: SplitMode::BySections.to_string(),
            horizontal_divisions: Some(horizontal.into()),
            vertical_divisions: Some(vertical.into()),
            merge: Some(merge.into()),
            ..Default::default()
        }
    }

    pub fn by_size_or_count(split_type: &str, value: &str) -> Self {
        Self {
            mode: SplitMode::BySizeOrCount.to_string(),
            split_type: Some(split_type.into()),
            split_value: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn by_chapters(bookmark_level: u32, include_metadata: bool, allow_duplicates: bool) -> Self {
        Self {
            mode: SplitMode::ByChapters.to_string(),
            bookmark_level: Some(bookmark_level.into()),
            include_metadata: Some(include_metadata.into()),
            allow_duplicates: Some(allow_duplicates.into()),
            ..Default::default()
        }
    }
}

/// The four split strategies a request can name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitMode {
    ByPages,
    BySections,
    BySizeOrCount,
    ByChapters,
}

impl fmt::Display for SplitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SplitMode::ByPages => "byPages",
            SplitMode::BySections => "bySections",
            SplitMode::BySizeOrCount => "bySizeOrCount",
            SplitMode::ByChapters => "byChapters",
        };
        f.write_str(name)
    }
}

impl FromStr for SplitMode {
    type Err = SplitError;

    /// Accepts the mode names ("byPages") as well as endpoint names
    /// ("split-pages"), ignoring case, dashes and underscores.
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "bypages" | "splitpages" => Ok(SplitMode::ByPages),
            "bysections" | "splitpdfbysections" => Ok(SplitMode::BySections),
            "bysizeorcount" | "splitbysizeorcount" => Ok(SplitMode::BySizeOrCount),
            "bychapters" | "splitpdfbychapters" => Ok(SplitMode::ByChapters),
            _ => Err(SplitError::UnsupportedStrategy(s.to_string())),
        }
    }
}

/// One token of a page selector, 1-based and inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageToken {
    Single(usize),
    Range(usize, usize),
}

impl PageToken {
    pub fn last(&self) -> usize {
        match *self {
            PageToken::Single(page) => page,
            PageToken::Range(_, end) => end,
        }
    }

    fn pages(&self) -> std::ops::RangeInclusive<usize> {
        match *self {
            PageToken::Single(page) => page..=page,
            PageToken::Range(start, end) => start..=end,
        }
    }
}

/// Parsed explicit page selection
///
/// An empty selection means "every page on its own"; the resolver never
/// produces one from user input, but programmatic callers may.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSelection {
    tokens: Vec<PageToken>,
}

impl PageSelection {
    /// Parse a selector like "1,3,5-10"
    pub fn parse(input: &str) -> Result<Self> {
        if input.trim().is_empty() {
            return Err(SplitError::InvalidPageSelector("selector is empty".into()));
        }

        let mut tokens = Vec::new();
        for part in input.split(',') {
            let part = part.trim();
            if part.is_empty() {
                return Err(SplitError::InvalidPageSelector(format!(
                    "empty entry in \"{}\"",
                    input
                )));
            }
            tokens.push(parse_token(part)?);
        }

        Ok(Self { tokens })
    }

    pub fn every_page() -> Self {
        Self::default()
    }

    pub fn is_every_page(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[PageToken] {
        &self.tokens
    }

    /// Highest 1-based page the selector references
    pub fn max_page(&self) -> Option<usize> {
        self.tokens.iter().map(PageToken::last).max()
    }

    /// All selected pages as sorted, deduplicated 0-based indices
    pub fn page_indices(&self) -> BTreeSet<usize> {
        self.tokens
            .iter()
            .flat_map(|token| token.pages())
            .map(|page| page - 1)
            .collect()
    }
}

fn parse_token(part: &str) -> Result<PageToken> {
    let caps = PAGE_TOKEN_PATTERN
        .captures(part)
        .ok_or_else(|| SplitError::InvalidPageSelector(format!("\"{}\" is not a page or range", part)))?;

    let parse = |s: &str| {
        s.parse::<usize>()
            .map_err(|_| SplitError::InvalidPageSelector(format!("\"{}\" is not a valid page", s)))
    };

    let start = parse(&caps[1])?;
    if start == 0 {
        return Err(SplitError::InvalidPageSelector(
            "page numbers start at 1".into(),
        ));
    }

    match caps.get(2) {
        None => Ok(PageToken::Single(start)),
        Some(end) => {
            let end = parse(end.as_str())?;
            if start > end {
                return Err(SplitError::InvalidPageSelector(format!(
                    "range {}-{} is inverted",
                    start, end
                )));
            }
            Ok(PageToken::Range(start, end))
        }
    }
}

/// Grid-section parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSections {
    pub horizontal_divisions: u32,
    pub vertical_divisions: u32,
    pub merge: bool,
}

impl GridSections {
    pub fn rows(&self) -> usize {
        self.horizontal_divisions as usize + 1
    }

    pub fn columns(&self) -> usize {
        self.vertical_divisions as usize + 1
    }

    /// Output pages produced per input page
    pub fn fan_out(&self) -> usize {
        self.rows() * self.columns()
    }
}

/// Size/count thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeOrCount {
    Size { max_bytes: u64 },
    PageCount(usize),
    DocumentCount(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChapterOptions {
    /// 1 is the top level of the outline
    pub bookmark_level: u32,
    pub include_metadata: bool,
    pub allow_duplicates: bool,
}

/// Validated, strongly-typed split request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedSplitSpec {
    ByExplicitPages(PageSelection),
    ByGridSections(GridSections),
    BySizeOrCount(SizeOrCount),
    ByChapters(ChapterOptions),
}

impl ResolvedSplitSpec {
    pub fn mode(&self) -> SplitMode {
        match self {
            ResolvedSplitSpec::ByExplicitPages(_) => SplitMode::ByPages,
            ResolvedSplitSpec::ByGridSections(_) => SplitMode::BySections,
            ResolvedSplitSpec::BySizeOrCount(_) => SplitMode::BySizeOrCount,
            ResolvedSplitSpec::ByChapters(_) => SplitMode::ByChapters,
        }
    }
}

/// Validate and normalize a raw request
pub fn resolve(params: &SplitParameters) -> Result<ResolvedSplitSpec> {
    match params.mode.parse::<SplitMode>()? {
        SplitMode::ByPages => {
            let selector = params.page_numbers.as_deref().unwrap_or("");
            Ok(ResolvedSplitSpec::ByExplicitPages(PageSelection::parse(
                selector,
            )?))
        }
        SplitMode::BySections => Ok(ResolvedSplitSpec::ByGridSections(GridSections {
            horizontal_divisions: parse_divisions(
                params.horizontal_divisions.as_ref(),
                "horizontal divisions",
            )?,
            vertical_divisions: parse_divisions(
                params.vertical_divisions.as_ref(),
                "vertical divisions",
            )?,
            merge: parse_flag(params.merge.as_ref(), "merge")?,
        })),
        SplitMode::BySizeOrCount => Ok(ResolvedSplitSpec::BySizeOrCount(parse_size_or_count(
            params.split_type.as_ref(),
            params.split_value.as_ref(),
        )?)),
        SplitMode::ByChapters => Ok(ResolvedSplitSpec::ByChapters(ChapterOptions {
            bookmark_level: parse_bookmark_level(params.bookmark_level.as_ref())?,
            include_metadata: parse_flag(params.include_metadata.as_ref(), "include metadata")?,
            allow_duplicates: parse_flag(params.allow_duplicates.as_ref(), "allow duplicates")?,
        })),
    }
}

fn parse_divisions(value: Option<&LooseValue>, axis: &'static str) -> Result<u32> {
    let text = value.map(LooseValue::as_text).unwrap_or_default();
    text.parse::<u32>()
        .ok()
        .filter(|n| *n <= MAX_DIVISIONS)
        .ok_or(SplitError::InvalidDivisionCount { axis, value: text })
}

fn parse_flag(value: Option<&LooseValue>, field: &str) -> Result<bool> {
    let Some(value) = value else {
        return Ok(false);
    };

    match value.as_text().to_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" | "" => Ok(false),
        other => Err(SplitError::InvalidSplitValue(format!(
            "{} must be true or false, got \"{}\"",
            field, other
        ))),
    }
}

fn parse_bookmark_level(value: Option<&LooseValue>) -> Result<u32> {
    let text = value.map(LooseValue::as_text).unwrap_or_default();
    text.parse::<u32>()
        .ok()
        .filter(|level| *level > 0)
        .ok_or(SplitError::InvalidBookmarkLevel(text))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SplitType {
    Size,
    PageCount,
    DocumentCount,
}

fn parse_split_type(value: Option<&LooseValue>) -> Result<SplitType> {
    let text = value.map(LooseValue::as_text).unwrap_or_default();
    let normalized: String = text
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .collect::<String>()
        .to_lowercase();

    match normalized.as_str() {
        "size" | "0" => Ok(SplitType::Size),
        "pagecount" | "pages" | "1" => Ok(SplitType::PageCount),
        "doccount" | "documentcount" | "documents" | "2" => Ok(SplitType::DocumentCount),
        _ => Err(SplitError::InvalidSplitValue(format!(
            "unknown split type \"{}\"",
            text
        ))),
    }
}

fn parse_size_or_count(
    split_type: Option<&LooseValue>,
    value: Option<&LooseValue>,
) -> Result<SizeOrCount> {
    let split_type = parse_split_type(split_type)?;
    let text = value.map(LooseValue::as_text).unwrap_or_default();
    if text.is_empty() {
        return Err(SplitError::InvalidSplitValue("split value is blank".into()));
    }

    match split_type {
        SplitType::Size => parse_size(&text).map(|max_bytes| SizeOrCount::Size { max_bytes }),
        SplitType::PageCount => parse_count(&text).map(SizeOrCount::PageCount),
        SplitType::DocumentCount => parse_count(&text).map(SizeOrCount::DocumentCount),
    }
}

/// Parse "<number><unit>" with binary units into a byte count
pub fn parse_size(text: &str) -> Result<u64> {
    let caps = SIZE_PATTERN.captures(text).ok_or_else(|| {
        SplitError::InvalidSplitValue(format!(
            "\"{}\" is not a size such as 10MB, 500KB or 1GB",
            text
        ))
    })?;

    let amount: f64 = caps[1]
        .parse()
        .map_err(|_| SplitError::InvalidSplitValue(format!("\"{}\" is not a number", &caps[1])))?;
    let unit: u64 = match caps[2].to_uppercase().as_str() {
        "KB" => 1024,
        "MB" => 1024 * 1024,
        _ => 1024 * 1024 * 1024,
    };

    let bytes = (amount * unit as f64).floor() as u64;
    if bytes == 0 {
        return Err(SplitError::InvalidSplitValue(format!(
            "size \"{}\" must be greater than zero",
            text
        )));
    }
    Ok(bytes)
}

fn parse_count(text: &str) -> Result<usize> {
    COUNT_PATTERN
        .captures(text)
        .and_then(|caps| caps[1].parse::<usize>().ok())
        .filter(|count| *count > 0)
        .ok_or_else(|| {
            SplitError::InvalidSplitValue(format!("\"{}\" is not a positive whole number", text))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_selector_single_and_ranges() {
        let selection = PageSelection::parse("1,3,5-10").unwrap();
        assert_eq!(
            selection.tokens(),
            &[
                PageToken::Single(1),
                PageToken::Single(3),
                PageToken::Range(5, 10)
            ]
        );
        assert_eq!(selection.max_page(), Some(10));
    }

    #[test]
    fn test_selector_tolerates_whitespace() {
        let selection = PageSelection::parse(" 1 , 2 - 4 ").unwrap();
        assert_eq!(
            selection.tokens(),
            &[PageToken::Single(1), PageToken::Range(2, 4)]
        );
    }

    #[test]
    fn test_selector_rejects_malformed() {
        for selector in ["", "   ", "abc", "5-2", "1,,2", "0", "1-", "-3", "1-2-3"] {
            let err = PageSelection::parse(selector).unwrap_err();
            assert!(
                matches!(err, SplitError::InvalidPageSelector(_)),
                "{:?} gave {:?}",
                selector,
                err
            );
        }
    }

    #[test]
    fn test_page_indices_are_zero_based_and_deduplicated() {
        let selection = PageSelection::parse("3,1-3").unwrap();
        assert_eq!(
            selection.page_indices().into_iter().collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_mode_accepts_endpoint_names() {
        assert_eq!("split-pages".parse::<SplitMode>().unwrap(), SplitMode::ByPages);
        assert_eq!(
            "bySizeOrCount".parse::<SplitMode>().unwrap(),
            SplitMode::BySizeOrCount
        );
        assert_eq!(
            "by_chapters".parse::<SplitMode>().unwrap(),
            SplitMode::ByChapters
        );
        assert!(matches!(
            "rotate".parse::<SplitMode>(),
            Err(SplitError::UnsupportedStrategy(_))
        ));
    }

    #[test]
    fn test_resolve_sections() {
        let spec = resolve(&SplitParameters::by_sections(1, 2, true)).unwrap();
        let ResolvedSplitSpec::ByGridSections(grid) = spec else {
            panic!("expected grid sections");
        };
        assert_eq!(grid.rows(), 2);
        assert_eq!(grid.columns(), 3);
        assert_eq!(grid.fan_out(), 6);
        assert!(grid.merge);
    }

    #[test]
    fn test_resolve_sections_rejects_out_of_range() {
        for bad in ["301", "-1", "two", ""] {
            let params = SplitParameters {
                mode: "bySections".into(),
                horizontal_divisions: Some(bad.into()),
                vertical_divisions: Some(0.into()),
                ..Default::default()
            };
            assert!(matches!(
                resolve(&params),
                Err(SplitError::InvalidDivisionCount { .. })
            ));
        }
    }

    #[test]
    fn test_resolve_sections_accepts_bounds() {
        let spec = resolve(&SplitParameters::by_sections(0, 300, false)).unwrap();
        assert!(matches!(spec, ResolvedSplitSpec::ByGridSections(_)));
    }

    #[test]
    fn test_parse_size_units() {
        assert_eq!(parse_size("10MB").unwrap(), 10 * 1024 * 1024);
        assert_eq!(parse_size("500 kb").unwrap(), 500 * 1024);
        assert_eq!(parse_size("1.5GB").unwrap(), 1_610_612_736);
        assert!(parse_size("10").is_err());
        assert!(parse_size("10TB").is_err());
        assert!(parse_size("0MB").is_err());
    }

    #[test]
    fn test_resolve_size_or_count() {
        let spec = resolve(&SplitParameters::by_size_or_count("size", "2MB")).unwrap();
        assert_eq!(
            spec,
            ResolvedSplitSpec::BySizeOrCount(SizeOrCount::Size {
                max_bytes: 2 * 1024 * 1024
            })
        );

        let spec = resolve(&SplitParameters::by_size_or_count("1", "5")).unwrap();
        assert_eq!(spec, ResolvedSplitSpec::BySizeOrCount(SizeOrCount::PageCount(5)));

        let spec = resolve(&SplitParameters::by_size_or_count("docCount", "3")).unwrap();
        assert_eq!(
            spec,
            ResolvedSplitSpec::BySizeOrCount(SizeOrCount::DocumentCount(3))
        );
    }

    #[test]
    fn test_resolve_size_or_count_rejects_bad_values() {
        for (split_type, value) in [
            ("size", "  "),
            ("size", "lots"),
            ("pageCount", "0"),
            ("pageCount", "10MB"),
            ("docCount", "-2"),
            ("weight", "3"),
        ] {
            let result = resolve(&SplitParameters::by_size_or_count(split_type, value));
            assert!(
                matches!(result, Err(SplitError::InvalidSplitValue(_))),
                "{}={:?} gave {:?}",
                split_type,
                value,
                result
            );
        }
    }

    #[test]
    fn test_resolve_chapters() {
        let spec = resolve(&SplitParameters::by_chapters(2, true, false)).unwrap();
        assert_eq!(
            spec,
            ResolvedSplitSpec::ByChapters(ChapterOptions {
                bookmark_level: 2,
                include_metadata: true,
                allow_duplicates: false,
            })
        );
    }

    #[test]
    fn test_resolve_chapters_rejects_zero_level() {
        let result = resolve(&SplitParameters::by_chapters(0, false, false));
        assert!(matches!(result, Err(SplitError::InvalidBookmarkLevel(_))));
    }

    #[test]
    fn test_parameters_deserialize_loose_json() {
        let json = r#"{
            "mode": "bySections",
            "horizontalDivisions": "2",
            "verticalDivisions": 1,
            "merge": "on"
        }"#;
        let params: SplitParameters = serde_json::from_str(json).unwrap();
        let spec = resolve(&params).unwrap();
        assert_eq!(
            spec,
            ResolvedSplitSpec::ByGridSections(GridSections {
                horizontal_divisions: 2,
                vertical_divisions: 1,
                merge: true,
            })
        );
    }
}
