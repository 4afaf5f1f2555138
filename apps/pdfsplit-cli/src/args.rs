use clap::{Parser, ValueEnum};
use pdfsplit_core::params::LooseValue;
use pdfsplit_core::{SplitMode, SplitOptions, SplitParameters, UnlistedPages};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pdfsplit")]
#[command(version, about = "Split PDF files by pages, grid sections, size or chapters")]
pub struct Args {
    /// Split strategy
    #[arg(long, env = "PDFSPLIT_MODE", value_enum)]
    pub mode: ModeArg,

    /// Pages that end a part, e.g. "1,3,5-10" (by-pages)
    #[arg(long, env = "PDFSPLIT_PAGES")]
    pub pages: Option<String>,

    /// What to do with pages the selector does not list (by-pages)
    #[arg(long, env = "PDFSPLIT_UNLISTED", value_enum, default_value = "drop")]
    pub unlisted: UnlistedArg,

    /// Horizontal cuts per page (by-sections)
    #[arg(long, env = "PDFSPLIT_HORIZONTAL", default_value = "0")]
    pub horizontal: u32,

    /// Vertical cuts per page (by-sections)
    #[arg(long, env = "PDFSPLIT_VERTICAL", default_value = "0")]
    pub vertical: u32,

    /// Put every section into one output (by-sections)
    #[arg(long, env = "PDFSPLIT_MERGE")]
    pub merge: bool,

    /// Threshold kind (by-size-or-count)
    #[arg(long, env = "PDFSPLIT_SPLIT_TYPE", value_enum)]
    pub split_type: Option<SplitTypeArg>,

    /// Threshold, e.g. "10MB", "5" (by-size-or-count)
    #[arg(long, env = "PDFSPLIT_VALUE")]
    pub value: Option<String>,

    /// Deepest outline level that starts a chapter (by-chapters)
    #[arg(long, env = "PDFSPLIT_BOOKMARK_LEVEL", default_value = "1")]
    pub bookmark_level: u32,

    /// Copy document metadata into each chapter (by-chapters)
    #[arg(long, env = "PDFSPLIT_INCLUDE_METADATA")]
    pub include_metadata: bool,

    /// Keep bookmarks that share a page as separate outputs (by-chapters)
    #[arg(long, env = "PDFSPLIT_ALLOW_DUPLICATES")]
    pub allow_duplicates: bool,

    /// Directory the parts are written to
    #[arg(short, long, env = "PDFSPLIT_OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Keep going when a file fails and write the parts of the others
    #[arg(long, env = "PDFSPLIT_LENIENT")]
    pub lenient: bool,

    /// PDF files to split
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeArg {
    ByPages,
    BySections,
    BySizeOrCount,
    ByChapters,
}

impl From<ModeArg> for SplitMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::ByPages => SplitMode::ByPages,
            ModeArg::BySections => SplitMode::BySections,
            ModeArg::BySizeOrCount => SplitMode::BySizeOrCount,
            ModeArg::ByChapters => SplitMode::ByChapters,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnlistedArg {
    Drop,
    Fold,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitTypeArg {
    Size,
    PageCount,
    DocCount,
}

impl SplitTypeArg {
    fn as_str(&self) -> &'static str {
        match self {
            SplitTypeArg::Size => "size",
            SplitTypeArg::PageCount => "pageCount",
            SplitTypeArg::DocCount => "docCount",
        }
    }
}

impl Args {
    /// The request bag the core resolves; flags of other modes are ignored there
    pub fn parameters(&self) -> SplitParameters {
        SplitParameters {
            mode: SplitMode::from(self.mode).to_string(),
            page_numbers: self.pages.clone(),
            horizontal_divisions: Some(self.horizontal.into()),
            vertical_divisions: Some(self.vertical.into()),
            merge: Some(self.merge.into()),
            split_type: self.split_type.map(|t| LooseValue::from(t.as_str())),
            split_value: self.value.as_deref().map(LooseValue::from),
            bookmark_level: Some(self.bookmark_level.into()),
            include_metadata: Some(self.include_metadata.into()),
            allow_duplicates: Some(self.allow_duplicates.into()),
        }
    }

    pub fn options(&self) -> SplitOptions {
        SplitOptions {
            unlisted_pages: match self.unlisted {
                UnlistedArg::Drop => UnlistedPages::Drop,
                UnlistedArg::Fold => UnlistedPages::FoldIntoPrevious,
            },
            ..SplitOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfsplit_core::params::SizeOrCount;
    use pdfsplit_core::{resolve, ResolvedSplitSpec};
    use pretty_assertions::assert_eq;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("pdfsplit").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_by_pages_resolves() {
        let args = parse(&["--mode", "by-pages", "--pages", "1,3-4", "in.pdf"]);
        let spec = resolve(&args.parameters()).unwrap();
        assert_eq!(spec.mode(), SplitMode::ByPages);
        assert_eq!(args.options().unlisted_pages, UnlistedPages::Drop);
        assert_eq!(args.files, vec![PathBuf::from("in.pdf")]);
    }

    #[test]
    fn test_size_or_count_resolves() {
        let args = parse(&[
            "--mode",
            "by-size-or-count",
            "--split-type",
            "doc-count",
            "--value",
            "3",
            "a.pdf",
            "b.pdf",
        ]);
        assert_eq!(
            resolve(&args.parameters()).unwrap(),
            ResolvedSplitSpec::BySizeOrCount(SizeOrCount::DocumentCount(3))
        );
    }

    #[test]
    fn test_fold_option() {
        let args = parse(&["--mode", "by-pages", "--pages", "2", "--unlisted", "fold", "a.pdf"]);
        assert_eq!(args.options().unlisted_pages, UnlistedPages::FoldIntoPrevious);
    }

    #[test]
    fn test_files_are_required() {
        assert!(Args::try_parse_from(["pdfsplit", "--mode", "by-pages"]).is_err());
    }
}
