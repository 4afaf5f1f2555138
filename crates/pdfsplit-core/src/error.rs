use thiserror::Error;

pub type Result<T> = std::result::Result<T, SplitError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SplitError {
    #[error("Page selector is empty or malformed: {0}")]
    InvalidPageSelector(String),

    #[error("Invalid division count {value} for {axis}: must be an integer between 0 and 300")]
    InvalidDivisionCount { axis: &'static str, value: String },

    #[error("Invalid split value: {0}")]
    InvalidSplitValue(String),

    #[error("Invalid bookmark level {0}: must be a positive integer")]
    InvalidBookmarkLevel(String),

    #[error("Document has no pages")]
    EmptyDocument,

    #[error("Page {page} does not exist (document has {page_count} pages)")]
    OutOfRangePageReference { page: usize, page_count: usize },

    #[error("Page index {index} is out of range (document has {page_count} pages)")]
    PageIndexOutOfRange { index: usize, page_count: usize },

    #[error("Unsupported split strategy: {0}")]
    UnsupportedStrategy(String),

    #[error("No PDF bookmarks/outline found in document")]
    MissingOutline,

    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("PDF operation failed: {0}")]
    OperationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl SplitError {
    /// Errors the caller can fix by correcting the request
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SplitError::InvalidPageSelector(_)
                | SplitError::InvalidDivisionCount { .. }
                | SplitError::InvalidSplitValue(_)
                | SplitError::InvalidBookmarkLevel(_)
                | SplitError::UnsupportedStrategy(_)
        )
    }
}
