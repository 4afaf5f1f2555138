//! PDF document splitting
//!
//! Splits a PDF into a sequence of smaller documents using lopdf. A request
//! flows through four stages:
//! - [`params::resolve`]: validate the loosely typed request into a [`ResolvedSplitSpec`]
//! - [`split_points::compute_split_points`]: pick the last page of every output
//! - [`partition::partition`]: slice the page index space at those points
//! - [`materialize::materialize`]: copy each slice into a fresh document
//!
//! [`splitter`] wires the stages together for single files and batches;
//! [`command`] holds the serde request and response types.

pub mod command;
pub mod document;
pub mod error;
pub mod materialize;
pub mod outline;
pub mod params;
pub mod partition;
pub mod sections;
pub mod split_points;
pub mod splitter;

pub use command::{InputFile, OutputDocument, ProcessMetrics, SplitCommand, SplitResult};
pub use document::{get_page_count, DocumentInfo};
pub use error::{Result, SplitError};
pub use params::{resolve, ResolvedSplitSpec, SplitMode, SplitParameters};
pub use splitter::{
    split, split_batch, split_batch_lenient, split_document, SplitOptions, UnlistedPages,
};
