//! Stylesheet scanning, per-file rewriting and batch processing.

mod batch;
mod references;
mod rewrite;

pub use references::{AssetReference, find_references};
pub use rewrite::StylesheetRewriter;
