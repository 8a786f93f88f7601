#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod asset_paths;
pub mod config;
pub mod error;
pub mod host;
pub mod models;
pub mod stylesheet;

pub use config::RewriterConfig;
pub use error::{ConfigError, RewriteError};
pub use host::{AssetHost, CdnAssetHost};
pub use models::{BatchResult, Diagnostic, FileOutcome, FileStatus, RewrittenText};
pub use stylesheet::{AssetReference, StylesheetRewriter, find_references};
