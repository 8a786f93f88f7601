//! Error types surfaced by the rewriter and its configuration loader.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures that are fatal for a single stylesheet.
///
/// A `RewriteError` never aborts a batch: [`crate::StylesheetRewriter::rewrite_all`]
/// records it against the offending file and moves on.
#[derive(Debug, Error)]
pub enum RewriteError {
    /// The stylesheet could not be read, or was not valid UTF-8.
    #[error("failed to read stylesheet {}", path.display())]
    Read {
        /// Stylesheet that could not be read.
        path: PathBuf,
        /// Source I/O error.
        #[source]
        source: io::Error,
    },
    /// The rewritten copy could not be written to its temporary location.
    #[error("failed to stage rewritten copy of {}", path.display())]
    Stage {
        /// Stylesheet whose rewritten copy failed to stage.
        path: PathBuf,
        /// Source I/O error.
        #[source]
        source: io::Error,
    },
    /// The staged copy could not be renamed over the original.
    #[error("failed to replace {} with its rewritten copy", path.display())]
    Swap {
        /// Stylesheet that was left untouched.
        path: PathBuf,
        /// Source I/O error.
        #[source]
        source: io::Error,
    },
    /// Directory traversal failed below the batch root.
    #[error("failed to walk {}", path.display())]
    Walk {
        /// Entry (or root) that could not be visited.
        path: PathBuf,
        /// Source traversal error.
        #[source]
        source: walkdir::Error,
    },
}

impl RewriteError {
    /// Path of the stylesheet (or directory entry) the error belongs to.
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Read { path, .. }
            | Self::Stage { path, .. }
            | Self::Swap { path, .. }
            | Self::Walk { path, .. } => path,
        }
    }
}

/// Errors that can occur while loading a [`crate::RewriterConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config {}", path.display())]
    Io {
        /// Path that caused the error.
        path: PathBuf,
        /// Source I/O error.
        #[source]
        source: io::Error,
    },
    /// Failed to parse the JSON configuration file.
    #[error("failed to parse config {}", path.display())]
    Parse {
        /// Path that caused the error.
        path: PathBuf,
        /// Source parse error.
        #[source]
        source: serde_json::Error,
    },
    /// No delivery host was configured.
    #[error("no asset host configured")]
    MissingAssetHost,
    /// The delivery host has no `//authority`, so its URLs would look like local paths.
    #[error("asset host `{host}` must start with `//` or a scheme such as `https://`")]
    InvalidAssetHost {
        /// Host as configured, without trailing slashes.
        host: String,
    },
    /// One of the configured exclusion patterns is not a valid regex.
    #[error("invalid exclude pattern `{pattern}`")]
    InvalidPattern {
        /// Offending pattern as written in the config.
        pattern: String,
        /// Source regex error.
        #[source]
        source: regex::Error,
    },
}
