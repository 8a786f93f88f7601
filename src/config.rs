//! Rewriter configuration, passed explicitly to [`crate::StylesheetRewriter`].

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// File name searched for by [`RewriterConfig::discover`].
pub const DEFAULT_CONFIG_FILE: &str = "cdn_rewrite.config.json";

/// Settings shared by every stylesheet processed in a run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RewriterConfig {
    /// Directory that absolute (`/...`) references resolve against.
    pub public_root: PathBuf,
    /// Default batch root; falls back to `<public_root>/stylesheets`.
    pub stylesheets_dir: Option<PathBuf>,
    /// Drop `?query` suffixes from rewritten references.
    pub strip_query_strings: bool,
    /// File extensions (without the dot) treated as stylesheets.
    pub stylesheet_extensions: Vec<String>,
    /// Delivery host prefix, e.g. `//cdn.example.com`. Required by [`crate::CdnAssetHost`].
    /// A `%d` is replaced with a host number.
    pub asset_host: String,
    /// Number of numbered hosts available when `asset_host` contains `%d`.
    pub asset_host_count: u32,
    /// Hex characters kept from the content digest.
    pub key_length: usize,
    /// Extra regular expressions; matching URLs are never rewritten.
    pub exclude_patterns: Vec<String>,
    /// Rewrite files of a batch on the rayon thread pool.
    pub parallel: bool,
}

impl Default for RewriterConfig {
    fn default() -> Self {
        Self {
            public_root: PathBuf::from("public"),
            stylesheets_dir: None,
            strip_query_strings: false,
            stylesheet_extensions: vec!["css".into()],
            asset_host: String::new(),
            asset_host_count: 4,
            key_length: 10,
            exclude_patterns: Vec::new(),
            parallel: true,
        }
    }
}

impl RewriterConfig {
    /// Configuration rooted at `public_root` with every other value defaulted.
    pub fn new(public_root: impl Into<PathBuf>) -> Self {
        Self {
            public_root: public_root.into(),
            ..Self::default()
        }
    }

    /// Load `cdn_rewrite.config.json` from `dir`, or defaults when it does not exist.
    ///
    /// Relative paths inside the file are interpreted relative to `dir`.
    pub fn discover(dir: &Path) -> Result<Self, ConfigError> {
        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        match Self::from_path(&candidate) {
            Err(ConfigError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                Ok(Self::default().rebased(dir))
            }
            other => other,
        }
    }

    /// Read configuration from a specific JSON file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(config.rebased(base))
    }

    /// Directory walked by a batch run when no explicit root is given.
    pub fn stylesheets_dir(&self) -> PathBuf {
        self.stylesheets_dir
            .clone()
            .unwrap_or_else(|| self.public_root.join("stylesheets"))
    }

    /// Whether `path` carries one of the configured stylesheet extensions.
    pub fn is_stylesheet(&self, path: &Path) -> bool {
        let Some(extension) = path.extension().and_then(|value| value.to_str()) else {
            return false;
        };

        self.stylesheet_extensions
            .iter()
            .any(|candidate| candidate.trim_start_matches('.').eq_ignore_ascii_case(extension))
    }

    fn rebased(mut self, base: &Path) -> Self {
        if self.public_root.is_relative() {
            self.public_root = base.join(&self.public_root);
        }
        if let Some(dir) = self.stylesheets_dir.as_mut() {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }
        self
    }
}
