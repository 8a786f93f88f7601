//! Delivery-host collaborator consumed by the rewriter.

use std::fs;
use std::io;
use std::path::Path;

use regex::Regex;
use sha2::{Digest, Sha256};

use crate::asset_paths::should_skip_rewrite;
use crate::config::RewriterConfig;
use crate::error::ConfigError;

/// Trait describing how references map onto the content-delivery host.
pub trait AssetHost {
    /// Returns `true` when the URL must be left exactly as written.
    fn is_excluded(&self, url: &str) -> bool;

    /// Stable identifier for the current content of the asset at `resolved`.
    fn content_key(&self, resolved: &Path) -> io::Result<String>;

    /// Host prefix (scheme and authority, no trailing slash) used for `url`.
    fn host_for_url(&self, url: &str) -> String;
}

/// Default [`AssetHost`] keyed by a truncated SHA-256 of each asset's bytes.
#[derive(Debug, Clone)]
pub struct CdnAssetHost {
    host: String,
    host_count: u32,
    key_length: usize,
    own_urls: Regex,
    excludes: Vec<Regex>,
}

fn absolute_host() -> &'static Regex {
    use std::sync::OnceLock;

    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([a-zA-Z][a-zA-Z0-9+.-]*:)?//[^/]").expect("invalid asset host regex")
    })
}

impl CdnAssetHost {
    /// Build the host from the shared rewriter configuration.
    ///
    /// `asset_host` must name an authority (`//cdn.example.com` or `https://...`). Generated
    /// URLs are then recognisably off-tree, so rewriting an already rewritten stylesheet is a
    /// no-op.
    pub fn from_config(config: &RewriterConfig) -> Result<Self, ConfigError> {
        let host = config.asset_host.trim_end_matches('/').to_string();
        if host.is_empty() {
            return Err(ConfigError::MissingAssetHost);
        }
        if !absolute_host().is_match(&host) {
            return Err(ConfigError::InvalidAssetHost { host });
        }

        let own_urls = Regex::new(&format!(
            "^{}(/|$)",
            regex::escape(&host).replace("%d", r"\d+")
        ))
        .map_err(|source| ConfigError::InvalidPattern {
            pattern: host.clone(),
            source,
        })?;

        let excludes = config
            .exclude_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            host,
            host_count: config.asset_host_count.max(1),
            key_length: config.key_length,
            own_urls,
            excludes,
        })
    }
}

impl AssetHost for CdnAssetHost {
    fn is_excluded(&self, url: &str) -> bool {
        if should_skip_rewrite(url) {
            return true;
        }

        if self.own_urls.is_match(url) {
            return true;
        }

        self.excludes.iter().any(|pattern| pattern.is_match(url))
    }

    fn content_key(&self, resolved: &Path) -> io::Result<String> {
        let bytes = fs::read(resolved)?;
        let digest = format!("{:x}", Sha256::digest(&bytes));

        let length = match self.key_length {
            0 => digest.len(),
            length => length.min(digest.len()),
        };
        Ok(digest[..length].to_string())
    }

    fn host_for_url(&self, url: &str) -> String {
        if !self.host.contains("%d") {
            return self.host.clone();
        }

        let number = url
            .bytes()
            .fold(0u32, |acc, byte| acc.wrapping_add(u32::from(byte)))
            % self.host_count;
        self.host.replacen("%d", &number.to_string(), 1)
    }
}
