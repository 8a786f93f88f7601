//! Locates `url()` references in raw stylesheet text.

use std::ops::Range;
use std::sync::OnceLock;

use regex::{Captures, Regex};

fn reference_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r#"(?i)url\(\s*(?:"([^"]*)"|'([^']*)'|([^"'()\s]*))\s*\)"#)
      .expect("invalid url() reference regex")
  })
}

/// A single `url()` occurrence, borrowed from the stylesheet it was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetReference<'a> {
  /// Full matched token, e.g. `url("../img/a.png?v=2")`.
  pub raw_text: &'a str,
  /// Byte range of `raw_text` within the scanned text.
  pub span: Range<usize>,
  /// Path or URL without quotes, fragment or query. Empty for degenerate tokens.
  pub url_part: &'a str,
  /// `#...` suffix, if any.
  pub fragment_part: Option<&'a str>,
  /// `?...` suffix, if any.
  pub query_part: Option<&'a str>,
}

impl<'a> AssetReference<'a> {
  fn from_captures(captures: &Captures<'a>) -> Option<Self> {
    let token = captures.get(0)?;
    let value = captures
      .get(1)
      .or_else(|| captures.get(2))
      .or_else(|| captures.get(3))?
      .as_str();

    let path_end = value.find(['#', '?']).unwrap_or(value.len());
    let (url_part, suffix) = value.split_at(path_end);

    Some(Self {
      raw_text: token.as_str(),
      span: token.range(),
      url_part: url_part.trim(),
      fragment_part: delimited(suffix, '#', '?'),
      query_part: delimited(suffix, '?', '#'),
    })
  }
}

/// Lazily scan `text` for `url()` references, left to right and without overlap.
///
/// The `url(` token is matched case-insensitively and the value may be single-quoted,
/// double-quoted or bare. Fragment and query suffixes are isolated whichever comes first.
/// Tokens with mismatched quotes are simply not matched.
pub fn find_references(text: &str) -> impl Iterator<Item = AssetReference<'_>> {
  reference_pattern()
    .captures_iter(text)
    .filter_map(|captures| AssetReference::from_captures(&captures))
}

fn delimited(suffix: &str, marker: char, stop: char) -> Option<&str> {
  let start = suffix.find(marker)?;
  let tail = &suffix[start..];
  let end = tail[1..]
    .find(stop)
    .map_or(tail.len(), |index| index + 1);
  Some(&tail[..end])
}
