//! Data structures produced while rewriting stylesheets.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Result of rewriting a single stylesheet in memory.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RewrittenText {
  /// Full stylesheet contents with eligible references replaced.
  pub text: String,
  /// Number of `url()` references that were replaced.
  pub rewritten: usize,
  /// Non-fatal problems found while rewriting.
  pub diagnostics: Vec<Diagnostic>,
}

impl RewrittenText {
  /// Whether the rewritten text differs from `original`.
  pub fn is_changed(&self, original: &str) -> bool {
    self.text != original
  }
}

/// Problem with a single reference. The reference is kept verbatim and the run continues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
  /// A `url()` token without a path, e.g. `url()` or `url(#id)`.
  MalformedReference {
    /// Stylesheet containing the token.
    stylesheet: PathBuf,
    /// Token as it appears in the source.
    raw: String,
  },
  /// The reference does not name an existing file.
  UnresolvedAsset {
    /// Stylesheet containing the reference.
    stylesheet: PathBuf,
    /// URL as written in the stylesheet.
    url: String,
    /// Filesystem path the URL resolved to.
    resolved: PathBuf,
  },
  /// The file exists but lies outside the public root, so it has no public URL.
  OutsidePublicRoot {
    /// Stylesheet containing the reference.
    stylesheet: PathBuf,
    /// URL as written in the stylesheet.
    url: String,
    /// Filesystem path the URL resolved to.
    resolved: PathBuf,
  },
  /// The asset host could not compute a content key.
  KeyUnavailable {
    /// Stylesheet containing the reference.
    stylesheet: PathBuf,
    /// URL as written in the stylesheet.
    url: String,
    /// Rendered error.
    reason: String,
  },
}

impl fmt::Display for Diagnostic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::MalformedReference { stylesheet, raw } => {
        write!(f, "could not find a url in `{}` ({})", raw, stylesheet.display())
      }
      Self::UnresolvedAsset {
        stylesheet,
        url,
        resolved,
      } => write!(
        f,
        "unresolved asset `{}` -> {} ({})",
        url,
        resolved.display(),
        stylesheet.display()
      ),
      Self::OutsidePublicRoot {
        stylesheet,
        url,
        resolved,
      } => write!(
        f,
        "asset `{}` -> {} is outside the public root ({})",
        url,
        resolved.display(),
        stylesheet.display()
      ),
      Self::KeyUnavailable {
        stylesheet,
        url,
        reason,
      } => write!(
        f,
        "no content key for `{}`: {} ({})",
        url,
        reason,
        stylesheet.display()
      ),
    }
  }
}

/// Outcome of processing one stylesheet during a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
  /// Stylesheet path as discovered under the batch root.
  pub path: PathBuf,
  /// What happened to the file.
  pub status: FileStatus,
  /// Reference-level diagnostics collected for this file.
  pub diagnostics: Vec<Diagnostic>,
}

/// Final state of a stylesheet after a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
  /// The file was replaced with its rewritten copy (or would be, in a dry run).
  Rewritten {
    /// Number of references replaced.
    references: usize,
  },
  /// No reference needed rewriting; the file was not touched.
  Unchanged,
  /// The file could not be processed and was left untouched.
  Failed {
    /// Rendered error chain.
    reason: String,
  },
}

/// Aggregate result of [`crate::StylesheetRewriter::rewrite_all`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResult {
  /// One entry per discovered stylesheet, in discovery order.
  pub outcomes: Vec<FileOutcome>,
}

impl BatchResult {
  /// Outcomes for files that were rewritten.
  pub fn rewritten(&self) -> impl Iterator<Item = &FileOutcome> {
    self
      .outcomes
      .iter()
      .filter(|outcome| matches!(outcome.status, FileStatus::Rewritten { .. }))
  }

  /// Outcomes for files left as they were.
  pub fn unchanged(&self) -> impl Iterator<Item = &FileOutcome> {
    self
      .outcomes
      .iter()
      .filter(|outcome| outcome.status == FileStatus::Unchanged)
  }

  /// Outcomes for files that failed.
  pub fn failed(&self) -> impl Iterator<Item = &FileOutcome> {
    self
      .outcomes
      .iter()
      .filter(|outcome| matches!(outcome.status, FileStatus::Failed { .. }))
  }

  /// Total number of reference-level diagnostics across all files.
  pub fn diagnostic_count(&self) -> usize {
    self.outcomes.iter().map(|outcome| outcome.diagnostics.len()).sum()
  }

  /// True when no file failed.
  pub fn is_success(&self) -> bool {
    self.failed().next().is_none()
  }
}
