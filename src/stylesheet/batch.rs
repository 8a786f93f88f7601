//! Directory-wide rewriting with staged, atomic replacement of each stylesheet.

use std::error::Error;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tempfile::{Builder as TempFileBuilder, NamedTempFile};
use walkdir::WalkDir;

use crate::error::RewriteError;
use crate::host::AssetHost;
use crate::models::{BatchResult, Diagnostic, FileOutcome, FileStatus};

use super::rewrite::{StylesheetRewriter, read_stylesheet};

impl<H: AssetHost> StylesheetRewriter<H> {
  /// Lazily list every stylesheet below `root`, at any depth.
  ///
  /// Files and symlinks with a configured stylesheet extension are yielded. Symlinked
  /// directories are not descended into, and symlinked stylesheets are later reported as
  /// unchanged rather than rewritten. Entries are sorted by file name within each directory
  /// so runs are repeatable.
  pub fn discover_stylesheets(
    &self,
    root: &Path,
  ) -> impl Iterator<Item = Result<PathBuf, RewriteError>> {
    let root = root.to_path_buf();
    WalkDir::new(&root)
      .follow_links(false)
      .sort_by_file_name()
      .into_iter()
      .filter_map(move |entry| match entry {
        Ok(entry) => {
          let file_type = entry.file_type();
          let wanted = (file_type.is_file() || file_type.is_symlink())
            && self.config.is_stylesheet(entry.path());
          wanted.then(|| Ok(entry.into_path()))
        }
        Err(source) => Some(Err(RewriteError::Walk {
          path: source.path().unwrap_or(root.as_path()).to_path_buf(),
          source,
        })),
      })
  }
}

impl<H: AssetHost + Sync> StylesheetRewriter<H> {
  /// Rewrite every stylesheet below `root` in place.
  ///
  /// Each file is rewritten into a temporary sibling which is then renamed over the original,
  /// so a failure at any point leaves the original untouched. Failures are recorded per file
  /// and never stop the rest of the batch.
  pub fn rewrite_all(&self, root: &Path) -> BatchResult {
    self.run(root, true)
  }

  /// Same as [`Self::rewrite_all`] but never writes; `Rewritten` means "would be rewritten".
  pub fn rewrite_all_dry_run(&self, root: &Path) -> BatchResult {
    self.run(root, false)
  }

  fn run(&self, root: &Path, commit: bool) -> BatchResult {
    let entries: Vec<_> = self.discover_stylesheets(root).collect();
    tracing::debug!(root = %root.display(), files = entries.len(), "discovered stylesheets");

    let outcomes: Vec<FileOutcome> = if self.config.parallel {
      entries
        .into_par_iter()
        .map(|entry| self.process(entry, commit))
        .collect()
    } else {
      entries
        .into_iter()
        .map(|entry| self.process(entry, commit))
        .collect()
    };

    BatchResult { outcomes }
  }

  fn process(&self, entry: Result<PathBuf, RewriteError>, commit: bool) -> FileOutcome {
    let path = match entry {
      Ok(path) => path,
      Err(err) => return failed(err.path().clone(), &err, Vec::new()),
    };

    if is_symlink(&path) {
      tracing::debug!(path = %path.display(), "skipping symlinked stylesheet");
      return FileOutcome {
        path,
        status: FileStatus::Unchanged,
        diagnostics: Vec::new(),
      };
    }

    let original = match read_stylesheet(&path) {
      Ok(text) => text,
      Err(err) => return failed(path, &err, Vec::new()),
    };

    let rewritten = self.rewrite_text(&original, &path);
    if !rewritten.is_changed(&original) {
      tracing::debug!(path = %path.display(), "stylesheet unchanged");
      return FileOutcome {
        path,
        status: FileStatus::Unchanged,
        diagnostics: rewritten.diagnostics,
      };
    }

    if commit {
      let swapped = RewriteJob::stage(&path, &rewritten.text).and_then(RewriteJob::commit);
      if let Err(err) = swapped {
        return failed(path, &err, rewritten.diagnostics);
      }
    }

    tracing::info!(
      path = %path.display(),
      references = rewritten.rewritten,
      dry_run = !commit,
      "rewrote stylesheet"
    );
    FileOutcome {
      path,
      status: FileStatus::Rewritten {
        references: rewritten.rewritten,
      },
      diagnostics: rewritten.diagnostics,
    }
  }
}

/// A rewritten stylesheet staged next to its original, waiting to be swapped in.
///
/// Dropping the job without committing deletes the staged copy.
struct RewriteJob<'a> {
  path: &'a Path,
  staged: NamedTempFile,
}

impl<'a> RewriteJob<'a> {
  fn stage(path: &'a Path, text: &str) -> Result<Self, RewriteError> {
    let stage_err = |source| RewriteError::Stage {
      path: path.to_path_buf(),
      source,
    };

    let dir = match path.parent() {
      Some(parent) if !parent.as_os_str().is_empty() => parent,
      _ => Path::new("."),
    };
    let mut staged = TempFileBuilder::new()
      .prefix(".cdn-css-")
      .suffix(".tmp")
      .tempfile_in(dir)
      .map_err(stage_err)?;

    staged.write_all(text.as_bytes()).map_err(stage_err)?;
    staged.flush().map_err(stage_err)?;
    staged.as_file().sync_all().map_err(stage_err)?;

    let permissions = fs::metadata(path).map_err(stage_err)?.permissions();
    staged
      .as_file()
      .set_permissions(permissions)
      .map_err(stage_err)?;

    Ok(Self { path, staged })
  }

  fn commit(self) -> Result<(), RewriteError> {
    self
      .staged
      .persist(self.path)
      .map(|_| ())
      .map_err(|err| RewriteError::Swap {
        path: self.path.to_path_buf(),
        source: err.error,
      })
  }
}

// Renaming over a symlink would replace the link itself.
fn is_symlink(path: &Path) -> bool {
  fs::symlink_metadata(path)
    .map(|metadata| metadata.file_type().is_symlink())
    .unwrap_or(false)
}

fn failed(path: PathBuf, err: &RewriteError, diagnostics: Vec<Diagnostic>) -> FileOutcome {
  let reason = render_error(err);
  tracing::error!(path = %path.display(), error = %reason, "failed to rewrite stylesheet");
  FileOutcome {
    path,
    status: FileStatus::Failed { reason },
    diagnostics,
  }
}

fn render_error(err: &dyn Error) -> String {
  let mut rendered = err.to_string();
  let mut source = err.source();
  while let Some(cause) = source {
    rendered.push_str(": ");
    rendered.push_str(&cause.to_string());
    source = cause.source();
  }
  rendered
}
