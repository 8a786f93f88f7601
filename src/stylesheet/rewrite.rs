//! Per-stylesheet rewriting of `url()` references to content-keyed delivery URLs.

use std::fs;
use std::path::Path;

use crate::asset_paths::{public_path_suffix, resolve_asset_path};
use crate::config::RewriterConfig;
use crate::error::RewriteError;
use crate::host::AssetHost;
use crate::models::{Diagnostic, RewrittenText};

use super::references::{AssetReference, find_references};

/// Rewrites stylesheets using an explicit configuration and a delivery-host collaborator.
#[derive(Debug, Clone)]
pub struct StylesheetRewriter<H> {
  pub(super) config: RewriterConfig,
  pub(super) host: H,
}

impl<H: AssetHost> StylesheetRewriter<H> {
  /// Create a rewriter for the provided configuration and host.
  pub fn new(config: RewriterConfig, host: H) -> Self {
    Self { config, host }
  }

  /// Configuration the rewriter was built with.
  pub fn config(&self) -> &RewriterConfig {
    &self.config
  }

  /// Read `path` and return its rewritten contents without touching the file.
  pub fn rewrite_file(&self, path: &Path) -> Result<RewrittenText, RewriteError> {
    let text = read_stylesheet(path)?;
    Ok(self.rewrite_text(&text, path))
  }

  /// Rewrite every eligible reference in `text`, which was read from `stylesheet`.
  ///
  /// Text outside the matched `url()` tokens is copied through byte for byte. References
  /// that cannot be rewritten are kept verbatim and reported in the returned diagnostics.
  pub fn rewrite_text(&self, text: &str, stylesheet: &Path) -> RewrittenText {
    let mut output = String::with_capacity(text.len());
    let mut diagnostics = Vec::new();
    let mut rewritten = 0;
    let mut last = 0;

    for reference in find_references(text) {
      output.push_str(&text[last..reference.span.start]);

      match self.replacement_for(&reference, stylesheet) {
        Ok(Some(token)) => {
          output.push_str(&token);
          rewritten += 1;
        }
        Ok(None) => output.push_str(reference.raw_text),
        Err(diagnostic) => {
          tracing::warn!("{diagnostic}");
          diagnostics.push(diagnostic);
          output.push_str(reference.raw_text);
        }
      }

      last = reference.span.end;
    }
    output.push_str(&text[last..]);

    RewrittenText {
      text: output,
      rewritten,
      diagnostics,
    }
  }

  fn replacement_for(
    &self,
    reference: &AssetReference<'_>,
    stylesheet: &Path,
  ) -> Result<Option<String>, Diagnostic> {
    let url = reference.url_part;
    if url.is_empty() {
      return Err(Diagnostic::MalformedReference {
        stylesheet: stylesheet.to_path_buf(),
        raw: reference.raw_text.to_string(),
      });
    }

    if self.host.is_excluded(url) {
      return Ok(None);
    }

    let resolved = resolve_asset_path(url, stylesheet, &self.config.public_root);
    if !resolved.is_file() {
      return Err(Diagnostic::UnresolvedAsset {
        stylesheet: stylesheet.to_path_buf(),
        url: url.to_string(),
        resolved,
      });
    }

    let Some(suffix) = public_path_suffix(&resolved, &self.config.public_root) else {
      return Err(Diagnostic::OutsidePublicRoot {
        stylesheet: stylesheet.to_path_buf(),
        url: url.to_string(),
        resolved,
      });
    };

    let key = self
      .host
      .content_key(&resolved)
      .map_err(|err| Diagnostic::KeyUnavailable {
        stylesheet: stylesheet.to_path_buf(),
        url: url.to_string(),
        reason: err.to_string(),
      })?;

    let fragment = reference.fragment_part.unwrap_or_default();
    let query = match reference.query_part {
      Some(query) if !self.config.strip_query_strings => query,
      _ => "",
    };

    Ok(Some(format!(
      "url({}/{}{}{}{})",
      self.host.host_for_url(url),
      key,
      suffix,
      fragment,
      query
    )))
  }
}

pub(super) fn read_stylesheet(path: &Path) -> Result<String, RewriteError> {
  fs::read_to_string(path).map_err(|source| RewriteError::Read {
    path: path.to_path_buf(),
    source,
  })
}

#[cfg(test)]
pub(super) mod tests {
  use super::*;
  use crate::asset_paths::should_skip_rewrite;
  use std::io;
  use std::path::PathBuf;
  use tempfile::tempdir;

  /// Host returning a fixed key, so expected URLs can be written out in full.
  pub(in crate::stylesheet) struct FixedHost;

  impl AssetHost for FixedHost {
    fn is_excluded(&self, url: &str) -> bool {
      should_skip_rewrite(url)
    }

    fn content_key(&self, _resolved: &Path) -> io::Result<String> {
      Ok("abc123".into())
    }

    fn host_for_url(&self, _url: &str) -> String {
      "//cdn.example.com".into()
    }
  }

  struct LockedHost;

  impl AssetHost for LockedHost {
    fn is_excluded(&self, _url: &str) -> bool {
      false
    }

    fn content_key(&self, _resolved: &Path) -> io::Result<String> {
      Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"))
    }

    fn host_for_url(&self, _url: &str) -> String {
      "//cdn.example.com".into()
    }
  }

  /// Lay out `<root>/public/{images/logo.png, stylesheets/app.css}`.
  pub(in crate::stylesheet) fn public_tree(root: &Path) -> io::Result<PathBuf> {
    let public = root.join("public");
    fs::create_dir_all(public.join("images"))?;
    fs::create_dir_all(public.join("stylesheets"))?;
    fs::write(public.join("images/logo.png"), b"logo")?;
    Ok(public)
  }

  fn rewriter(public: &Path, strip_query_strings: bool) -> StylesheetRewriter<FixedHost> {
    let mut config = RewriterConfig::new(public);
    config.strip_query_strings = strip_query_strings;
    StylesheetRewriter::new(config, FixedHost)
  }

  #[test]
  fn rewrites_relative_reference_to_delivery_url() -> io::Result<()> {
    let dir = tempdir()?;
    let public = public_tree(dir.path())?;
    let sheet = public.join("stylesheets/app.css");
    fs::write(&sheet, ".logo { background: url(../images/logo.png) no-repeat; }")?;

    let result = rewriter(&public, true).rewrite_file(&sheet).unwrap();

    assert_eq!(
      result.text,
      ".logo { background: url(//cdn.example.com/abc123/images/logo.png) no-repeat; }"
    );
    assert_eq!(result.rewritten, 1);
    assert!(result.diagnostics.is_empty());
    assert_eq!(
      fs::read_to_string(&sheet)?,
      ".logo { background: url(../images/logo.png) no-repeat; }"
    );
    Ok(())
  }

  #[test]
  fn rewrites_absolute_reference_and_drops_quotes() -> io::Result<()> {
    let dir = tempdir()?;
    let public = public_tree(dir.path())?;
    let sheet = public.join("stylesheets/app.css");

    let result = rewriter(&public, false).rewrite_text(r#"a{b:url("/images/logo.png")}"#, &sheet);
    assert_eq!(result.text, "a{b:url(//cdn.example.com/abc123/images/logo.png)}");
    Ok(())
  }

  #[test]
  fn keeps_or_strips_query_strings_per_config() -> io::Result<()> {
    let dir = tempdir()?;
    let public = public_tree(dir.path())?;
    let sheet = public.join("stylesheets/app.css");
    let text = "a{b:url(../images/logo.png?v=3#mark)}";

    let kept = rewriter(&public, false).rewrite_text(text, &sheet);
    assert_eq!(kept.text, "a{b:url(//cdn.example.com/abc123/images/logo.png#mark?v=3)}");

    let stripped = rewriter(&public, true).rewrite_text(text, &sheet);
    assert_eq!(stripped.text, "a{b:url(//cdn.example.com/abc123/images/logo.png#mark)}");
    Ok(())
  }

  #[test]
  fn missing_assets_are_left_alone_and_reported() -> io::Result<()> {
    let dir = tempdir()?;
    let public = public_tree(dir.path())?;
    let sheet = public.join("stylesheets/app.css");
    let text = "a { background: url(/images/missing.png); }";

    let result = rewriter(&public, true).rewrite_text(text, &sheet);

    assert_eq!(result.text, text);
    assert_eq!(result.rewritten, 0);
    assert_eq!(result.diagnostics, vec![Diagnostic::UnresolvedAsset {
      stylesheet: sheet.clone(),
      url: "/images/missing.png".into(),
      resolved: public.join("images/missing.png"),
    }]);
    Ok(())
  }

  #[test]
  fn one_bad_reference_does_not_stop_the_others() -> io::Result<()> {
    let dir = tempdir()?;
    let public = public_tree(dir.path())?;
    let sheet = public.join("stylesheets/app.css");
    let text = "a{b:url(nope.png)} c{d:url(#glow)} e{f:url('../images/logo.png')}";

    let result = rewriter(&public, true).rewrite_text(text, &sheet);

    assert_eq!(
      result.text,
      "a{b:url(nope.png)} c{d:url(#glow)} e{f:url(//cdn.example.com/abc123/images/logo.png)}"
    );
    assert_eq!(result.rewritten, 1);
    assert_eq!(result.diagnostics.len(), 2);
    assert!(matches!(result.diagnostics[1], Diagnostic::MalformedReference { .. }));
    Ok(())
  }

  #[test]
  fn excluded_urls_are_emitted_verbatim() -> io::Result<()> {
    let dir = tempdir()?;
    let public = public_tree(dir.path())?;
    let sheet = public.join("stylesheets/app.css");
    let text = "a{b:url('https://fonts.example.com/a.woff')} c{d:url(data:image/gif;base64,R0lG)}";

    let result = rewriter(&public, true).rewrite_text(text, &sheet);
    assert_eq!(result.text, text);
    assert!(result.diagnostics.is_empty());
    Ok(())
  }

  #[test]
  fn rerunning_on_rewritten_output_is_a_no_op() -> io::Result<()> {
    let dir = tempdir()?;
    let public = public_tree(dir.path())?;
    let sheet = public.join("stylesheets/app.css");
    let rewriter = rewriter(&public, false);

    let first = rewriter.rewrite_text("a{b:url(../images/logo.png)}", &sheet);
    let second = rewriter.rewrite_text(&first.text, &sheet);

    assert!(!second.is_changed(&first.text));
    assert_eq!(second.rewritten, 0);
    assert!(second.diagnostics.is_empty());
    Ok(())
  }

  #[test]
  fn path_style_host_prefixes_do_not_hide_local_assets() -> io::Result<()> {
    let dir = tempdir()?;
    let public = public_tree(dir.path())?;
    fs::create_dir_all(public.join("assets"))?;
    fs::write(public.join("assets/icon.png"), b"icon")?;
    let sheet = public.join("stylesheets/app.css");

    let mut config = RewriterConfig::new(&public);
    config.asset_host = "//cdn.example.com/assets".into();
    config.strip_query_strings = true;
    let host = crate::host::CdnAssetHost::from_config(&config).unwrap();
    let rewriter = StylesheetRewriter::new(config, host);

    let result = rewriter.rewrite_text("a{b:url(/assets/icon.png)} c{d:url(/assetsfoo.png)}", &sheet);

    assert_eq!(result.rewritten, 1);
    assert!(result.text.starts_with("a{b:url(//cdn.example.com/assets/"));
    assert!(result.text.contains("/assets/icon.png)} c{d:url(/assetsfoo.png)}"));
    assert!(matches!(
      &result.diagnostics[..],
      [Diagnostic::UnresolvedAsset { url, .. }] if url == "/assetsfoo.png"
    ));

    let rerun = rewriter.rewrite_text(&result.text, &sheet);
    assert!(!rerun.is_changed(&result.text));
    assert_eq!(rerun.diagnostics.len(), 1);
    Ok(())
  }

  #[test]
  fn assets_outside_public_root_are_reported() -> io::Result<()> {
    let dir = tempdir()?;
    let public = public_tree(dir.path())?;
    fs::write(dir.path().join("secret.png"), b"secret")?;
    let sheet = public.join("stylesheets/app.css");

    let result = rewriter(&public, true).rewrite_text("a{b:url(../../secret.png)}", &sheet);

    assert_eq!(result.text, "a{b:url(../../secret.png)}");
    assert!(matches!(result.diagnostics[0], Diagnostic::OutsidePublicRoot { .. }));
    Ok(())
  }

  #[test]
  fn key_failures_are_reported() -> io::Result<()> {
    let dir = tempdir()?;
    let public = public_tree(dir.path())?;
    let sheet = public.join("stylesheets/app.css");
    let rewriter = StylesheetRewriter::new(RewriterConfig::new(&public), LockedHost);

    let result = rewriter.rewrite_text("a{b:url(../images/logo.png)}", &sheet);

    assert_eq!(result.text, "a{b:url(../images/logo.png)}");
    assert!(matches!(result.diagnostics[0], Diagnostic::KeyUnavailable { .. }));
    Ok(())
  }

  #[test]
  fn unreadable_stylesheets_are_errors() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing.css");

    let err = rewriter(dir.path(), true).rewrite_file(&missing).unwrap_err();
    assert!(matches!(err, RewriteError::Read { .. }));
    assert_eq!(err.path(), &missing);
  }
}
