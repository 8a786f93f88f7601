use std::path::Path;

use super::resolve::normalize_path;

/// Produce the URL path of a resolved asset relative to the public root.
///
/// The suffix keeps its leading slash and always uses forward slashes, regardless of the
/// native directory separator, so the generated delivery URL is identical on every platform.
/// Returns `None` when the asset lives outside the public root and therefore has no public URL.
pub fn public_path_suffix(resolved: &Path, public_root: &Path) -> Option<String> {
    let root = normalize_path(&std::path::absolute(public_root).ok()?);
    let relative = resolved.strip_prefix(&root).ok()?;
    if relative.as_os_str().is_empty() {
        return None;
    }

    let relative = relative.to_string_lossy().replace('\\', "/");
    Some(format!("/{}", relative.trim_start_matches('/')))
}
