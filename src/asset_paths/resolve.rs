use std::path::{Component, Path, PathBuf};

/// Map a stylesheet `url()` path onto the filesystem.
///
/// Values starting with `/` are anchored at `public_root`; anything else is taken relative to
/// the directory holding the stylesheet. The result is absolute and free of `.`/`..` segments,
/// but symlinks are left as they are.
pub fn resolve_asset_path(url: &str, stylesheet: &Path, public_root: &Path) -> PathBuf {
    let joined = match url.strip_prefix('/') {
        Some(rooted) => absolutize(public_root).join(rooted.trim_start_matches('/')),
        None => {
            let stylesheet = absolutize(stylesheet);
            let dir = stylesheet.parent().unwrap_or_else(|| Path::new("/"));
            dir.join(url)
        }
    };

    normalize_path(&joined)
}

/// Lexically collapse `.` and `..` segments. `..` never climbs above the root.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => normalized.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                let at_root = matches!(
                    normalized.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                );
                if !at_root {
                    normalized.pop();
                }
            }
            Component::Normal(segment) => normalized.push(segment),
        }
    }

    normalized
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::path::absolute(path).unwrap_or_else(|_| Path::new("/").join(path))
}
