use std::path::{Component, Path, PathBuf};

use crate::error::{PipelineError, PipelineResult};

/// Lexically normalizes `..`/`.` components without touching the
/// filesystem, so confinement can be checked before a path is known to
/// exist (mirrors the original's `Path.resolve()` + `relative_to()` pair,
/// which this crate can't reproduce exactly since `std::fs::canonicalize`
/// requires the target to already exist).
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Joins `filename` onto `root` and verifies the normalized result is still
/// confined under `root`. Fails closed: any `filename` that would escape
/// the root (via `..` segments or an absolute path) is rejected.
pub fn confine(root: &Path, filename: &str) -> PipelineResult<PathBuf> {
    let candidate = normalize_lexically(&root.join(filename));
    let root_norm = normalize_lexically(root);
    if candidate.starts_with(&root_norm) {
        Ok(candidate)
    } else {
        Err(PipelineError::InvalidInput { reason: format!("path escapes policies root: {filename}") })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_filename_is_confined() {
        let root = Path::new("/data/policies");
        let path = confine(root, "acme_humira_digitized.json").unwrap();
        assert_eq!(path, PathBuf::from("/data/policies/acme_humira_digitized.json"));
    }

    #[test]
    fn parent_dir_traversal_is_rejected() {
        let root = Path::new("/data/policies");
        assert!(confine(root, "../../etc/passwd").is_err());
    }

    #[test]
    fn absolute_path_escape_is_rejected() {
        let root = Path::new("/data/policies");
        assert!(confine(root, "/etc/passwd").is_err());
    }
}
