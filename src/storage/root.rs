//! Storage root and path resolution
//!
//! Every client-supplied path goes through [`StorageRoot::resolve`] before it
//! reaches the filesystem. A [`ResolvedPath`] can only be built here, so any
//! function taking one is guaranteed to stay inside the root.

use log::warn;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::StorageError;

/// The single directory all client paths are confined to.
#[derive(Debug, Clone)]
pub struct StorageRoot {
    path: PathBuf,
}

/// An absolute path verified to be the storage root or inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    absolute: PathBuf,
    virtual_path: String,
}

impl ResolvedPath {
    /// Absolute host path.
    pub fn as_path(&self) -> &Path {
        &self.absolute
    }

    /// Root-relative form (`/`, `/docs/a.txt`) safe to show to clients.
    pub fn virtual_path(&self) -> &str {
        &self.virtual_path
    }

    /// Last path segment, `None` for the root itself.
    pub fn file_name(&self) -> Option<&str> {
        self.virtual_path
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
    }

    pub fn is_root(&self) -> bool {
        self.virtual_path == "/"
    }
}

impl StorageRoot {
    /// Opens (and creates if missing) the storage root.
    ///
    /// The directory is canonicalized so containment checks compare real
    /// paths.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        fs::create_dir_all(path).map_err(|e| StorageError::io("/", e))?;
        let path = path.canonicalize().map_err(|e| StorageError::io("/", e))?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The root itself as a resolved path.
    pub fn as_resolved(&self) -> ResolvedPath {
        ResolvedPath {
            absolute: self.path.clone(),
            virtual_path: "/".to_string(),
        }
    }

    /// Resolves a client path relative to the root.
    pub fn resolve_from_root(&self, relative: &str) -> Result<ResolvedPath, StorageError> {
        self.resolve(&self.as_resolved(), relative)
    }

    /// Joins `relative` onto `base`, normalizes `.`/`..`, and verifies the
    /// result is still inside the root.
    ///
    /// Leading `/` characters are stripped, so `/docs` names `<root>/docs`.
    pub fn resolve(
        &self,
        base: &ResolvedPath,
        relative: &str,
    ) -> Result<ResolvedPath, StorageError> {
        let trimmed = relative.trim_start_matches('/');
        let mut absolute = base.absolute.clone();

        for component in Path::new(trimmed).components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    absolute.pop();
                }
                Component::Normal(segment) => absolute.push(segment),
                Component::RootDir | Component::Prefix(_) => {
                    warn!("Rejected absolute path component in {relative:?}");
                    return Err(StorageError::AccessDenied(relative.to_string()));
                }
            }
        }

        if !absolute.starts_with(&self.path) {
            warn!(
                "Rejected path escaping storage root: {relative:?} (base {})",
                base.virtual_path
            );
            return Err(StorageError::AccessDenied(relative.to_string()));
        }

        if !self.existing_ancestor_contained(&absolute) {
            warn!("Rejected path leaving storage root through a link: {relative:?}");
            return Err(StorageError::AccessDenied(relative.to_string()));
        }

        let virtual_path = self.virtual_path_of(&absolute);
        Ok(ResolvedPath {
            absolute,
            virtual_path,
        })
    }

    /// Canonicalizes the deepest existing ancestor of `path` and checks it
    /// did not leave the root through a symlink.
    fn existing_ancestor_contained(&self, path: &Path) -> bool {
        for ancestor in path.ancestors() {
            match ancestor.canonicalize() {
                Ok(real) => return real.starts_with(&self.path),
                // A dangling link may be replaced or removed, never walked through
                Err(_) if ancestor.symlink_metadata().is_ok() => {
                    return ancestor == path
                        && ancestor
                            .parent()
                            .and_then(|parent| parent.canonicalize().ok())
                            .is_some_and(|parent| parent.starts_with(&self.path));
                }
                Err(_) => continue,
            }
        }
        false
    }

    fn virtual_path_of(&self, absolute: &Path) -> String {
        let relative = absolute.strip_prefix(&self.path).unwrap_or(Path::new(""));
        let segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        format!("/{}", segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    fn sandbox() -> (TempDir, StorageRoot) {
        let dir = tempfile::tempdir().unwrap();
        let root = StorageRoot::open(dir.path().join("storage")).unwrap();
        (dir, root)
    }

    #[test]
    fn resolves_nested_paths() {
        let (_dir, root) = sandbox();
        let resolved = root.resolve_from_root("docs/./reports").unwrap();
        assert_eq!(resolved.as_path(), root.path().join("docs").join("reports"));
        assert_eq!(resolved.virtual_path(), "/docs/reports");
        assert_eq!(resolved.file_name(), Some("reports"));
    }

    #[test]
    fn empty_and_slash_resolve_to_root() {
        let (_dir, root) = sandbox();
        for input in ["", "/", ".", "docs/.."] {
            let resolved = root.resolve_from_root(input).unwrap();
            assert!(resolved.is_root(), "{input:?} should be the root");
            assert_eq!(resolved.file_name(), None);
        }
    }

    #[test]
    fn leading_slash_is_root_relative() {
        let (_dir, root) = sandbox();
        let resolved = root.resolve_from_root("/docs").unwrap();
        assert_eq!(resolved.as_path(), root.path().join("docs"));
    }

    #[test]
    fn rejects_traversal_out_of_root() {
        let (_dir, root) = sandbox();
        for input in ["..", "../x", "docs/../../x", "a/b/../../../etc", "./../storage2"] {
            let err = root.resolve_from_root(input).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::AccessDenied, "{input:?}");
        }
    }

    #[test]
    fn appended_name_is_checked_independently() {
        let (_dir, root) = sandbox();
        let base = root.resolve_from_root("docs").unwrap();
        assert!(root.resolve(&base, "..").unwrap().is_root());
        let err = root.resolve(&base, "../../etc").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);
    }

    #[test]
    fn sibling_with_common_prefix_is_outside() {
        let (dir, root) = sandbox();
        std::fs::create_dir_all(dir.path().join("storage2")).unwrap();
        let err = root.resolve_from_root("../storage2").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);
    }

    #[cfg(unix)]
    #[test]
    fn rejects_symlink_leaving_root() {
        let (dir, root) = sandbox();
        let outside = dir.path().join("outside");
        std::fs::create_dir_all(&outside).unwrap();
        std::os::unix::fs::symlink(&outside, root.path().join("escape")).unwrap();

        let err = root.resolve_from_root("escape/secret.txt").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);
    }
}
