//! Directory management
//!
//! Creates directories and deletes them, asking for confirmation before
//! removing anything that is not empty.

use log::{error, info, warn};
use std::fs;
use std::path::Path;

use crate::error::StorageError;
use crate::storage::classify::classify_directory;
use crate::storage::results::DirectoryContentState;
use crate::storage::root::{ResolvedPath, StorageRoot};

/// Creates `base/name`, including any missing intermediate directories.
pub fn create_directory(
    root: &StorageRoot,
    base: &ResolvedPath,
    name: &str,
) -> Result<ResolvedPath, StorageError> {
    let target = root.resolve(base, name)?;
    let virtual_path = target.virtual_path();

    match fs::symlink_metadata(target.as_path()) {
        Ok(metadata) if metadata.is_dir() => {
            return Err(StorageError::AlreadyExists(virtual_path.to_string()));
        }
        Ok(_) => return Err(StorageError::NameConflict(virtual_path.to_string())),
        Err(_) => {}
    }

    fs::create_dir_all(target.as_path()).map_err(|e| {
        error!("Failed to create directory {virtual_path}: {e}");
        StorageError::io(virtual_path, e)
    })?;

    info!("Created directory {virtual_path}");
    Ok(target)
}

/// Deletes the directory `base/name`.
///
/// Empty directories go immediately. Anything else is only removed when
/// `confirmed` is set, and then the whole tree goes, failing on the first
/// entry that cannot be removed.
pub fn delete_directory(
    root: &StorageRoot,
    base: &ResolvedPath,
    name: &str,
    confirmed: bool,
) -> Result<(), StorageError> {
    let target = root.resolve(base, name)?;
    let virtual_path = target.virtual_path();

    if target.is_root() {
        warn!("Refused to delete the storage root");
        return Err(StorageError::AccessDenied(virtual_path.to_string()));
    }

    let is_dir = fs::symlink_metadata(target.as_path())
        .map(|metadata| metadata.is_dir())
        .unwrap_or(false);
    if !is_dir {
        return Err(StorageError::NotFound(virtual_path.to_string()));
    }

    match classify_directory(&target)? {
        DirectoryContentState::Empty => {
            fs::remove_dir(target.as_path()).map_err(|e| {
                error!("Failed to delete directory {virtual_path}: {e}");
                StorageError::io(virtual_path, e)
            })?;
        }
        state if !confirmed => {
            warn!("Deletion of {virtual_path} ({state:?}) needs confirmation");
            return Err(StorageError::ConfirmationRequired(virtual_path.to_string()));
        }
        _ => remove_tree(target.as_path(), virtual_path)?,
    }

    info!("Deleted directory {virtual_path}");
    Ok(())
}

/// Removes a directory tree bottom-up: the files of each directory, then its
/// subdirectories, then the directory itself.
///
/// Children are collected before descending so no directory handle stays
/// open across the recursion.
fn remove_tree(dir: &Path, virtual_dir: &str) -> Result<(), StorageError> {
    let children = fs::read_dir(dir)
        .and_then(|entries| entries.collect::<Result<Vec<_>, _>>())
        .map_err(|e| {
            error!("Failed to read directory {virtual_dir}: {e}");
            StorageError::io(virtual_dir, e)
        })?;

    let mut subdirectories = Vec::new();
    for child in children {
        let name = child.file_name().to_string_lossy().into_owned();
        let virtual_child = format!("{virtual_dir}/{name}");
        let file_type = child
            .file_type()
            .map_err(|e| StorageError::io(&virtual_child, e))?;

        if file_type.is_dir() {
            subdirectories.push((child.path(), virtual_child));
        } else {
            fs::remove_file(child.path()).map_err(|e| {
                error!("Failed to delete file {virtual_child}: {e}");
                StorageError::io(&virtual_child, e)
            })?;
        }
    }

    for (path, virtual_child) in subdirectories {
        remove_tree(&path, &virtual_child)?;
    }

    fs::remove_dir(dir).map_err(|e| {
        error!("Failed to delete directory {virtual_dir}: {e}");
        StorageError::io(virtual_dir, e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::storage::listing::list_directory;
    use tempfile::TempDir;

    fn sandbox() -> (TempDir, StorageRoot) {
        let dir = tempfile::tempdir().unwrap();
        let root = StorageRoot::open(dir.path()).unwrap();
        (dir, root)
    }

    fn names(root: &StorageRoot, path: &str) -> Vec<String> {
        let resolved = root.resolve_from_root(path).unwrap();
        let mut names: Vec<String> = list_directory(&resolved)
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        names.sort();
        names
    }

    #[test]
    fn creates_nested_directories() {
        let (_dir, root) = sandbox();
        let created = create_directory(&root, &root.as_resolved(), "a/b/c").unwrap();
        assert!(created.as_path().is_dir());
        assert_eq!(created.virtual_path(), "/a/b/c");
    }

    #[test]
    fn second_create_reports_already_exists() {
        let (_dir, root) = sandbox();
        let base = root.as_resolved();
        create_directory(&root, &base, "x").unwrap();
        let err = create_directory(&root, &base, "x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn create_over_file_reports_name_conflict() {
        let (_dir, root) = sandbox();
        fs::write(root.path().join("x"), b"data").unwrap();
        let err = create_directory(&root, &root.as_resolved(), "x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NameConflict);
    }

    #[test]
    fn create_outside_root_is_denied() {
        let (dir, root) = sandbox();
        let base = root.as_resolved();
        let err = create_directory(&root, &base, "../../escaped").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);
        assert!(!dir.path().join("..").join("escaped").exists());
    }

    #[test]
    fn empty_directory_is_deleted_without_confirmation() {
        let (_dir, root) = sandbox();
        fs::create_dir(root.path().join("empty")).unwrap();
        delete_directory(&root, &root.as_resolved(), "empty", false).unwrap();
        assert!(!root.path().join("empty").exists());
    }

    #[test]
    fn non_empty_directory_needs_confirmation_and_is_left_untouched() {
        let (_dir, root) = sandbox();
        fs::create_dir_all(root.path().join("docs").join("inner")).unwrap();
        let before = names(&root, "docs");

        let err = delete_directory(&root, &root.as_resolved(), "docs", false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfirmationRequired);
        assert_eq!(names(&root, "docs"), before);

        delete_directory(&root, &root.as_resolved(), "docs", true).unwrap();
        assert!(!root.path().join("docs").exists());
    }

    #[test]
    fn confirmed_delete_removes_whole_tree() {
        let (_dir, root) = sandbox();
        let docs = root.path().join("docs");
        fs::create_dir_all(docs.join("a").join("b")).unwrap();
        fs::write(docs.join("top.txt"), b"1").unwrap();
        fs::write(docs.join("a").join("mid.txt"), b"2").unwrap();
        fs::write(docs.join("a").join("b").join("leaf.txt"), b"3").unwrap();
        fs::write(root.path().join("keep.txt"), b"keep").unwrap();

        delete_directory(&root, &root.as_resolved(), "docs", true).unwrap();
        assert!(!docs.exists());
        assert_eq!(names(&root, ""), vec!["keep.txt".to_string()]);
    }

    #[test]
    fn deleting_missing_or_file_is_not_found() {
        let (_dir, root) = sandbox();
        fs::write(root.path().join("file.txt"), b"x").unwrap();
        let base = root.as_resolved();

        let err = delete_directory(&root, &base, "missing", true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = delete_directory(&root, &base, "file.txt", true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(root.path().join("file.txt").exists());
    }

    #[test]
    fn storage_root_cannot_be_deleted() {
        let (_dir, root) = sandbox();
        let base = root.as_resolved();
        for name in ["", ".", "sub/.."] {
            let err = delete_directory(&root, &base, name, true).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::AccessDenied, "{name:?}");
        }
        assert!(root.path().is_dir());
    }

    #[test]
    fn traversal_in_name_is_denied() {
        let (_dir, root) = sandbox();
        fs::create_dir(root.path().join("docs")).unwrap();
        let base = root.resolve_from_root("docs").unwrap();
        let err = delete_directory(&root, &base, "../../etc", true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);
    }

    #[cfg(unix)]
    #[test]
    fn confirmed_delete_stops_at_first_failure() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, root) = sandbox();
        let docs = root.path().join("docs");
        let locked = docs.join("locked");
        fs::create_dir_all(&locked).unwrap();
        fs::write(docs.join("top.txt"), b"1").unwrap();
        fs::write(locked.join("pinned.txt"), b"2").unwrap();

        // Entries of a read-only directory cannot be unlinked
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();
        let enforced = fs::write(locked.join("write-check"), b"").is_err();
        let _ = fs::remove_file(locked.join("write-check"));
        let result = enforced.then(|| delete_directory(&root, &root.as_resolved(), "docs", true));
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let Some(result) = result else {
            // Running with privileges that bypass file modes
            return;
        };
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoFailure);
        assert!(err.to_string().contains("/docs/locked/pinned.txt"));
        assert!(!docs.join("top.txt").exists(), "files before the failure are gone");
        assert!(locked.join("pinned.txt").exists());
        assert!(docs.is_dir());
    }
}
