//! Directory content classification
//!
//! Decides whether deleting a directory needs confirmation.

use std::fs;

use crate::error::StorageError;
use crate::storage::results::DirectoryContentState;
use crate::storage::root::ResolvedPath;

/// Classifies a directory from its immediate children.
///
/// A subdirectory anywhere among the children wins over files.
pub fn classify_directory(path: &ResolvedPath) -> Result<DirectoryContentState, StorageError> {
    let virtual_path = path.virtual_path();
    let entries =
        fs::read_dir(path.as_path()).map_err(|e| StorageError::io(virtual_path, e))?;

    let mut state = DirectoryContentState::Empty;
    for entry in entries {
        let file_type = entry
            .and_then(|entry| entry.file_type())
            .map_err(|e| StorageError::io(virtual_path, e))?;

        if file_type.is_dir() {
            return Ok(DirectoryContentState::HasSubdirectories);
        }
        state = DirectoryContentState::FilesOnly;
    }

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::root::StorageRoot;

    fn classify(setup: impl FnOnce(&std::path::Path)) -> DirectoryContentState {
        let dir = tempfile::tempdir().unwrap();
        let root = StorageRoot::open(dir.path()).unwrap();
        setup(root.path());
        classify_directory(&root.as_resolved()).unwrap()
    }

    #[test]
    fn empty_directory() {
        assert_eq!(classify(|_| {}), DirectoryContentState::Empty);
    }

    #[test]
    fn files_only() {
        let state = classify(|p| {
            fs::write(p.join("a.txt"), b"a").unwrap();
            fs::write(p.join("b.txt"), b"b").unwrap();
        });
        assert_eq!(state, DirectoryContentState::FilesOnly);
    }

    #[test]
    fn subdirectory_dominates_files() {
        let state = classify(|p| {
            fs::write(p.join("a.txt"), b"a").unwrap();
            fs::create_dir(p.join("sub")).unwrap();
        });
        assert_eq!(state, DirectoryContentState::HasSubdirectories);
    }

    #[test]
    fn only_immediate_children_count() {
        let state = classify(|p| {
            fs::create_dir_all(p.join("sub").join("deeper")).unwrap();
        });
        assert_eq!(state, DirectoryContentState::HasSubdirectories);
    }
}
