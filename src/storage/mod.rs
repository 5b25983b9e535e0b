//! File system storage management
//!
//! Everything that touches the storage tree lives here. [`Storage`] is the
//! entry point: it owns the [`StorageRoot`] and takes client-supplied
//! strings, which it resolves before handing off to the component modules.

pub mod archive;
pub mod batch;
pub mod classify;
pub mod directories;
pub mod listing;
pub mod results;
pub mod root;
pub mod upload;

use std::io::Read;
use std::path::Path;

use crate::error::StorageError;

pub use results::{
    ArchiveBody, ArchiveStream, BatchDeletion, DeletionOutcome, DirectoryContentState, Entry,
    EntryKind,
};
pub use root::{ResolvedPath, StorageRoot};

/// Handle to the sandboxed storage tree.
///
/// Holds no locks; share it behind an `Arc` across sessions.
#[derive(Debug, Clone)]
pub struct Storage {
    root: StorageRoot,
}

impl Storage {
    /// Opens storage rooted at `root`, creating the directory if needed.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        Ok(Self {
            root: StorageRoot::open(root)?,
        })
    }

    pub fn root(&self) -> &StorageRoot {
        &self.root
    }

    /// Lists the immediate children of `path`.
    pub fn list(&self, path: &str) -> Result<Vec<Entry>, StorageError> {
        let dir = self.root.resolve_from_root(path)?;
        listing::list_directory(&dir)
    }

    pub fn create_directory(&self, path: &str, name: &str) -> Result<(), StorageError> {
        let base = self.root.resolve_from_root(path)?;
        directories::create_directory(&self.root, &base, name).map(|_| ())
    }

    pub fn delete_directory(
        &self,
        path: &str,
        name: &str,
        confirmed: bool,
    ) -> Result<(), StorageError> {
        let base = self.root.resolve_from_root(path)?;
        directories::delete_directory(&self.root, &base, name, confirmed)
    }

    /// Deletes each named file under `path`. Never fails as a whole: if
    /// `path` itself is rejected, every name carries that rejection.
    pub fn delete_files<S: AsRef<str>>(&self, path: &str, names: &[S]) -> BatchDeletion {
        match self.root.resolve_from_root(path) {
            Ok(base) => batch::delete_files(&self.root, &base, names),
            Err(e) => {
                let outcome = DeletionOutcome::from(e);
                let mut rejected = BatchDeletion::default();
                for name in names {
                    rejected.record(name.as_ref(), outcome.clone());
                }
                rejected
            }
        }
    }

    pub fn download(&self, path: &str, name: &str) -> Result<ArchiveStream, StorageError> {
        let base = self.root.resolve_from_root(path)?;
        archive::prepare_download(&self.root, &base, name)
    }

    /// Checks that an upload to `path/name` would be accepted, without
    /// writing anything.
    pub fn check_upload(&self, path: &str, name: &str) -> Result<(), StorageError> {
        let base = self.root.resolve_from_root(path)?;
        upload::resolve_upload_target(&self.root, &base, name).map(|_| ())
    }

    /// Stores `reader` at `path/name`, overwriting an existing file.
    pub fn store_file<R: Read>(
        &self,
        path: &str,
        name: &str,
        reader: &mut R,
    ) -> Result<u64, StorageError> {
        let base = self.root.resolve_from_root(path)?;
        upload::store_file(&self.root, &base, name, reader)
    }
}
