//! Batch file deletion
//!
//! Each name is handled on its own; one failure never stops the rest.

use log::{error, info, warn};
use std::fs;

use crate::error::StorageError;
use crate::storage::results::{BatchDeletion, DeletionOutcome};
use crate::storage::root::{ResolvedPath, StorageRoot};

/// Deletes every named file under `base`, recording one outcome per name.
pub fn delete_files<S: AsRef<str>>(
    root: &StorageRoot,
    base: &ResolvedPath,
    names: &[S],
) -> BatchDeletion {
    let mut batch = BatchDeletion::default();

    for name in names {
        let name = name.as_ref();
        let outcome = match delete_file(root, base, name) {
            Ok(()) => DeletionOutcome::Deleted,
            Err(e) => {
                warn!("Could not delete {name:?} in {}: {e}", base.virtual_path());
                DeletionOutcome::from(e)
            }
        };
        batch.record(name, outcome);
    }

    info!(
        "Batch delete in {}: {}/{} files deleted",
        base.virtual_path(),
        batch.deleted_count(),
        batch.len()
    );
    batch
}

/// Deletes a single regular file. Directories are reported as not found.
fn delete_file(root: &StorageRoot, base: &ResolvedPath, name: &str) -> Result<(), StorageError> {
    let target = root.resolve(base, name)?;
    let virtual_path = target.virtual_path();

    let is_file = fs::symlink_metadata(target.as_path())
        .map(|metadata| !metadata.is_dir())
        .unwrap_or(false);
    if !is_file {
        return Err(StorageError::NotFound(virtual_path.to_string()));
    }

    fs::remove_file(target.as_path()).map_err(|e| {
        error!("Failed to delete file {virtual_path}: {e}");
        StorageError::io(virtual_path, e)
    })?;

    info!("Deleted file {virtual_path}");
    Ok(())
}
