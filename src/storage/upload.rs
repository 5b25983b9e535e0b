//! Uploads
//!
//! Stores an incoming byte stream under a client path. The bytes land in a
//! freshly created temporary file in the target directory and are renamed
//! over the target once complete, so an existing file is only replaced by a
//! finished upload.

use log::{error, info};
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use tempfile::{Builder, NamedTempFile};

use crate::error::StorageError;
use crate::storage::root::{ResolvedPath, StorageRoot};

const TEMP_SUFFIX: &str = ".upload";

/// Resolves and checks where `base/name` would be stored.
///
/// The parent must be an existing directory and the target must not be a
/// directory. An existing file is fine: it gets overwritten.
pub fn resolve_upload_target(
    root: &StorageRoot,
    base: &ResolvedPath,
    name: &str,
) -> Result<ResolvedPath, StorageError> {
    let target = root.resolve(base, name)?;
    let virtual_path = target.virtual_path();

    if target.is_root() {
        return Err(StorageError::NameConflict(virtual_path.to_string()));
    }

    let parent_is_dir = target
        .as_path()
        .parent()
        .is_some_and(|parent| parent.is_dir());
    if !parent_is_dir {
        return Err(StorageError::NotFound(virtual_path.to_string()));
    }

    if fs::symlink_metadata(target.as_path()).is_ok_and(|metadata| metadata.is_dir()) {
        return Err(StorageError::NameConflict(virtual_path.to_string()));
    }

    Ok(target)
}

/// Copies `reader` into `base/name`, replacing any existing file.
///
/// Returns the number of bytes stored. On failure the temporary file is
/// removed and the target is left as it was.
pub fn store_file<R: Read>(
    root: &StorageRoot,
    base: &ResolvedPath,
    name: &str,
    reader: &mut R,
) -> Result<u64, StorageError> {
    let target = resolve_upload_target(root, base, name)?;
    let virtual_path = target.virtual_path();

    let (temp_file, written) = write_temp(&target, reader).map_err(|e| {
        error!("Failed to write upload for {virtual_path}: {e}");
        StorageError::io(virtual_path, e)
    })?;

    temp_file.persist(target.as_path()).map_err(|e| {
        error!("Failed to move upload into place at {virtual_path}: {e}");
        StorageError::io(virtual_path, e.error)
    })?;

    info!("Stored {virtual_path} ({written} bytes)");
    Ok(written)
}

/// Writes `reader` into a new `.<name>.XXXXXX.upload` file next to the
/// target. The file is created exclusively, so it never clobbers an existing
/// entry, and is deleted when dropped unless persisted.
fn write_temp<R: Read>(
    target: &ResolvedPath,
    reader: &mut R,
) -> io::Result<(NamedTempFile, u64)> {
    let dir = target.as_path().parent().unwrap_or(Path::new("."));
    let prefix = format!(".{}.", target.file_name().unwrap_or_default());

    let mut temp_file = Builder::new()
        .prefix(&prefix)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(dir)?;
    let written = io::copy(reader, &mut temp_file)?;
    temp_file.flush()?;
    temp_file.as_file().sync_all()?;
    Ok((temp_file, written))
}
