//! Directory listing
//!
//! Lists the immediate children of a directory with their metadata.

use chrono::{DateTime, Local};
use log::{debug, error, info};
use std::fs;
use std::io;

use crate::error::StorageError;
use crate::storage::results::{Entry, EntryKind};
use crate::storage::root::ResolvedPath;

/// Lists the contents of a directory in filesystem order.
///
/// A child whose metadata cannot be read fails the whole listing rather than
/// being skipped.
pub fn list_directory(path: &ResolvedPath) -> Result<Vec<Entry>, StorageError> {
    let virtual_path = path.virtual_path();
    if !path.as_path().is_dir() {
        return Err(StorageError::NotFound(virtual_path.to_string()));
    }

    let entries = fs::read_dir(path.as_path()).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => {
            StorageError::NotFound(virtual_path.to_string())
        }
        _ => {
            error!("Failed to list directory {virtual_path}: {e}");
            StorageError::io(virtual_path, e)
        }
    })?;

    let mut listing = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            error!("Failed to read entry in {virtual_path}: {e}");
            StorageError::io(virtual_path, e)
        })?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let child_path = format!("{}/{}", virtual_path.trim_end_matches('/'), name);

        let metadata = entry_metadata(&entry).map_err(|e| {
            error!("Failed to read metadata for {child_path}: {e}");
            StorageError::io(&child_path, e)
        })?;
        let modified = metadata.modified().map_err(|e| {
            error!("Failed to read modification time for {child_path}: {e}");
            StorageError::io(&child_path, e)
        })?;

        let kind = if metadata.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        let size_bytes = match kind {
            EntryKind::Directory => 0,
            EntryKind::File => metadata.len(),
        };

        debug!("Listed {child_path} ({kind:?}, {size_bytes} bytes)");
        listing.push(Entry {
            name,
            kind,
            size_bytes,
            modified_at: DateTime::<Local>::from(modified),
        });
    }

    info!("Listed directory {virtual_path} - {} entries", listing.len());
    Ok(listing)
}

/// Metadata of the entry, following symbolic links so a link to a directory
/// lists as a directory. A dangling link falls back to the link itself.
fn entry_metadata(entry: &fs::DirEntry) -> io::Result<fs::Metadata> {
    match fs::metadata(entry.path()) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            let link = entry.metadata()?;
            if link.file_type().is_symlink() {
                Ok(link)
            } else {
                Err(e)
            }
        }
        result => result,
    }
}
