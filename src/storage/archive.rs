//! Downloads
//!
//! A file is handed back as-is; a folder is zipped in memory with its own
//! name as the top-level prefix.

use log::{debug, error, info};
use std::fs::{self, File};
use std::io::{self, Cursor, Seek, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::StorageError;
use crate::storage::results::{ArchiveBody, ArchiveStream};
use crate::storage::root::{ResolvedPath, StorageRoot};

/// Fallback folder name when the storage root itself is downloaded and has
/// no usable name.
const ROOT_ARCHIVE_NAME: &str = "storage";

/// Prepares `base/name` for download.
pub fn prepare_download(
    root: &StorageRoot,
    base: &ResolvedPath,
    name: &str,
) -> Result<ArchiveStream, StorageError> {
    let target = root.resolve(base, name)?;
    let virtual_path = target.virtual_path();

    let metadata = fs::metadata(target.as_path())
        .map_err(|_| StorageError::NotFound(virtual_path.to_string()))?;

    if metadata.is_file() {
        let file = File::open(target.as_path()).map_err(|e| {
            error!("Failed to open {virtual_path} for download: {e}");
            StorageError::io(virtual_path, e)
        })?;
        let name = target.file_name().unwrap_or(name).to_string();
        info!("Prepared download of {virtual_path} ({} bytes)", metadata.len());
        return Ok(ArchiveStream {
            name,
            len: metadata.len(),
            body: ArchiveBody::File(file),
        });
    }

    if !metadata.is_dir() {
        return Err(StorageError::NotFound(virtual_path.to_string()));
    }

    let folder_name = match target.file_name() {
        Some(folder) => folder.to_string(),
        None => root
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| ROOT_ARCHIVE_NAME.to_string()),
    };

    let bytes = zip_directory(&target, &folder_name)?;
    info!(
        "Prepared zip of {virtual_path} as {folder_name}.zip ({} bytes)",
        bytes.len()
    );
    Ok(ArchiveStream {
        name: format!("{folder_name}.zip"),
        len: bytes.len() as u64,
        body: ArchiveBody::Zip(Cursor::new(bytes)),
    })
}

/// Zips the whole tree under `dir`, every entry prefixed with `folder_name`.
fn zip_directory(dir: &ResolvedPath, folder_name: &str) -> Result<Vec<u8>, StorageError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    add_directory(&mut writer, options, dir.as_path(), folder_name, dir.virtual_path())?;

    let cursor = writer.finish().map_err(|e| {
        error!("Failed to finish archive of {}: {e}", dir.virtual_path());
        StorageError::io(dir.virtual_path(), io::Error::other(e))
    })?;
    Ok(cursor.into_inner())
}

/// Adds the files below `dir` depth-first, children in name order.
///
/// Empty directories get an entry of their own so extraction recreates
/// them. Symbolic links are skipped.
fn add_directory<W: Write + Seek>(
    writer: &mut ZipWriter<W>,
    options: SimpleFileOptions,
    dir: &Path,
    prefix: &str,
    virtual_dir: &str,
) -> Result<(), StorageError> {
    let mut children = fs::read_dir(dir)
        .and_then(|entries| entries.collect::<Result<Vec<_>, _>>())
        .map_err(|e| {
            error!("Failed to read directory {virtual_dir} while archiving: {e}");
            StorageError::io(virtual_dir, e)
        })?;
    children.sort_by_key(|child| child.file_name());

    if children.is_empty() {
        writer
            .add_directory(format!("{prefix}/"), options)
            .map_err(|e| StorageError::io(virtual_dir, io::Error::other(e)))?;
        return Ok(());
    }

    for child in children {
        let name = child.file_name().to_string_lossy().into_owned();
        let entry_name = format!("{prefix}/{name}");
        let virtual_child = format!("{}/{name}", virtual_dir.trim_end_matches('/'));
        let file_type = child
            .file_type()
            .map_err(|e| StorageError::io(&virtual_child, e))?;

        if file_type.is_dir() {
            add_directory(writer, options, &child.path(), &entry_name, &virtual_child)?;
        } else if file_type.is_file() {
            let mut file = File::open(child.path()).map_err(|e| {
                error!("Failed to open {virtual_child} while archiving: {e}");
                StorageError::io(&virtual_child, e)
            })?;
            writer
                .start_file(entry_name.clone(), options)
                .map_err(|e| StorageError::io(&virtual_child, io::Error::other(e)))?;
            let copied = io::copy(&mut file, writer).map_err(|e| {
                error!("Failed to read {virtual_child} while archiving: {e}");
                StorageError::io(&virtual_child, e)
            })?;
            debug!("Archived {entry_name} ({copied} bytes)");
        } else {
            debug!("Skipped {virtual_child} while archiving: not a regular file");
        }
    }

    Ok(())
}
