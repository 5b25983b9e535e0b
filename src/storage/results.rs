//! Storage result types
//!
//! Defines the plain data returned by storage operations.

use chrono::{DateTime, Local};
use std::fs::File;
use std::io::{self, Cursor, Read};

use crate::error::{ErrorKind, StorageError};

/// Format used for entry modification times, in server local time.
pub const MODIFIED_FORMAT: &str = "%d-%m-%Y %H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One child of a listed directory
#[derive(Debug, Clone)]
pub struct Entry {
    pub name: String,
    pub kind: EntryKind,
    /// Byte length, 0 for directories
    pub size_bytes: u64,
    pub modified_at: DateTime<Local>,
}

impl Entry {
    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Modification time as `dd-MM-yyyy HH:mm`.
    pub fn modified_display(&self) -> String {
        self.modified_at.format(MODIFIED_FORMAT).to_string()
    }
}

/// What a directory holds, judged from its immediate children only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryContentState {
    Empty,
    FilesOnly,
    /// At least one subdirectory, whether or not files are present
    HasSubdirectories,
}

/// Result of deleting one file in a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionOutcome {
    Deleted,
    Failed { kind: ErrorKind, message: String },
}

impl DeletionOutcome {
    pub fn is_deleted(&self) -> bool {
        matches!(self, DeletionOutcome::Deleted)
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            DeletionOutcome::Deleted => None,
            DeletionOutcome::Failed { kind, .. } => Some(*kind),
        }
    }
}

impl From<StorageError> for DeletionOutcome {
    fn from(error: StorageError) -> Self {
        DeletionOutcome::Failed {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Per-name results of a batch file deletion, in request order
#[derive(Debug, Clone, Default)]
pub struct BatchDeletion {
    outcomes: Vec<(String, DeletionOutcome)>,
}

impl BatchDeletion {
    pub(crate) fn record(&mut self, name: &str, outcome: DeletionOutcome) {
        self.outcomes.push((name.to_string(), outcome));
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Outcome recorded for `name` (the first one, if it was requested twice).
    pub fn get(&self, name: &str) -> Option<&DeletionOutcome> {
        self.outcomes
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, outcome)| outcome)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DeletionOutcome)> {
        self.outcomes.iter().map(|(name, outcome)| (name.as_str(), outcome))
    }

    pub fn deleted_count(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_deleted()).count()
    }

    pub fn all_deleted(&self) -> bool {
        self.deleted_count() == self.outcomes.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.all_deleted()
    }
}

/// Body of a download
#[derive(Debug)]
pub enum ArchiveBody {
    /// The requested file, streamed as-is
    File(File),
    /// A zip built in memory from a folder
    Zip(Cursor<Vec<u8>>),
}

/// A download ready to be sent
#[derive(Debug)]
pub struct ArchiveStream {
    /// Suggested download name
    pub name: String,
    /// Exact number of bytes the body yields
    pub len: u64,
    pub body: ArchiveBody,
}

impl Read for ArchiveStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.body {
            ArchiveBody::File(file) => file.read(buf),
            ArchiveBody::Zip(cursor) => cursor.read(buf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn entry_formats_modified_time() {
        let entry = Entry {
            name: "notes.txt".into(),
            kind: EntryKind::File,
            size_bytes: 12,
            modified_at: Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 0).unwrap(),
        };
        assert_eq!(entry.modified_display(), "07-03-2024 09:05");
        assert!(!entry.is_directory());
    }

    #[test]
    fn batch_tracks_partial_failure() {
        let mut batch = BatchDeletion::default();
        batch.record("a.txt", DeletionOutcome::Deleted);
        batch.record(
            "b.txt",
            StorageError::NotFound("/b.txt".into()).into(),
        );

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.deleted_count(), 1);
        assert!(batch.has_failures());
        assert_eq!(batch.get("b.txt").and_then(DeletionOutcome::kind), Some(ErrorKind::NotFound));
    }
}
