//! Command handlers
//!
//! Runs the commands that complete in a single reply. `RETR` and `STOR`
//! move payload bytes over the connection and are driven by the session
//! instead.

use log::{info, warn};

use crate::protocol::responses::{self, error_response, format_response};
use crate::protocol::{Command, CommandResult, CommandStatus};
use crate::storage::{BatchDeletion, DeletionOutcome, Entry, Storage};

/// Dispatches a parsed command to its handler.
pub fn handle_command(storage: &Storage, command: &Command) -> CommandResult {
    match command {
        Command::LIST(path) => handle_cmd_list(storage, path),
        Command::MKD { path, name } => handle_cmd_mkd(storage, path, name),
        Command::RMD {
            path,
            name,
            confirmed,
        } => handle_cmd_rmd(storage, path, name, *confirmed),
        Command::DELE { path, names } => handle_cmd_dele(storage, path, names),
        Command::NOOP => CommandResult::success(format_response(responses::OK, "OK")),
        Command::QUIT => CommandResult {
            status: CommandStatus::CloseConnection,
            message: format_response(responses::GOODBYE, "Goodbye"),
        },
        Command::RETR { .. } | Command::STOR { .. } => CommandResult::failure(
            "Transfer command outside a session",
            format_response(responses::SYNTAX_ERROR, "Transfer commands need a session"),
        ),
        Command::INVALID(reason) => CommandResult::failure(
            reason.clone(),
            format_response(responses::SYNTAX_ERROR, reason),
        ),
        Command::UNKNOWN => CommandResult::failure(
            "Unknown command",
            format_response(responses::UNKNOWN_COMMAND, "Unknown command"),
        ),
    }
}

/// Handles LIST: a count line, one line per entry, then a completion line.
fn handle_cmd_list(storage: &Storage, path: &str) -> CommandResult {
    match storage.list(path) {
        Ok(entries) => {
            let mut message = format_response(
                responses::OPENING_DATA,
                &format!("{} entries", entries.len()),
            );
            for entry in &entries {
                message.push_str(&format_entry(entry));
            }
            message.push_str(&format_response(
                responses::TRANSFER_COMPLETE,
                "Listing complete",
            ));
            CommandResult::success(message)
        }
        Err(e) => CommandResult::failure(e.to_string(), error_response(&e)),
    }
}

/// `<d|f>\t<size>\t<modified>\t<name>`; the name goes last so it may hold
/// tabs or spaces.
fn format_entry(entry: &Entry) -> String {
    let marker = if entry.is_directory() { 'd' } else { 'f' };
    format!(
        "{marker}\t{}\t{}\t{}\r\n",
        entry.size_bytes,
        entry.modified_display(),
        entry.name
    )
}

fn handle_cmd_mkd(storage: &Storage, path: &str, name: &str) -> CommandResult {
    match storage.create_directory(path, name) {
        Ok(()) => CommandResult::success(format_response(
            responses::DIRECTORY_CREATED,
            "Directory created",
        )),
        Err(e) => CommandResult::failure(e.to_string(), error_response(&e)),
    }
}

fn handle_cmd_rmd(storage: &Storage, path: &str, name: &str, confirmed: bool) -> CommandResult {
    match storage.delete_directory(path, name, confirmed) {
        Ok(()) => CommandResult::success(format_response(
            responses::ACTION_COMPLETE,
            "Directory deleted",
        )),
        Err(e) => CommandResult::failure(e.to_string(), error_response(&e)),
    }
}

/// Handles DELE: one outcome line per requested name, then a summary whose
/// code tells full, partial and no success apart.
fn handle_cmd_dele(storage: &Storage, path: &str, names: &[String]) -> CommandResult {
    let batch = storage.delete_files(path, names);
    if batch.is_empty() {
        return CommandResult::failure(
            "DELE without file names",
            format_response(responses::SYNTAX_ERROR, "No file names given"),
        );
    }

    let mut message = format_response(
        responses::OPENING_DATA,
        &format!("{} outcomes", batch.len()),
    );
    for (name, outcome) in batch.iter() {
        message.push_str(&format_outcome(name, outcome));
    }

    let summary = format!("{}/{} files deleted", batch.deleted_count(), batch.len());
    if batch.has_failures() {
        warn!("DELE in {path:?}: {summary}");
        message.push_str(&format_response(batch_failure_code(&batch), &summary));
        CommandResult::failure(summary, message)
    } else {
        info!("DELE in {path:?}: {summary}");
        message.push_str(&format_response(responses::ACTION_COMPLETE, &summary));
        CommandResult::success(message)
    }
}

fn batch_failure_code(batch: &BatchDeletion) -> u16 {
    if batch.deleted_count() == 0 {
        responses::ACTION_NOT_TAKEN
    } else {
        responses::PARTIALLY_COMPLETE
    }
}

fn format_outcome(name: &str, outcome: &DeletionOutcome) -> String {
    match outcome {
        DeletionOutcome::Deleted => format!("OK\t{name}\r\n"),
        DeletionOutcome::Failed { kind, message } => {
            format!("{}\t{name}\t{message}\r\n", kind.as_str())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn storage() -> (tempfile::TempDir, Storage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        (dir, storage)
    }

    #[test]
    fn list_reply_has_count_entries_and_footer() {
        let (_dir, storage) = storage();
        fs::write(storage.root().path().join("a b.txt"), b"abc").unwrap();

        let result = handle_command(&storage, &Command::LIST(String::new()));
        assert_eq!(result.status, CommandStatus::Success);
        let lines: Vec<&str> = result.message.split("\r\n").collect();
        assert_eq!(lines[0], "150 1 entries");
        assert!(lines[1].starts_with("f\t3\t"));
        assert!(lines[1].ends_with("\ta b.txt"));
        assert_eq!(lines[2], "226 Listing complete");
    }

    #[test]
    fn list_outside_root_is_denied() {
        let (_dir, storage) = storage();
        let result = handle_command(&storage, &Command::LIST("../..".into()));
        assert!(matches!(result.status, CommandStatus::Failure(_)));
        assert!(result.message.starts_with("553 ACCESS_DENIED"));
    }

    #[test]
    fn mkd_twice_reports_already_exists() {
        let (_dir, storage) = storage();
        let mkd = Command::MKD {
            path: String::new(),
            name: "x".into(),
        };
        assert!(handle_command(&storage, &mkd).message.starts_with("257"));
        assert!(handle_command(&storage, &mkd)
            .message
            .starts_with("521 ALREADY_EXISTS"));
    }

    #[test]
    fn rmd_without_confirmation_reports_350() {
        let (_dir, storage) = storage();
        fs::create_dir_all(storage.root().path().join("docs").join("inner")).unwrap();
        let result = handle_command(
            &storage,
            &Command::RMD {
                path: String::new(),
                name: "docs".into(),
                confirmed: false,
            },
        );
        assert!(result.message.starts_with("350 CONFIRMATION_REQUIRED"));
        assert!(storage.root().path().join("docs").join("inner").is_dir());
    }

    #[test]
    fn dele_reports_each_name_and_partial_summary() {
        let (_dir, storage) = storage();
        fs::write(storage.root().path().join("a.txt"), b"a").unwrap();

        let result = handle_command(
            &storage,
            &Command::DELE {
                path: String::new(),
                names: vec!["a.txt".into(), "missing.txt".into()],
            },
        );
        let lines: Vec<&str> = result.message.split("\r\n").collect();
        assert_eq!(lines[0], "150 2 outcomes");
        assert_eq!(lines[1], "OK\ta.txt");
        assert!(lines[2].starts_with("NOT_FOUND\tmissing.txt\t"));
        assert_eq!(lines[3], "251 1/2 files deleted");
    }

    #[test]
    fn dele_without_names_is_a_syntax_error() {
        let (_dir, storage) = storage();
        let result = handle_command(
            &storage,
            &Command::DELE {
                path: String::new(),
                names: Vec::new(),
            },
        );
        assert!(matches!(result.status, CommandStatus::Failure(_)));
        assert!(result.message.starts_with("501 "));
    }

    #[test]
    fn quit_closes_and_unknown_is_500() {
        let (_dir, storage) = storage();
        assert_eq!(
            handle_command(&storage, &Command::QUIT).status,
            CommandStatus::CloseConnection
        );
        assert!(handle_command(&storage, &Command::UNKNOWN)
            .message
            .starts_with("500"));
    }
}
