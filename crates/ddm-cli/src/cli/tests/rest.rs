//! Tests for status, pause, resume, remove, bench, checksum.

use super::parse;
use crate::cli::CliCommand;

#[test]
fn cli_parse_status() {
    match parse(&["ddm", "status"]) {
        CliCommand::Status { logs } => assert!(logs.is_none()),
        _ => panic!("expected Status"),
    }
}

#[test]
fn cli_parse_status_logs() {
    match parse(&["ddm", "status", "--logs", "7"]) {
        CliCommand::Status { logs } => assert_eq!(logs, Some(7)),
        _ => panic!("expected Status with --logs"),
    }
}

#[test]
fn cli_parse_cancel() {
    match parse(&["ddm", "cancel", "5"]) {
        CliCommand::Cancel { id, download_dir } => {
            assert_eq!(id, 5);
            assert!(download_dir.is_none());
        }
        _ => panic!("expected Cancel"),
    }
}

#[test]
fn cli_parse_pause() {
    match parse(&["ddm", "pause", "42"]) {
        CliCommand::Pause { id } => assert_eq!(id, 42),
        _ => panic!("expected Pause"),
    }
}

#[test]
fn cli_parse_resume() {
    match parse(&["ddm", "resume", "1"]) {
        CliCommand::Resume { id } => assert_eq!(id, 1),
        _ => panic!("expected Resume"),
    }
}

#[test]
fn cli_parse_remove() {
    match parse(&["ddm", "remove", "99"]) {
        CliCommand::Remove {
            id,
            delete_files,
            download_dir,
        } => {
            assert_eq!(id, 99);
            assert!(!delete_files);
            assert!(download_dir.is_none());
        }
        _ => panic!("expected Remove"),
    }
}

#[test]
fn cli_parse_remove_delete_files() {
    match parse(&["ddm", "remove", "1", "--delete-files"]) {
        CliCommand::Remove {
            id,
            delete_files,
            download_dir,
        } => {
            assert_eq!(id, 1);
            assert!(delete_files);
            assert!(download_dir.is_none());
        }
        _ => panic!("expected Remove with --delete-files"),
    }
}

#[test]
fn cli_parse_remove_delete_files_download_dir() {
    match parse(&[
        "ddm",
        "remove",
        "2",
        "--delete-files",
        "--download-dir",
        "/tmp",
    ]) {
        CliCommand::Remove {
            id,
            delete_files,
            download_dir,
        } => {
            assert_eq!(id, 2);
            assert!(delete_files);
            assert_eq!(download_dir.as_deref(), Some(std::path::Path::new("/tmp")));
        }
        _ => panic!("expected Remove with --delete-files --download-dir"),
    }
}

#[test]
fn cli_parse_bench() {
    match parse(&["ddm", "bench", "https://example.com/large.bin"]) {
        CliCommand::Bench { url } => assert_eq!(url, "https://example.com/large.bin"),
        _ => panic!("expected Bench"),
    }
}

#[test]
fn cli_parse_checksum() {
    match parse(&["ddm", "checksum", "/path/to/file.bin"]) {
        CliCommand::Checksum { path } => assert_eq!(path, "/path/to/file.bin"),
        _ => panic!("expected Checksum"),
    }
}
