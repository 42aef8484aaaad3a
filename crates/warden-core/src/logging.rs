//! Thread-safe logging utilities.
//!
//! Provides simple append-only log files with timestamps. Used for the
//! decision log; diagnostics go through the `log` facade instead.

use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::Path,
    sync::{Arc, Mutex},
};

use chrono::{SecondsFormat, Utc};

/// Thread-safe handle to an append-only log file.
pub type LogHandle = Arc<Mutex<Option<File>>>;

/// Format current UTC time as ISO 8601 with milliseconds (e.g. 2026-02-04T10:15:30.123Z).
fn utc_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Write a timestamped line to the log file (if present).
pub fn log_line(handle: &LogHandle, label: &str, data: &str) {
    if let Ok(mut guard) = handle.lock() {
        if let Some(ref mut file) = *guard {
            let ts = utc_timestamp();
            let _ = writeln!(file, "[{}] {}: {}", ts, label, data);
            let _ = file.flush();
        }
    }
}

/// Open (or create) a log file at `{log_dir}/{log_id}.log` and return a shared handle.
///
/// Failures yield a handle that silently discards lines.
pub fn open_log_file(log_dir: Option<&Path>, log_id: &str) -> LogHandle {
    let file = log_dir.and_then(|dir| {
        let path = dir.join(format!("{}.log", log_id));
        if let Err(err) = std::fs::create_dir_all(dir) {
            log::warn!("Cannot create log dir {}: {err}", dir.display());
            return None;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| log::warn!("Cannot open log {}: {err}", path.display()))
            .ok()
    });
    Arc::new(Mutex::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::tempdir;

    #[test]
    fn utc_timestamp_format() {
        let ts = utc_timestamp();
        // YYYY-MM-DDTHH:MM:SS.mmmZ
        assert!(ts.ends_with('Z'));
        assert_eq!(ts.len(), 24);
        assert_eq!(&ts[4..5], "-");
        assert_eq!(&ts[7..8], "-");
        assert_eq!(&ts[10..11], "T");
        assert_eq!(&ts[13..14], ":");
        assert_eq!(&ts[16..17], ":");
        assert_eq!(&ts[19..20], ".");
    }

    #[test]
    fn open_log_file_creates_file() {
        let dir = tempdir().unwrap();
        let log_dir = dir.path().join("logs");

        let handle = open_log_file(Some(&log_dir), "decisions");
        assert!(handle.lock().unwrap().is_some());
        assert!(log_dir.join("decisions.log").exists());
    }

    #[test]
    fn open_log_file_none_dir() {
        let handle = open_log_file(None, "decisions");
        assert!(handle.lock().unwrap().is_none());
    }

    #[test]
    fn log_line_appends() {
        let dir = tempdir().unwrap();

        let handle = open_log_file(Some(dir.path()), "decisions");
        log_line(&handle, "APPROVED", "git status");
        log_line(&handle, "DENIED", "bash -c ls");

        let mut contents = String::new();
        File::open(dir.path().join("decisions.log"))
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();

        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("APPROVED: git status"));
        assert!(lines[1].ends_with("DENIED: bash -c ls"));
        assert!(lines[0].starts_with('['));
    }

    #[test]
    fn log_line_handles_none_file() {
        let handle: LogHandle = Arc::new(Mutex::new(None));
        // Should not panic
        log_line(&handle, "APPROVED", "test");
    }
}
