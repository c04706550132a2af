//! Log file naming, creation and retention.
//!
//! Files live flat in one directory and are named
//! `env_log_<sanitized id>_<YYYYMMDD_HHMMSS>.csv`. Filename order is the
//! retention order: the lexicographically smallest name is deleted first.

use crate::logging::format::{header, sanitize_id, Zone};
use crate::logging::stats::{LoggerStats, SharedLoggerStats};
use chrono::{DateTime, Utc};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Prefix of every log file name.
pub const LOG_FILE_PREFIX: &str = "env_log_";

/// Extension of every log file name.
pub const LOG_FILE_EXTENSION: &str = "csv";

/// Collision suffixes tried when a name is taken within the same second.
const MAX_NAME_SUFFIX: u32 = 999;

/// Errors from creating, writing or pruning log files.
#[derive(Debug, thiserror::Error)]
pub enum LogFileError {
    #[error("cannot create log directory {}: {source}", .path.display())]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("cannot list log directory {}: {source}", .path.display())]
    ReadDir { path: PathBuf, source: io::Error },
    #[error("cannot remove old log file {}: {source}", .path.display())]
    Remove { path: PathBuf, source: io::Error },
    #[error("cannot open log file {}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("cannot write log file {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
}

impl LogFileError {
    /// True when the directory itself is unusable rather than a single file.
    pub fn is_configuration(&self) -> bool {
        matches!(self, LogFileError::CreateDir { .. })
    }
}

/// An open log file with its header already written.
#[derive(Debug)]
pub struct LogFile {
    path: PathBuf,
    writer: BufWriter<File>,
    rows_written: u64,
}

impl LogFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Data rows written so far, excluding the header.
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Append one row and flush it to the OS immediately.
    pub fn append_line(&mut self, line: &str) -> Result<(), LogFileError> {
        writeln!(self.writer, "{line}")
            .and_then(|_| self.writer.flush())
            .map_err(|source| LogFileError::Write {
                path: self.path.clone(),
                source,
            })?;
        self.rows_written += 1;
        Ok(())
    }

    /// Flush and close, returning the path.
    pub fn close(mut self) -> Result<PathBuf, LogFileError> {
        self.writer.flush().map_err(|source| LogFileError::Write {
            path: self.path.clone(),
            source,
        })?;
        Ok(self.path)
    }
}

/// Creates log files in one directory and keeps their count under a cap.
#[derive(Debug, Clone)]
pub struct LogFileManager {
    dir: PathBuf,
    max_files: usize,
    zone: Zone,
    stats: SharedLoggerStats,
}

impl LogFileManager {
    pub fn new(dir: impl Into<PathBuf>, max_files: usize, zone: Zone) -> Self {
        Self {
            dir: dir.into(),
            max_files,
            zone,
            stats: Arc::new(LoggerStats::new()),
        }
    }

    /// Share counters with the rest of the logger.
    pub fn with_stats(mut self, stats: SharedLoggerStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Retention cap.
    pub fn capacity(&self) -> usize {
        self.max_files
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }

    pub fn stats(&self) -> &SharedLoggerStats {
        &self.stats
    }

    /// Existing log files, oldest first. A missing directory is empty.
    pub fn list(&self) -> Result<Vec<PathBuf>, LogFileError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(LogFileError::ReadDir {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && is_log_file(p))
            .collect();
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(files)
    }

    /// File names only, oldest first.
    pub fn file_names(&self) -> Result<Vec<String>, LogFileError> {
        Ok(self
            .list()?
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect())
    }

    /// Delete the oldest files until there is room for one more.
    pub fn enforce_retention(&self) -> Result<Vec<PathBuf>, LogFileError> {
        let mut files = self.list()?;
        let mut deleted = Vec::new();
        while !files.is_empty() && files.len() >= self.max_files {
            let oldest = files.remove(0);
            tracing::info!(path = %oldest.display(), "deleting oldest log file");
            std::fs::remove_file(&oldest).map_err(|source| LogFileError::Remove {
                path: oldest.clone(),
                source,
            })?;
            self.stats.record_file_deleted();
            deleted.push(oldest);
        }
        Ok(deleted)
    }

    /// Create a new log file for `session_id`, pruning old files first.
    pub fn create(&self, session_id: &str, at: DateTime<Utc>) -> Result<LogFile, LogFileError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| LogFileError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;
        self.enforce_retention()?;

        let stem = format!(
            "{LOG_FILE_PREFIX}{}_{}",
            sanitize_id(session_id),
            self.zone.file_timestamp(at)
        );
        let (path, file) = self.open_unique(&stem)?;

        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", header())
            .and_then(|_| writer.flush())
            .map_err(|source| LogFileError::Write {
                path: path.clone(),
                source,
            })?;

        self.stats.record_file_created();
        tracing::info!(path = %path.display(), "new log file");
        Ok(LogFile {
            path,
            writer,
            rows_written: 0,
        })
    }

    /// Open `<stem>.csv`, or `<stem>_NNN.csv` when that name is taken.
    ///
    /// The suffix sorts after the bare name, so filename order stays
    /// creation order.
    fn open_unique(&self, stem: &str) -> Result<(PathBuf, File), LogFileError> {
        let mut path = self.dir.join(format!("{stem}.{LOG_FILE_EXTENSION}"));
        let mut suffix = 0;
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists && suffix < MAX_NAME_SUFFIX => {
                    suffix += 1;
                    path = self
                        .dir
                        .join(format!("{stem}_{suffix:03}.{LOG_FILE_EXTENSION}"));
                }
                Err(source) => return Err(LogFileError::Open { path, source }),
            }
        }
    }
}

fn is_log_file(path: &Path) -> bool {
    let name_ok = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(LOG_FILE_PREFIX));
    let ext_ok = path
        .extension()
        .is_some_and(|e| e == LOG_FILE_EXTENSION);
    name_ok && ext_ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn manager(dir: &Path, max_files: usize) -> LogFileManager {
        LogFileManager::new(dir, max_files, Zone::Named(chrono_tz::UTC))
    }

    fn at(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap() + chrono::Duration::seconds(secs as i64)
    }

    #[test]
    fn test_create_writes_header_and_name() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 10);

        let file = manager.create("ward 3/bed:7", at(0)).unwrap();
        let name = file.path().file_name().unwrap().to_str().unwrap().to_string();
        assert_eq!(name, "env_log_ward-3-bed-7_20261017_120000.csv");

        let path = file.close().unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content, format!("{}\n", header()));
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let manager = manager(&nested, 10);
        assert!(manager.list().unwrap().is_empty());

        manager.create("S", at(0)).unwrap();
        assert_eq!(manager.list().unwrap().len(), 1);
    }

    #[test]
    fn test_append_flushes_each_row() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = manager(dir.path(), 10).create("S", at(0)).unwrap();
        file.append_line("row-1").unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        assert!(content.ends_with("row-1\n"));
        assert_eq!(file.rows_written(), 1);
    }

    #[test]
    fn test_same_second_names_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 10);
        manager.create("S", at(0)).unwrap();
        manager.create("S", at(0)).unwrap();
        manager.create("S", at(1)).unwrap();

        assert_eq!(
            manager.file_names().unwrap(),
            vec![
                "env_log_S_20261017_120000.csv",
                "env_log_S_20261017_120000_001.csv",
                "env_log_S_20261017_120001.csv",
            ]
        );
    }

    #[test]
    fn test_retention_deletes_smallest_name_first() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), 10);
        for i in 0..10 {
            manager.create("S", at(i)).unwrap();
        }
        let before = manager.file_names().unwrap();
        assert_eq!(before.len(), 10);

        manager.create("S", at(100)).unwrap();

        let after = manager.file_names().unwrap();
        assert_eq!(after.len(), 10);
        assert!(!after.contains(&before[0]));
        assert_eq!(&after[..9], &before[1..]);
        assert_eq!(after[9], "env_log_S_20261017_120140.csv");
        assert_eq!(manager.stats().stats().files_deleted, 1);
    }

    #[test]
    fn test_retention_prunes_overfull_directory() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..13 {
            let name = format!("env_log_X_20260101_0000{i:02}.csv");
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        let manager = manager(dir.path(), 10);
        manager.create("Y", at(0)).unwrap();
        assert_eq!(manager.list().unwrap().len(), 10);
    }

    #[test]
    fn test_unrelated_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.csv"), "").unwrap();
        std::fs::write(dir.path().join("env_log_A.txt"), "").unwrap();
        let manager = manager(dir.path(), 1);

        manager.create("S", at(0)).unwrap();
        manager.create("S", at(1)).unwrap();

        assert_eq!(manager.file_names().unwrap(), vec!["env_log_S_20261017_120001.csv"]);
        assert!(dir.path().join("notes.csv").exists());
        assert!(dir.path().join("env_log_A.txt").exists());
    }

    #[test]
    fn test_unusable_directory_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();

        let err = manager(&blocker.join("logs"), 10)
            .create("S", at(0))
            .unwrap_err();
        assert!(err.is_configuration(), "{err}");
    }
}
