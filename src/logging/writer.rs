//! Row appends and rollover for one logging session.

use crate::logging::files::{LogFile, LogFileError, LogFileManager};
use crate::logging::format::LogRow;
use crate::sensors::Snapshot;
use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};

/// What an append did besides writing the row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended,
    /// The row filled the file; it was closed and a fresh one opened.
    Rotated { closed: PathBuf, opened: PathBuf },
}

/// Writes one session's rows, rolling over after a fixed row count.
#[derive(Debug)]
pub struct SessionWriter {
    manager: LogFileManager,
    session_id: String,
    rows_per_file: u64,
    file: Option<LogFile>,
    last_path: PathBuf,
    total_rows: u64,
}

impl SessionWriter {
    /// Create the session's first file.
    pub fn open(
        manager: LogFileManager,
        session_id: impl Into<String>,
        rows_per_file: u64,
        at: DateTime<Utc>,
    ) -> Result<Self, LogFileError> {
        let session_id = session_id.into();
        let file = manager.create(&session_id, at)?;
        Ok(Self {
            last_path: file.path().to_path_buf(),
            file: Some(file),
            manager,
            session_id,
            rows_per_file: rows_per_file.max(1),
            total_rows: 0,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Path of the open file, or of the last one if a rotation failed.
    pub fn current_path(&self) -> &Path {
        &self.last_path
    }

    /// Rows in the current file; zero right after a rotation.
    pub fn rows_in_file(&self) -> u64 {
        self.file.as_ref().map_or(0, LogFile::rows_written)
    }

    /// Rows written across every file of this session.
    pub fn total_rows(&self) -> u64 {
        self.total_rows
    }

    /// Classify and append one snapshot, rotating when the file is full.
    pub fn append(
        &mut self,
        snapshot: &Snapshot,
        at: DateTime<Utc>,
    ) -> Result<AppendOutcome, LogFileError> {
        let row = LogRow::from_snapshot(
            self.manager.zone().row_timestamp(at),
            &self.session_id,
            snapshot,
        );

        let file = self.file.as_mut().ok_or_else(|| LogFileError::Write {
            path: self.last_path.clone(),
            source: io::Error::other("log file closed after a failed rotation"),
        })?;
        file.append_line(&row.to_csv_line())?;
        self.total_rows += 1;
        self.manager.stats().record_row();

        if file.rows_written() < self.rows_per_file {
            return Ok(AppendOutcome::Appended);
        }
        self.rotate(at)
    }

    fn rotate(&mut self, at: DateTime<Utc>) -> Result<AppendOutcome, LogFileError> {
        let closed = match self.file.take() {
            Some(file) => file.close()?,
            None => self.last_path.clone(),
        };
        tracing::info!(
            session_id = %self.session_id,
            path = %closed.display(),
            rows = self.rows_per_file,
            "log file full, rolling over"
        );

        let next = self.manager.create(&self.session_id, at)?;
        let opened = next.path().to_path_buf();
        self.last_path = opened.clone();
        self.file = Some(next);
        self.manager.stats().record_rotation();
        Ok(AppendOutcome::Rotated { closed, opened })
    }

    /// Close the current file and return its path.
    pub fn finish(mut self) -> Result<PathBuf, LogFileError> {
        match self.file.take() {
            Some(file) => file.close(),
            None => Ok(self.last_path),
        }
    }
}
