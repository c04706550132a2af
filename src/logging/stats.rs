//! Process-lifetime logging counters.
//!
//! Counters are updated by the file manager and the session task and read
//! by status requests without taking any lock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for everything the logger has done since process start.
#[derive(Debug)]
pub struct LoggerStats {
    /// Rows appended across all sessions
    rows_written: AtomicU64,
    /// Log files created, including rotations
    files_created: AtomicU64,
    /// Log files deleted by retention
    files_deleted: AtomicU64,
    /// Row-threshold rollovers
    rotations: AtomicU64,
    /// Sessions started
    sessions_started: AtomicU64,
    /// Sessions that ended on an I/O failure
    sessions_failed: AtomicU64,
    /// Process start time
    started_at: DateTime<Utc>,
}

impl LoggerStats {
    pub fn new() -> Self {
        Self {
            rows_written: AtomicU64::new(0),
            files_created: AtomicU64::new(0),
            files_deleted: AtomicU64::new(0),
            rotations: AtomicU64::new(0),
            sessions_started: AtomicU64::new(0),
            sessions_failed: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    pub fn record_row(&self) {
        self.rows_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_file_created(&self) {
        self.files_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_file_deleted(&self) {
        self.files_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rotation(&self) {
        self.rotations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_failed(&self) {
        self.sessions_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current counter values.
    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            rows_written: self.rows_written.load(Ordering::Relaxed),
            files_created: self.files_created.load(Ordering::Relaxed),
            files_deleted: self.files_deleted.load(Ordering::Relaxed),
            rotations: self.rotations.load(Ordering::Relaxed),
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            sessions_failed: self.sessions_failed.load(Ordering::Relaxed),
            started_at: self.started_at,
            uptime_secs: (Utc::now() - self.started_at).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Logger Statistics:\n\
             - Rows written: {}\n\
             - Files created: {}\n\
             - Files deleted by retention: {}\n\
             - Rotations: {}\n\
             - Sessions started: {} ({} failed)\n\
             - Uptime: {} seconds",
            stats.rows_written,
            stats.files_created,
            stats.files_deleted,
            stats.rotations,
            stats.sessions_started,
            stats.sessions_failed,
            stats.uptime_secs
        )
    }
}

impl Default for LoggerStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`LoggerStats`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub rows_written: u64,
    pub files_created: u64,
    pub files_deleted: u64,
    pub rotations: u64,
    pub sessions_started: u64,
    pub sessions_failed: u64,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
}

/// Thread-safe shared counters.
pub type SharedLoggerStats = Arc<LoggerStats>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting() {
        let stats = LoggerStats::new();
        stats.record_row();
        stats.record_row();
        stats.record_file_created();
        stats.record_session_started();
        stats.record_session_failed();

        let snapshot = stats.stats();
        assert_eq!(snapshot.rows_written, 2);
        assert_eq!(snapshot.files_created, 1);
        assert_eq!(snapshot.files_deleted, 0);
        assert_eq!(snapshot.sessions_started, 1);
        assert_eq!(snapshot.sessions_failed, 1);
    }

    #[test]
    fn test_summary_format() {
        let summary = LoggerStats::new().summary();
        assert!(summary.contains("Rows written: 0"));
        assert!(summary.contains("Rotations"));
    }
}
