//! Session lifecycle and the background logging task.
//!
//! At most one session runs at a time. Starting a session while another is
//! running cancels the old task and joins it before the new file is
//! created, so two tasks never write at once. Lifecycle transitions are
//! serialized by an async lock; the published [`SessionStatus`] sits behind
//! a separate short-held lock so status readers never wait on a join.

use crate::logging::files::{LogFileError, LogFileManager};
use crate::logging::stats::SharedLoggerStats;
use crate::logging::writer::{AppendOutcome, SessionWriter};
use crate::sensors::SensorBank;
use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Session id used when a start request carries none.
pub const UNKNOWN_SESSION_ID: &str = "UNKNOWN";

/// Timing and rollover settings for logging sessions.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Time between rows
    pub sample_interval: Duration,
    /// Rows per file before rolling over
    pub rows_per_file: u64,
    /// How long a superseding start waits before warning about a slow exit
    pub supersede_grace: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_secs(1),
            rows_per_file: 3600,
            supersede_grace: Duration::from_millis(1200),
        }
    }
}

/// Lifecycle state of the logger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    #[default]
    Idle,
    Starting,
    Running,
    Stopping,
}

/// Published view of the logger, readable at any time.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionStatus {
    pub state: SessionState,
    /// Current session, or the most recent one when idle
    pub session_id: Option<String>,
    /// File being written while running
    pub current_file: Option<PathBuf>,
    /// Rows in the current file
    pub rows_in_file: u64,
    /// Last file closed by a stop, supersession or failure
    pub last_file: Option<PathBuf>,
    /// Why the most recent session ended abnormally
    pub last_error: Option<String>,
}

impl SessionStatus {
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Running
    }
}

/// Errors that prevent a session from starting.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("log directory unavailable: {0}")]
    Configuration(#[source] LogFileError),
    #[error("cannot open session log: {0}")]
    Io(#[source] LogFileError),
}

impl From<LogFileError> for SessionError {
    fn from(e: LogFileError) -> Self {
        if e.is_configuration() {
            SessionError::Configuration(e)
        } else {
            SessionError::Io(e)
        }
    }
}

/// Result of a successful start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStarted {
    pub session_id: String,
    pub file: PathBuf,
}

/// Result of a stop request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StopOutcome {
    Stopped {
        session_id: String,
        last_file: PathBuf,
        rows_written: u64,
    },
    /// Nothing was running; carries the state observed instead.
    NotRunning { state: SessionState },
}

/// What the background task reports when it exits.
#[derive(Debug)]
struct SessionSummary {
    session_id: String,
    last_file: PathBuf,
    rows_written: u64,
    failed: bool,
}

struct ActiveSession {
    session_id: String,
    cancel: CancellationToken,
    handle: JoinHandle<SessionSummary>,
}

/// Owns the background logging task and its start/stop lifecycle.
pub struct LogSession {
    bank: Arc<SensorBank>,
    manager: LogFileManager,
    config: SessionConfig,
    active: Mutex<Option<ActiveSession>>,
    status: Arc<RwLock<SessionStatus>>,
}

impl LogSession {
    pub fn new(bank: Arc<SensorBank>, manager: LogFileManager, config: SessionConfig) -> Self {
        Self {
            bank,
            manager,
            config,
            active: Mutex::new(None),
            status: Arc::new(RwLock::new(SessionStatus::default())),
        }
    }

    pub fn manager(&self) -> &LogFileManager {
        &self.manager
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Snapshot of the published status.
    pub fn status(&self) -> SessionStatus {
        self.status.read().clone()
    }

    pub fn is_active(&self) -> bool {
        self.status.read().is_active()
    }

    /// Start logging under `session_id`, superseding any running session.
    ///
    /// A blank id is replaced with [`UNKNOWN_SESSION_ID`]. On failure the
    /// logger is left idle with the error recorded in the status.
    pub async fn start(&self, session_id: &str) -> Result<SessionStarted, SessionError> {
        let session_id = match session_id.trim() {
            "" => UNKNOWN_SESSION_ID.to_string(),
            id => id.to_string(),
        };

        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            tracing::info!(
                previous = %previous.session_id,
                next = %session_id,
                "superseding running session"
            );
            self.status.write().state = SessionState::Stopping;
            self.join(previous).await;
        }

        {
            let mut status = self.status.write();
            status.state = SessionState::Starting;
            status.session_id = Some(session_id.clone());
            status.current_file = None;
            status.rows_in_file = 0;
        }

        let writer = match SessionWriter::open(
            self.manager.clone(),
            session_id.clone(),
            self.config.rows_per_file,
            Utc::now(),
        ) {
            Ok(writer) => writer,
            Err(e) => {
                tracing::error!(session_id = %session_id, error = %e, "failed to start session");
                self.manager.stats().record_session_failed();
                let mut status = self.status.write();
                status.state = SessionState::Idle;
                status.last_error = Some(e.to_string());
                return Err(e.into());
            }
        };

        let file = writer.current_path().to_path_buf();
        {
            let mut status = self.status.write();
            status.state = SessionState::Running;
            status.current_file = Some(file.clone());
            status.last_error = None;
        }
        self.manager.stats().record_session_started();
        tracing::info!(session_id = %session_id, path = %file.display(), "session started");

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_session(
            writer,
            Arc::clone(&self.bank),
            cancel.clone(),
            self.config.sample_interval,
            Arc::clone(&self.status),
            Arc::clone(self.manager.stats()),
        ));
        *active = Some(ActiveSession {
            session_id: session_id.clone(),
            cancel,
            handle,
        });

        Ok(SessionStarted { session_id, file })
    }

    /// Stop the running session and wait for its task to exit.
    ///
    /// Not running is reported, not treated as an error. A session whose
    /// task already ended on an I/O failure also reports not running.
    pub async fn stop(&self) -> StopOutcome {
        let mut active = self.active.lock().await;
        let Some(current) = active.take() else {
            return StopOutcome::NotRunning {
                state: self.status.read().state,
            };
        };

        let was_running = self.is_active();
        if was_running {
            self.status.write().state = SessionState::Stopping;
        }
        let summary = self.join(current).await;
        self.status.write().state = SessionState::Idle;

        match summary {
            Some(summary) if was_running && !summary.failed => {
                tracing::info!(
                    session_id = %summary.session_id,
                    path = %summary.last_file.display(),
                    rows = summary.rows_written,
                    "session stopped"
                );
                StopOutcome::Stopped {
                    session_id: summary.session_id,
                    last_file: summary.last_file,
                    rows_written: summary.rows_written,
                }
            }
            _ => StopOutcome::NotRunning {
                state: SessionState::Idle,
            },
        }
    }

    /// Cancel a task and wait for it, warning if it outlives the grace period.
    async fn join(&self, session: ActiveSession) -> Option<SessionSummary> {
        session.cancel.cancel();
        let mut handle = session.handle;
        let joined = match tokio::time::timeout(self.config.supersede_grace, &mut handle).await {
            Ok(joined) => joined,
            Err(_) => {
                tracing::warn!(
                    session_id = %session.session_id,
                    grace_ms = self.config.supersede_grace.as_millis() as u64,
                    "session task still running after grace period, waiting"
                );
                handle.await
            }
        };
        match joined {
            Ok(summary) => Some(summary),
            Err(e) => {
                tracing::error!(session_id = %session.session_id, error = %e, "session task aborted");
                let mut status = self.status.write();
                status.state = SessionState::Idle;
                status.last_error = Some(format!("session task aborted: {e}"));
                None
            }
        }
    }
}

impl Drop for LogSession {
    fn drop(&mut self) {
        if let Some(session) = self.active.get_mut() {
            session.cancel.cancel();
        }
    }
}

/// Body of the background task: sleep, sample, append, repeat.
///
/// Cancellation is observed only while sleeping, so a row is never cut off
/// mid-write.
async fn run_session(
    mut writer: SessionWriter,
    bank: Arc<SensorBank>,
    cancel: CancellationToken,
    interval: Duration,
    status: Arc<RwLock<SessionStatus>>,
    stats: SharedLoggerStats,
) -> SessionSummary {
    let session_id = writer.session_id().to_string();

    let failure = loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break None,
            _ = tokio::time::sleep(interval) => {}
        }

        let snapshot = bank.read_all();
        match writer.append(&snapshot, Utc::now()) {
            Ok(AppendOutcome::Appended) => {}
            Ok(AppendOutcome::Rotated { opened, .. }) => {
                status.write().current_file = Some(opened);
            }
            Err(e) => break Some(e),
        }
        status.write().rows_in_file = writer.rows_in_file();
    };

    let rows_written = writer.total_rows();
    let (last_file, failure) = match (failure, writer.current_path().to_path_buf()) {
        (None, path) => match writer.finish() {
            Ok(path) => (path, None),
            Err(e) => (path, Some(e)),
        },
        (Some(e), path) => {
            let _ = writer.finish();
            (path, Some(e))
        }
    };

    let failed = failure.is_some();
    {
        let mut status = status.write();
        status.current_file = None;
        status.rows_in_file = 0;
        status.last_file = Some(last_file.clone());
        if let Some(e) = &failure {
            status.state = SessionState::Idle;
            status.last_error = Some(e.to_string());
        }
    }
    if let Some(e) = failure {
        stats.record_session_failed();
        tracing::error!(
            session_id = %session_id,
            error = %e,
            rows = rows_written,
            "session ended on log failure"
        );
    } else {
        tracing::debug!(session_id = %session_id, rows = rows_written, "session task exited");
    }

    SessionSummary {
        session_id,
        last_file,
        rows_written,
        failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::format::Zone;
    use std::path::Path;

    fn fast_config(rows_per_file: u64) -> SessionConfig {
        SessionConfig {
            sample_interval: Duration::from_millis(10),
            rows_per_file,
            supersede_grace: Duration::from_millis(1200),
        }
    }

    fn session(dir: &Path, rows_per_file: u64) -> LogSession {
        let manager = LogFileManager::new(dir, 10, Zone::Named(chrono_tz::UTC));
        LogSession::new(
            Arc::new(SensorBank::with_seed(11)),
            manager,
            fast_config(rows_per_file),
        )
    }

    fn line_count(path: &Path) -> usize {
        std::fs::read_to_string(path).unwrap().lines().count()
    }

    #[tokio::test]
    async fn test_start_then_stop() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(dir.path(), 3600);

        let started = session.start("P-1").await.unwrap();
        assert!(session.is_active());
        assert_eq!(session.status().current_file.as_ref(), Some(&started.file));

        tokio::time::sleep(Duration::from_millis(120)).await;
        let outcome = session.stop().await;
        let StopOutcome::Stopped {
            session_id,
            last_file,
            rows_written,
        } = outcome
        else {
            panic!("expected stopped, got {outcome:?}");
        };
        assert_eq!(session_id, "P-1");
        assert_eq!(last_file, started.file);
        assert!(rows_written > 0);
        assert_eq!(line_count(&last_file), rows_written as usize + 1);

        // No rows after the stop returned.
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(line_count(&last_file), rows_written as usize + 1);

        let status = session.status();
        assert_eq!(status.state, SessionState::Idle);
        assert_eq!(status.last_file, Some(last_file));
        assert_eq!(status.current_file, None);
    }

    #[tokio::test]
    async fn test_stop_when_idle_reports_state() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(dir.path(), 3600);
        assert_eq!(
            session.stop().await,
            StopOutcome::NotRunning {
                state: SessionState::Idle
            }
        );
    }

    #[tokio::test]
    async fn test_supersession_leaves_single_writer() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(dir.path(), 3600);

        let a = session.start("A").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let b = session.start("B").await.unwrap();

        let a_lines = line_count(&a.file);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(line_count(&a.file), a_lines, "A's file grew after supersession");
        assert!(line_count(&b.file) > 1);

        let status = session.status();
        assert!(status.is_active());
        assert_eq!(status.session_id.as_deref(), Some("B"));
        let current = status.current_file.unwrap();
        let name = current.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("env_log_B_"), "{name}");
        assert_eq!(status.last_file, Some(a.file));

        session.stop().await;
    }

    #[tokio::test]
    async fn test_rotation_during_session() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(dir.path(), 3);

        session.start("R").await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(session.status().rows_in_file < 3);
        let outcome = session.stop().await;
        let StopOutcome::Stopped { rows_written, .. } = outcome else {
            panic!("expected stopped, got {outcome:?}");
        };

        let files = session.manager().list().unwrap();
        assert!(files.len() >= 2, "expected rollover, got {files:?}");
        let data_rows: usize = files.iter().map(|f| line_count(f) - 1).sum();
        assert_eq!(data_rows as u64, rows_written);
        assert!(files.iter().all(|f| line_count(f) - 1 <= 3));
    }

    #[tokio::test]
    async fn test_blank_id_becomes_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(dir.path(), 3600);
        let started = session.start("   ").await.unwrap();
        assert_eq!(started.session_id, UNKNOWN_SESSION_ID);
        session.stop().await;
    }

    #[tokio::test]
    async fn test_start_failure_leaves_idle() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let session = session(&blocker.join("logs"), 3600);

        let err = session.start("P").await.unwrap_err();
        assert!(matches!(err, SessionError::Configuration(_)), "{err}");

        let status = session.status();
        assert_eq!(status.state, SessionState::Idle);
        assert!(status.last_error.is_some());
        assert!(matches!(session.stop().await, StopOutcome::NotRunning { .. }));
    }

    #[tokio::test]
    async fn test_failed_rotation_ends_session() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("logs");
        let session = session(&logs, 1);

        session.start("F").await.unwrap();
        std::fs::remove_dir_all(&logs).unwrap();
        std::fs::write(&logs, "").unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let status = session.status();
        assert_eq!(status.state, SessionState::Idle);
        assert!(status.last_error.is_some());
        assert!(!session.is_active());
        assert_eq!(
            session.stop().await,
            StopOutcome::NotRunning {
                state: SessionState::Idle
            }
        );
        assert_eq!(session.manager().stats().stats().sessions_failed, 1);
    }
}
