//! Session-scoped CSV logging.
//!
//! This module contains:
//! - Row and filename formatting
//! - Log file creation and count-capped retention
//! - Per-session row appends with rollover
//! - The session lifecycle and its background task
//! - Process-lifetime logging counters

pub mod files;
pub mod format;
pub mod session;
pub mod stats;
pub mod writer;

// Re-export commonly used types
pub use files::{LogFile, LogFileError, LogFileManager, LOG_FILE_EXTENSION, LOG_FILE_PREFIX};
pub use format::{header, sanitize_id, LogRow, RowParseError, Zone};
pub use session::{
    LogSession, SessionConfig, SessionError, SessionStarted, SessionState, SessionStatus,
    StopOutcome, UNKNOWN_SESSION_ID,
};
pub use stats::{LoggerStats, SharedLoggerStats, StatsSnapshot};
pub use writer::{AppendOutcome, SessionWriter};
