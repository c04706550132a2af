//! Incubator Monitor - simulated lab incubator sensors with session logging.
//!
//! Six stochastic sensors (temperature, humidity, CO2, O2, pressure, pH)
//! drift toward adjustable targets. While a monitoring session is active a
//! background task samples them once per interval and appends classified
//! rows to rotating, retention-capped CSV files.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Incubator Monitor                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │ SensorBank  │──▶│   Alarm     │──▶│   Report    │ poll  │
//! │  │ (6 sensors) │   │ classifier  │   │             │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │         │                                                   │
//! │         ▼                                                   │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │ LogSession  │──▶│  Session    │──▶│  LogFile    │ log   │
//! │  │ (task)      │   │  Writer     │   │  Manager    │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use incubator_monitor::{Config, Monitor};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let monitor = Monitor::from_config(&Config::default())?;
//! let started = monitor.start_session("P-001").await?;
//! println!("logging to {}", started.file.display());
//!
//! let report = monitor.poll_report();
//! println!("worst alarm: {}", report.worst_alarm());
//!
//! monitor.stop_session().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod logging;
pub mod monitor;
pub mod sensors;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use logging::{
    LogFileManager, LogSession, SessionConfig, SessionError, SessionState, StopOutcome,
};
pub use monitor::{LogListing, Monitor, MonitorStatus, Report, SharedMonitor};
pub use sensors::{classify, AlarmLevel, Channel, SensorBank, Snapshot, TargetReport};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
