//! The monitor: sensor bank plus logging session, built once at startup.
//!
//! Every consumer (poll path, control path, transport) holds a handle to the
//! same [`Monitor`]; there is no process-wide state.

use crate::config::{Config, ConfigError};
use crate::logging::{
    LogFileError, LogFileManager, LogSession, LoggerStats, SessionError, SessionStarted,
    SessionState, StatsSnapshot, StopOutcome, Zone,
};
use crate::sensors::{AlarmLevel, Channel, SensorBank, Snapshot, TargetReport, CHANNEL_COUNT};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// One channel in a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelReading {
    pub channel: Channel,
    pub value: f64,
    pub unit: &'static str,
    pub target: f64,
    pub alarm: AlarmLevel,
}

impl ChannelReading {
    fn from_snapshot(channel: Channel, snapshot: &Snapshot) -> Self {
        let value = snapshot.value(channel);
        Self {
            channel,
            value,
            unit: channel.unit(),
            target: snapshot.target(channel),
            alarm: channel.thresholds().classify(value),
        }
    }
}

/// Per-channel readings from one bank pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub read_at: DateTime<Utc>,
    pub channels: Vec<ChannelReading>,
}

impl Report {
    fn from_snapshot(read_at: DateTime<Utc>, snapshot: &Snapshot) -> Self {
        Self {
            read_at,
            channels: Channel::ALL
                .iter()
                .map(|&c| ChannelReading::from_snapshot(c, snapshot))
                .collect(),
        }
    }

    pub fn get(&self, channel: Channel) -> Option<&ChannelReading> {
        self.channels.iter().find(|r| r.channel == channel)
    }

    /// The most severe level across all channels.
    pub fn worst_alarm(&self) -> AlarmLevel {
        self.channels
            .iter()
            .map(|r| r.alarm)
            .max_by_key(|a| match a {
                AlarmLevel::Ok => 0,
                AlarmLevel::Warning => 1,
                AlarmLevel::Critical => 2,
            })
            .unwrap_or(AlarmLevel::Ok)
    }
}

/// The retention set and logger state.
#[derive(Debug, Clone, Serialize)]
pub struct LogListing {
    /// File names, oldest first
    pub files: Vec<String>,
    pub count: usize,
    pub capacity: usize,
    pub active: bool,
    pub session_id: Option<String>,
    pub current_file: Option<PathBuf>,
    pub last_error: Option<String>,
}

/// Overall service status.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorStatus {
    pub sensors: usize,
    pub logging: bool,
    pub state: SessionState,
    pub instance_id: String,
    pub host: String,
    pub stats: StatsSnapshot,
}

/// Sensor bank and logging session behind one handle.
pub struct Monitor {
    bank: Arc<SensorBank>,
    session: LogSession,
    instance_id: String,
    host: String,
}

impl Monitor {
    pub fn new(bank: Arc<SensorBank>, session: LogSession) -> Self {
        Self {
            bank,
            session,
            instance_id: Uuid::new_v4().to_string(),
            host: hostname::get()
                .map(|h| h.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "unknown".to_string()),
        }
    }

    /// Build the bank and session described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let zone = Zone::from_name(config.timezone.as_deref()).map_err(ConfigError::Invalid)?;
        let bank = Arc::new(match config.seed {
            Some(seed) => SensorBank::with_seed(seed),
            None => SensorBank::new(),
        });
        let manager = LogFileManager::new(&config.log_dir, config.max_files, zone)
            .with_stats(Arc::new(LoggerStats::new()));
        let session = LogSession::new(Arc::clone(&bank), manager, config.session_config());
        Ok(Self::new(bank, session))
    }

    pub fn bank(&self) -> &Arc<SensorBank> {
        &self.bank
    }

    pub fn session(&self) -> &LogSession {
        &self.session
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub async fn start_session(&self, session_id: &str) -> Result<SessionStarted, SessionError> {
        self.session.start(session_id).await
    }

    pub async fn stop_session(&self) -> StopOutcome {
        self.session.stop().await
    }

    /// Advance the simulation and report every channel.
    pub fn poll_report(&self) -> Report {
        let snapshot = self.bank.read_all();
        Report::from_snapshot(Utc::now(), &snapshot)
    }

    /// Current value of one channel without advancing the simulation.
    pub fn peek_channel(&self, channel: Channel) -> ChannelReading {
        ChannelReading::from_snapshot(channel, &self.bank.peek_all())
    }

    pub fn set_targets(&self, updates: &[(Channel, f64)]) -> TargetReport {
        let report = self.bank.set_targets(updates);
        tracing::info!(
            applied = ?report.applied,
            skipped = report.skipped.len(),
            "targets updated"
        );
        report
    }

    pub fn list_log_files(&self) -> Result<LogListing, LogFileError> {
        let manager = self.session.manager();
        let files = manager.file_names()?;
        let status = self.session.status();
        Ok(LogListing {
            count: files.len(),
            files,
            capacity: manager.capacity(),
            active: status.is_active(),
            session_id: status.session_id,
            current_file: status.current_file,
            last_error: status.last_error,
        })
    }

    pub fn status(&self) -> MonitorStatus {
        let status = self.session.status();
        MonitorStatus {
            sensors: CHANNEL_COUNT,
            logging: status.is_active(),
            state: status.state,
            instance_id: self.instance_id.clone(),
            host: self.host.clone(),
            stats: self.session.manager().stats().stats(),
        }
    }
}

/// Thread-safe shared monitor.
pub type SharedMonitor = Arc<Monitor>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_config(dir: &std::path::Path) -> Config {
        Config {
            log_dir: dir.to_path_buf(),
            sample_interval: Duration::from_millis(10),
            seed: Some(3),
            timezone: Some("UTC".to_string()),
            ..Config::default()
        }
    }

    #[test]
    fn test_poll_report_covers_all_channels() {
        let dir = tempfile::tempdir().unwrap();
        let monitor = Monitor::from_config(&test_config(dir.path())).unwrap();
        let report = monitor.poll_report();

        assert_eq!(report.channels.len(), CHANNEL_COUNT);
        let temp = report.get(Channel::Temperature).unwrap();
        assert_eq!(temp.unit, "C");
        assert_eq!(temp.target, 37.0);
    }

    #[test]
    fn test_report_reflects_new_targets() {
        let dir = tempfile::tempdir().unwrap();
        let monitor = Monitor::from_config(&test_config(dir.path())).unwrap();
        let report = monitor.set_targets(&[(Channel::Co2, 6.0)]);
        assert_eq!(report.applied, vec![Channel::Co2]);
        assert_eq!(monitor.peek_channel(Channel::Co2).target, 6.0);
    }

    #[test]
    fn test_peek_channel_matches_poll() {
        let dir = tempfile::tempdir().unwrap();
        let monitor = Monitor::from_config(&test_config(dir.path())).unwrap();
        let report = monitor.poll_report();
        let peek = monitor.peek_channel(Channel::Ph);
        assert_eq!(Some(&peek), report.get(Channel::Ph));
    }

    #[test]
    fn test_worst_alarm() {
        let values = [37.0, 95.0, 5.0, 21.0, 1013.0, 7.7];
        let snapshot = Snapshot::new(values, values);
        let report = Report::from_snapshot(Utc::now(), &snapshot);
        assert_eq!(report.worst_alarm(), AlarmLevel::Warning);
    }

    #[test]
    fn test_invalid_timezone_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.timezone = Some("Nowhere/Special".to_string());
        assert!(Monitor::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_listing_tracks_session() {
        let dir = tempfile::tempdir().unwrap();
        let monitor = Monitor::from_config(&test_config(dir.path())).unwrap();

        let listing = monitor.list_log_files().unwrap();
        assert_eq!(listing.count, 0);
        assert_eq!(listing.capacity, 10);
        assert!(!listing.active);

        monitor.start_session("L-1").await.unwrap();
        let listing = monitor.list_log_files().unwrap();
        assert_eq!(listing.count, 1);
        assert!(listing.active);
        assert_eq!(listing.session_id.as_deref(), Some("L-1"));
        assert!(monitor.status().logging);

        monitor.stop_session().await;
        let listing = monitor.list_log_files().unwrap();
        assert!(!listing.active);
        assert_eq!(listing.session_id.as_deref(), Some("L-1"));
        assert_eq!(monitor.status().stats.sessions_started, 1);
    }
}
