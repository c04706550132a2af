//! End-to-end logging sessions through the monitor

use incubator_monitor::logging::{LogRow, SessionState, StopOutcome};
use incubator_monitor::{Config, Monitor};
use std::path::Path;
use std::time::Duration;

fn config(log_dir: &Path, rows_per_file: u64, max_files: usize) -> Config {
    Config {
        log_dir: log_dir.to_path_buf(),
        sample_interval: Duration::from_millis(10),
        rows_per_file,
        max_files,
        seed: Some(23),
        timezone: Some("UTC".to_string()),
        ..Config::default()
    }
}

fn read_rows(path: &Path) -> Vec<LogRow> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .skip(1)
        .map(|line| LogRow::parse(line).unwrap())
        .collect()
}

#[tokio::test]
async fn test_logged_rows_parse_and_carry_session_id() {
    let dir = tempfile::tempdir().unwrap();
    let monitor = Monitor::from_config(&config(dir.path(), 3600, 10)).unwrap();

    let started = monitor.start_session("ICU/7: bay 2").await.unwrap();
    let name = started.file.file_name().unwrap().to_str().unwrap().to_string();
    assert!(name.starts_with("env_log_ICU-7--bay-2_"), "{name}");
    assert!(name.ends_with(".csv"));

    tokio::time::sleep(Duration::from_millis(100)).await;
    monitor.stop_session().await;

    let rows = read_rows(&started.file);
    assert!(!rows.is_empty());
    for row in &rows {
        assert_eq!(row.session_id, "ICU/7: bay 2");
        // DD/MM/YYYY HH:MM:SS.mmm
        assert_eq!(row.timestamp.len(), 23);
        assert_eq!(&row.timestamp[2..3], "/");
        assert_eq!(&row.timestamp[19..20], ".");
    }
}

#[tokio::test]
async fn test_retention_holds_during_rapid_rotation() {
    let dir = tempfile::tempdir().unwrap();
    let monitor = Monitor::from_config(&config(dir.path(), 1, 3)).unwrap();

    monitor.start_session("R").await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    let listing = monitor.list_log_files().unwrap();
    assert!(listing.count <= 3, "{:?}", listing.files);
    monitor.stop_session().await;

    let listing = monitor.list_log_files().unwrap();
    assert_eq!(listing.count, 3);
    let mut sorted = listing.files.clone();
    sorted.sort();
    assert_eq!(sorted, listing.files);
    assert!(monitor.status().stats.files_deleted > 0);
}

#[tokio::test]
async fn test_supersession_then_stop() {
    let dir = tempfile::tempdir().unwrap();
    let monitor = Monitor::from_config(&config(dir.path(), 3600, 10)).unwrap();

    let a = monitor.start_session("A").await.unwrap();
    tokio::time::sleep(Duration::from_millis(40)).await;
    let b = monitor.start_session("B").await.unwrap();
    let a_rows = read_rows(&a.file).len();

    tokio::time::sleep(Duration::from_millis(80)).await;
    let outcome = monitor.stop_session().await;
    assert!(matches!(
        &outcome,
        StopOutcome::Stopped { session_id, last_file, .. }
            if session_id == "B" && last_file == &b.file
    ));

    assert_eq!(read_rows(&a.file).len(), a_rows);
    assert!(read_rows(&b.file).iter().all(|r| r.session_id == "B"));
    assert_eq!(monitor.session().status().state, SessionState::Idle);
    assert_eq!(monitor.list_log_files().unwrap().count, 2);
}

#[tokio::test]
async fn test_restart_after_stop() {
    let dir = tempfile::tempdir().unwrap();
    let monitor = Monitor::from_config(&config(dir.path(), 3600, 10)).unwrap();

    monitor.start_session("first").await.unwrap();
    monitor.stop_session().await;
    let second = monitor.start_session("second").await.unwrap();
    assert!(monitor.session().is_active());
    tokio::time::sleep(Duration::from_millis(50)).await;
    monitor.stop_session().await;

    assert!(!read_rows(&second.file).is_empty());
    assert!(matches!(
        monitor.stop_session().await,
        StopOutcome::NotRunning { .. }
    ));
}
