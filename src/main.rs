//! Incubator Monitor CLI
//!
//! Simulated lab incubator sensors with session-scoped CSV logging.

use anyhow::Context;
use clap::{Parser, Subcommand};
use incubator_monitor::{
    config::Config,
    logging::StopOutcome,
    monitor::{Monitor, SharedMonitor},
    VERSION,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "incubator-monitor")]
#[command(version = VERSION)]
#[command(about = "Simulated incubator environment monitor and logger", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log directory, overriding the configuration file
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve readings and session control over HTTP
    #[cfg(feature = "server")]
    Serve {
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,

        /// Address to bind to
        #[arg(long, default_value = "127.0.0.1")]
        bind: std::net::IpAddr,
    },

    /// Log a session in the foreground until Ctrl+C or the duration elapses
    Record {
        /// Session identifier embedded in file names and rows
        #[arg(long)]
        session_id: String,

        /// Stop after this many seconds
        #[arg(long)]
        duration_secs: Option<u64>,
    },

    /// Print one report of all channels
    Poll,

    /// List retained log files, oldest first
    Logs,

    /// Show configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.log_dir)?;

    match cli.command {
        #[cfg(feature = "server")]
        Commands::Serve { port, bind } => cmd_serve(config, port, bind).await,
        Commands::Record {
            session_id,
            duration_secs,
        } => cmd_record(config, &session_id, duration_secs).await,
        Commands::Poll => cmd_poll(config),
        Commands::Logs => cmd_logs(config),
        Commands::Config { save } => cmd_config(&config, cli.config.as_deref(), save),
    }
}

fn load_config(path: Option<&std::path::Path>, log_dir: Option<PathBuf>) -> anyhow::Result<Config> {
    let mut config = match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("loading configuration")?;
    if let Some(dir) = log_dir {
        config.log_dir = dir;
    }
    Ok(config)
}

fn build_monitor(config: &Config) -> anyhow::Result<SharedMonitor> {
    let monitor = Monitor::from_config(config).context("invalid configuration")?;
    Ok(Arc::new(monitor))
}

#[cfg(feature = "server")]
async fn cmd_serve(mut config: Config, port: Option<u16>, bind: std::net::IpAddr) -> anyhow::Result<()> {
    use incubator_monitor::server::{run, ServerConfig};

    if let Some(port) = port {
        config.port = port;
    }
    let monitor = build_monitor(&config)?;

    println!("Incubator Monitor v{VERSION}");
    println!("  Logs: {}/", config.log_dir.display());
    println!("  Start: POST /api/logger/start | Stop: POST /api/logger/stop");
    println!();

    let server_config = ServerConfig::new(config.port).with_bind(bind);
    let (addr, shutdown_tx) = run(server_config, monitor.clone()).await?;
    println!("Listening on http://{addr} (Ctrl+C to stop)");

    tokio::signal::ctrl_c().await.context("waiting for Ctrl+C")?;
    println!();
    println!("Shutting down...");
    let _ = shutdown_tx.send(());

    // The server task stops any running session after draining.
    while monitor.session().is_active() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    println!("{}", monitor.session().manager().stats().summary());
    Ok(())
}

async fn cmd_record(config: Config, session_id: &str, duration_secs: Option<u64>) -> anyhow::Result<()> {
    let monitor = build_monitor(&config)?;
    let started = monitor
        .start_session(session_id)
        .await
        .context("starting session")?;

    println!("Recording session {}", started.session_id);
    println!("  File: {}", started.file.display());
    println!("  Interval: {}ms", config.sample_interval.as_millis());
    println!("  Rotation: every {} rows, keeping {} files", config.rows_per_file, config.max_files);
    println!();
    println!("Press Ctrl+C to stop");

    match duration_secs {
        Some(secs) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
            }
        }
        None => tokio::signal::ctrl_c().await.context("waiting for Ctrl+C")?,
    }

    println!();
    match monitor.stop_session().await {
        StopOutcome::Stopped {
            last_file,
            rows_written,
            ..
        } => println!("Stopped after {rows_written} rows; last file {}", last_file.display()),
        StopOutcome::NotRunning { .. } => {
            let status = monitor.session().status();
            eprintln!(
                "Session ended early: {}",
                status.last_error.as_deref().unwrap_or("unknown error")
            );
        }
    }
    println!();
    println!("{}", monitor.session().manager().stats().summary());
    Ok(())
}

fn cmd_poll(config: Config) -> anyhow::Result<()> {
    let monitor = build_monitor(&config)?;
    let report = monitor.poll_report();
    for reading in &report.channels {
        println!(
            "{:<12} {:>9.3} {:<5} (target {:.3})  {}",
            reading.channel.name(),
            reading.value,
            reading.unit,
            reading.target,
            reading.alarm
        );
    }
    Ok(())
}

fn cmd_logs(config: Config) -> anyhow::Result<()> {
    let monitor = build_monitor(&config)?;
    let listing = monitor.list_log_files().context("listing log files")?;

    println!("Log directory: {}", config.log_dir.display());
    println!("Files: {}/{}", listing.count, listing.capacity);
    for name in &listing.files {
        println!("  {name}");
    }
    if listing.files.is_empty() {
        println!("No log files yet. Run 'incubator-monitor record --session-id <id>' to start one.");
    }
    Ok(())
}

fn cmd_config(config: &Config, path: Option<&std::path::Path>, save: bool) -> anyhow::Result<()> {
    let path = path.map(PathBuf::from).unwrap_or_else(Config::config_path);

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {}", path.display());
    println!();
    println!("{}", serde_json::to_string_pretty(config)?);

    if save {
        config.save_to(&path).context("saving configuration")?;
        println!();
        println!("Saved to {}", path.display());
    }
    Ok(())
}
