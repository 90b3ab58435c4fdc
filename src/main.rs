use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};

use proxywatch_logs::{LogMonitor, MonitorEvent, MonitoringState};
use proxywatch_tui::{
    Action, AppState, Event, EventHandler, HelpOverlay, KeyBindings, KeyContext, LogViewerScreen,
    Settings, Tui,
};
use proxywatch_types::LogEntry;

/// Proxywatch - live, classified view of a local proxy server's log file
#[derive(Parser, Debug)]
#[command(name = "proxywatch")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log file to tail (defaults to the last one monitored)
    #[arg(value_name = "LOG_FILE")]
    path: Option<PathBuf>,

    /// Poll interval in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Maximum number of entries kept in memory
    #[arg(long)]
    max_entries: Option<usize>,

    /// Settings file
    #[arg(long, default_value = "proxywatch.toml")]
    settings: PathBuf,

    /// Print entries to stdout instead of opening the console
    #[arg(long)]
    headless: bool,

    /// Write diagnostics to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(args.log_file.as_deref())?;

    let result = run_app(args).await;

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into());

    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    Ok(())
}

async fn run_app(args: Args) -> Result<()> {
    let loaded = Settings::load(&args.settings)
        .with_context(|| format!("Failed to load settings from {}", args.settings.display()))?;
    let mut settings = loaded.clone();

    // Command line wins over the settings file
    if let Some(interval_ms) = args.interval_ms {
        settings.poll_interval_ms = interval_ms;
    }
    if let Some(max_entries) = args.max_entries {
        settings.max_entries = max_entries;
    }
    if args.path.is_some() {
        settings.last_log_path = args.path.clone();
    }
    settings.validate()?;

    let monitor = LogMonitor::new(settings.max_entries)?;

    let result = if args.headless {
        run_headless(&monitor, &settings).await
    } else {
        run_console(&monitor, &mut settings).await
    };

    monitor.stop_monitoring().await;

    match settings.save_if_changed(&loaded, &args.settings) {
        Ok(true) => info!(path = %args.settings.display(), "Settings saved"),
        Ok(false) => {}
        Err(e) => warn!(error = %e, "Failed to save settings"),
    }

    result
}

/// Print each new entry until Ctrl+C or a monitoring error
async fn run_headless(monitor: &LogMonitor, settings: &Settings) -> Result<()> {
    let path = settings
        .last_log_path
        .clone()
        .context("A log file path is required in headless mode")?;

    let mut monitor_rx = monitor.subscribe();
    monitor
        .start_monitoring(&path, settings.poll_interval())
        .await?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Interrupted");
                return Ok(());
            }

            Some(event) = monitor_rx.recv() => match event {
                MonitorEvent::EntryAdded(entry) => println!("{}", format_entry(&entry)),
                MonitorEvent::StatusChanged { state: MonitoringState::Error, message } => {
                    anyhow::bail!(
                        "Monitoring {} failed: {}",
                        path.display(),
                        message.unwrap_or_else(|| "unknown error".to_string())
                    );
                }
                MonitorEvent::StatusChanged { state, .. } => {
                    info!(%state, "Monitor state changed");
                }
            },
        }
    }
}

async fn run_console(monitor: &LogMonitor, settings: &mut Settings) -> Result<()> {
    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();
    let mut monitor_rx = monitor.subscribe();

    let mut state = AppState::new(
        settings.last_log_path.clone(),
        settings.poll_interval(),
        settings.auto_scroll,
    );

    let mut tui = Tui::new()?;
    let mut events = EventHandler::new(Duration::from_millis(250));
    let keybindings = KeyBindings::new();

    if let Some(path) = state.log_path.clone() {
        monitor.start_monitoring(&path, state.poll_interval).await?;
    }
    state.status = monitor.status();

    render(&mut tui, &mut state, monitor)?;

    loop {
        tokio::select! {
            Some(event) = events.next() => {
                match event {
                    Event::Key(key) => {
                        let action = if state.ui_state.filter_active {
                            keybindings.get_filter_input_action(&key)
                        } else {
                            keybindings.get_action(KeyContext::LogViewer, &key)
                        };
                        if let Some(action) = action {
                            let _ = action_tx.send(action);
                        }
                    }
                    Event::Tick | Event::Resize(_, _) => {}
                    Event::Error(e) => state.show_error(e),
                }
            }

            Some(event) = monitor_rx.recv() => {
                apply_monitor_event(&mut state, monitor, event);
                // Coalesce a burst of entries into one redraw
                while let Ok(event) = monitor_rx.try_recv() {
                    apply_monitor_event(&mut state, monitor, event);
                }
            }

            Some(action) = action_rx.recv() => {
                handle_action(&mut state, monitor, action).await;
            }

            else => break,
        }

        if state.should_quit {
            break;
        }

        render(&mut tui, &mut state, monitor)?;
    }

    events.shutdown().await;
    tui.restore()?;

    settings.auto_scroll = state.ui_state.auto_scroll;

    Ok(())
}

fn apply_monitor_event(state: &mut AppState, monitor: &LogMonitor, event: MonitorEvent) {
    match event {
        MonitorEvent::EntryAdded(_) => state.invalidate_view(),
        MonitorEvent::StatusChanged { .. } => {
            state.status = monitor.status();
            state.invalidate_view();
        }
    }
}

async fn handle_action(state: &mut AppState, monitor: &LogMonitor, action: Action) {
    match action {
        Action::ToggleMonitoring => {
            if monitor.state() == MonitoringState::Running {
                monitor.stop_monitoring().await;
            } else if let Some(path) = state.log_path.clone() {
                if let Err(e) = monitor.start_monitoring(&path, state.poll_interval).await {
                    state.show_error(e.to_string());
                }
            } else {
                state.show_error("No log file given; pass one on the command line");
            }
        }
        Action::ClearEntries => {
            monitor.clear_entries();
            state.invalidate_view();
            state.show_notice("Entries cleared");
        }
        Action::ExportEntries => {
            let filename = format!("proxywatch-export-{}.log", Local::now().format("%Y%m%d-%H%M%S"));
            match export_entries(Path::new(&filename), &state.visible) {
                Ok(count) => state.show_notice(format!("Exported {} entries to {}", count, filename)),
                Err(e) => state.show_error(format!("Export failed: {:#}", e)),
            }
        }
        other => state.update(other),
    }
}

fn render(tui: &mut Tui, state: &mut AppState, monitor: &LogMonitor) -> Result<()> {
    state.refresh_view(monitor);

    tui.terminal().draw(|frame| {
        LogViewerScreen::render(frame, state);

        if state.ui_state.help_visible {
            HelpOverlay::render(frame);
        }
    })?;

    Ok(())
}

fn format_entry(entry: &LogEntry) -> String {
    format!(
        "{} [{}] {}",
        entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
        entry.severity.as_str(),
        entry.message
    )
}

/// Write `entries` to `path`, one formatted line each
fn export_entries<E: AsRef<LogEntry>>(path: &Path, entries: &[E]) -> Result<usize> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    for entry in entries {
        writeln!(writer, "{}", format_entry(entry.as_ref()))?;
    }
    writer.flush()?;

    Ok(entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proxywatch_types::Severity;
    use std::sync::Arc;

    fn entry(severity: Severity, message: &str) -> Arc<LogEntry> {
        let timestamp = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        Arc::new(LogEntry {
            timestamp,
            severity,
            message: message.to_string(),
            ..LogEntry::default()
        })
    }

    #[test]
    fn test_format_entry() {
        let line = format_entry(&entry(Severity::Error, "ERROR connection refused"));
        assert_eq!(line, "2024-01-01 10:00:00 [ERR] ERROR connection refused");
    }

    #[test]
    fn test_export_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.log");
        let entries = vec![entry(Severity::Info, "one"), entry(Severity::Warning, "two")];

        assert_eq!(export_entries(&path, &entries).unwrap(), 2);
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "2024-01-01 10:00:00 [INF] one\n2024-01-01 10:00:00 [WRN] two\n"
        );
    }

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from([
            "proxywatch",
            "/var/log/proxy.log",
            "--interval-ms",
            "250",
            "--headless",
        ]);
        assert_eq!(args.path, Some(PathBuf::from("/var/log/proxy.log")));
        assert_eq!(args.interval_ms, Some(250));
        assert!(args.headless);
        assert_eq!(args.settings, PathBuf::from("proxywatch.toml"));
    }
}
