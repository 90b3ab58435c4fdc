use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::buffer::LogBuffer;
use crate::classifier::LineClassifier;
use crate::error::{MonitorError, Result};
use crate::events::{EventBus, MonitorEvent};
use crate::filter::{EntryFilter, filter_entries};
use crate::stats::Statistics;
use crate::tailer::FileTailer;
use crate::types::{ArcLogEntry, LogEntry, MonitoringState};

/// Current state plus the context needed to display it
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Status {
    pub state: MonitoringState,

    /// Reason for the last transition into `Error`
    pub message: Option<String>,

    /// File of the current or most recent session request
    pub path: Option<PathBuf>,
}

/// State reachable from the poll task
#[derive(Clone)]
struct Shared {
    buffer: LogBuffer,
    status: Arc<Mutex<Status>>,
    events: EventBus,
}

impl Shared {
    fn transition(&self, state: MonitoringState, message: Option<String>) {
        {
            let mut status = self.status.lock();
            status.state = state;
            status.message = message.clone();
        }
        self.events.publish(MonitorEvent::StatusChanged { state, message });
    }

    fn append(&self, entry: LogEntry) {
        let entry = self.buffer.push(entry);
        self.events.publish(MonitorEvent::EntryAdded(entry));
    }

    fn state(&self) -> MonitoringState {
        self.status.lock().state
    }

    /// One tick: read what is new and append every non-blank line
    fn poll_once(&self, tailer: &mut FileTailer) -> Result<()> {
        let lines = tailer.poll()?;
        if !lines.is_empty() {
            debug!(lines = lines.len(), "Polled new lines");
        }
        for line in lines.iter().filter(|l| !l.trim().is_empty()) {
            self.append(LineClassifier::classify(line));
        }
        Ok(())
    }
}

/// A running poll task
struct Session {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Session {
    /// Cancel the task and wait for an in-flight tick to finish
    async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            if e.is_panic() {
                warn!("Poll task panicked: {}", e);
            }
        }
    }
}

/// Serialized by the session lock
#[derive(Default)]
struct SessionSlot {
    active: Option<Session>,

    /// Path of the last session that actually opened its file
    last_path: Option<PathBuf>,
}

/// Tails a log file on a timer, classifying new lines into a bounded buffer
pub struct LogMonitor {
    shared: Shared,

    /// Start/stop lock; held across the awaits that tear a session down
    session: AsyncMutex<SessionSlot>,
}

impl LogMonitor {
    /// Create a monitor whose buffer holds at most `max_entries`
    pub fn new(max_entries: usize) -> Result<Self> {
        Ok(Self {
            shared: Shared {
                buffer: LogBuffer::new(max_entries)?,
                status: Arc::new(Mutex::new(Status::default())),
                events: EventBus::default(),
            },
            session: AsyncMutex::new(SessionSlot::default()),
        })
    }

    /// Receive entry-added and status-changed notifications.
    ///
    /// The channel is unbounded: a subscriber must keep draining its
    /// receiver, or its queue grows with every appended entry. Dropping the
    /// receiver unsubscribes.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<MonitorEvent> {
        self.shared.events.subscribe()
    }

    /// Begin tailing `path` from its current end, polling every `interval`.
    ///
    /// A missing file is reported through the `Error` state, not as an
    /// `Err`; only a zero interval is rejected here.
    pub async fn start_monitoring(&self, path: impl AsRef<Path>, interval: Duration) -> Result<()> {
        if interval.is_zero() {
            return Err(MonitorError::InvalidArgument(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        let path = path.as_ref().to_path_buf();

        let mut slot = self.session.lock().await;
        if self.shared.state() == MonitoringState::Running {
            warn!(path = %path.display(), "Monitoring already running, ignoring start");
            return Ok(());
        }

        self.shared.status.lock().path = Some(path.clone());
        self.shared.transition(MonitoringState::Starting, None);

        // A session that ended in Error still owns a finished task
        if let Some(previous) = slot.active.take() {
            previous.shutdown().await;
        }

        let tailer = match FileTailer::open(&path) {
            Ok(tailer) => tailer,
            Err(e) => {
                warn!(path = %path.display(), "Cannot start monitoring: {}", e);
                self.shared.transition(MonitoringState::Error, Some(e.to_string()));
                return Ok(());
            }
        };

        if slot.last_path.as_ref().is_some_and(|last| *last != path) {
            self.shared.buffer.clear();
        }
        slot.last_path = Some(path.clone());

        self.shared.append(LogEntry::system(
            format!("Monitoring started: {}", path.display()),
            Local::now().naive_local(),
        ));
        self.shared.transition(MonitoringState::Running, None);

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_poll_loop(
            self.shared.clone(),
            tailer,
            interval,
            cancel.clone(),
        ));
        slot.active = Some(Session { cancel, task });

        info!(path = %path.display(), interval_ms = interval.as_millis() as u64, "Monitoring started");
        Ok(())
    }

    /// Stop the running session. Does nothing unless the state is `Running`.
    pub async fn stop_monitoring(&self) {
        let mut slot = self.session.lock().await;
        if self.shared.state() != MonitoringState::Running {
            return;
        }
        let Some(session) = slot.active.take() else {
            return;
        };

        session.shutdown().await;

        self.shared.append(LogEntry::system(
            "Monitoring stopped",
            Local::now().naive_local(),
        ));
        self.shared.transition(MonitoringState::Stopped, None);
        info!("Monitoring stopped");
    }

    /// Remove every buffered entry
    pub fn clear_entries(&self) {
        self.shared.buffer.clear();
    }

    /// Buffered entries, oldest first, optionally narrowed by a
    /// case-insensitive substring
    pub fn entries(&self, filter: Option<&str>) -> Vec<ArcLogEntry> {
        let snapshot = self.shared.buffer.snapshot();
        match filter {
            Some(text) => filter_entries(&snapshot, text),
            None => snapshot,
        }
    }

    /// Buffered entries accepted by `filter`
    pub fn entries_matching(&self, filter: &EntryFilter) -> Vec<ArcLogEntry> {
        filter.apply(&self.shared.buffer.snapshot())
    }

    pub fn statistics(&self) -> Statistics {
        Statistics::from_entries(&self.shared.buffer.snapshot())
    }

    /// Change the buffer bound, evicting the oldest entries on shrink
    pub fn set_max_entries(&self, max_entries: usize) -> Result<()> {
        self.shared.buffer.set_capacity(max_entries)
    }

    pub fn max_entries(&self) -> usize {
        self.shared.buffer.capacity()
    }

    /// Entries dropped to honor the bound since the last clear
    pub fn evicted(&self) -> u64 {
        self.shared.buffer.evicted()
    }

    pub fn state(&self) -> MonitoringState {
        self.shared.state()
    }

    pub fn status(&self) -> Status {
        self.shared.status.lock().clone()
    }
}

impl Drop for LogMonitor {
    fn drop(&mut self) {
        if let Some(session) = &self.session.get_mut().active {
            session.cancel.cancel();
        }
    }
}

/// Poll until cancelled or until the file becomes unreadable.
/// Ticks never overlap; a late tick is skipped rather than queued.
async fn run_poll_loop(
    shared: Shared,
    mut tailer: FileTailer,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            _ = ticker.tick() => {
                if let Err(e) = shared.poll_once(&mut tailer) {
                    warn!(path = %tailer.path().display(), "Monitoring failed: {}", e);
                    shared.transition(MonitoringState::Error, Some(e.to_string()));
                    break;
                }
            }
        }
    }

    tailer.close();
}
