use std::time::Duration;

use crossterm::event::{Event as CrosstermEvent, EventStream, KeyEvent, KeyEventKind};
use futures::{FutureExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Terminal events
#[derive(Clone, Debug)]
pub enum Event {
    /// Periodic tick, used to refresh the clock-driven parts of the screen
    Tick,
    Key(KeyEvent),
    Resize(u16, u16),
    Error(String),
}

/// Reads terminal input on a background task and forwards it as [`Event`]s
pub struct EventHandler {
    receiver: mpsc::UnboundedReceiver<Event>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let task = tokio::spawn(Self::run(sender, cancel.clone(), tick_rate));

        Self {
            receiver,
            cancel,
            task: Some(task),
        }
    }

    async fn run(sender: mpsc::UnboundedSender<Event>, cancel: CancellationToken, tick_rate: Duration) {
        let mut reader = EventStream::new();
        let mut tick_interval = tokio::time::interval(tick_rate);

        loop {
            let tick = tick_interval.tick();
            let crossterm_event = reader.next().fuse();

            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tick => Event::Tick,
                maybe_event = crossterm_event => match maybe_event {
                    // Ignore release events (reported on Windows)
                    Some(Ok(CrosstermEvent::Key(key))) if key.kind == KeyEventKind::Press => Event::Key(key),
                    Some(Ok(CrosstermEvent::Resize(w, h))) => Event::Resize(w, h),
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => Event::Error(e.to_string()),
                    None => break,
                },
            };

            if sender.send(event).is_err() {
                break;
            }
        }
    }

    pub async fn next(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    /// Stop reading input and wait for the reader task to finish
    pub async fn shutdown(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for EventHandler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
