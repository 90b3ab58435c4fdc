use std::path::PathBuf;
use std::time::Duration;

use proxywatch_logs::{EntryFilter, FilterPresets, LogMonitor, Statistics, Status};
use proxywatch_types::ArcLogEntry;

use super::Action;

/// Severity narrowing applied on top of the text filter
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SeverityPreset {
    #[default]
    All,
    WarningsAndAbove,
    ErrorsOnly,
}

impl SeverityPreset {
    pub fn next(self) -> Self {
        match self {
            Self::All => Self::WarningsAndAbove,
            Self::WarningsAndAbove => Self::ErrorsOnly,
            Self::ErrorsOnly => Self::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::All => "all levels",
            Self::WarningsAndAbove => "warnings+",
            Self::ErrorsOnly => "errors",
        }
    }

    /// Combine this preset with a text predicate
    pub fn filter(self, text: &str) -> EntryFilter {
        match self {
            Self::All => EntryFilter::new(text),
            Self::WarningsAndAbove => FilterPresets::warnings_and_above().with_text(text),
            Self::ErrorsOnly => FilterPresets::errors_only().with_text(text),
        }
    }
}

/// UI-specific transient state
pub struct UiState {
    /// Is the filter bar being edited?
    pub filter_active: bool,

    /// Text typed into the filter bar
    pub filter_input: String,

    /// Applied text filter (None = show all)
    pub active_filter: Option<String>,

    pub severity: SeverityPreset,

    pub help_visible: bool,

    pub stats_visible: bool,

    /// Follow mode: keep the newest entry in view
    pub auto_scroll: bool,

    pub show_timestamps: bool,

    /// Index of the first visible entry
    pub scroll: usize,

    /// Entry rows that fit on screen, updated by the renderer
    pub page_size: usize,

    /// Error message to display (if any)
    pub error_message: Option<String>,

    /// Transient feedback such as "Exported 12 entries"
    pub notice: Option<String>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            filter_active: false,
            filter_input: String::new(),
            active_filter: None,
            severity: SeverityPreset::All,
            help_visible: false,
            stats_visible: false,
            auto_scroll: true,
            show_timestamps: true,
            scroll: 0,
            page_size: 20,
            error_message: None,
            notice: None,
        }
    }
}

/// Everything the console renders
pub struct AppState {
    /// File started by the monitoring toggle
    pub log_path: Option<PathBuf>,

    pub poll_interval: Duration,

    /// Last status reported by the monitor
    pub status: Status,

    pub ui_state: UiState,

    /// Entries passing the current filter, oldest first
    pub visible: Vec<ArcLogEntry>,

    /// Statistics over the whole buffer, not just `visible`
    pub stats: Statistics,

    pub evicted: u64,

    pub max_entries: usize,

    view_dirty: bool,

    pub should_quit: bool,
}

impl AppState {
    pub fn new(log_path: Option<PathBuf>, poll_interval: Duration, auto_scroll: bool) -> Self {
        Self {
            log_path,
            poll_interval,
            status: Status::default(),
            ui_state: UiState {
                auto_scroll,
                ..UiState::default()
            },
            visible: Vec::new(),
            stats: Statistics::default(),
            evicted: 0,
            max_entries: 0,
            view_dirty: true,
            should_quit: false,
        }
    }

    /// Filter combining the applied text and the severity preset
    pub fn current_filter(&self) -> EntryFilter {
        let text = self.ui_state.active_filter.as_deref().unwrap_or("");
        self.ui_state.severity.filter(text)
    }

    /// Mark the filtered view stale; it is rebuilt on the next refresh
    pub fn invalidate_view(&mut self) {
        self.view_dirty = true;
    }

    /// Rebuild `visible` and `stats` from the monitor if anything changed
    pub fn refresh_view(&mut self, monitor: &LogMonitor) {
        if !self.view_dirty {
            return;
        }
        self.view_dirty = false;

        self.visible = monitor.entries_matching(&self.current_filter());
        self.stats = monitor.statistics();
        self.evicted = monitor.evicted();
        self.max_entries = monitor.max_entries();

        if self.ui_state.auto_scroll {
            self.ui_state.scroll = self.max_scroll();
        } else {
            self.ui_state.scroll = self.ui_state.scroll.min(self.max_scroll());
        }
    }

    pub fn show_error(&mut self, message: impl Into<String>) {
        self.ui_state.error_message = Some(message.into());
    }

    pub fn show_notice(&mut self, message: impl Into<String>) {
        self.ui_state.notice = Some(message.into());
    }

    fn max_scroll(&self) -> usize {
        self.visible.len().saturating_sub(self.ui_state.page_size)
    }

    fn scroll_up(&mut self, lines: usize) {
        self.ui_state.auto_scroll = false;
        self.ui_state.scroll = self.ui_state.scroll.saturating_sub(lines);
    }

    fn scroll_down(&mut self, lines: usize) {
        let max = self.max_scroll();
        self.ui_state.scroll = (self.ui_state.scroll + lines).min(max);
        // Reaching the bottom resumes following
        if self.ui_state.scroll == max {
            self.ui_state.auto_scroll = true;
        }
    }

    /// Apply a view-only action. Actions that need the monitor are
    /// handled by the caller and ignored here.
    pub fn update(&mut self, action: Action) {
        let ui = &mut self.ui_state;
        match action {
            Action::Quit => self.should_quit = true,
            Action::ToggleHelp => ui.help_visible = !ui.help_visible,
            Action::DismissError => {
                ui.error_message = None;
                ui.help_visible = false;
            }

            Action::OpenFilter => {
                ui.filter_active = true;
                ui.filter_input = ui.active_filter.clone().unwrap_or_default();
            }
            Action::CloseFilter => {
                ui.filter_active = false;
                ui.filter_input.clear();
            }
            Action::FilterInput(c) => ui.filter_input.push(c),
            Action::FilterBackspace => {
                ui.filter_input.pop();
            }
            Action::FilterClear => ui.filter_input.clear(),
            Action::ApplyFilter => {
                ui.filter_active = false;
                let input = std::mem::take(&mut ui.filter_input);
                ui.active_filter = (!input.is_empty()).then_some(input);
                self.view_dirty = true;
            }
            Action::ClearFilter => {
                ui.active_filter = None;
                self.view_dirty = true;
            }
            Action::CycleSeverity => {
                ui.severity = ui.severity.next();
                self.view_dirty = true;
            }

            Action::ScrollUp(n) => self.scroll_up(n),
            Action::ScrollDown(n) => self.scroll_down(n),
            Action::PageUp => self.scroll_up(self.ui_state.page_size),
            Action::PageDown => self.scroll_down(self.ui_state.page_size),
            Action::ScrollToTop => {
                ui.auto_scroll = false;
                ui.scroll = 0;
            }
            Action::ScrollToBottom => {
                ui.auto_scroll = true;
                self.ui_state.scroll = self.max_scroll();
            }
            Action::ToggleAutoScroll => {
                ui.auto_scroll = !ui.auto_scroll;
                if ui.auto_scroll {
                    self.ui_state.scroll = self.max_scroll();
                }
            }
            Action::ToggleTimestamps => ui.show_timestamps = !ui.show_timestamps,
            Action::ToggleStats => ui.stats_visible = !ui.stats_visible,

            Action::ToggleMonitoring | Action::ClearEntries | Action::ExportEntries => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxywatch_types::{LogEntry, Severity};
    use std::sync::Arc;

    fn state_with(count: usize, page_size: usize) -> AppState {
        let mut state = AppState::new(None, Duration::from_secs(1), true);
        state.ui_state.page_size = page_size;
        state.visible = (0..count)
            .map(|i| {
                Arc::new(LogEntry {
                    id: i as u64,
                    message: format!("line {i}"),
                    ..LogEntry::default()
                })
            })
            .collect();
        state
    }

    #[test]
    fn test_filter_editing_flow() {
        let mut state = state_with(0, 10);
        state.update(Action::OpenFilter);
        assert!(state.ui_state.filter_active);

        for c in "refused".chars() {
            state.update(Action::FilterInput(c));
        }
        state.update(Action::FilterBackspace);
        state.update(Action::ApplyFilter);

        assert!(!state.ui_state.filter_active);
        assert_eq!(state.ui_state.active_filter.as_deref(), Some("refuse"));
        assert_eq!(state.current_filter().pattern(), "refuse");

        // Reopening edits the applied text
        state.update(Action::OpenFilter);
        assert_eq!(state.ui_state.filter_input, "refuse");
        state.update(Action::CloseFilter);
        assert_eq!(state.ui_state.active_filter.as_deref(), Some("refuse"));

        state.update(Action::ClearFilter);
        assert!(state.current_filter().is_empty());
    }

    #[test]
    fn test_applying_empty_input_clears_filter() {
        let mut state = state_with(0, 10);
        state.ui_state.active_filter = Some("x".into());
        state.update(Action::OpenFilter);
        state.update(Action::FilterClear);
        state.update(Action::ApplyFilter);
        assert!(state.ui_state.active_filter.is_none());
    }

    #[test]
    fn test_severity_cycle() {
        let mut state = state_with(0, 10);
        state.update(Action::CycleSeverity);
        assert_eq!(state.ui_state.severity, SeverityPreset::WarningsAndAbove);

        let warn = LogEntry {
            severity: Severity::Warning,
            ..LogEntry::default()
        };
        let info = LogEntry::default();
        assert!(state.current_filter().matches(&warn));
        assert!(!state.current_filter().matches(&info));

        state.update(Action::CycleSeverity);
        state.update(Action::CycleSeverity);
        assert_eq!(state.ui_state.severity, SeverityPreset::All);
    }

    #[test]
    fn test_scrolling_toggles_follow_mode() {
        let mut state = state_with(50, 10);
        state.update(Action::ScrollToBottom);
        assert_eq!(state.ui_state.scroll, 40);

        state.update(Action::ScrollUp(5));
        assert!(!state.ui_state.auto_scroll);
        assert_eq!(state.ui_state.scroll, 35);

        state.update(Action::PageDown);
        assert_eq!(state.ui_state.scroll, 40);
        assert!(state.ui_state.auto_scroll);

        state.update(Action::ScrollToTop);
        assert_eq!(state.ui_state.scroll, 0);
        assert!(!state.ui_state.auto_scroll);

        state.update(Action::ScrollUp(3));
        assert_eq!(state.ui_state.scroll, 0);
    }

    #[test]
    fn test_refresh_view_follows_newest() {
        let monitor = LogMonitor::new(100).unwrap();
        let mut state = state_with(0, 10);
        state.refresh_view(&monitor);

        assert!(state.visible.is_empty());
        assert_eq!(state.max_entries, 100);
        assert_eq!(state.ui_state.scroll, 0);

        // Nothing changed, nothing rebuilt
        state.visible = vec![Arc::new(LogEntry::default())];
        state.refresh_view(&monitor);
        assert_eq!(state.visible.len(), 1);

        state.invalidate_view();
        state.refresh_view(&monitor);
        assert!(state.visible.is_empty());
    }
}
