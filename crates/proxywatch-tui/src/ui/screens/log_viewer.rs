use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};

use proxywatch_types::{LogEntry, MonitoringState, Severity};

use crate::app::AppState;
use crate::ui::components::{filter_hints, viewer_hints, StatusBar};
use crate::ui::{Layout, Theme};

/// Log viewer screen
pub struct LogViewerScreen;

/// Truncate to at most `max_chars` characters, marking the cut with "..."
fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}

impl LogViewerScreen {
    pub fn render(frame: &mut Frame, state: &mut AppState) {
        let show_filter_bar = state.ui_state.filter_active || state.ui_state.active_filter.is_some();
        let areas = Layout::log_viewer(frame.area(), state.ui_state.stats_visible, show_filter_bar);

        Self::render_header(frame, areas.header, state);
        if let Some(area) = areas.stats {
            Self::render_stats_bar(frame, area, state);
        }
        if let Some(area) = areas.filter {
            Self::render_filter_bar(frame, area, state);
        }
        Self::render_entries(frame, areas.entries, state);
        Self::render_status_bar(frame, areas.status_bar, state);
    }

    fn render_header(frame: &mut Frame, area: Rect, state: &AppState) {
        let path = state
            .status
            .path
            .as_ref()
            .or(state.log_path.as_ref())
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "no file selected".to_string());

        let title = Line::from(vec![
            Span::styled("proxywatch", Theme::title()),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled(path, Theme::text()),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled(
                format!("● {}", state.status.state),
                Theme::state_badge(state.status.state),
            ),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled(
                format!("every {}ms", state.poll_interval.as_millis()),
                Theme::text_dim(),
            ),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled(
                format!("{}/{} entries", state.stats.total, state.max_entries),
                Theme::text(),
            ),
        ]);

        let header = Paragraph::new(title).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border()),
        );

        frame.render_widget(header, area);
    }

    fn render_stats_bar(frame: &mut Frame, area: Rect, state: &AppState) {
        let stats = &state.stats;
        let mut spans = vec![Span::styled(" ", Theme::text())];

        for severity in Severity::ALL {
            spans.push(Span::styled(
                format!("{} ", severity.as_str()),
                Style::default()
                    .fg(severity.color())
                    .add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::styled(
                format!("{}  ", stats.counts.get(severity)),
                Theme::text(),
            ));
        }

        if let (Some(oldest), Some(newest)) = (stats.oldest, stats.newest) {
            spans.push(Span::styled("│ ", Theme::text_dim()));
            spans.push(Span::styled(
                format!("{} → {}", oldest.format("%H:%M:%S"), newest.format("%H:%M:%S")),
                Theme::text(),
            ));
        }

        if state.evicted > 0 {
            spans.push(Span::styled(
                format!("  │ {} evicted", state.evicted),
                Style::default().fg(Theme::WARNING),
            ));
        }

        let bar = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border())
                .title(Span::styled(" Statistics ", Theme::title())),
        );

        frame.render_widget(bar, area);
    }

    fn render_filter_bar(frame: &mut Frame, area: Rect, state: &AppState) {
        let ui = &state.ui_state;
        let mut spans = vec![];

        if ui.filter_active {
            spans.push(Span::styled(" /", Theme::text_highlight()));
            spans.push(Span::styled(ui.filter_input.clone(), Theme::text_highlight()));
            spans.push(Span::styled(
                "█",
                Style::default()
                    .fg(Theme::HIGHLIGHT)
                    .add_modifier(Modifier::SLOW_BLINK),
            ));
        } else {
            spans.push(Span::styled(" Filter: ", Theme::text_dim()));
            spans.push(Span::styled(
                ui.active_filter.clone().unwrap_or_default(),
                Theme::text_highlight(),
            ));
            spans.push(Span::styled("  [n] Clear  [/] Edit", Theme::text_dim()));
        }

        let bar = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(if ui.filter_active {
                    Theme::border_focused()
                } else {
                    Theme::border()
                })
                .title(Span::styled(" Filter ", Theme::title())),
        );

        frame.render_widget(bar, area);
    }

    fn render_entries(frame: &mut Frame, area: Rect, state: &mut AppState) {
        let inner_height = area.height.saturating_sub(2) as usize;
        // Borders and scrollbar
        let inner_width = area.width.saturating_sub(4) as usize;

        state.ui_state.page_size = inner_height.max(1);
        let total = state.visible.len();
        let max_scroll = total.saturating_sub(inner_height);
        if state.ui_state.auto_scroll || state.ui_state.scroll > max_scroll {
            state.ui_state.scroll = max_scroll;
        }

        let lines: Vec<Line> = state
            .visible
            .iter()
            .skip(state.ui_state.scroll)
            .take(inner_height)
            .map(|entry| Self::format_entry(entry, state.ui_state.show_timestamps, inner_width))
            .collect();

        let filtered = state.ui_state.active_filter.is_some()
            || state.ui_state.severity != Default::default();
        let mut title = if filtered {
            format!(" Entries ({} matching, {}) ", total, state.ui_state.severity.label())
        } else {
            format!(" Entries ({}) ", total)
        };
        if !state.ui_state.auto_scroll {
            title.push_str("[paused] ");
        }

        let widget = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border())
                .title(Span::styled(title, Theme::title())),
        );
        frame.render_widget(widget, area);

        if total > inner_height {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("▲"))
                .end_symbol(Some("▼"));
            let mut scrollbar_state = ScrollbarState::new(max_scroll).position(state.ui_state.scroll);
            frame.render_stateful_widget(scrollbar, area, &mut scrollbar_state);
        }
    }

    fn format_entry(entry: &LogEntry, show_timestamps: bool, width: usize) -> Line<'static> {
        let mut spans = Vec::with_capacity(4);
        let mut used = 0;

        if show_timestamps {
            let ts = entry.timestamp.format("%H:%M:%S ").to_string();
            used += ts.len();
            spans.push(Span::styled(ts, Theme::text_dim()));
        }

        spans.push(Span::styled(
            format!("{} ", entry.severity.as_str()),
            Style::default()
                .fg(entry.severity.color())
                .add_modifier(Modifier::BOLD),
        ));
        used += 4;

        let style = if entry.is_system {
            Theme::system_entry()
        } else {
            Style::default().fg(entry.color)
        };
        spans.push(Span::styled(
            truncate_chars(&entry.message, width.saturating_sub(used)),
            style,
        ));

        Line::from(spans)
    }

    fn render_status_bar(frame: &mut Frame, area: Rect, state: &AppState) {
        let hints = if state.ui_state.filter_active {
            filter_hints()
        } else {
            viewer_hints(state.status.state == MonitoringState::Running)
        };
        let bar = StatusBar::new().hints(hints);

        let bar = if let Some(err) = &state.ui_state.error_message {
            bar.error(format!("⚠ {err}"))
        } else if let Some(message) = &state.status.message {
            bar.error(message.clone())
        } else if let Some(notice) = &state.ui_state.notice {
            bar.message(notice.clone())
        } else {
            bar.message(state.status.state.label())
        };

        frame.render_widget(bar, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Action;
    use proxywatch_types::EntryCategory;
    use ratatui::{Terminal, backend::TestBackend};
    use std::sync::Arc;
    use std::time::Duration;

    fn entry(id: u64, severity: Severity, message: &str) -> Arc<LogEntry> {
        Arc::new(LogEntry {
            id,
            severity,
            category: EntryCategory::General,
            message: message.to_string(),
            color: severity.color(),
            ..LogEntry::default()
        })
    }

    fn screen_text(state: &mut AppState, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal
            .draw(|frame| LogViewerScreen::render(frame, state))
            .unwrap();
        let buffer = terminal.backend().buffer();
        (0..height)
            .map(|y| {
                (0..width)
                    .map(|x| buffer[(x, y)].symbol().to_string())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("a longer message", 8), "a lon...");
        assert_eq!(truncate_chars("ééééé", 4), "é...");
    }

    #[test]
    fn test_renders_entries_and_header() {
        let mut state = AppState::new(Some("/var/log/proxy.log".into()), Duration::from_millis(500), true);
        state.visible = vec![
            entry(1, Severity::Info, "listening on 127.0.0.1:8080"),
            entry(2, Severity::Error, "upstream connection refused"),
        ];
        state.ui_state.show_timestamps = false;

        let text = screen_text(&mut state, 100, 12);
        assert!(text.contains("/var/log/proxy.log"));
        assert!(text.contains("Stopped"));
        assert!(text.contains("every 500ms"));
        assert!(text.contains("INF listening on 127.0.0.1:8080"));
        assert!(text.contains("ERR upstream connection refused"));
        assert!(text.contains("Entries (2)"));
    }

    #[test]
    fn test_follow_mode_shows_newest() {
        let mut state = AppState::new(None, Duration::from_secs(1), true);
        state.visible = (0..30)
            .map(|i| entry(i, Severity::Info, &format!("line-{i:02}")))
            .collect();

        // 10 rows: header 3, entries 6 (4 inside borders), status 1
        let text = screen_text(&mut state, 60, 10);
        assert_eq!(state.ui_state.page_size, 4);
        assert_eq!(state.ui_state.scroll, 26);
        assert!(text.contains("line-29"));
        assert!(!text.contains("line-25"));

        state.update(Action::ScrollToTop);
        let text = screen_text(&mut state, 60, 10);
        assert!(text.contains("line-00"));
        assert!(text.contains("[paused]"));
    }

    #[test]
    fn test_filter_bar_and_error_message() {
        let mut state = AppState::new(None, Duration::from_secs(1), true);
        state.update(Action::OpenFilter);
        state.update(Action::FilterInput('x'));
        state.show_error("file not found");

        let text = screen_text(&mut state, 100, 12);
        assert!(text.contains("/x"));
        assert!(text.contains("file not found"));
    }
}
