use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::ui::Theme;

/// Bottom line: key hints on the left, the latest status message on the right
pub struct StatusBar<'a> {
    hints: Vec<(&'a str, &'a str)>,
    message: Option<(String, Style)>,
}

impl<'a> StatusBar<'a> {
    pub fn new() -> Self {
        Self {
            hints: Vec::new(),
            message: None,
        }
    }

    /// Keyboard hints as (key, description) pairs
    pub fn hints<I>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.hints = hints.into_iter().collect();
        self
    }

    pub fn message<S: Into<String>>(mut self, text: S) -> Self {
        self.message = Some((text.into(), Theme::status_bar()));
        self
    }

    pub fn error<S: Into<String>>(mut self, text: S) -> Self {
        self.message = Some((text.into(), Theme::error().bg(Color::DarkGray)));
        self
    }
}

impl Default for StatusBar<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        buf.set_style(area, Theme::status_bar());

        let mut spans = Vec::new();
        for (i, (key, desc)) in self.hints.iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled(" ", Theme::status_bar()));
            }
            spans.push(Span::styled(format!("[{}]", key), Theme::status_bar_key()));
            spans.push(Span::styled(desc.to_string(), Theme::status_bar()));
        }

        let line = Line::from(spans);
        let line_width = line.width() as u16;
        buf.set_line(area.x + 1, area.y, &line, area.width.saturating_sub(2));

        // The message only shows when it does not overlap the hints
        if let Some((text, style)) = self.message {
            let width = Line::from(text.as_str()).width() as u16;
            let x = area.x + area.width.saturating_sub(width + 1);
            if x > area.x + line_width + 2 {
                buf.set_span(x, area.y, &Span::styled(text.as_str(), style), width);
            }
        }
    }
}

/// Hints shown while browsing entries
pub fn viewer_hints(running: bool) -> Vec<(&'static str, &'static str)> {
    vec![
        ("s", if running { "Stop" } else { "Start" }),
        ("/", "Filter"),
        ("v", "Level"),
        ("c", "Clear"),
        ("e", "Export"),
        ("?", "Help"),
        ("q", "Quit"),
    ]
}

/// Hints shown while typing a filter
pub fn filter_hints() -> Vec<(&'static str, &'static str)> {
    vec![("Enter", "Apply"), ("Esc", "Cancel"), ("Ctrl+u", "Clear")]
}
