use ratatui::layout::{Constraint, Direction, Layout as RatatuiLayout, Rect};

/// Areas of the log viewer screen, top to bottom
pub struct LogViewerAreas {
    pub header: Rect,
    pub stats: Option<Rect>,
    pub filter: Option<Rect>,
    pub entries: Rect,
    pub status_bar: Rect,
}

/// Layout helper for consistent screen layouts
pub struct Layout;

impl Layout {
    /// Header, optional stats and filter bars, entry list, status bar
    pub fn log_viewer(area: Rect, show_stats: bool, show_filter: bool) -> LogViewerAreas {
        let mut constraints = vec![Constraint::Length(3)];
        if show_stats {
            constraints.push(Constraint::Length(3));
        }
        if show_filter {
            constraints.push(Constraint::Length(3));
        }
        constraints.push(Constraint::Min(1));
        constraints.push(Constraint::Length(1));

        let chunks = RatatuiLayout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        let mut next = chunks.iter().copied();
        let header = next.next().unwrap_or_default();
        let stats = show_stats.then(|| next.next().unwrap_or_default());
        let filter = show_filter.then(|| next.next().unwrap_or_default());
        let entries = next.next().unwrap_or_default();
        let status_bar = next.next().unwrap_or_default();

        LogViewerAreas {
            header,
            stats,
            filter,
            entries,
            status_bar,
        }
    }

    /// Centered popup of at most `width` x `height` cells
    pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
        let width = width.min(area.width.saturating_sub(4));
        let height = height.min(area.height.saturating_sub(4));

        let x = area.x + area.width.saturating_sub(width) / 2;
        let y = area.y + area.height.saturating_sub(height) / 2;
        Rect::new(x, y, width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_viewer_all_bars() {
        let areas = Layout::log_viewer(Rect::new(0, 0, 80, 30), true, true);
        assert_eq!(areas.header.height, 3);
        assert_eq!(areas.stats.map(|r| r.height), Some(3));
        assert_eq!(areas.filter.map(|r| r.height), Some(3));
        assert_eq!(areas.status_bar.height, 1);
        assert_eq!(areas.entries.height, 30 - 3 - 3 - 3 - 1);
    }

    #[test]
    fn test_log_viewer_minimal() {
        let areas = Layout::log_viewer(Rect::new(0, 0, 80, 30), false, false);
        assert!(areas.stats.is_none());
        assert!(areas.filter.is_none());
        assert_eq!(areas.entries.height, 26);
        assert_eq!(areas.status_bar.y, 29);
    }

    #[test]
    fn test_centered_fits_inside() {
        let popup = Layout::centered(Rect::new(0, 0, 40, 20), 100, 100);
        assert_eq!(popup.width, 36);
        assert_eq!(popup.height, 16);
        assert_eq!(popup.x, 2);
    }
}
