//! Shared types for proxywatch
//!
//! This crate contains data structures used across multiple proxywatch crates.

use chrono::NaiveDateTime;
use std::fmt;
use std::sync::Arc;

pub use ratatui::style::Color;

// ============================================================================
// Log Types
// ============================================================================

/// Log severity, ordered from least to most severe
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Severity {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Fatal,
}

impl Severity {
    /// All severities, least severe first
    pub const ALL: [Severity; 5] = [
        Self::Debug,
        Self::Info,
        Self::Warning,
        Self::Error,
        Self::Fatal,
    ];

    /// Get display color for this severity
    pub fn color(&self) -> Color {
        match self {
            Self::Debug => Color::DarkGray,
            Self::Info => Color::White,
            Self::Warning => Color::Yellow,
            Self::Error => Color::Red,
            Self::Fatal => Color::Magenta,
        }
    }

    /// Short display string (3 chars)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DBG",
            Self::Info => "INF",
            Self::Warning => "WRN",
            Self::Error => "ERR",
            Self::Fatal => "FTL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of activity a line describes, beyond its severity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum EntryCategory {
    #[default]
    General,
    /// Client connections and proxied requests
    Connection,
    /// Configuration, initialization and startup
    Lifecycle,
    /// Markers generated by the monitor itself
    System,
}

impl EntryCategory {
    /// Color used when the category overrides the severity color
    pub fn color(&self) -> Option<Color> {
        match self {
            Self::General => None,
            Self::Connection => Some(Color::Blue),
            Self::Lifecycle => Some(Color::Green),
            Self::System => Some(Color::Cyan),
        }
    }
}

/// A single classified log line
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LogEntry {
    /// Sequence number assigned by the buffer on insertion
    pub id: u64,

    /// Timestamp found in the line, or the time the line was read
    pub timestamp: NaiveDateTime,

    /// Detected severity
    pub severity: Severity,

    /// Detected activity category
    pub category: EntryCategory,

    /// Original line text, without the line terminator
    pub message: String,

    /// Whether this is a synthetic marker rather than a line from the file
    pub is_system: bool,

    /// Presentation hint
    pub color: Color,
}

/// Shared handle to an entry; cloning is a reference count increment
pub type ArcLogEntry = Arc<LogEntry>;

impl LogEntry {
    /// Create a synthetic marker entry (session start/stop)
    pub fn system(message: impl Into<String>, timestamp: NaiveDateTime) -> Self {
        Self {
            id: 0,
            timestamp,
            severity: Severity::Info,
            category: EntryCategory::System,
            message: message.into(),
            is_system: true,
            color: EntryCategory::System.color().unwrap_or(Color::Cyan),
        }
    }
}

// ============================================================================
// Monitor Types
// ============================================================================

/// Lifecycle of a monitoring session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum MonitoringState {
    #[default]
    Stopped,
    Starting,
    Running,
    Error,
}

impl MonitoringState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Stopped => "Stopped",
            Self::Starting => "Starting",
            Self::Running => "Running",
            Self::Error => "Error",
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::Stopped => Color::DarkGray,
            Self::Starting => Color::Yellow,
            Self::Running => Color::Green,
            Self::Error => Color::Red,
        }
    }
}

impl fmt::Display for MonitoringState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
        assert_eq!(Severity::ALL.len(), 5);
    }

    #[test]
    fn test_system_entry() {
        let ts = NaiveDateTime::default();
        let entry = LogEntry::system("started", ts);
        assert!(entry.is_system);
        assert_eq!(entry.category, EntryCategory::System);
        assert_eq!(entry.color, Color::Cyan);
    }
}
