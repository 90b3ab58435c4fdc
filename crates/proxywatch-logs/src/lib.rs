//! Log monitoring for proxywatch
//!
//! This crate tails a growing log file, classifies each new line, keeps a
//! bounded history of entries and publishes notifications as they arrive.

mod buffer;
mod classifier;
mod error;
mod events;
mod filter;
mod monitor;
mod stats;
mod tailer;

use proxywatch_types as types;

pub use buffer::LogBuffer;
pub use classifier::LineClassifier;
pub use error::{MonitorError, Result};
pub use events::MonitorEvent;
pub use filter::{EntryFilter, FilterPresets, filter_entries};
pub use monitor::{LogMonitor, Status};
pub use stats::{SeverityCounts, Statistics};
pub use tailer::FileTailer;

// Re-export types used in our public API
pub use proxywatch_types::{ArcLogEntry, EntryCategory, LogEntry, MonitoringState, Severity};
