use chrono::NaiveDateTime;

use crate::types::{LogEntry, Severity};

/// Counts per severity
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SeverityCounts {
    pub debug: usize,
    pub info: usize,
    pub warning: usize,
    pub error: usize,
    pub fatal: usize,
}

impl SeverityCounts {
    fn increment(&mut self, severity: Severity) {
        match severity {
            Severity::Debug => self.debug += 1,
            Severity::Info => self.info += 1,
            Severity::Warning => self.warning += 1,
            Severity::Error => self.error += 1,
            Severity::Fatal => self.fatal += 1,
        }
    }

    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Debug => self.debug,
            Severity::Info => self.info,
            Severity::Warning => self.warning,
            Severity::Error => self.error,
            Severity::Fatal => self.fatal,
        }
    }

    pub fn total(&self) -> usize {
        self.debug + self.info + self.warning + self.error + self.fatal
    }
}

/// Summary of a snapshot of the buffer
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Statistics {
    pub total: usize,
    pub counts: SeverityCounts,
    /// Synthetic start/stop markers included in `total`
    pub system: usize,
    pub oldest: Option<NaiveDateTime>,
    pub newest: Option<NaiveDateTime>,
}

impl Statistics {
    /// Aggregate over entries; an empty slice gives zeros and no timestamps
    pub fn from_entries<E: AsRef<LogEntry>>(entries: &[E]) -> Self {
        let mut stats = Self::default();

        for entry in entries.iter().map(AsRef::as_ref) {
            stats.total += 1;
            stats.counts.increment(entry.severity);
            if entry.is_system {
                stats.system += 1;
            }
            stats.oldest = Some(stats.oldest.map_or(entry.timestamp, |t| t.min(entry.timestamp)));
            stats.newest = Some(stats.newest.map_or(entry.timestamp, |t| t.max(entry.timestamp)));
        }

        stats
    }

    /// Time covered by the entries, if there are any
    pub fn span(&self) -> Option<chrono::Duration> {
        Some(self.newest? - self.oldest?)
    }
}
