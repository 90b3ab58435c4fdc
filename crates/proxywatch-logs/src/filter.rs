use std::collections::HashSet;

use crate::types::{ArcLogEntry, LogEntry, Severity};

/// Case-insensitive substring filter over log entries
#[derive(Clone, Debug, Default)]
pub struct EntryFilter {
    /// Text as typed by the user
    pattern: String,

    /// Lowercased pattern used for matching
    needle: String,

    /// Severities to include (empty = all)
    severities: HashSet<Severity>,
}

impl EntryFilter {
    /// Create a filter from a text predicate; empty text matches everything
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            needle: pattern.to_lowercase(),
            severities: HashSet::new(),
        }
    }

    /// Replace the text predicate, keeping any severity restriction
    pub fn with_text(mut self, pattern: &str) -> Self {
        self.pattern = pattern.to_string();
        self.needle = pattern.to_lowercase();
        self
    }

    /// Restrict matches to the given severities
    pub fn with_severities(mut self, severities: HashSet<Severity>) -> Self {
        self.severities = severities;
        self
    }

    /// Check if a log entry matches this filter
    pub fn matches(&self, entry: &LogEntry) -> bool {
        if !self.severities.is_empty() && !self.severities.contains(&entry.severity) {
            return false;
        }

        self.needle.is_empty() || entry.message.to_lowercase().contains(&self.needle)
    }

    /// Project a snapshot onto the entries that match, keeping order
    pub fn apply(&self, entries: &[ArcLogEntry]) -> Vec<ArcLogEntry> {
        if self.is_empty() {
            return entries.to_vec();
        }
        entries.iter().filter(|e| self.matches(e)).cloned().collect()
    }

    /// Get the original pattern
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Check if filter is empty (matches everything)
    pub fn is_empty(&self) -> bool {
        self.needle.is_empty() && self.severities.is_empty()
    }
}

/// Entries of `entries` whose message contains `text`, ignoring case
pub fn filter_entries(entries: &[ArcLogEntry], text: &str) -> Vec<ArcLogEntry> {
    EntryFilter::new(text).apply(entries)
}

/// Quick filter presets
pub struct FilterPresets;

impl FilterPresets {
    /// Filter for errors only
    pub fn errors_only() -> EntryFilter {
        EntryFilter::default().with_severities(HashSet::from([Severity::Error, Severity::Fatal]))
    }

    /// Filter for warnings and above
    pub fn warnings_and_above() -> EntryFilter {
        EntryFilter::default()
            .with_severities(Severity::ALL.into_iter().filter(|s| *s >= Severity::Warning).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::LineClassifier;
    use std::sync::Arc;

    fn entries(lines: &[&str]) -> Vec<ArcLogEntry> {
        lines
            .iter()
            .map(|l| Arc::new(LineClassifier::classify(l)))
            .collect()
    }

    #[test]
    fn test_case_insensitive_substring() {
        let all = entries(&["Error: disk full", "all good", "ERROR again"]);
        let matched = filter_entries(&all, "error");
        let messages: Vec<_> = matched.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["Error: disk full", "ERROR again"]);
    }

    #[test]
    fn test_empty_pattern_matches_everything() {
        let all = entries(&["a", "b", "c"]);
        assert_eq!(filter_entries(&all, "").len(), 3);
        assert!(EntryFilter::new("").is_empty());
    }

    #[test]
    fn test_no_match() {
        let all = entries(&["a", "b"]);
        assert!(filter_entries(&all, "zzz").is_empty());
    }

    #[test]
    fn test_severity_presets() {
        let all = entries(&[
            "DEBUG cache hit",
            "plain",
            "warning: slow upstream",
            "error: refused",
            "fatal: crashed",
        ]);

        assert_eq!(FilterPresets::errors_only().apply(&all).len(), 2);
        assert_eq!(FilterPresets::warnings_and_above().apply(&all).len(), 3);
    }

    #[test]
    fn test_text_and_severity_combined() {
        let all = entries(&["error: upstream a", "error: upstream b", "warn: upstream a"]);
        let filter = FilterPresets::errors_only().with_text("UPSTREAM A");
        let matched = filter.apply(&all);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].message, "error: upstream a");
    }
}
