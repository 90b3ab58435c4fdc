use std::sync::LazyLock;

use chrono::{Local, NaiveDateTime};
use regex::Regex;

use crate::types::{EntryCategory, LogEntry, Severity};

/// `YYYY-MM-DD HH:MM:SS` anywhere in the line
static TIMESTAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}").expect("timestamp pattern is valid")
});

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One row of the classification table
struct Rule {
    keywords: &'static [&'static str],
    severity: Severity,
    category: EntryCategory,
}

/// Evaluated top to bottom, first match wins. Keywords are upper case.
const RULES: &[Rule] = &[
    Rule {
        keywords: &["FATAL"],
        severity: Severity::Fatal,
        category: EntryCategory::General,
    },
    Rule {
        keywords: &["ERROR"],
        severity: Severity::Error,
        category: EntryCategory::General,
    },
    Rule {
        keywords: &["WARNING", "WARN"],
        severity: Severity::Warning,
        category: EntryCategory::General,
    },
    Rule {
        keywords: &["CONNECT", "REQUEST"],
        severity: Severity::Info,
        category: EntryCategory::Connection,
    },
    Rule {
        keywords: &["CONFIG", "INITIALIZ", "START"],
        severity: Severity::Info,
        category: EntryCategory::Lifecycle,
    },
    Rule {
        keywords: &["DEBUG"],
        severity: Severity::Debug,
        category: EntryCategory::General,
    },
];

/// Heuristic single-line classifier for proxy log output
pub struct LineClassifier;

impl LineClassifier {
    /// Classify a raw line, using the current local time when the line
    /// carries no timestamp
    pub fn classify(raw: &str) -> LogEntry {
        Self::classify_at(raw, Local::now().naive_local())
    }

    /// Classify a raw line with an explicit ingestion time
    pub fn classify_at(raw: &str, ingested_at: NaiveDateTime) -> LogEntry {
        let (severity, category) = Self::severity_of(raw);
        let color = category.color().unwrap_or_else(|| severity.color());

        LogEntry {
            id: 0,
            timestamp: Self::extract_timestamp(raw).unwrap_or(ingested_at),
            severity,
            category,
            message: raw.to_string(),
            is_system: false,
            color,
        }
    }

    fn severity_of(raw: &str) -> (Severity, EntryCategory) {
        let upper = raw.to_uppercase();

        RULES
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| upper.contains(k)))
            .map(|rule| (rule.severity, rule.category))
            .unwrap_or((Severity::Info, EntryCategory::General))
    }

    /// Find the first `YYYY-MM-DD HH:MM:SS` that is also a real date
    fn extract_timestamp(raw: &str) -> Option<NaiveDateTime> {
        TIMESTAMP_RE
            .find_iter(raw)
            .find_map(|m| NaiveDateTime::parse_from_str(m.as_str(), TIMESTAMP_FORMAT).ok())
    }
}
