//! Bounded, filterable log store
//!
//! Owned by the console session with a single writer (the log dispatcher).
//! Capacity 500 with FIFO eviction; while paused, accepted entries are
//! dropped silently and the buffer is otherwise untouched. Queries are pure
//! and recomputed on demand — there is no cached materialized view.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use gateway_client::{LogEntry, LogLevel};

/// Maximum retained entries; the oldest are evicted first beyond this.
pub const LOG_CAPACITY: usize = 500;

/// Multi-criteria filter, composed in order as a logical AND:
/// errors-only override, level, substring search, inclusive date range.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    /// Keep only `error` entries. Supersedes `level` entirely.
    pub errors_only: bool,
    /// `None` means "all levels".
    pub level: Option<LogLevel>,
    /// Case-insensitive substring matched against the message or the level
    /// label.
    pub search: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl LogFilter {
    /// `term` is the search string already lower-cased, once per query.
    fn matches(&self, entry: &LogEntry, term: Option<&str>) -> bool {
        if self.errors_only {
            if entry.level != LogLevel::Error {
                return false;
            }
        } else if let Some(level) = self.level {
            if entry.level != level {
                return false;
            }
        }

        if let Some(term) = term {
            if !term.is_empty()
                && !entry.message.to_lowercase().contains(term)
                && !entry.level.as_str().contains(term)
            {
                return false;
            }
        }

        if let Some(from) = self.from {
            if entry.timestamp < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if entry.timestamp > to {
                return false;
            }
        }
        true
    }
}

/// Insertion-ordered log store with FIFO eviction at `LOG_CAPACITY`.
#[derive(Debug, Default)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
    paused: bool,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, evicting from the front beyond capacity.
    ///
    /// Returns whether the entry was stored; while paused, entries are
    /// dropped silently and `false` is returned.
    pub fn accept(&mut self, entry: LogEntry) -> bool {
        if self.paused {
            return false;
        }
        self.entries.push_back(entry);
        while self.entries.len() > LOG_CAPACITY {
            self.entries.pop_front();
        }
        true
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Filtered view, recomputed on every call.
    pub fn query(&self, filter: &LogFilter) -> Vec<&LogEntry> {
        let term = filter.search.as_ref().map(|s| s.to_lowercase());
        self.entries
            .iter()
            .filter(|e| filter.matches(e, term.as_deref()))
            .collect()
    }

    /// JSON export of the filtered view (not the raw buffer).
    pub fn export_json(&self, filter: &LogFilter) -> String {
        serde_json::to_string_pretty(&self.query(filter)).unwrap_or_else(|_| String::from("[]"))
    }

    /// CSV export of the filtered view: `timestamp,level,message` with RFC
    /// 4180 quoting for the message column.
    pub fn export_csv(&self, filter: &LogFilter) -> String {
        let mut out = String::from("timestamp,level,message\n");
        for entry in self.query(filter) {
            out.push_str(&entry.timestamp.to_rfc3339());
            out.push(',');
            out.push_str(entry.level.as_str());
            out.push(',');
            out.push_str(&csv_field(&entry.message));
            out.push('\n');
        }
        out
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        let escaped = value.replace('"', "\"\"");
        format!("\"{escaped}\"")
    } else {
        value.to_string()
    }
}
