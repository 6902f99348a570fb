//! Log entry format
//!
//! One entry per line:
//! ```text
//! 2024-01-03 14:30:05.123456: /home/me/notes/todo.txt was modified
//! ```

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// strftime pattern for entry timestamps (local time, microseconds)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Separator between timestamp and description
const SEPARATOR: &str = ": ";

/// A single change or error log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// When the entry was written
    pub timestamp: NaiveDateTime,
    /// Human-readable description
    pub description: String,
}

impl LogEntry {
    /// Entry stamped with the current local time
    pub fn now(description: impl Into<String>) -> Self {
        Self::at(&Local::now(), description)
    }

    /// Entry stamped with `time` in its own zone
    pub fn at<Tz: TimeZone>(time: &DateTime<Tz>, description: impl Into<String>) -> Self {
        Self {
            timestamp: time.naive_local(),
            description: description.into(),
        }
    }

    /// Render as a single line, newline included
    pub fn to_line(&self) -> String {
        format!("{self}\n")
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Line breaks in descriptions would split one entry across lines
        let description = self.description.replace(['\r', '\n'], " ");
        write!(
            f,
            "{}{}{}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            SEPARATOR,
            description
        )
    }
}

/// A line that is not a log entry
#[derive(Error, Debug, PartialEq, Eq)]
#[error("malformed log line: {line:?}")]
pub struct ParseEntryError {
    pub line: String,
}

impl FromStr for LogEntry {
    type Err = ParseEntryError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let malformed = || ParseEntryError {
            line: line.to_string(),
        };

        // The timestamp itself contains ':' so split after its fixed-width prefix
        let (stamp, description) = line
            .char_indices()
            .filter(|&(_, c)| c == ':')
            .map(|(i, _)| (&line[..i], &line[i..]))
            .find_map(|(stamp, rest)| {
                let timestamp = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()?;
                rest.strip_prefix(SEPARATOR).map(|d| (timestamp, d))
            })
            .ok_or_else(malformed)?;

        Ok(Self {
            timestamp: stamp,
            description: description.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_line_format() {
        let time = Local.with_ymd_and_hms(2024, 1, 3, 14, 30, 5).unwrap();
        let entry = LogEntry::at(&time, "/tmp/notes.txt was modified");
        assert_eq!(
            entry.to_line(),
            "2024-01-03 14:30:05.000000: /tmp/notes.txt was modified\n"
        );
    }

    #[test]
    fn test_parse_line() {
        let entry: LogEntry = "2024-01-03 14:30:05.123456: /a: b was moved to /c"
            .parse()
            .unwrap();
        assert_eq!(entry.description, "/a: b was moved to /c");
        assert_eq!(
            entry.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            "2024-01-03 14:30:05.123456"
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("not a log line".parse::<LogEntry>().is_err());
        assert!("2024-01-03 14:30:05.123456 missing separator"
            .parse::<LogEntry>()
            .is_err());
    }

    #[test]
    fn test_newlines_are_flattened() {
        let time = Local.with_ymd_and_hms(2024, 1, 3, 14, 30, 5).unwrap();
        let entry = LogEntry::at(&time, "Error backing up /x: line one\nline two");
        let line = entry.to_line();
        assert_eq!(line.matches('\n').count(), 1);
        assert!(line.ends_with("line one line two\n"));
    }
}
