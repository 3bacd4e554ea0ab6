use std::fmt::Write;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};

use crate::error::ConfigError;

/// Pattern used by the bare `date` format.
pub const DEFAULT_DATE_PATTERN: &str = "MMM d, yyyy";

/// Pattern used by the bare `time` format.
pub const DEFAULT_TIME_PATTERN: &str = "h:mm:ss a";

/// A `yyyy-MM-dd HH:mm:ss` style pattern compiled to a chrono format string.
///
/// Parsed values are epoch milliseconds. Text without an explicit offset is
/// read as UTC.
#[derive(Debug, Clone, PartialEq)]
pub struct DatePattern {
    source: String,
    strftime: String,
    has_offset: bool,
}

impl DatePattern {
    pub fn compile(pattern: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidDatePattern {
            pattern: pattern.to_string(),
            reason,
        };

        let chars: Vec<char> = pattern.chars().collect();
        let mut strftime = String::new();
        let mut has_offset = false;
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if c == '\'' {
                // Quoted literal; '' is an escaped quote.
                if chars.get(i + 1) == Some(&'\'') {
                    strftime.push('\'');
                    i += 2;
                    continue;
                }
                let mut j = i + 1;
                loop {
                    match chars.get(j).copied() {
                        None => return Err(invalid("unterminated quote".to_string())),
                        Some('\'') if chars.get(j + 1) == Some(&'\'') => {
                            strftime.push('\'');
                            j += 2;
                        }
                        Some('\'') => break,
                        Some('%') => {
                            strftime.push_str("%%");
                            j += 1;
                        }
                        Some(other) => {
                            strftime.push(other);
                            j += 1;
                        }
                    }
                }
                i = j + 1;
                continue;
            }
            if !c.is_ascii_alphabetic() {
                if c == '%' {
                    strftime.push_str("%%");
                } else {
                    strftime.push(c);
                }
                i += 1;
                continue;
            }

            let mut run = 1;
            while chars.get(i + run) == Some(&c) {
                run += 1;
            }
            let spec = match (c, run) {
                ('y' | 'Y', 2) => "%y",
                ('y' | 'Y', _) => "%Y",
                ('M', 1 | 2) => "%m",
                ('M', 3) => "%b",
                ('M', _) => "%B",
                ('d', _) => "%d",
                ('D', _) => "%j",
                ('H' | 'k', _) => "%H",
                ('h' | 'K', _) => "%I",
                ('m', _) => "%M",
                ('s', _) => "%S",
                ('S', _) => "%3f",
                ('a', _) => "%p",
                ('E', 1..=3) => "%a",
                ('E', _) => "%A",
                ('Z', _) | ('X', 1 | 2) => {
                    has_offset = true;
                    "%z"
                }
                ('X', _) => {
                    has_offset = true;
                    "%:z"
                }
                _ => return Err(invalid(format!("unsupported pattern letter '{c}'"))),
            };
            strftime.push_str(spec);
            i += run;
        }

        if StrftimeItems::new(&strftime).any(|item| matches!(item, Item::Error)) {
            return Err(invalid(format!("cannot translate to {strftime:?}")));
        }

        Ok(Self {
            source: pattern.to_string(),
            strftime,
            has_offset,
        })
    }

    /// The pattern as the user wrote it.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The equivalent chrono format string.
    pub fn strftime(&self) -> &str {
        &self.strftime
    }

    /// Parse a value to epoch milliseconds.
    pub fn parse_to_millis(&self, value: &str) -> Option<f64> {
        let value = value.trim();
        if self.has_offset {
            return DateTime::parse_from_str(value, &self.strftime)
                .ok()
                .map(|dt| dt.timestamp_millis() as f64);
        }

        if let Ok(dt) = NaiveDateTime::parse_from_str(value, &self.strftime) {
            Some(dt.and_utc().timestamp_millis() as f64)
        } else if let Ok(d) = NaiveDate::parse_from_str(value, &self.strftime) {
            Some(d.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis() as f64)
        } else if let Ok(t) = NaiveTime::parse_from_str(value, &self.strftime) {
            let millis = t.num_seconds_from_midnight() as f64 * 1000.0
                + (t.nanosecond() / 1_000_000) as f64;
            Some(millis)
        } else {
            None
        }
    }

    /// Render epoch milliseconds with this pattern.
    pub fn format_millis(&self, millis: f64) -> String {
        format_millis(millis, &self.strftime)
    }
}

/// Format epoch milliseconds as UTC text using a chrono format string.
/// Falls back to the plain number when the value is out of range.
pub fn format_millis(millis: f64, strftime: &str) -> String {
    if !millis.is_finite() {
        return format!("{millis}");
    }
    match DateTime::<Utc>::from_timestamp_millis(millis.round() as i64) {
        Some(dt) => {
            let mut out = String::new();
            if write!(out, "{}", dt.format(strftime)).is_err() {
                return format!("{millis:.0}");
            }
            out
        }
        None => format!("{millis:.0}"),
    }
}
