use regex::Regex;

use crate::error::ConfigError;

/// Separator used when none is configured: one or more commas, tabs or spaces.
pub const DEFAULT_SEPARATOR: &str = "[,\t ]+";

/// Splits raw text lines into fields.
#[derive(Debug, Clone)]
pub struct LineDecoder {
    separator: Regex,
}

impl LineDecoder {
    pub fn new(separator: &str) -> Result<Self, ConfigError> {
        let separator = Regex::new(separator).map_err(|source| ConfigError::InvalidSeparator {
            pattern: separator.to_string(),
            source,
        })?;
        Ok(Self { separator })
    }

    /// Decode one line. Lines that are blank after trimming, or whose trimmed
    /// text starts with `#`, yield `None` and must be ignored entirely.
    pub fn decode<'a>(&self, line: &'a str) -> Option<Vec<&'a str>> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return None;
        }
        Some(self.split(line))
    }

    /// Split text on the separator, dropping trailing empty fields.
    pub fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut fields: Vec<&str> = self.separator.split(text).collect();
        while fields.last().is_some_and(|f| f.is_empty()) {
            fields.pop();
        }
        fields
    }
}
