//! Per-field input formats.
//!
//! A format spec is one of `number`, `number,<decimal-pattern>`, `date`,
//! `date,<date-pattern>`, `time` or `time,<date-pattern>`. Dates and times
//! parse to epoch milliseconds in UTC.

use std::fmt;
use std::str::FromStr;

use crate::data::datetime::{DatePattern, DEFAULT_DATE_PATTERN, DEFAULT_TIME_PATTERN};
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum InputFormat {
    /// Plain decimal number. Grouping commas are ignored.
    #[default]
    Number,
    /// Number following a `#,##0.00` style pattern.
    Decimal(DecimalPattern),
    /// Date or time, converted to epoch milliseconds.
    Date(DatePattern),
}

impl InputFormat {
    /// Parse one raw field. `None` means the text does not match the format.
    pub fn parse_value(&self, raw: &str) -> Option<f64> {
        match self {
            InputFormat::Number => parse_plain_number(raw),
            InputFormat::Decimal(pattern) => pattern.parse(raw),
            InputFormat::Date(pattern) => pattern.parse_to_millis(raw),
        }
    }

    pub fn is_date(&self) -> bool {
        matches!(self, InputFormat::Date(_))
    }
}

impl FromStr for InputFormat {
    type Err = ConfigError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let spec = spec.trim();
        let (kind, pattern) = match spec.split_once(',') {
            Some((kind, pattern)) => (kind, Some(pattern)),
            None => (spec, None),
        };
        match (kind, pattern) {
            ("number", None) => Ok(InputFormat::Number),
            ("number", Some(p)) => Ok(InputFormat::Decimal(DecimalPattern::compile(p)?)),
            ("date", p) => Ok(InputFormat::Date(DatePattern::compile(
                p.unwrap_or(DEFAULT_DATE_PATTERN),
            )?)),
            ("time", p) => Ok(InputFormat::Date(DatePattern::compile(
                p.unwrap_or(DEFAULT_TIME_PATTERN),
            )?)),
            _ => Err(ConfigError::UnknownFormat(spec.to_string())),
        }
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputFormat::Number => write!(f, "number"),
            InputFormat::Decimal(p) => write!(f, "number,{}", p.source),
            InputFormat::Date(p) => write!(f, "date,{}", p.source()),
        }
    }
}

fn parse_plain_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let cleaned: String = trimmed.chars().filter(|&c| c != ',').collect();
    if !cleaned
        .bytes()
        .any(|b| b.is_ascii_digit())
    {
        // Rejects "inf", "NaN" and friends, which are not numbers in a data file.
        return None;
    }
    cleaned.parse::<f64>().ok()
}

/// A compiled decimal pattern such as `#,##0.00`, `0.###E0`, `#%` or `$#,##0`.
#[derive(Debug, Clone, PartialEq)]
pub struct DecimalPattern {
    source: String,
    prefix: String,
    suffix: String,
    divisor: f64,
    grouping: bool,
    exponent: bool,
    min_fraction: usize,
    max_fraction: usize,
}

impl DecimalPattern {
    pub fn compile(pattern: &str) -> Result<Self, ConfigError> {
        // Only the positive subpattern matters for parsing.
        let positive = pattern.split(';').next().unwrap_or_default();
        let is_number_char = |c: char| matches!(c, '#' | '0' | ',' | '.' | 'E');

        let start = positive
            .char_indices()
            .find(|&(_, c)| c == '#' || c == '0')
            .map(|(i, _)| i)
            .ok_or_else(|| ConfigError::InvalidDecimalPattern(pattern.to_string()))?;
        let body_len = positive[start..]
            .char_indices()
            .find(|&(_, c)| !is_number_char(c) && !c.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(positive.len() - start);
        let body = &positive[start..start + body_len];
        let prefix = unquote(&positive[..start]);
        let suffix = unquote(&positive[start + body_len..]);

        let mut divisor = 1.0;
        for affix in [&prefix, &suffix] {
            if affix.contains('%') {
                divisor = 100.0;
            } else if affix.contains('\u{2030}') {
                divisor = 1000.0;
            }
        }

        let mantissa = body.split('E').next().unwrap_or_default();
        let fraction = mantissa.split_once('.').map(|(_, f)| f).unwrap_or_default();

        Ok(Self {
            source: pattern.to_string(),
            prefix,
            suffix,
            divisor,
            grouping: body.contains(','),
            exponent: body.contains('E'),
            min_fraction: fraction.chars().filter(|&c| c == '0').count(),
            max_fraction: fraction.chars().filter(|&c| c == '0' || c == '#').count(),
        })
    }

    /// Render a value with this pattern, the inverse of [`DecimalPattern::parse`].
    pub fn format(&self, value: f64) -> String {
        if !value.is_finite() {
            return format!("{value}");
        }
        let scaled = value * self.divisor;
        let sign = if scaled < 0.0 { "-" } else { "" };
        let magnitude = scaled.abs();

        let body = if self.exponent {
            let text = format!("{:.*e}", self.max_fraction, magnitude);
            let (mantissa, exp) = text.split_once('e').unwrap_or((text.as_str(), "0"));
            format!("{}E{exp}", trim_fraction(mantissa, self.min_fraction))
        } else {
            let text = format!("{:.*}", self.max_fraction, magnitude);
            let text = trim_fraction(&text, self.min_fraction);
            if self.grouping {
                group_thousands(&text)
            } else {
                text
            }
        };
        format!("{sign}{}{body}{}", self.prefix, self.suffix)
    }

    pub fn parse(&self, raw: &str) -> Option<f64> {
        let mut text = raw.trim();
        let negative = match text.strip_prefix('-') {
            Some(rest) => {
                text = rest;
                true
            }
            None => false,
        };
        text = text.strip_prefix(self.prefix.as_str())?;
        text = text.strip_suffix(self.suffix.as_str())?;

        let mut digits = String::with_capacity(text.len() + 1);
        if negative {
            digits.push('-');
        }
        for c in text.chars() {
            match c {
                ',' if self.grouping => {}
                '0'..='9' | '.' => digits.push(c),
                '-' | '+' if digits.ends_with('E') => digits.push(c),
                '-' if digits.is_empty() => digits.push(c),
                'E' | 'e' if self.exponent => digits.push('E'),
                _ => return None,
            }
        }
        if !digits.bytes().any(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse::<f64>().ok().map(|v| v / self.divisor)
    }
}

/// Drop trailing fraction zeros beyond `keep` digits, and a bare trailing point.
pub(crate) fn trim_fraction(text: &str, keep: usize) -> String {
    let Some(dot) = text.find('.') else {
        return text.to_string();
    };
    let mut end = text.len();
    while end > dot + 1 + keep && text.as_bytes()[end - 1] == b'0' {
        end -= 1;
    }
    if end == dot + 1 {
        end = dot;
    }
    text[..end].to_string()
}

fn group_thousands(text: &str) -> String {
    let (int, rest) = match text.find('.') {
        Some(dot) => text.split_at(dot),
        None => (text, ""),
    };
    let mut out = String::with_capacity(text.len() + int.len() / 3);
    for (i, c) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out.push_str(rest);
    out
}

/// Strip `'...'` quoting from a pattern affix.
fn unquote(affix: &str) -> String {
    let mut out = String::with_capacity(affix.len());
    let mut chars = affix.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\'' {
            if chars.peek() == Some(&'\'') {
                out.push('\'');
                chars.next();
            }
            continue;
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_format_specs() {
        assert_eq!("number".parse::<InputFormat>().unwrap(), InputFormat::Number);
        assert!(matches!(
            "number,#,##0.00".parse::<InputFormat>().unwrap(),
            InputFormat::Decimal(_)
        ));
        assert!("date".parse::<InputFormat>().unwrap().is_date());
        assert!("time,HH:mm:ss".parse::<InputFormat>().unwrap().is_date());
        assert!(matches!(
            "hex".parse::<InputFormat>(),
            Err(ConfigError::UnknownFormat(_))
        ));
        assert!(matches!(
            "number,abc".parse::<InputFormat>(),
            Err(ConfigError::InvalidDecimalPattern(_))
        ));
    }

    #[test]
    fn plain_numbers() {
        let f = InputFormat::Number;
        assert_eq!(f.parse_value(" 2.5 "), Some(2.5));
        assert_eq!(f.parse_value("-1e3"), Some(-1000.0));
        assert_eq!(f.parse_value("1,234"), Some(1234.0));
        assert_eq!(f.parse_value("abc"), None);
        assert_eq!(f.parse_value("inf"), None);
        assert_eq!(f.parse_value(""), None);
    }

    #[test]
    fn decimal_pattern_affixes_and_percent() {
        let money = DecimalPattern::compile("$#,##0.00").unwrap();
        assert_eq!(money.parse("$1,234.50"), Some(1234.5));
        assert_eq!(money.parse("-$3.00"), Some(-3.0));
        assert_eq!(money.parse("1234.50"), None);

        let pct = DecimalPattern::compile("#%").unwrap();
        assert_eq!(pct.parse("50%"), Some(0.5));

        let sci = DecimalPattern::compile("0.###E0").unwrap();
        assert_eq!(sci.parse("1.5E3"), Some(1500.0));
        assert_eq!(sci.parse("2E-2"), Some(0.02));
    }

    #[test]
    fn decimal_pattern_without_grouping_rejects_commas() {
        let p = DecimalPattern::compile("0.0").unwrap();
        assert_eq!(p.parse("1,5"), None);
        assert_eq!(p.parse("1.5"), Some(1.5));
    }

    #[test]
    fn decimal_pattern_formats() {
        let money = DecimalPattern::compile("$#,##0.00").unwrap();
        assert_eq!(money.format(1234.5), "$1,234.50");
        assert_eq!(money.format(-3.0), "-$3.00");

        let loose = DecimalPattern::compile("0.###").unwrap();
        assert_eq!(loose.format(2.5), "2.5");
        assert_eq!(loose.format(2.0), "2");

        let pct = DecimalPattern::compile("#%").unwrap();
        assert_eq!(pct.format(0.25), "25%");

        let sci = DecimalPattern::compile("0.##E0").unwrap();
        assert_eq!(sci.format(1500.0), "1.5E3");
    }

    #[test]
    fn date_format_parses_to_millis() {
        let f: InputFormat = "date,yyyy-MM-dd".parse().unwrap();
        assert_eq!(f.parse_value("1970-01-03"), Some(2.0 * 86_400_000.0));
    }
}
