//! Axis tick and editor text.

use std::fmt;

use crate::data::datetime::DatePattern;
use crate::data::format::{trim_fraction, DecimalPattern, InputFormat};
use crate::state::axis_state::AxisScale;

/// Digits used for tick labels.
pub const TICK_DIGITS: usize = 3;
/// Digits used in the min/max editors.
pub const EDITOR_DIGITS: usize = 9;

const PLAIN_MIN: f64 = 0.01;
const PLAIN_MAX: f64 = 999.5;

/// Plain notation for moderate magnitudes, `1.1E6` style otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultiscaleFormat {
    pub fraction_digits: usize,
}

impl MultiscaleFormat {
    pub const fn new(fraction_digits: usize) -> Self {
        Self { fraction_digits }
    }

    pub fn format(&self, value: f64) -> String {
        if value == 0.0 {
            return "0".to_string();
        }
        if !value.is_finite() {
            return format!("{value}");
        }
        let magnitude = value.abs();
        if (PLAIN_MIN..=PLAIN_MAX).contains(&magnitude) {
            let text = format!("{:.*}", self.fraction_digits, value);
            return trim_fraction(&text, 0);
        }
        let text = format!("{:.*e}", self.fraction_digits, value);
        match text.split_once('e') {
            Some((mantissa, exponent)) => format!("{}E{exponent}", trim_fraction(mantissa, 0)),
            None => text,
        }
    }
}

impl Default for MultiscaleFormat {
    fn default() -> Self {
        Self::new(TICK_DIGITS)
    }
}

/// How values on one axis are rendered as text.
#[derive(Debug, Clone, PartialEq)]
pub enum AxisFormat {
    Number(MultiscaleFormat),
    Decimal(DecimalPattern),
    Date(DatePattern),
}

impl Default for AxisFormat {
    fn default() -> Self {
        AxisFormat::Number(MultiscaleFormat::default())
    }
}

impl From<InputFormat> for AxisFormat {
    fn from(format: InputFormat) -> Self {
        match format {
            InputFormat::Number => AxisFormat::default(),
            InputFormat::Decimal(pattern) => AxisFormat::Decimal(pattern),
            InputFormat::Date(pattern) => AxisFormat::Date(pattern),
        }
    }
}

impl AxisFormat {
    /// The same format with editor precision.
    pub fn for_editor(&self) -> Self {
        match self {
            AxisFormat::Number(_) => AxisFormat::Number(MultiscaleFormat::new(EDITOR_DIGITS)),
            other => other.clone(),
        }
    }

    /// Format a raw (display space) value.
    pub fn format(&self, value: f64) -> String {
        match self {
            AxisFormat::Number(f) => f.format(value),
            AxisFormat::Decimal(p) => p.format(value),
            AxisFormat::Date(p) => p.format_millis(value),
        }
    }

    /// Format a value held in axis space, undoing a log transform first.
    pub fn format_axis_value(&self, value: f64, scale: AxisScale) -> String {
        self.format(scale.to_display(value))
    }

    /// Parse text typed into a min/max editor.
    pub fn parse(&self, text: &str) -> Option<f64> {
        match self {
            AxisFormat::Number(_) => text.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            AxisFormat::Decimal(p) => p.parse(text),
            AxisFormat::Date(p) => p.parse_to_millis(text),
        }
    }
}

impl fmt::Display for AxisFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisFormat::Number(_) => write!(f, "number"),
            AxisFormat::Decimal(p) => write!(f, "{}", InputFormat::Decimal(p.clone())),
            AxisFormat::Date(p) => write!(f, "date,{}", p.source()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiscale_plain_range() {
        let f = MultiscaleFormat::default();
        assert_eq!(f.format(1.0), "1");
        assert_eq!(f.format(0.0), "0");
        assert_eq!(f.format(12.3456), "12.346");
        assert_eq!(f.format(-0.5), "-0.5");
        assert_eq!(f.format(999.0), "999");
    }

    #[test]
    fn multiscale_exponential_range() {
        let f = MultiscaleFormat::default();
        assert_eq!(f.format(1e6), "1E6");
        assert_eq!(f.format(1.1e6), "1.1E6");
        assert_eq!(f.format(1e-6), "1E-6");
        assert_eq!(f.format(-1e6), "-1E6");
        assert_eq!(f.format(-1.1e6), "-1.1E6");
        assert_eq!(f.format(-1e-6), "-1E-6");
        assert_eq!(f.format(0.005), "5E-3");
    }

    #[test]
    fn editor_keeps_more_digits() {
        let f = AxisFormat::default().for_editor();
        assert_eq!(f.format(1.123456789), "1.123456789");
        assert_eq!(f.format(1234567.0), "1.234567E6");
    }

    #[test]
    fn log_axis_values_are_shown_raw() {
        let f = AxisFormat::default();
        assert_eq!(f.format_axis_value(3.0, AxisScale::Log10), "1E3");
        assert_eq!(f.format_axis_value(0.0, AxisScale::Log10), "1");
    }

    #[test]
    fn date_axis() {
        let f: AxisFormat = "date,yyyy-MM-dd".parse::<InputFormat>().unwrap().into();
        assert_eq!(f.format(86_400_000.0), "1970-01-02");
        assert_eq!(f.parse("1970-01-02"), Some(86_400_000.0));
    }
}
