//! Column binding and row parsing for one source.
//!
//! The first usable line of a source fixes which fields are plotted, their
//! names and their Y axis. Every later line is turned into a numeric tuple
//! `[x, y1, y2, ...]` against that binding.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::data::decoder::{LineDecoder, DEFAULT_SEPARATOR};
use crate::data::format::InputFormat;
use crate::error::{ConfigError, RowRejected};

/// Which Y axis a column is plotted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum YAxis {
    Y1,
    Y2,
}

impl fmt::Display for YAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YAxis::Y1 => write!(f, "Y1"),
            YAxis::Y2 => write!(f, "Y2"),
        }
    }
}

/// A plotted field. Immutable once bound.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    /// 1-based index of the field in the raw line.
    pub field: usize,
    pub axis: YAxis,
    pub format: InputFormat,
}

/// Parse options for one source, as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct SourceConfig {
    /// File to follow; `None` reads standard input.
    pub path: Option<PathBuf>,
    pub separator: Option<String>,
    /// Field names, separated by the field separator.
    pub field_names: Option<String>,
    /// 1-based field indices to plot.
    pub selection: Option<Vec<usize>>,
    /// 1-based (pre-selection) field indices routed to the Y2 axis.
    pub y2: Option<Vec<usize>>,
    /// 1-based index of the X field; `None` uses the row counter.
    pub x_field: Option<usize>,
    pub field_formats: Vec<(usize, InputFormat)>,
    pub header_line: bool,
}

impl SourceConfig {
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Validate and freeze the configuration for the source at `index`.
    pub fn validate(self, index: usize, source_count: usize) -> Result<ParseConfig, ConfigError> {
        let decoder = LineDecoder::new(self.separator.as_deref().unwrap_or(DEFAULT_SEPARATOR))?;

        if self.selection.iter().flatten().any(|&i| i == 0) {
            return Err(ConfigError::ZeroIndex("--select"));
        }
        if self.y2.iter().flatten().any(|&i| i == 0) {
            return Err(ConfigError::ZeroIndex("--y2"));
        }
        if self.x_field == Some(0) {
            return Err(ConfigError::ZeroIndex("--x"));
        }
        if self.field_formats.iter().any(|(i, _)| *i == 0) {
            return Err(ConfigError::ZeroIndex("--field-format"));
        }

        for &ix in self.y2.iter().flatten() {
            match &self.selection {
                Some(selection) if !selection.contains(&ix) => {
                    return Err(ConfigError::Y2NotSelected(ix));
                }
                None if self.x_field == Some(ix) => return Err(ConfigError::Y2IsXField(ix)),
                _ => {}
            }
        }

        let field_names = self
            .field_names
            .as_deref()
            .map(|names| decoder.split(names).into_iter().map(str::to_string).collect::<Vec<_>>());
        if let (Some(selection), Some(names)) = (&self.selection, &field_names) {
            if selection.len() != names.len() {
                return Err(ConfigError::LabelCountMismatch {
                    selected: selection.len(),
                    labels: names.len(),
                });
            }
        }

        let field_formats: HashMap<usize, InputFormat> = self.field_formats.into_iter().collect();
        let x_format = self
            .x_field
            .and_then(|x| field_formats.get(&x).cloned())
            .unwrap_or_default();
        let min_field_count = self
            .selection
            .iter()
            .flatten()
            .copied()
            .chain(self.x_field)
            .max()
            .unwrap_or(0);

        Ok(ParseConfig {
            index,
            source_count,
            path: self.path,
            decoder,
            header_line: self.header_line,
            field_names,
            selection: self.selection,
            y2: self.y2,
            x_field: self.x_field,
            x_format,
            field_formats,
            min_field_count,
        })
    }
}

/// Validated, immutable parse configuration of a source.
#[derive(Debug, Clone)]
pub struct ParseConfig {
    index: usize,
    source_count: usize,
    path: Option<PathBuf>,
    decoder: LineDecoder,
    header_line: bool,
    field_names: Option<Vec<String>>,
    selection: Option<Vec<usize>>,
    y2: Option<Vec<usize>>,
    x_field: Option<usize>,
    x_format: InputFormat,
    field_formats: HashMap<usize, InputFormat>,
    min_field_count: usize,
}

impl ParseConfig {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    pub fn x_format(&self) -> &InputFormat {
        &self.x_format
    }

    /// Human readable name of the source for titles and diagnostics.
    pub fn display_name(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => "<standard input>".to_string(),
        }
    }

    fn synthesized_name(&self, position: usize) -> String {
        if self.source_count > 1 {
            format!("Column {} (file {})", position + 1, self.index + 1)
        } else {
            format!("Column {}", position + 1)
        }
    }
}

/// What became of one raw line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    /// Blank or comment line.
    Ignored,
    /// Header line consumed for naming; no tuple.
    Header,
    /// Too few fields; dropped.
    Rejected(RowRejected),
    /// `[x, y1, y2, ...]`
    Row(Vec<f64>),
}

/// Turns the lines of one source into numeric tuples.
///
/// A fresh parser is created for every reader generation, so its row counter
/// and binding start over on restart.
#[derive(Debug)]
pub struct RowParser {
    config: Arc<ParseConfig>,
    selection: Option<Vec<usize>>,
    columns: Option<Arc<[Column]>>,
    min_field_count: usize,
    rows_emitted: u64,
    /// Header mode: the first usable line has not been consumed yet.
    header_pending: bool,
}

impl RowParser {
    pub fn new(config: Arc<ParseConfig>) -> Self {
        let min_field_count = config.min_field_count;
        let header_pending = config.header_line;
        Self {
            config,
            selection: None,
            columns: None,
            min_field_count,
            rows_emitted: 0,
            header_pending,
        }
    }

    /// Bound columns, once the first usable line has been seen.
    pub fn columns(&self) -> Option<&Arc<[Column]>> {
        self.columns.as_ref()
    }

    /// Number of tuples emitted so far.
    pub fn rows_emitted(&self) -> u64 {
        self.rows_emitted
    }

    /// Decode, bind if needed, and parse one line. `line_number` is 1-based.
    pub fn process_line(&mut self, line_number: usize, line: &str) -> LineOutcome {
        let Some(fields) = self.config.decoder.decode(line) else {
            return LineOutcome::Ignored;
        };

        if self.columns.is_none() {
            // In header mode the first usable line is the header even when
            // it is too short to bind from.
            let header = std::mem::take(&mut self.header_pending);
            if let Err(rejected) = self.bind_from(&fields, line_number, header) {
                tracing::warn!("{rejected}");
                return LineOutcome::Rejected(rejected);
            }
            if header {
                return LineOutcome::Header;
            }
        }

        match self.parse_row(&fields, line_number) {
            Ok(values) => LineOutcome::Row(values),
            Err(rejected) => {
                tracing::warn!("{rejected}");
                LineOutcome::Rejected(rejected)
            }
        }
    }

    /// Resolve the selection, names and axes from the first usable line.
    ///
    /// In header mode names are taken from `fields` only while the header
    /// line is still pending.
    pub fn bind(&mut self, fields: &[&str], line_number: usize) -> Result<(), RowRejected> {
        let header = self.header_pending;
        self.bind_from(fields, line_number, header)
    }

    fn bind_from(
        &mut self,
        fields: &[&str],
        line_number: usize,
        header: bool,
    ) -> Result<(), RowRejected> {
        self.check_shape(fields, line_number)?;
        let config = &self.config;

        let selection = match &config.selection {
            Some(selection) => selection.clone(),
            // Plotting X against itself would only draw a diagonal.
            None => (1..=fields.len())
                .filter(|&f| Some(f) != config.x_field)
                .collect(),
        };

        if let Some(names) = &config.field_names {
            if names.len() != selection.len() {
                tracing::warn!(
                    "{} field names given for {} plotted fields in {}",
                    names.len(),
                    selection.len(),
                    config.display_name()
                );
            }
        }
        for &ix in config.y2.iter().flatten() {
            if !selection.contains(&ix) {
                tracing::warn!(
                    "Field {ix} is routed to Y2 but {} only has {} fields",
                    config.display_name(),
                    fields.len()
                );
            }
        }

        let columns: Vec<Column> = selection
            .iter()
            .enumerate()
            .map(|(position, &field)| {
                let base = match &config.field_names {
                    Some(names) => names
                        .get(position)
                        .cloned()
                        .unwrap_or_else(|| config.synthesized_name(position)),
                    None if header => fields[field - 1].to_string(),
                    None => config.synthesized_name(position),
                };
                let axis = if config.y2.iter().flatten().any(|&ix| ix == field) {
                    YAxis::Y2
                } else {
                    YAxis::Y1
                };
                let name = if config.y2.is_some() {
                    format!("{base} ({axis})")
                } else {
                    base
                };
                Column {
                    name,
                    field,
                    axis,
                    format: config.field_formats.get(&field).cloned().unwrap_or_default(),
                }
            })
            .collect();

        tracing::debug!(
            "Bound {} columns for {}: {:?}",
            columns.len(),
            config.display_name(),
            columns.iter().map(|c| c.name.as_str()).collect::<Vec<_>>()
        );

        self.min_field_count = selection
            .iter()
            .copied()
            .chain(config.x_field)
            .max()
            .unwrap_or(0)
            .max(config.min_field_count);
        self.selection = Some(selection);
        self.columns = Some(columns.into());
        Ok(())
    }

    /// Produce `[x, y1, y2, ...]` for a bound source.
    ///
    /// Unparsable values become `NaN`; the row is still emitted.
    pub fn parse_row(&mut self, fields: &[&str], line_number: usize) -> Result<Vec<f64>, RowRejected> {
        if self.columns.is_none() {
            self.bind_from(fields, line_number, false)?;
        }
        self.check_shape(fields, line_number)?;

        let (Some(columns), Some(selection)) = (&self.columns, &self.selection) else {
            return Ok(Vec::new());
        };

        let mut values = Vec::with_capacity(columns.len() + 1);
        let x = match self.config.x_field {
            None => self.rows_emitted as f64,
            Some(x_field) => {
                let raw = fields[x_field - 1];
                self.config.x_format.parse_value(raw).unwrap_or_else(|| {
                    tracing::warn!("Invalid X value on line {line_number}: {raw}");
                    f64::NAN
                })
            }
        };
        values.push(x);

        for (column, &field) in columns.iter().zip(selection) {
            let raw = fields[field - 1];
            let value = column.format.parse_value(raw).unwrap_or_else(|| {
                tracing::warn!(
                    "Invalid value on line {line_number} for \"{}\": {raw}",
                    column.name
                );
                f64::NAN
            });
            values.push(value);
        }

        self.rows_emitted += 1;
        Ok(values)
    }

    fn check_shape(&self, fields: &[&str], line_number: usize) -> Result<(), RowRejected> {
        if fields.len() < self.min_field_count {
            return Err(RowRejected {
                required: self.min_field_count,
                observed: fields.len(),
                line: line_number,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser(config: SourceConfig) -> RowParser {
        RowParser::new(Arc::new(config.validate(0, 1).unwrap()))
    }

    fn feed(parser: &mut RowParser, text: &str) -> Vec<LineOutcome> {
        text.lines()
            .enumerate()
            .map(|(i, line)| parser.process_line(i + 1, line))
            .collect()
    }

    fn names(parser: &RowParser) -> Vec<String> {
        parser
            .columns()
            .map(|c| c.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn default_binding_uses_row_counter_as_x() {
        let mut p = parser(SourceConfig::default());
        let outcomes = feed(&mut p, "1,2\n3,4\n5,6\n");
        assert_eq!(names(&p), vec!["Column 1", "Column 2"]);
        assert_eq!(
            outcomes,
            vec![
                LineOutcome::Row(vec![0.0, 1.0, 2.0]),
                LineOutcome::Row(vec![1.0, 3.0, 4.0]),
                LineOutcome::Row(vec![2.0, 5.0, 6.0]),
            ]
        );
        assert_eq!(p.rows_emitted(), 3);
    }

    #[test]
    fn blank_and_comment_lines_do_not_count() {
        let mut p = parser(SourceConfig::default());
        let outcomes = feed(&mut p, "# header comment\n\n1 2\n   \n3 4\n");
        assert_eq!(outcomes[0], LineOutcome::Ignored);
        assert_eq!(outcomes[1], LineOutcome::Ignored);
        assert_eq!(outcomes[3], LineOutcome::Ignored);
        assert_eq!(p.rows_emitted(), 2);
        assert_eq!(outcomes[4], LineOutcome::Row(vec![1.0, 3.0, 4.0]));
    }

    #[test]
    fn x_field_is_excluded_from_default_selection() {
        let mut p = parser(SourceConfig {
            x_field: Some(2),
            ..Default::default()
        });
        let outcomes = feed(&mut p, "10 100 20\n11 101 21\n");
        assert_eq!(names(&p), vec!["Column 1", "Column 2"]);
        let columns = p.columns().unwrap();
        assert_eq!(columns[0].field, 1);
        assert_eq!(columns[1].field, 3);
        assert_eq!(outcomes[1], LineOutcome::Row(vec![101.0, 11.0, 21.0]));
    }

    #[test]
    fn short_row_is_rejected_without_counting() {
        let mut p = parser(SourceConfig {
            selection: Some(vec![1, 2, 3]),
            ..Default::default()
        });
        let outcomes = feed(&mut p, "1 2 3\n4 5\n6 7 8\n");
        assert_eq!(
            outcomes[1],
            LineOutcome::Rejected(RowRejected {
                required: 3,
                observed: 2,
                line: 2
            })
        );
        assert_eq!(p.rows_emitted(), 2);
        assert_eq!(outcomes[2], LineOutcome::Row(vec![1.0, 6.0, 7.0, 8.0]));
    }

    #[test]
    fn rejected_first_row_does_not_bind() {
        let mut p = parser(SourceConfig {
            selection: Some(vec![3]),
            ..Default::default()
        });
        let outcomes = feed(&mut p, "1 2\n1 2 3\n");
        assert!(matches!(outcomes[0], LineOutcome::Rejected(_)));
        assert_eq!(names(&p), vec!["Column 1"]);
        assert_eq!(outcomes[1], LineOutcome::Row(vec![0.0, 3.0]));
    }

    #[test]
    fn header_names_columns_and_emits_nothing() {
        let mut p = parser(SourceConfig {
            header_line: true,
            selection: Some(vec![3, 1]),
            ..Default::default()
        });
        let outcomes = feed(&mut p, "time,speed,temp\n1,2,3\n");
        assert_eq!(outcomes[0], LineOutcome::Header);
        assert_eq!(names(&p), vec!["temp", "time"]);
        assert_eq!(outcomes[1], LineOutcome::Row(vec![0.0, 3.0, 1.0]));
        assert_eq!(p.rows_emitted(), 1);
    }

    #[test]
    fn short_header_line_is_still_consumed() {
        let mut p = parser(SourceConfig {
            header_line: true,
            selection: Some(vec![2, 3]),
            ..Default::default()
        });
        let outcomes = feed(&mut p, "temp\n1 2 3\n4 5 6\n");
        assert!(matches!(outcomes[0], LineOutcome::Rejected(_)));
        assert_eq!(outcomes[1], LineOutcome::Row(vec![0.0, 2.0, 3.0]));
        assert_eq!(outcomes[2], LineOutcome::Row(vec![1.0, 5.0, 6.0]));
        assert_eq!(names(&p), vec!["Column 1", "Column 2"]);
    }

    #[test]
    fn explicit_names_win_over_header() {
        let mut p = parser(SourceConfig {
            header_line: true,
            field_names: Some("a b".to_string()),
            ..Default::default()
        });
        let outcomes = feed(&mut p, "x y\n1 2\n");
        assert_eq!(outcomes[0], LineOutcome::Header);
        assert_eq!(names(&p), vec!["a", "b"]);
    }

    #[test]
    fn y2_assignment_follows_selection() {
        let mut p = parser(SourceConfig {
            selection: Some(vec![1, 3]),
            y2: Some(vec![3]),
            ..Default::default()
        });
        feed(&mut p, "1 2 3\n");
        let columns = p.columns().unwrap();
        assert_eq!(columns[0].axis, YAxis::Y1);
        assert_eq!(columns[1].axis, YAxis::Y2);
        assert_eq!(names(&p), vec!["Column 1 (Y1)", "Column 2 (Y2)"]);
    }

    #[test]
    fn bad_values_become_nan_and_row_is_kept() {
        let mut p = parser(SourceConfig {
            x_field: Some(1),
            ..Default::default()
        });
        let outcomes = feed(&mut p, "oops 1 x\n");
        let LineOutcome::Row(values) = &outcomes[0] else {
            panic!("expected a row, got {:?}", outcomes[0]);
        };
        assert_eq!(values.len(), 3);
        assert!(values[0].is_nan());
        assert_eq!(values[1], 1.0);
        assert!(values[2].is_nan());
        assert_eq!(p.rows_emitted(), 1);
    }

    #[test]
    fn field_formats_apply_to_x_and_columns() {
        let mut p = parser(SourceConfig {
            x_field: Some(1),
            field_formats: vec![
                (1, "date,yyyy-MM-dd".parse().unwrap()),
                (2, "number,#%".parse().unwrap()),
            ],
            ..Default::default()
        });
        let outcomes = feed(&mut p, "1970-01-02 50%\n");
        assert_eq!(outcomes[0], LineOutcome::Row(vec![86_400_000.0, 0.5]));
    }

    #[test]
    fn multiple_sources_suffix_synthesized_names() {
        let config = SourceConfig::default().validate(1, 2).unwrap();
        let mut p = RowParser::new(Arc::new(config));
        p.process_line(1, "1 2");
        assert_eq!(names(&p), vec!["Column 1 (file 2)", "Column 2 (file 2)"]);
    }

    #[test]
    fn configuration_errors() {
        let y2_outside = SourceConfig {
            selection: Some(vec![1, 2]),
            y2: Some(vec![3]),
            ..Default::default()
        };
        assert!(matches!(
            y2_outside.validate(0, 1),
            Err(ConfigError::Y2NotSelected(3))
        ));

        let y2_on_x = SourceConfig {
            x_field: Some(1),
            y2: Some(vec![1]),
            ..Default::default()
        };
        assert!(matches!(y2_on_x.validate(0, 1), Err(ConfigError::Y2IsXField(1))));

        let labels = SourceConfig {
            selection: Some(vec![1, 2]),
            field_names: Some("only".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            labels.validate(0, 1),
            Err(ConfigError::LabelCountMismatch {
                selected: 2,
                labels: 1
            })
        ));

        let zero = SourceConfig {
            selection: Some(vec![0]),
            ..Default::default()
        };
        assert!(matches!(zero.validate(0, 1), Err(ConfigError::ZeroIndex(_))));
    }
}
