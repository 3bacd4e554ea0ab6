//! Command-line configuration.
//!
//! Per-source options bind to the nearest FILE before them, so
//! `tailplot a.log -x 1 b.log -s 2,3` gives `a.log` an X field and `b.log` a
//! selection. With a single input the options may also come first.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{ArgAction, ArgMatches, CommandFactory, FromArgMatches, Parser};

use crate::data::format::InputFormat;
use crate::data::parser::{ParseConfig, SourceConfig};
use crate::error::ConfigError;
use crate::ui::axis_format::AxisFormat;

#[derive(Parser, Debug)]
#[command(
    name = "tailplot",
    version,
    about = "Plot delimited numeric data as it is appended to files"
)]
pub struct Cli {
    /// Files to follow. Reads standard input when none are given.
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Display format of the X axis (number, number,PATTERN, date[,PATTERN], time[,PATTERN])
    #[arg(long, value_name = "FORMAT")]
    pub x_format: Option<String>,

    /// Display format of the Y axis
    #[arg(long, value_name = "FORMAT")]
    pub y_format: Option<String>,

    /// Display format of the Y2 axis
    #[arg(long, value_name = "FORMAT")]
    pub y2_format: Option<String>,

    /// Window title
    #[arg(short = 't', long)]
    pub title: Option<String>,

    /// Show only the trailing WIDTH X units
    #[arg(long, value_name = "WIDTH", allow_hyphen_values = true)]
    pub scroll_width: Option<String>,

    /// Do not restart when a followed file shrinks
    #[arg(long)]
    pub no_auto_restart: bool,

    /// Field separator regex [default: "[,\t ]+"]
    #[arg(short = 'F', long = "field-separator", value_name = "REGEX", action = ArgAction::Append)]
    pub field_separator: Vec<String>,

    /// Field names, split by the field separator
    #[arg(short = 'f', long = "fields", value_name = "NAMES", action = ArgAction::Append)]
    pub fields: Vec<String>,

    /// 1-based fields to plot, e.g. 2,3,5
    #[arg(short = 's', long = "select", value_name = "LIST", action = ArgAction::Append)]
    pub select: Vec<String>,

    /// 1-based fields to plot against the secondary Y axis
    #[arg(long = "y2", value_name = "LIST", action = ArgAction::Append)]
    pub y2: Vec<String>,

    /// 1-based field holding X; the row number is used otherwise
    #[arg(short = 'x', long = "x", value_name = "INDEX", action = ArgAction::Append)]
    pub x: Vec<String>,

    /// Input format of one field, e.g. 1,date,yyyy-MM-dd HH:mm:ss
    #[arg(long = "field-format", value_name = "INDEX,FORMAT", action = ArgAction::Append)]
    pub field_format: Vec<String>,

    /// First line holds column names
    #[arg(
        long = "header-line",
        num_args = 0,
        default_missing_value = "true",
        action = ArgAction::Append
    )]
    pub header_line: Vec<bool>,
}

/// Everything the application needs, validated.
#[derive(Debug)]
pub struct AppConfig {
    pub sources: Vec<ParseConfig>,
    pub title: String,
    pub x_format: AxisFormat,
    pub y_format: AxisFormat,
    pub y2_format: AxisFormat,
    pub scroll_width: Option<f64>,
    pub auto_restart: bool,
}

/// Parse the process arguments.
pub fn parse_args() -> Result<AppConfig, ConfigError> {
    parse_from(std::env::args_os())
}

pub fn parse_from<I, T>(args: I) -> Result<AppConfig, ConfigError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = Cli::command().try_get_matches_from(args)?;
    let cli = Cli::from_arg_matches(&matches)?;
    cli.into_config(&matches)
}

impl Cli {
    fn into_config(self, matches: &ArgMatches) -> Result<AppConfig, ConfigError> {
        let file_positions: Vec<usize> = matches
            .indices_of("files")
            .map(|i| i.collect())
            .unwrap_or_default();
        let source_count = self.files.len().max(1);
        let mut raw: Vec<SourceConfig> = if self.files.is_empty() {
            vec![SourceConfig::default()]
        } else {
            self.files.iter().cloned().map(SourceConfig::for_path).collect()
        };

        let owner = |id: &str, flag: &str| -> Result<Vec<usize>, ConfigError> {
            matches
                .indices_of(id)
                .into_iter()
                .flatten()
                .map(|position| {
                    match file_positions.iter().rposition(|&f| f < position) {
                        Some(source) => Ok(source),
                        None if file_positions.len() <= 1 => Ok(0),
                        None => Err(ConfigError::OptionBeforeFile(flag.to_string())),
                    }
                })
                .collect()
        };

        for (source, separator) in owner("field_separator", "--field-separator")?
            .into_iter()
            .zip(self.field_separator)
        {
            raw[source].separator = Some(separator);
        }
        for (source, names) in owner("fields", "--fields")?.into_iter().zip(self.fields) {
            raw[source].field_names = Some(names);
        }
        for (source, list) in owner("select", "--select")?.into_iter().zip(self.select) {
            raw[source].selection = Some(parse_index_list(&list)?);
        }
        for (source, list) in owner("y2", "--y2")?.into_iter().zip(self.y2) {
            raw[source].y2 = Some(parse_index_list(&list)?);
        }
        for (source, index) in owner("x", "--x")?.into_iter().zip(self.x) {
            raw[source].x_field = Some(parse_index(&index)?);
        }
        for (source, spec) in owner("field_format", "--field-format")?
            .into_iter()
            .zip(self.field_format)
        {
            raw[source].field_formats.push(parse_field_format(&spec)?);
        }
        for (source, on) in owner("header_line", "--header-line")?
            .into_iter()
            .zip(self.header_line)
        {
            raw[source].header_line = on;
        }

        let sources = raw
            .into_iter()
            .enumerate()
            .map(|(index, config)| config.validate(index, source_count))
            .collect::<Result<Vec<_>, _>>()?;

        let x_format = match &self.x_format {
            Some(spec) => spec.parse::<InputFormat>()?.into(),
            None => sources
                .first()
                .filter(|s| s.x_format().is_date())
                .map(|s| AxisFormat::from(s.x_format().clone()))
                .unwrap_or_default(),
        };
        let y_format = display_format(self.y_format.as_deref())?;
        let y2_format = display_format(self.y2_format.as_deref())?;

        // Read in X display units, so a time axis takes e.g. `00:05:00`.
        let scroll_width = self
            .scroll_width
            .as_deref()
            .map(|w| {
                x_format
                    .parse(w)
                    .or_else(|| InputFormat::Number.parse_value(w))
                    .filter(|&width| width > 0.0)
                    .ok_or_else(|| ConfigError::InvalidScrollWidth(w.to_string()))
            })
            .transpose()?;

        let title = self.title.unwrap_or_else(|| {
            sources
                .iter()
                .map(ParseConfig::display_name)
                .collect::<Vec<_>>()
                .join(", ")
        });
        let auto_restart = !self.no_auto_restart && sources.iter().all(|s| s.path().is_some());

        Ok(AppConfig {
            sources,
            title,
            x_format,
            y_format,
            y2_format,
            scroll_width,
            auto_restart,
        })
    }
}

fn display_format(spec: Option<&str>) -> Result<AxisFormat, ConfigError> {
    Ok(match spec {
        Some(spec) => spec.parse::<InputFormat>()?.into(),
        None => AxisFormat::default(),
    })
}

fn parse_index(text: &str) -> Result<usize, ConfigError> {
    text.trim()
        .parse::<usize>()
        .map_err(|_| ConfigError::InvalidIndexList(text.to_string()))
}

/// `"1,3, 4"` -> `[1, 3, 4]`
fn parse_index_list(text: &str) -> Result<Vec<usize>, ConfigError> {
    text.split(',')
        .map(|part| {
            part.trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidIndexList(text.to_string()))
        })
        .collect()
}

/// `"2,date,yyyy-MM-dd"` -> `(2, Date(..))`
fn parse_field_format(spec: &str) -> Result<(usize, InputFormat), ConfigError> {
    let (index, format) = spec
        .split_once(',')
        .ok_or_else(|| ConfigError::InvalidFieldFormat(spec.to_string()))?;
    let index = index
        .trim()
        .parse::<usize>()
        .map_err(|_| ConfigError::InvalidFieldFormat(spec.to_string()))?;
    Ok((index, format.parse()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<AppConfig, ConfigError> {
        parse_from(std::iter::once("tailplot").chain(args.iter().copied()))
    }

    #[test]
    fn no_files_reads_stdin() {
        let config = parse(&["--header-line", "-s", "1,2"]).unwrap();
        assert_eq!(config.sources.len(), 1);
        assert!(config.sources[0].path().is_none());
        assert_eq!(config.title, "<standard input>");
        assert!(!config.auto_restart);
    }

    #[test]
    fn options_attach_to_preceding_file() {
        let config = parse(&["a.log", "-x", "1", "b.log", "--y2", "3", "-s", "2,3"]).unwrap();
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.title, "a.log, b.log");
        assert!(config.auto_restart);

        let mut a = crate::data::parser::RowParser::new(config.sources[0].clone().into());
        a.process_line(1, "10 20");
        assert_eq!(a.columns().unwrap().len(), 1);

        let mut b = crate::data::parser::RowParser::new(config.sources[1].clone().into());
        b.process_line(1, "1 2 3");
        let names: Vec<_> = b.columns().unwrap().iter().map(|c| c.name.clone()).collect();
        assert_eq!(names, vec!["Column 1 (file 2) (Y1)", "Column 2 (file 2) (Y2)"]);
    }

    #[test]
    fn single_file_accepts_leading_options() {
        let config = parse(&["-s", "2", "data.csv"]).unwrap();
        let mut p = crate::data::parser::RowParser::new(config.sources[0].clone().into());
        assert!(matches!(
            p.process_line(1, "1"),
            crate::data::parser::LineOutcome::Rejected(_)
        ));
    }

    #[test]
    fn leading_option_with_several_files_is_an_error() {
        assert!(matches!(
            parse(&["-x", "1", "a.log", "b.log"]),
            Err(ConfigError::OptionBeforeFile(flag)) if flag == "--x"
        ));
    }

    #[test]
    fn bad_values_are_config_errors() {
        assert!(matches!(
            parse(&["-s", "1,two", "a.log"]),
            Err(ConfigError::InvalidIndexList(_))
        ));
        assert!(matches!(
            parse(&["--field-format", "date", "a.log"]),
            Err(ConfigError::InvalidFieldFormat(_))
        ));
        assert!(matches!(
            parse(&["--field-format", "1,hex", "a.log"]),
            Err(ConfigError::UnknownFormat(_))
        ));
        assert!(matches!(
            parse(&["--scroll-width", "wide", "a.log"]),
            Err(ConfigError::InvalidScrollWidth(_))
        ));
        assert!(matches!(
            parse(&["-s", "1,2", "--y2", "3", "a.log"]),
            Err(ConfigError::Y2NotSelected(3))
        ));
        assert!(matches!(
            parse(&["-F", "(", "a.log"]),
            Err(ConfigError::InvalidSeparator { .. })
        ));
    }

    #[test]
    fn date_x_field_sets_axis_format() {
        let config = parse(&["-x", "1", "--field-format", "1,date,yyyy-MM-dd", "a.log"]).unwrap();
        assert!(matches!(config.x_format, AxisFormat::Date(_)));
        assert!(matches!(config.y_format, AxisFormat::Number(_)));
    }

    #[test]
    fn scroll_width_must_be_positive() {
        for width in ["0", "-5"] {
            assert!(matches!(
                parse(&["--scroll-width", width, "a.log"]),
                Err(ConfigError::InvalidScrollWidth(w)) if w == width
            ));
        }
    }

    #[test]
    fn scroll_width_uses_x_display_format() {
        let config = parse(&[
            "--x-format",
            "time,HH:mm:ss",
            "--scroll-width",
            "00:05:00",
            "a.log",
        ])
        .unwrap();
        assert_eq!(config.scroll_width, Some(300_000.0));
    }

    #[test]
    fn general_options() {
        let config = parse(&["--scroll-width", "60", "-t", "Load", "--no-auto-restart", "a.log"])
            .unwrap();
        assert_eq!(config.scroll_width, Some(60.0));
        assert_eq!(config.title, "Load");
        assert!(!config.auto_restart);
    }
}
