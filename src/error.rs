//! Error types for configuration, sources and row decoding.

use std::path::PathBuf;

use thiserror::Error;

/// Problems with the command line or per-source parse configuration.
///
/// All of these are fatal: they are reported before any reader starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid field separator {pattern:?}: {source}")]
    InvalidSeparator {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Unrecognized number format: {0}")]
    UnknownFormat(String),

    #[error("Invalid date pattern {pattern:?}: {reason}")]
    InvalidDatePattern { pattern: String, reason: String },

    #[error("Invalid decimal pattern {0:?}: no digit placeholder")]
    InvalidDecimalPattern(String),

    #[error("Field indices are 1-based, but {0} was given")]
    ZeroIndex(&'static str),

    #[error("Invalid field index list {0:?}")]
    InvalidIndexList(String),

    #[error("Invalid field format {0:?}, expected INDEX,FORMAT")]
    InvalidFieldFormat(String),

    #[error("Number of fields selected with --select ({selected}) does not match number of labels given with --fields ({labels})")]
    LabelCountMismatch { selected: usize, labels: usize },

    #[error("Field specified in --y2 ({0}) not present in --select")]
    Y2NotSelected(usize),

    #[error("Field specified in --y2 ({0}) is the X field and is never plotted")]
    Y2IsXField(usize),

    #[error("{0} must be used after file argument")]
    OptionBeforeFile(String),

    #[error("Invalid X value for scroll width: {0}")]
    InvalidScrollWidth(String),

    #[error(transparent)]
    Usage(#[from] clap::Error),
}

/// Errors raised by a source's reader or its lifecycle hooks.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Cannot open {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Read error on {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("start() has already been called for {0}")]
    AlreadyStarted(String),

    #[error("start() has not been called yet for {0}")]
    NotStarted(String),

    #[error("{0} cannot be restarted")]
    NotRestartable(String),
}

/// A row dropped because it has too few fields.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Expected at least {required} fields, but saw {observed} on line {line}")]
pub struct RowRejected {
    pub required: usize,
    pub observed: usize,
    pub line: usize,
}
