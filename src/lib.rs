//! Live plotting of delimited numeric data appended to files or piped on
//! standard input.
//!
//! Reader threads ([`data::source`]) turn lines into tuples and hand them to
//! the UI thread, which applies them to [`state::plot_state::PlotState`].

pub mod app;
pub mod cli;
pub mod data;
pub mod error;
pub mod processing;
pub mod state;
pub mod ui;
