use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::data::parser::{LineOutcome, RowParser};
use crate::data::source::{ReaderState, Source};
use crate::error::SourceError;

/// How long a reader sleeps at end of file before polling again.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

enum Exit {
    Stopped,
    EndOfInput,
    Truncated,
    Superseded,
}

/// Body of a reader thread for one generation of `source`.
pub(crate) fn run(source: Source, generation: u64, stop: Arc<AtomicBool>) {
    match follow(&source, generation, &stop) {
        Ok(Exit::Truncated) => {
            source.set_state(generation, ReaderState::Closed);
            source.restart_after_truncation(generation);
            return;
        }
        Ok(Exit::EndOfInput) => tracing::info!("End of input on {}", source.name()),
        Ok(Exit::Stopped) | Ok(Exit::Superseded) => {
            tracing::debug!("Reader for {} (generation {generation}) finished", source.name());
        }
        Err(e) => tracing::error!("{e}"),
    }
    source.set_state(generation, ReaderState::Closed);
}

fn follow(source: &Source, generation: u64, stop: &AtomicBool) -> Result<Exit, SourceError> {
    let config = source.config().clone();
    let name = source.name();

    source.set_state(generation, ReaderState::Opening);
    // Length of the file when last looked at; truncation is any shrink below it.
    let mut observed_len: u64 = 0;
    let mut input: Box<dyn BufRead> = match config.path() {
        Some(path) => {
            let file = File::open(path).map_err(|e| SourceError::Open {
                path: path.clone(),
                source: e,
            })?;
            observed_len = file.metadata().map(|m| m.len()).unwrap_or(0);
            Box::new(BufReader::new(file))
        }
        None => Box::new(io::stdin().lock()),
    };

    let mut parser = RowParser::new(config.clone());
    let mut published = false;
    let mut line_number = 0usize;
    let mut pending: Vec<u8> = Vec::new();

    loop {
        // Checked ahead of the stop flag.
        if let Some(path) = config.path() {
            if let Ok(meta) = fs::metadata(path) {
                let len = meta.len();
                if len < observed_len && source.auto_restart() {
                    tracing::debug!("{name} shrank from {observed_len} to {len} bytes");
                    return Ok(Exit::Truncated);
                }
                observed_len = len;
            }
        }
        if stop.load(Ordering::Acquire) {
            drop(input);
            return Ok(Exit::Stopped);
        }

        let read = input
            .read_until(b'\n', &mut pending)
            .map_err(|e| SourceError::Read {
                name: name.clone(),
                source: e,
            })?;

        if read == 0 {
            if config.path().is_none() {
                if !pending.is_empty() {
                    line_number += 1;
                    if !deliver(source, generation, &mut parser, &mut published, line_number, &pending) {
                        return Ok(Exit::Superseded);
                    }
                }
                return Ok(Exit::EndOfInput);
            }
            source.set_state(generation, ReaderState::WaitingForData);
            thread::sleep(POLL_INTERVAL);
            continue;
        }

        // Half-written line; wait for the rest.
        if pending.last() != Some(&b'\n') {
            continue;
        }

        source.set_state(generation, ReaderState::Reading);
        line_number += 1;
        if !deliver(source, generation, &mut parser, &mut published, line_number, &pending) {
            return Ok(Exit::Superseded);
        }
        pending.clear();
    }
}

/// Parse one complete line and hand the result to the source.
/// Returns `false` when this reader's generation is no longer current.
fn deliver(
    source: &Source,
    generation: u64,
    parser: &mut RowParser,
    published: &mut bool,
    line_number: usize,
    raw: &[u8],
) -> bool {
    let text = String::from_utf8_lossy(raw);
    let line = text.trim_end_matches(['\n', '\r']);

    let outcome = parser.process_line(line_number, line);

    if !*published {
        if let Some(columns) = parser.columns() {
            if !source.publish_columns(generation, columns.clone()) {
                return false;
            }
            *published = true;
        }
    }

    match outcome {
        LineOutcome::Row(values) => source.push_row(generation, values),
        LineOutcome::Ignored | LineOutcome::Header | LineOutcome::Rejected(_) => true,
    }
}
