//! A followed input and the buffer its reader thread hands rows through.
//!
//! The reader appends rows under a short-held lock and asks the scheduler for
//! a flush only when the buffer goes from empty to non-empty. The consumer
//! then takes everything in one [`Source::drain`] call. Every reader belongs to
//! a generation; rows from a superseded generation are refused.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::data::parser::{Column, ParseConfig};
use crate::data::reader;
use crate::error::SourceError;

/// Receives "source N has rows waiting" notifications.
pub trait FlushScheduler: Send + Sync {
    fn schedule_flush(&self, source_index: usize);
}

/// Scheduler that forwards indices over a channel and optionally wakes the UI.
pub struct ChannelScheduler {
    sender: Sender<usize>,
    waker: Option<Box<dyn Fn() + Send + Sync>>,
}

impl ChannelScheduler {
    /// Attach a callback run after every notification, e.g. a repaint request.
    pub fn with_waker(mut self, waker: impl Fn() + Send + Sync + 'static) -> Self {
        self.waker = Some(Box::new(waker));
        self
    }
}

impl FlushScheduler for ChannelScheduler {
    fn schedule_flush(&self, source_index: usize) {
        if self.sender.send(source_index).is_err() {
            tracing::debug!("Flush receiver dropped; source {source_index} notification lost");
            return;
        }
        if let Some(waker) = &self.waker {
            waker();
        }
    }
}

/// Create a channel-backed scheduler and the receiving end the consumer polls.
pub fn flush_channel() -> (ChannelScheduler, Receiver<usize>) {
    let (sender, receiver) = mpsc::channel();
    (
        ChannelScheduler {
            sender,
            waker: None,
        },
        receiver,
    )
}

/// Reader lifecycle as last reported by the current generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    Idle,
    Opening,
    Reading,
    WaitingForData,
    Restarting,
    Closed,
}

/// Everything drained from a source in one step.
#[derive(Debug, Clone)]
pub struct Batch {
    pub generation: u64,
    pub columns: Option<Arc<[Column]>>,
    pub rows: Vec<Vec<f64>>,
}

#[derive(Debug, Default)]
struct Handoff {
    generation: u64,
    columns: Option<Arc<[Column]>>,
    rows: Vec<Vec<f64>>,
    scheduled: bool,
}

#[derive(Debug)]
struct Lifecycle {
    started: bool,
    stop: Option<Arc<AtomicBool>>,
    state: ReaderState,
}

struct Inner {
    config: Arc<ParseConfig>,
    scheduler: Arc<dyn FlushScheduler>,
    handoff: Mutex<Handoff>,
    generation: AtomicU64,
    auto_restart: AtomicBool,
    lifecycle: Mutex<Lifecycle>,
}

/// Handle to one followed file or standard input. Cheap to clone.
#[derive(Clone)]
pub struct Source {
    inner: Arc<Inner>,
}

impl Source {
    pub fn new(config: ParseConfig, scheduler: Arc<dyn FlushScheduler>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config: Arc::new(config),
                scheduler,
                handoff: Mutex::new(Handoff::default()),
                generation: AtomicU64::new(0),
                auto_restart: AtomicBool::new(true),
                lifecycle: Mutex::new(Lifecycle {
                    started: false,
                    stop: None,
                    state: ReaderState::Idle,
                }),
            }),
        }
    }

    pub fn config(&self) -> &Arc<ParseConfig> {
        &self.inner.config
    }

    pub fn index(&self) -> usize {
        self.inner.config.index()
    }

    pub fn name(&self) -> String {
        self.inner.config.display_name()
    }

    /// Only files can be reopened.
    pub fn is_restartable(&self) -> bool {
        self.inner.config.path().is_some()
    }

    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }

    pub fn state(&self) -> ReaderState {
        self.inner.lifecycle.lock().state
    }

    pub fn auto_restart(&self) -> bool {
        self.inner.auto_restart.load(Ordering::Relaxed)
    }

    /// Enable or disable restarting when the file shrinks.
    pub fn set_auto_restart(&self, enabled: bool) {
        self.inner.auto_restart.store(enabled, Ordering::Relaxed);
    }

    /// Spawn the first reader. May only be called once.
    pub fn start(&self) -> Result<(), SourceError> {
        let mut lifecycle = self.inner.lifecycle.lock();
        if lifecycle.started {
            return Err(SourceError::AlreadyStarted(self.name()));
        }
        lifecycle.started = true;
        let generation = self.generation();
        tracing::info!("Following {} (generation {generation})", self.name());
        self.spawn_reader(&mut lifecycle, generation);
        Ok(())
    }

    /// Discard everything read so far and read the file again from the top.
    ///
    /// The buffered rows are cleared and a flush is scheduled so the consumer
    /// drops its data for this source before any row of the new generation.
    pub fn restart(&self) -> Result<(), SourceError> {
        if !self.is_restartable() {
            return Err(SourceError::NotRestartable(self.name()));
        }
        let mut lifecycle = self.inner.lifecycle.lock();
        if !lifecycle.started {
            return Err(SourceError::NotStarted(self.name()));
        }
        if let Some(stop) = lifecycle.stop.take() {
            stop.store(true, Ordering::Release);
        }
        lifecycle.state = ReaderState::Restarting;

        let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
        {
            let mut handoff = self.inner.handoff.lock();
            handoff.generation = generation;
            handoff.columns = None;
            handoff.rows.clear();
            handoff.scheduled = true;
        }
        self.inner.scheduler.schedule_flush(self.index());

        tracing::info!("Restarting {} (generation {generation})", self.name());
        self.spawn_reader(&mut lifecycle, generation);
        Ok(())
    }

    /// Ask the current reader to finish.
    ///
    /// A file reader sees the request within one poll interval, closes its
    /// file and reports [`ReaderState::Closed`]. A reader blocked on standard
    /// input cannot be woken; it exits once the read returns, and anything it
    /// produces after this call belongs to a stopped generation.
    pub fn stop(&self) -> Result<(), SourceError> {
        let mut lifecycle = self.inner.lifecycle.lock();
        if !lifecycle.started {
            return Err(SourceError::NotStarted(self.name()));
        }
        if let Some(stop) = lifecycle.stop.take() {
            stop.store(true, Ordering::Release);
            tracing::debug!("Stop requested for {}", self.name());
        }
        Ok(())
    }

    /// Take all buffered rows and the current binding.
    pub fn drain(&self) -> Batch {
        let mut handoff = self.inner.handoff.lock();
        handoff.scheduled = false;
        Batch {
            generation: handoff.generation,
            columns: handoff.columns.clone(),
            rows: std::mem::take(&mut handoff.rows),
        }
    }

    /// Called by a reader of `generation`. Returns `false` once superseded.
    pub(crate) fn push_row(&self, generation: u64, row: Vec<f64>) -> bool {
        let schedule = {
            let mut handoff = self.inner.handoff.lock();
            if handoff.generation != generation {
                return false;
            }
            handoff.rows.push(row);
            !std::mem::replace(&mut handoff.scheduled, true)
        };
        if schedule {
            self.inner.scheduler.schedule_flush(self.index());
        }
        true
    }

    pub(crate) fn publish_columns(&self, generation: u64, columns: Arc<[Column]>) -> bool {
        let schedule = {
            let mut handoff = self.inner.handoff.lock();
            if handoff.generation != generation {
                return false;
            }
            handoff.columns = Some(columns);
            !std::mem::replace(&mut handoff.scheduled, true)
        };
        if schedule {
            self.inner.scheduler.schedule_flush(self.index());
        }
        true
    }

    pub(crate) fn set_state(&self, generation: u64, state: ReaderState) {
        if self.generation() != generation {
            return;
        }
        let mut lifecycle = self.inner.lifecycle.lock();
        if lifecycle.state != state {
            tracing::trace!("{}: {:?} -> {state:?}", self.name(), lifecycle.state);
            lifecycle.state = state;
        }
    }

    /// Restart on behalf of a reader that saw its file shrink.
    pub(crate) fn restart_after_truncation(&self, generation: u64) {
        if self.generation() != generation || !self.auto_restart() {
            return;
        }
        tracing::info!("{} was truncated", self.name());
        if let Err(e) = self.restart() {
            tracing::error!("{e}");
        }
    }

    fn spawn_reader(&self, lifecycle: &mut Lifecycle, generation: u64) {
        let stop = Arc::new(AtomicBool::new(false));
        lifecycle.stop = Some(stop.clone());
        lifecycle.state = ReaderState::Opening;
        let source = self.clone();
        thread::spawn(move || reader::run(source, generation, stop));
    }
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source")
            .field("name", &self.name())
            .field("generation", &self.generation())
            .finish()
    }
}
