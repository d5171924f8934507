//! The session clock both the pacer and the audio engine measure against.

use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use crossbeam_channel::select;
use tracing::debug;

use crate::sync::{Cancellation, Latch};

#[derive(Debug, Default)]
struct ClockInner {
    start: OnceLock<Instant>,
    started: Latch,
}

/// Monotonic reference fixed when the first frame is about to be presented.
#[derive(Debug, Clone, Default)]
pub struct Clock {
    inner: Arc<ClockInner>,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the clock now, or return the existing start instant.
    pub fn start(&self) -> Instant {
        self.start_at(Instant::now())
    }

    /// Start the clock at `instant` unless it already started.
    pub fn start_at(&self, instant: Instant) -> Instant {
        let start = *self.inner.start.get_or_init(|| instant);
        if self.inner.started.fire() {
            debug!("Clock started");
        }
        start
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.inner.start.get().copied()
    }

    /// Time since the clock started, zero before that.
    pub fn elapsed(&self) -> Duration {
        self.started_at().map_or(Duration::ZERO, |start| start.elapsed())
    }

    /// Block until the clock starts. Returns false if the session was
    /// cancelled first.
    pub fn wait_started(&self, cancel: &Cancellation) -> bool {
        if self.inner.started.is_fired() {
            return true;
        }
        select! {
            recv(self.inner.started.receiver()) -> _ => !cancel.is_cancelled(),
            recv(cancel.receiver()) -> _ => false,
        }
    }
}
