//! Releases converted frames at the source frame rate.

use std::thread;
use std::time::{Duration, Instant};

use glyphreel_core::DisplayFrame;
use tracing::{debug, trace};

use crate::clock::Clock;
use crate::queue::{Inlet, Outlet, Recv};
use crate::sync::Cancellation;

/// Fixed schedule of frame deadlines.
///
/// Deadline `n` is always `start + n * interval`; a late frame never shifts
/// the ones after it.
#[derive(Debug, Clone, Copy)]
pub struct FrameSchedule {
    next: Instant,
    interval: Duration,
}

impl FrameSchedule {
    pub const fn new(start: Instant, interval: Duration) -> Self {
        Self {
            next: start,
            interval,
        }
    }

    /// Deadline for the next frame, advancing the schedule by one interval.
    pub fn next_deadline(&mut self) -> Instant {
        let deadline = self.next;
        self.next += self.interval;
        deadline
    }

    pub const fn interval(&self) -> Duration {
        self.interval
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacerState {
    Idle,
    Running,
    Stopped,
}

/// The pacing stage.
pub struct Pacer {
    input: Inlet<DisplayFrame>,
    output: Outlet<DisplayFrame>,
    clock: Clock,
    cancel: Cancellation,
    interval: Duration,
    state: PacerState,
    schedule: Option<FrameSchedule>,
    released: u64,
}

impl Pacer {
    pub const fn new(
        input: Inlet<DisplayFrame>,
        output: Outlet<DisplayFrame>,
        clock: Clock,
        cancel: Cancellation,
        interval: Duration,
    ) -> Self {
        Self {
            input,
            output,
            clock,
            cancel,
            interval,
            state: PacerState::Idle,
            schedule: None,
            released: 0,
        }
    }

    pub const fn state(&self) -> PacerState {
        self.state
    }

    /// Run until the input closes or the session is cancelled, returning the
    /// state the pacer ended in.
    ///
    /// On end of stream the output is closed and the pacer is `Stopped`; on
    /// cancellation it exits where it was and downstream sees the
    /// cancellation instead.
    pub fn run(mut self) -> PacerState {
        let _guard = self.cancel.guard("pacer");
        debug!("Pacer started, interval {:?}", self.interval);

        loop {
            let frame = match self.input.recv() {
                Recv::Item(frame) => frame,
                Recv::Closed => {
                    debug!("Pacer input closed after {} frames", self.released);
                    // The audio path waits on the clock, even for a source
                    // without a single frame.
                    self.clock.start();
                    break;
                }
                Recv::Cancelled => return self.state,
            };

            let deadline = self.next_deadline();
            let now = Instant::now();
            if deadline > now {
                thread::sleep(deadline - now);
            } else if deadline < now {
                debug!("Frame {} late by {:?}", self.released, now - deadline);
            }

            if self.output.send(frame).is_err() {
                return self.state;
            }
            self.released += 1;
        }

        PacerState::Stopped
    }

    fn next_deadline(&mut self) -> Instant {
        let interval = self.interval;
        let clock = &self.clock;
        let schedule = self.schedule.get_or_insert_with(|| {
            let start = clock.start();
            trace!("First frame, clock started");
            FrameSchedule::new(start, interval)
        });
        self.state = PacerState::Running;
        schedule.next_deadline()
    }
}
