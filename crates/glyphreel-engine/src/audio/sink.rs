//! The seam between the audio engine and an output device.

use std::fmt::Display;

use glyphreel_core::{Error, Result, StereoSample};
use tracing::{debug, error};

use crate::audio::streamer::{AudioStreamer, Fill, SyncTolerance};
use crate::sync::{Cancellation, Latch};

const SILENCE: StereoSample = [0.0, 0.0];

/// A running output stream. Dropping it stops the device.
pub trait SinkStream {
    /// Frames the device buffers ahead of playback, when known.
    fn latency_frames(&self) -> Option<u32> {
        None
    }
}

/// A real-time audio output device.
pub trait AudioSink: Send {
    /// The rate the device runs at on its own, if it can tell. Audio decoded
    /// at this rate plays without the device having to convert it.
    fn native_rate(&self) -> Option<u32> {
        None
    }

    /// Start pulling samples from `feeder` at `sample_rate`, buffering about
    /// `latency_frames` frames in the device.
    fn open(
        &mut self,
        sample_rate: u32,
        latency_frames: u32,
        feeder: SinkFeeder,
    ) -> Result<Box<dyn SinkStream>>;
}

/// Lets a device's error callback stop the session.
#[derive(Debug, Clone)]
pub struct SinkFault {
    cancel: Cancellation,
}

impl SinkFault {
    /// The device is gone and will not ask for more samples.
    pub fn device_lost(&self, reason: impl Display) {
        error!("Audio device lost: {reason}");
        self.cancel
            .cancel(Error::AudioOutput(format!("Audio device lost: {reason}")));
    }
}

/// Answers device callbacks from an [`AudioStreamer`].
///
/// Once the stream ends or the session is cancelled every later request is
/// answered with silence. A normal end fires the `ended` latch.
pub struct SinkFeeder {
    streamer: AudioStreamer,
    scratch: Vec<StereoSample>,
    ended: Latch,
    cancel: Cancellation,
    finished: bool,
}

impl SinkFeeder {
    pub const fn new(streamer: AudioStreamer, ended: Latch, cancel: Cancellation) -> Self {
        Self {
            streamer,
            scratch: Vec::new(),
            ended,
            cancel,
            finished: false,
        }
    }

    /// Handle for the device's error callback.
    pub fn fault(&self) -> SinkFault {
        SinkFault {
            cancel: self.cancel.clone(),
        }
    }

    /// Fill an interleaved `L R L R ...` buffer.
    pub fn feed(&mut self, interleaved: &mut [f32]) {
        self.feed_channels(interleaved, 2);
    }

    /// Fill a buffer of `channels` interleaved channels. Mono gets the mix
    /// of both sides; channels past the second stay silent.
    pub fn feed_channels(&mut self, out: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        let frames = out.len() / channels;
        self.observe_period(frames);
        let filled = self.pull(frames);

        for (i, frame) in out.chunks_mut(channels).enumerate() {
            let [left, right] = if i < filled { self.scratch[i] } else { SILENCE };
            match frame {
                [mono] => *mono = (left + right) * 0.5,
                [l, r, rest @ ..] => {
                    *l = left;
                    *r = right;
                    rest.fill(0.0);
                }
                [] => {}
            }
        }
    }

    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    pub const fn tolerance(&self) -> SyncTolerance {
        self.streamer.tolerance()
    }

    /// A device asking for more frames per callback than the configured
    /// latency buffers at least that much, so audio is only ahead past it.
    fn observe_period(&mut self, frames: usize) {
        let tolerance = self.streamer.tolerance();
        if frames as u64 > tolerance.latency() {
            debug!(
                "Device asks for {frames} frames per callback, widening the {} frame latency",
                tolerance.latency()
            );
            self.streamer.set_tolerance(tolerance.with_latency(frames as u64));
        }
    }

    /// Fill the first `frames` of the scratch buffer, returning how many hold
    /// audio.
    fn pull(&mut self, frames: usize) -> usize {
        if self.finished {
            return 0;
        }

        self.scratch.clear();
        self.scratch.resize(frames, SILENCE);
        match self.streamer.fill(&mut self.scratch) {
            Fill::Complete => frames,
            Fill::Exhausted { filled } => {
                debug!("Audio stream ended, {} samples played", self.streamer.played());
                self.finished = true;
                self.ended.fire();
                filled
            }
            Fill::Cancelled => {
                self.finished = true;
                0
            }
        }
    }
}
