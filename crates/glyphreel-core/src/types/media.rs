//! Stream information reported by the decoder.

use std::time::Duration;

/// What the decoder found in a source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaInfo {
    /// Width of the decoded video in pixels.
    pub width: u32,
    /// Height of the decoded video in pixels.
    pub height: u32,
    /// Video frames per second.
    pub frame_rate: f64,
    /// Audio sample rate, or `None` when the source has no audio track.
    pub sample_rate: Option<u32>,
}

impl MediaInfo {
    /// Time between two consecutive video frames, rounded to the nanosecond.
    pub fn frame_interval(&self) -> Duration {
        if self.frame_rate <= 0.0 || !self.frame_rate.is_finite() {
            return Duration::ZERO;
        }
        Duration::from_nanos((1e9 / self.frame_rate).round() as u64)
    }

    pub const fn has_audio(&self) -> bool {
        self.sample_rate.is_some()
    }
}
