//! Fills sink requests from decoded audio blocks, correcting desync against
//! the session clock.
//!
//! Desync is `played - expected`, in stereo frames, where `expected` is the
//! sample rate times the time since the clock started. Audio that fell
//! behind is skipped forward; audio that ran ahead is held back with
//! silence. Inside the tolerance band the stream plays untouched.

use std::time::Duration;

use glyphreel_core::{AudioBlock, StereoSample};
use tracing::{debug, trace};

use crate::clock::Clock;
use crate::queue::{Inlet, Recv};

const SILENCE: StereoSample = [0.0, 0.0];

/// Number of stereo frames played at `rate` over `duration`.
pub fn samples_in(rate: u32, duration: Duration) -> u64 {
    (u128::from(rate) * duration.as_nanos() / 1_000_000_000) as u64
}

/// Time it takes to play `samples` stereo frames at `rate`.
pub fn duration_of(rate: u32, samples: u64) -> Duration {
    if rate == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos((u128::from(samples) * 1_000_000_000 / u128::from(rate)) as u64)
}

/// Dead band around zero desync, in samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTolerance {
    /// How far audio may lag the clock before it is skipped forward.
    pub behind: u64,
    /// How far audio may lead the clock before silence is inserted. Includes
    /// the sink latency, since queued samples are not audible yet.
    pub ahead: u64,
}

/// Adjustment applied before filling one sink request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
    None,
    /// Discard this many samples from the stream.
    Skip(u64),
    /// Emit this many samples of silence at the front of the request.
    Silence(usize),
}

impl SyncTolerance {
    pub fn from_rate(rate: u32, tolerance: Duration, sink_latency: Duration) -> Self {
        let behind = samples_in(rate, tolerance);
        Self {
            behind,
            ahead: behind + samples_in(rate, sink_latency),
        }
    }

    /// Samples the sink holds before they are audible.
    pub const fn latency(&self) -> u64 {
        self.ahead - self.behind
    }

    /// The same band with the sink latency replaced by `latency` samples.
    #[must_use]
    pub const fn with_latency(self, latency: u64) -> Self {
        Self {
            behind: self.behind,
            ahead: self.behind + latency,
        }
    }

    /// Correction for a request of `request` samples at the given desync.
    pub fn correction(&self, desync: i64, request: usize) -> Correction {
        if desync < 0 && desync.unsigned_abs() > self.behind {
            Correction::Skip(desync.unsigned_abs())
        } else if desync > 0 && desync.unsigned_abs() > self.ahead {
            Correction::Silence(desync.unsigned_abs().min(request as u64) as usize)
        } else {
            Correction::None
        }
    }
}

/// Outcome of one sink request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// Every requested sample was written.
    Complete,
    /// The stream ended; only the first `filled` samples are valid.
    Exhausted { filled: usize },
    /// The session was cancelled while waiting for audio.
    Cancelled,
}

enum Pull {
    Ready,
    Ended,
    Cancelled,
}

/// Stateful reader over the decoded audio queue.
pub struct AudioStreamer {
    input: Inlet<AudioBlock>,
    block: AudioBlock,
    offset: usize,
    played: u64,
    clock: Clock,
    rate: u32,
    tolerance: SyncTolerance,
}

impl AudioStreamer {
    pub fn new(input: Inlet<AudioBlock>, clock: Clock, rate: u32, tolerance: SyncTolerance) -> Self {
        Self {
            input,
            block: AudioBlock::default(),
            offset: 0,
            played: 0,
            clock,
            rate,
            tolerance,
        }
    }

    /// Samples consumed from the stream so far, skipped ones included.
    pub const fn played(&self) -> u64 {
        self.played
    }

    pub const fn tolerance(&self) -> SyncTolerance {
        self.tolerance
    }

    pub fn set_tolerance(&mut self, tolerance: SyncTolerance) {
        self.tolerance = tolerance;
    }

    /// Fill `out` for the sink, measuring desync against the clock now.
    pub fn fill(&mut self, out: &mut [StereoSample]) -> Fill {
        let expected = samples_in(self.rate, self.clock.elapsed());
        self.fill_at(out, expected as i64)
    }

    /// Fill `out` as if the clock said `expected` samples should have played.
    pub fn fill_at(&mut self, out: &mut [StereoSample], expected: i64) -> Fill {
        let desync = self.played as i64 - expected;

        let silent = match self.tolerance.correction(desync, out.len()) {
            Correction::None => 0,
            Correction::Skip(count) => {
                debug!("Audio behind by {count} samples, skipping");
                match self.skip(count) {
                    Pull::Ready => 0,
                    Pull::Ended => return Fill::Exhausted { filled: 0 },
                    Pull::Cancelled => return Fill::Cancelled,
                }
            }
            Correction::Silence(count) => {
                debug!("Audio ahead by {desync} samples, inserting {count} of silence");
                out[..count].fill(SILENCE);
                count
            }
        };

        let mut written = silent;
        while written < out.len() {
            if self.offset == self.block.len() {
                match self.pull() {
                    Pull::Ready => {}
                    Pull::Ended => return Fill::Exhausted { filled: written },
                    Pull::Cancelled => return Fill::Cancelled,
                }
            }
            let available = &self.block.samples()[self.offset..];
            let count = available.len().min(out.len() - written);
            out[written..written + count].copy_from_slice(&available[..count]);
            self.offset += count;
            self.played += count as u64;
            written += count;
        }
        Fill::Complete
    }

    /// Discard exactly `count` samples, crossing block boundaries as needed.
    fn skip(&mut self, count: u64) -> Pull {
        let mut remaining = count;
        while remaining > 0 {
            if self.offset == self.block.len() {
                match self.pull() {
                    Pull::Ready => {}
                    other => return other,
                }
            }
            let available = (self.block.len() - self.offset) as u64;
            let step = available.min(remaining);
            self.offset += step as usize;
            self.played += step;
            remaining -= step;
        }
        Pull::Ready
    }

    /// Replace the exhausted block with the next non-empty one.
    fn pull(&mut self) -> Pull {
        loop {
            match self.input.recv() {
                Recv::Item(block) if block.is_empty() => {}
                Recv::Item(block) => {
                    trace!("Audio block of {} samples", block.len());
                    self.block = block;
                    self.offset = 0;
                    return Pull::Ready;
                }
                Recv::Closed => return Pull::Ended,
                Recv::Cancelled => return Pull::Cancelled,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::queue::bounded;
    use crate::sync::Cancellation;
    use glyphreel_core::Error;
    use proptest::prelude::*;

    fn tolerance_44100() -> SyncTolerance {
        SyncTolerance::from_rate(44_100, Duration::from_millis(20), Duration::from_millis(100))
    }

    /// Streamer over `total` samples numbered from zero, in blocks of `size`.
    fn numbered(total: usize, size: usize, cancel: &Cancellation) -> AudioStreamer {
        let blocks: Vec<AudioBlock> = (0..total)
            .collect::<Vec<_>>()
            .chunks(size)
            .map(|chunk| AudioBlock::new(chunk.iter().map(|&i| [i as f32, -(i as f32)]).collect()))
            .collect();
        let (outlet, inlet) = bounded(blocks.len().max(1), cancel);
        for block in blocks {
            outlet.send(block).unwrap();
        }
        outlet.close();
        AudioStreamer::new(inlet, Clock::new(), 44_100, tolerance_44100())
    }

    fn is_numbered_from(samples: &[StereoSample], first: usize) -> bool {
        samples
            .iter()
            .enumerate()
            .all(|(i, s)| *s == [(first + i) as f32, -((first + i) as f32)])
    }

    #[test]
    fn test_tolerances_at_44100() {
        let tolerance = tolerance_44100();
        assert_eq!(tolerance.behind, 882);
        assert_eq!(tolerance.ahead, 5292);
    }

    #[test]
    fn test_sample_durations() {
        assert_eq!(samples_in(48_000, Duration::from_millis(5)), 240);
        assert_eq!(duration_of(48_000, 240), Duration::from_millis(5));
        assert_eq!(duration_of(44_100, 44_100), Duration::from_secs(1));
        assert_eq!(duration_of(0, 100), Duration::ZERO);
    }

    #[test]
    fn test_correction_policy() {
        let tolerance = tolerance_44100();
        assert_eq!(tolerance.correction(-2000, 1024), Correction::Skip(2000));
        assert_eq!(tolerance.correction(6000, 8192), Correction::Silence(6000));
        assert_eq!(tolerance.correction(6000, 1024), Correction::Silence(1024));

        assert_eq!(tolerance.correction(-882, 1024), Correction::None);
        assert_eq!(tolerance.correction(-883, 1024), Correction::Skip(883));
        assert_eq!(tolerance.correction(5292, 1024), Correction::None);
        assert_eq!(tolerance.correction(0, 1024), Correction::None);
    }

    #[test]
    fn test_longer_sink_latency_widens_ahead_band() {
        let tolerance = tolerance_44100();
        assert_eq!(tolerance.latency(), 4410);

        // A device buffering 200 ms holds audio that the 100 ms band would
        // count as running ahead.
        let wider = tolerance.with_latency(8820);
        assert_eq!(wider.behind, 882);
        assert_eq!(wider.ahead, 9702);
        assert_eq!(tolerance.correction(6000, 1024), Correction::Silence(1024));
        assert_eq!(wider.correction(6000, 1024), Correction::None);
        assert_eq!(wider.correction(-2000, 1024), Correction::Skip(2000));
    }

    #[test]
    fn test_fill_crosses_blocks() {
        let cancel = Cancellation::new();
        let mut streamer = numbered(1000, 300, &cancel);
        let mut out = vec![SILENCE; 700];

        assert_eq!(streamer.fill_at(&mut out, 0), Fill::Complete);
        assert!(is_numbered_from(&out, 0));
        assert_eq!(streamer.played(), 700);
    }

    #[test]
    fn test_behind_skips_exactly() {
        let cancel = Cancellation::new();
        let mut streamer = numbered(10_000, 300, &cancel);
        let mut out = vec![SILENCE; 512];

        assert_eq!(streamer.fill_at(&mut out, 2000), Fill::Complete);
        assert!(is_numbered_from(&out, 2000));
        assert_eq!(streamer.played(), 2512);
    }

    #[test]
    fn test_ahead_inserts_silence() {
        let cancel = Cancellation::new();
        let mut streamer = numbered(20_000, 1024, &cancel);
        let mut out = vec![SILENCE; 100];
        assert_eq!(streamer.fill_at(&mut out, 0), Fill::Complete);

        // 100 played while the clock expects -5900, so desync is +6000.
        let mut out = vec![[1.0, 1.0]; 8192];
        assert_eq!(streamer.fill_at(&mut out, -5900), Fill::Complete);
        assert!(out[..6000].iter().all(|s| *s == SILENCE));
        assert!(is_numbered_from(&out[6000..], 100));
        assert_eq!(streamer.played(), 100 + 2192);
    }

    #[test]
    fn test_silence_is_clamped_to_request() {
        let cancel = Cancellation::new();
        let mut streamer = numbered(100, 100, &cancel);
        let mut out = vec![[1.0, 1.0]; 1024];

        assert_eq!(streamer.fill_at(&mut out, -6000), Fill::Complete);
        assert!(out.iter().all(|s| *s == SILENCE));
        assert_eq!(streamer.played(), 0);
    }

    #[test]
    fn test_partial_fill_at_end_of_stream() {
        let cancel = Cancellation::new();
        let mut streamer = numbered(300, 128, &cancel);
        let mut out = vec![SILENCE; 512];

        assert_eq!(streamer.fill_at(&mut out, 0), Fill::Exhausted { filled: 300 });
        assert!(is_numbered_from(&out[..300], 0));
        assert_eq!(streamer.fill_at(&mut out, 300), Fill::Exhausted { filled: 0 });
    }

    #[test]
    fn test_skip_past_end_of_stream() {
        let cancel = Cancellation::new();
        let mut streamer = numbered(1500, 256, &cancel);
        let mut out = vec![SILENCE; 64];

        assert_eq!(streamer.fill_at(&mut out, 5000), Fill::Exhausted { filled: 0 });
    }

    #[test]
    fn test_empty_blocks_are_passed_over() {
        let cancel = Cancellation::new();
        let (outlet, inlet) = bounded(4, &cancel);
        outlet.send(AudioBlock::default()).unwrap();
        outlet.send(AudioBlock::new(vec![[0.5, 0.5]; 4])).unwrap();
        outlet.close();
        let mut streamer = AudioStreamer::new(inlet, Clock::new(), 44_100, tolerance_44100());

        let mut out = vec![SILENCE; 4];
        assert_eq!(streamer.fill_at(&mut out, 0), Fill::Complete);
        assert_eq!(out, vec![[0.5, 0.5]; 4]);
    }

    #[test]
    fn test_cancel_while_waiting_for_audio() {
        let cancel = Cancellation::new();
        let (_outlet, inlet) = bounded::<AudioBlock>(1, &cancel);
        let mut streamer = AudioStreamer::new(inlet, Clock::new(), 44_100, tolerance_44100());
        cancel.cancel(Error::Interrupted);

        let mut out = vec![SILENCE; 16];
        assert_eq!(streamer.fill_at(&mut out, 0), Fill::Cancelled);
    }

    #[test]
    fn test_fill_before_clock_starts() {
        let cancel = Cancellation::new();
        let mut streamer = numbered(64, 64, &cancel);
        let mut out = vec![SILENCE; 32];
        assert_eq!(streamer.fill(&mut out), Fill::Complete);
        assert!(is_numbered_from(&out, 0));
    }

    proptest! {
        #[test]
        fn skip_distance_matches_desync(
            behind in 883u64..6_000,
            block in 16usize..700,
            request in 1usize..2_048,
        ) {
            let cancel = Cancellation::new();
            let mut streamer = numbered(10_000, block, &cancel);
            let mut out = vec![SILENCE; request];

            prop_assert_eq!(streamer.fill_at(&mut out, behind as i64), Fill::Complete);
            prop_assert!(is_numbered_from(&out, behind as usize));
            prop_assert_eq!(streamer.played(), behind + request as u64);
        }

        #[test]
        fn silence_prefix_then_contiguous(
            ahead in 5_293i64..20_000,
            request in 1usize..4_096,
        ) {
            let cancel = Cancellation::new();
            let mut streamer = numbered(10_000, 512, &cancel);
            let mut out = vec![[1.0, 1.0]; request];

            prop_assert_eq!(streamer.fill_at(&mut out, -ahead), Fill::Complete);
            let silent = (ahead as usize).min(request);
            prop_assert!(out[..silent].iter().all(|s| *s == SILENCE));
            prop_assert!(is_numbered_from(&out[silent..], 0));
        }
    }
}
