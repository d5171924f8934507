//! The audio stage: opens the sink once the clock starts and waits for the
//! stream to play out.

use std::thread;
use std::time::Duration;

use crossbeam_channel::select;
use glyphreel_core::{AudioBlock, AudioConfig};
use tracing::{debug, info};

use crate::audio::sink::{AudioSink, SinkFeeder};
use crate::audio::streamer::{duration_of, samples_in, AudioStreamer, SyncTolerance};
use crate::clock::Clock;
use crate::queue::Inlet;
use crate::sync::{Cancellation, Completion, Latch};

pub struct AudioPlayer {
    input: Inlet<AudioBlock>,
    sink: Box<dyn AudioSink>,
    sample_rate: Option<u32>,
    desync_tolerance: Duration,
    sink_latency: Duration,
    clock: Clock,
    cancel: Cancellation,
    completion: Completion,
}

impl AudioPlayer {
    /// `sample_rate` is `None` when the source has no audio track.
    pub fn new(
        input: Inlet<AudioBlock>,
        sink: Box<dyn AudioSink>,
        sample_rate: Option<u32>,
        config: &AudioConfig,
        clock: Clock,
        cancel: Cancellation,
        completion: Completion,
    ) -> Self {
        Self {
            input,
            sink,
            sample_rate,
            desync_tolerance: config.desync_tolerance(),
            sink_latency: config.sink_latency(),
            clock,
            cancel,
            completion,
        }
    }

    pub fn run(mut self) {
        let _guard = self.cancel.guard("audio");

        let Some(rate) = self.sample_rate else {
            debug!("No audio track");
            self.completion.audio_finished();
            return;
        };

        if !self.clock.wait_started(&self.cancel) {
            return;
        }

        let tolerance = SyncTolerance::from_rate(rate, self.desync_tolerance, self.sink_latency);
        debug!(
            "Audio at {rate}Hz, tolerance {} behind / {} ahead",
            tolerance.behind, tolerance.ahead
        );

        let ended = Latch::new();
        let streamer = AudioStreamer::new(self.input, self.clock.clone(), rate, tolerance);
        let feeder = SinkFeeder::new(streamer, ended.clone(), self.cancel.clone());
        let latency_frames = samples_in(rate, self.sink_latency) as u32;

        let stream = match self.sink.open(rate, latency_frames, feeder) {
            Ok(stream) => stream,
            Err(e) => {
                self.cancel.cancel(e);
                return;
            }
        };
        let play_out = stream
            .latency_frames()
            .map_or(self.sink_latency, |frames| duration_of(rate, u64::from(frames)));
        info!("Audio playback started");

        select! {
            recv(ended.receiver()) -> _ => {
                // Let the device play out what it already buffered.
                thread::sleep(play_out);
                drop(stream);
                self.completion.audio_finished();
            }
            recv(self.cancel.receiver()) -> _ => {}
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use crate::audio::sink::SinkStream;
    use crate::queue::bounded;
    use glyphreel_core::{Error, Result};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Sink that pulls from the feeder on its own thread, like a device
    /// callback, and records every sample it was given.
    #[derive(Clone, Default)]
    pub struct CaptureSink {
        pub samples: Arc<Mutex<Vec<f32>>>,
        pub opened: Arc<Mutex<Option<(u32, u32)>>>,
        pub fail: bool,
        /// Rate reported as the device's own.
        pub native_rate: Option<u32>,
        /// Stop calling back and report the device gone after this many
        /// callbacks.
        pub lose_after: Option<usize>,
    }

    struct CaptureStream {
        running: Arc<AtomicBool>,
        latency_frames: u32,
    }

    impl SinkStream for CaptureStream {
        fn latency_frames(&self) -> Option<u32> {
            Some(self.latency_frames)
        }
    }

    impl Drop for CaptureStream {
        fn drop(&mut self) {
            self.running.store(false, Ordering::Release);
        }
    }

    impl AudioSink for CaptureSink {
        fn native_rate(&self) -> Option<u32> {
            self.native_rate
        }

        fn open(
            &mut self,
            sample_rate: u32,
            latency_frames: u32,
            mut feeder: SinkFeeder,
        ) -> Result<Box<dyn SinkStream>> {
            if self.fail {
                return Err(Error::AudioOutput("no device".into()));
            }
            *self.opened.lock() = Some((sample_rate, latency_frames));

            let running = Arc::new(AtomicBool::new(true));
            let samples = Arc::clone(&self.samples);
            let alive = Arc::clone(&running);
            let lose_after = self.lose_after;
            let fault = feeder.fault();
            thread::spawn(move || {
                let mut buffer = vec![0.0; 256];
                let mut callbacks = 0;
                while alive.load(Ordering::Acquire) {
                    if lose_after == Some(callbacks) {
                        fault.device_lost("unplugged");
                        return;
                    }
                    feeder.feed(&mut buffer);
                    samples.lock().extend_from_slice(&buffer);
                    callbacks += 1;
                    thread::sleep(Duration::from_millis(1));
                }
            });
            Ok(Box::new(CaptureStream {
                running,
                latency_frames,
            }))
        }
    }

    /// Short latency, and a tolerance wide enough that a slow test thread
    /// never triggers a skip.
    fn quick_config() -> AudioConfig {
        AudioConfig {
            sink_latency_ms: 5,
            desync_tolerance_ms: 10_000,
            ..AudioConfig::default()
        }
    }

    #[test]
    fn test_no_audio_track_finishes_immediately() {
        let cancel = Cancellation::new();
        let completion = Completion::new(cancel.clone());
        let (_outlet, inlet) = bounded(1, &cancel);
        let sink = CaptureSink::default();

        AudioPlayer::new(
            inlet,
            Box::new(sink.clone()),
            None,
            &quick_config(),
            Clock::new(),
            cancel,
            completion.clone(),
        )
        .run();

        assert!(sink.opened.lock().is_none());
        completion.video_finished();
        assert!(completion.is_done());
    }

    #[test]
    fn test_plays_stream_then_finishes() {
        let cancel = Cancellation::new();
        let completion = Completion::new(cancel.clone());
        let (outlet, inlet) = bounded(8, &cancel);
        for _ in 0..4 {
            outlet.send(AudioBlock::new(vec![[0.5, 0.5]; 64])).unwrap();
        }
        outlet.close();

        let clock = Clock::new();
        clock.start();
        let sink = CaptureSink::default();
        AudioPlayer::new(
            inlet,
            Box::new(sink.clone()),
            Some(48_000),
            &quick_config(),
            clock,
            cancel.clone(),
            completion.clone(),
        )
        .run();

        assert_eq!(*sink.opened.lock(), Some((48_000, 240)));
        let samples = sink.samples.lock();
        assert_eq!(samples.iter().filter(|s| **s > 0.0).count(), 4 * 64 * 2);
        assert!(!cancel.is_cancelled());
        completion.video_finished();
        assert!(completion.is_done());
    }

    #[test]
    fn test_sink_failure_cancels() {
        let cancel = Cancellation::new();
        let completion = Completion::new(cancel.clone());
        let (_outlet, inlet) = bounded(1, &cancel);
        let clock = Clock::new();
        clock.start();

        AudioPlayer::new(
            inlet,
            Box::new(CaptureSink {
                fail: true,
                ..CaptureSink::default()
            }),
            Some(44_100),
            &quick_config(),
            clock,
            cancel.clone(),
            completion,
        )
        .run();

        assert!(matches!(cancel.take_cause(), Some(Error::AudioOutput(_))));
    }

    #[test]
    fn test_cancel_before_clock_starts() {
        let cancel = Cancellation::new();
        let completion = Completion::new(cancel.clone());
        let (_outlet, inlet) = bounded(1, &cancel);
        let sink = CaptureSink::default();
        let player = AudioPlayer::new(
            inlet,
            Box::new(sink.clone()),
            Some(44_100),
            &quick_config(),
            Clock::new(),
            cancel.clone(),
            completion.clone(),
        );

        let handle = thread::spawn(move || player.run());
        thread::sleep(Duration::from_millis(10));
        cancel.cancel(Error::Interrupted);
        handle.join().unwrap();

        assert!(sink.opened.lock().is_none());
        assert!(!completion.is_done());
    }

    #[test]
    fn test_lost_device_cancels_playback() {
        let cancel = Cancellation::new();
        let completion = Completion::new(cancel.clone());
        let (outlet, inlet) = bounded(4, &cancel);
        // The stream never ends; only the lost device can stop the player.
        let feed = thread::spawn(move || {
            while outlet.send(AudioBlock::new(vec![[0.5, 0.5]; 64])).is_ok() {}
        });
        let clock = Clock::new();
        clock.start();
        let sink = CaptureSink {
            lose_after: Some(3),
            ..CaptureSink::default()
        };

        AudioPlayer::new(
            inlet,
            Box::new(sink.clone()),
            Some(48_000),
            &quick_config(),
            clock,
            cancel.clone(),
            completion.clone(),
        )
        .run();
        feed.join().unwrap();

        assert_eq!(sink.samples.lock().len(), 3 * 256);
        assert!(matches!(cancel.take_cause(), Some(Error::AudioOutput(_))));
        completion.video_finished();
        assert!(!completion.is_done());
    }
}
