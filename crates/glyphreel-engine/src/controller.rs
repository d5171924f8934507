//! Wires the stages of one playback session together and runs them.
//!
//! Every call to [`Controller::play`] builds fresh queues, signals and a
//! fresh clock, starts one thread per stage plus an interrupt watcher, and
//! joins them all before reporting how the session ended. Nothing carries
//! over from one session to the next.

use std::io::Write;
use std::path::Path;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{select, Receiver};
use glyphreel_core::{Error, FrameRenderer, OpenedMedia, PlayerConfig, Result};
use tracing::{debug, info, warn};

use crate::audio::{AudioPlayer, AudioSink};
use crate::clock::Clock;
use crate::convert::Converter;
use crate::decode::{pump_audio, pump_video};
use crate::pacer::Pacer;
use crate::presenter::Presenter;
use crate::queue::{bounded, STRICT_DEPTH};
use crate::sync::{Cancellation, Completion, Latch};

/// The collaborators a session needs from the outside world.
pub trait Backend: Send + Sync {
    /// Open `source` and start decoding it, with audio at `output_rate`
    /// when the device reported one.
    fn open(&self, source: &Path, output_rate: Option<u32>) -> Result<OpenedMedia>;

    fn renderer(&self) -> Result<Box<dyn FrameRenderer>>;

    /// The character grid frames are written to.
    fn display(&self) -> Result<Box<dyn Write + Send>>;

    fn audio_sink(&self) -> Box<dyn AudioSink>;
}

/// Stage threads of one session.
struct Stages {
    cancel: Cancellation,
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl Stages {
    fn new(cancel: Cancellation) -> Self {
        Self {
            cancel,
            handles: Vec::new(),
        }
    }

    fn spawn(&mut self, name: &'static str, stage: impl FnOnce() + Send + 'static) {
        match thread::Builder::new().name(name.to_string()).spawn(stage) {
            Ok(handle) => self.handles.push((name, handle)),
            Err(e) => {
                self.cancel
                    .cancel(Error::Internal(format!("Failed to start {name}: {e}")));
            }
        }
    }

    fn join(self) {
        for (name, handle) in self.handles {
            if handle.join().is_err() {
                warn!("{name} thread panicked");
            } else {
                debug!("{name} exited");
            }
        }
    }
}

/// Plays sources one at a time.
pub struct Controller<B> {
    backend: B,
    config: PlayerConfig,
    interrupts: Receiver<()>,
}

impl<B: Backend> Controller<B> {
    /// `interrupts` delivers one message per user interrupt.
    pub const fn new(backend: B, config: PlayerConfig, interrupts: Receiver<()>) -> Self {
        Self {
            backend,
            config,
            interrupts,
        }
    }

    pub const fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Play `source` to the end.
    ///
    /// Returns `Ok(())` only if both the audio and the video path reached
    /// end of stream. Otherwise returns the first cause that stopped the
    /// session, [`Error::Interrupted`] for a user interrupt. An interrupt
    /// that arrived while no session was running stops this one before it
    /// starts.
    pub fn play(&mut self, source: &Path) -> Result<()> {
        if self.interrupts.try_recv().is_ok() {
            let more = self.interrupts.try_iter().count();
            debug!("Interrupted between sessions ({} more pending)", more);
            return Err(Error::Interrupted);
        }

        let sink = self.backend.audio_sink();
        let output_rate = if self.config.audio.enabled {
            sink.native_rate()
        } else {
            None
        };
        let OpenedMedia { info, video, audio } = self.backend.open(source, output_rate)?;
        let renderer = self.backend.renderer()?;
        let display = self.backend.display()?;
        let sample_rate = info.sample_rate.filter(|_| audio.is_some());
        info!(
            "Playing {}: {}x{} at {:.3} fps, audio {}",
            source.display(),
            info.width,
            info.height,
            info.frame_rate,
            sample_rate.map_or_else(|| "none".to_string(), |rate| format!("{rate}Hz"))
        );

        let cancel = Cancellation::new();
        let completion = Completion::new(cancel.clone());
        let clock = Clock::new();

        let (raw_out, raw_in) = bounded(self.config.video.queue_depth, &cancel);
        let (converted_out, converted_in) = bounded(STRICT_DEPTH, &cancel);
        let (paced_out, paced_in) = bounded(STRICT_DEPTH, &cancel);
        let (audio_out, audio_in) = bounded(STRICT_DEPTH, &cancel);

        let mut stages = Stages::new(cancel.clone());

        let stage_cancel = cancel.clone();
        stages.spawn("decode-video", move || pump_video(video, raw_out, stage_cancel));

        if let Some(source) = audio {
            let stage_cancel = cancel.clone();
            stages.spawn("decode-audio", move || {
                pump_audio(source, audio_out, stage_cancel);
            });
        }

        let converter = Converter::new(raw_in, converted_out, renderer, cancel.clone());
        stages.spawn("converter", move || converter.run());

        let pacer = Pacer::new(
            converted_in,
            paced_out,
            clock.clone(),
            cancel.clone(),
            info.frame_interval(),
        );
        stages.spawn("pacer", move || {
            pacer.run();
        });

        let player = AudioPlayer::new(
            audio_in,
            sink,
            sample_rate,
            &self.config.audio,
            clock,
            cancel.clone(),
            completion.clone(),
        );
        stages.spawn("audio", move || player.run());

        let presenter = Presenter::new(
            paced_in,
            display,
            self.config.display.alternate_screen,
            cancel.clone(),
            completion.clone(),
        );
        stages.spawn("presenter", move || presenter.run());

        let session_over = Latch::new();
        let watcher = {
            let interrupts = self.interrupts.clone();
            let cancel = cancel.clone();
            let over = session_over.clone();
            thread::Builder::new()
                .name("interrupt-watcher".to_string())
                .spawn(move || watch_interrupts(&interrupts, &cancel, &over))
        };
        if let Err(e) = &watcher {
            cancel.cancel(Error::Internal(format!("Failed to start interrupt watcher: {e}")));
        }

        stages.join();
        session_over.fire();
        if let Ok(watcher) = watcher {
            let _ = watcher.join();
        }

        if let Some(cause) = cancel.take_cause() {
            return Err(cause);
        }
        if completion.is_done() {
            info!("Finished {}", source.display());
            Ok(())
        } else {
            Err(Error::Internal(
                "Playback stopped before both streams ended".to_string(),
            ))
        }
    }
}

/// Turn the first interrupt of the session into a cancellation.
fn watch_interrupts(interrupts: &Receiver<()>, cancel: &Cancellation, over: &Latch) {
    select! {
        recv(interrupts) -> interrupt => {
            if interrupt.is_ok() {
                cancel.cancel(Error::Interrupted);
            }
        }
        recv(cancel.receiver()) -> _ => {}
        recv(over.receiver()) -> _ => {}
    }
}
