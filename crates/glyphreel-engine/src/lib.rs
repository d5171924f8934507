//! # glyphreel-engine
//!
//! Playback pipeline and audio/video sync engine for glyphreel.
//!
//! Features:
//! - One thread per stage, joined by bounded queues for backpressure
//! - Drift-free frame pacing against a shared session clock
//! - Audio desync correction by skipping ahead or padding with silence
//! - First-cause-wins cancellation and dual-path completion

pub mod audio;
pub mod clock;
pub mod controller;
pub mod convert;
pub mod decode;
pub mod pacer;
pub mod presenter;
pub mod queue;
pub mod sync;

pub use audio::{AudioSink, CpalSink, SinkFeeder, SinkStream};
pub use clock::Clock;
pub use controller::{Backend, Controller};
pub use pacer::FrameSchedule;
pub use queue::{bounded, Inlet, Outlet, Recv};
pub use sync::{Cancellation, Completion, Latch};
