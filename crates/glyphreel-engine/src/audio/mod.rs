//! The audio path: desync-corrected streaming into a real-time sink.

pub mod output;
pub mod player;
pub mod sink;
pub mod streamer;

pub use output::CpalSink;
pub use player::AudioPlayer;
pub use sink::{AudioSink, SinkFault, SinkFeeder, SinkStream};
pub use streamer::{AudioStreamer, Correction, Fill, SyncTolerance};
