//! Traits for the collaborators the playback pipeline is wired around.

use std::path::Path;

use crate::{AudioBlock, DisplayFrame, MediaInfo, RawVideoFrame, Result};

/// Produces decoded video frames in presentation order.
pub trait VideoSource: Send {
    /// Decode the next frame.
    ///
    /// Returns `Ok(None)` once the stream is exhausted. A recoverable error
    /// (see [`crate::Error::is_recoverable`]) skips one frame only.
    fn next_frame(&mut self) -> Result<Option<RawVideoFrame>>;
}

/// Produces decoded audio blocks in playback order.
pub trait AudioSource: Send {
    /// Decode the next block. Returns `Ok(None)` once the stream is exhausted.
    fn next_block(&mut self) -> Result<Option<AudioBlock>>;
}

/// An opened source: its stream info plus one reader per track.
pub struct OpenedMedia {
    pub info: MediaInfo,
    pub video: Box<dyn VideoSource>,
    /// `None` when the source has no audio track or audio is disabled.
    pub audio: Option<Box<dyn AudioSource>>,
}

impl std::fmt::Debug for OpenedMedia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedMedia")
            .field("info", &self.info)
            .field("has_audio", &self.audio.is_some())
            .finish_non_exhaustive()
    }
}

/// Opens a source for decoding.
pub trait MediaOpener: Send + Sync {
    /// `output_rate` is the rate the audio device runs at, when known; audio
    /// is decoded at that rate unless the configuration forces another.
    fn open(&self, source: &Path, output_rate: Option<u32>) -> Result<OpenedMedia>;
}

/// Turns raw frames into displayable glyph frames, one in, one out.
pub trait FrameRenderer: Send {
    fn render(&mut self, frame: RawVideoFrame) -> Result<DisplayFrame>;
}
