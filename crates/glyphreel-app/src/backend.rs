//! The real collaborators: ffmpeg for decoding, the terminal for display and
//! the default audio device for sound.

use std::io::{self, BufWriter, Write};
use std::path::Path;

use glyphreel_core::{FrameRenderer, MediaOpener, OpenedMedia, PlayerConfig, Result, VideoConfig};
use glyphreel_engine::{AudioSink, Backend, CpalSink};
use glyphreel_media::FfmpegOpener;
use glyphreel_render::GlyphConverter;

/// Frames are a few kilobytes of glyphs; buffer a whole one per flush.
const DISPLAY_BUFFER: usize = 1 << 16;

pub struct TerminalBackend {
    opener: FfmpegOpener,
    video: VideoConfig,
}

impl TerminalBackend {
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            opener: FfmpegOpener::new(&config.decoder, config.video.fps, config.audio.clone()),
            video: config.video.clone(),
        }
    }
}

impl Backend for TerminalBackend {
    fn open(&self, source: &Path, output_rate: Option<u32>) -> Result<OpenedMedia> {
        self.opener.open(source, output_rate)
    }

    fn renderer(&self) -> Result<Box<dyn FrameRenderer>> {
        Ok(Box::new(GlyphConverter::new(&self.video)))
    }

    fn display(&self) -> Result<Box<dyn Write + Send>> {
        Ok(Box::new(BufWriter::with_capacity(DISPLAY_BUFFER, io::stdout())))
    }

    fn audio_sink(&self) -> Box<dyn AudioSink> {
        Box::new(CpalSink::new())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use glyphreel_core::Error;

    #[test]
    fn test_missing_source_fails_before_decoding() {
        let dir = tempfile::tempdir().unwrap();
        let backend = TerminalBackend::new(&PlayerConfig::default());

        let result = backend.open(&dir.path().join("missing.mp4"), None);
        assert!(matches!(result, Err(Error::SourceNotFound(_))));
    }
}
