//! # glyphreel-media
//!
//! Media decoding for glyphreel, delegated to `ffprobe` and `ffmpeg`.
//!
//! Features:
//! - Stream discovery (frame rate, geometry, sample rate) via `ffprobe`
//! - Raw RGBA video frames and f32 stereo audio blocks streamed from `ffmpeg`
//! - Child processes are killed when a source is dropped mid-stream

pub mod audio;
pub mod probe;
pub mod process;
pub mod video;

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use glyphreel_core::{
    AudioConfig, AudioSource, DecoderConfig, Error, MediaInfo, MediaOpener, OpenedMedia, Result,
};
use tracing::info;

pub use audio::FfmpegAudioSource;
pub use probe::{parse_probe, probe};
pub use video::FfmpegVideoSource;

/// Opens sources by probing them and starting one ffmpeg per track.
#[derive(Debug, Clone)]
pub struct FfmpegOpener {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    fps: Option<u32>,
    audio: AudioConfig,
}

impl FfmpegOpener {
    pub fn new(decoder: &DecoderConfig, fps: Option<u32>, audio: AudioConfig) -> Self {
        Self {
            ffmpeg: decoder.ffmpeg.clone(),
            ffprobe: decoder.ffprobe.clone(),
            fps,
            audio,
        }
    }
}

impl MediaOpener for FfmpegOpener {
    fn open(&self, source: &Path, output_rate: Option<u32>) -> Result<OpenedMedia> {
        validate_source(source)?;

        let probed = probe(&self.ffprobe, source)?;
        let info = MediaInfo {
            frame_rate: self.fps.map_or(probed.frame_rate, f64::from),
            sample_rate: playback_rate(probed.sample_rate, &self.audio, output_rate),
            ..probed
        };

        let video = FfmpegVideoSource::spawn(
            &self.ffmpeg,
            source,
            info.width,
            info.height,
            self.fps,
        )?;

        let audio = match info.sample_rate {
            Some(rate) => Some(Box::new(FfmpegAudioSource::spawn(
                &self.ffmpeg,
                source,
                rate,
                self.audio.block_frames,
            )?) as Box<dyn AudioSource>),
            None => {
                info!("No audio track to play");
                None
            }
        };

        Ok(OpenedMedia {
            info,
            video: Box::new(video),
            audio,
        })
    }
}

/// Rate the audio track is decoded at: the configured rate, else the output
/// device's, else the source's own. `None` when there is no audio to play.
pub fn playback_rate(
    source_rate: Option<u32>,
    config: &AudioConfig,
    output_rate: Option<u32>,
) -> Option<u32> {
    if !config.enabled {
        return None;
    }
    source_rate.map(|rate| config.sample_rate.or(output_rate).unwrap_or(rate))
}

/// Check that `source` names a readable file before handing it to ffmpeg.
pub fn validate_source(source: &Path) -> Result<()> {
    let metadata = fs::metadata(source).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            Error::SourceNotFound(source.to_path_buf())
        } else {
            Error::SourceUnreadable {
                path: source.to_path_buf(),
                message: e.to_string(),
            }
        }
    })?;

    if metadata.is_dir() {
        return Err(Error::NotAFile(source.to_path_buf()));
    }
    Ok(())
}
