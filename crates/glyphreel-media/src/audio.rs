//! Interleaved f32 stereo audio decoded by ffmpeg.

use std::ffi::OsString;
use std::path::Path;

use glyphreel_core::{AudioBlock, AudioSource, Result};
use tracing::{info, warn};

use crate::process::{FfmpegProcess, ReadOutcome};

/// Bytes in one stereo frame of f32le samples.
const BYTES_PER_FRAME: usize = 8;

/// Streams fixed-size stereo blocks from an ffmpeg child.
pub struct FfmpegAudioSource {
    process: Option<FfmpegProcess>,
    block_frames: usize,
    blocks: u64,
}

impl FfmpegAudioSource {
    /// Start decoding the first audio stream of `source`, resampled to
    /// `sample_rate` and mixed to stereo.
    pub fn spawn(
        ffmpeg: &Path,
        source: &Path,
        sample_rate: u32,
        block_frames: usize,
    ) -> Result<Self> {
        let process = FfmpegProcess::spawn(ffmpeg, audio_args(source, sample_rate), "audio")?;
        info!("Audio decoder started: {sample_rate} Hz stereo, {block_frames} frames per block");

        Ok(Self {
            process: Some(process),
            block_frames,
            blocks: 0,
        })
    }
}

impl AudioSource for FfmpegAudioSource {
    fn next_block(&mut self) -> Result<Option<AudioBlock>> {
        let Some(process) = self.process.as_mut() else {
            return Ok(None);
        };

        let mut bytes = vec![0u8; self.block_frames * BYTES_PER_FRAME];
        let len = match process.read_full(&mut bytes)? {
            ReadOutcome::Full => bytes.len(),
            ReadOutcome::Eof(n) => {
                process.finish()?;
                self.process = None;
                if n % BYTES_PER_FRAME != 0 {
                    warn!("Audio stream ended mid-frame, dropping {} bytes", n % BYTES_PER_FRAME);
                }
                info!("Audio stream ended after {} blocks", self.blocks);
                n - n % BYTES_PER_FRAME
            }
        };

        if len == 0 {
            return Ok(None);
        }

        self.blocks += 1;
        Ok(Some(AudioBlock::from_interleaved(&bytes_to_f32(&bytes[..len]))))
    }
}

fn audio_args(source: &Path, sample_rate: u32) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-v".into(), "error".into(), "-i".into()];
    args.push(source.as_os_str().to_owned());
    args.extend(["-map", "0:a:0", "-vn", "-f", "f32le", "-acodec", "pcm_f32le"].map(OsString::from));
    args.push("-ar".into());
    args.push(sample_rate.to_string().into());
    args.extend(["-ac", "2", "pipe:1"].map(OsString::from));
    args
}

/// Convert raw bytes (f32le) to f32 samples.
fn bytes_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| {
            let arr: [u8; 4] = chunk.try_into().unwrap_or([0; 4]);
            f32::from_le_bytes(arr)
        })
        .collect()
}
