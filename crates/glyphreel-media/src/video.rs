//! Raw RGBA video frames decoded by ffmpeg.

use std::ffi::OsString;
use std::path::Path;

use glyphreel_core::{Error, RawVideoFrame, Result, VideoSource};
use tracing::{debug, info, warn};

use crate::process::{FfmpegProcess, ReadOutcome};

/// Streams `width * height` RGBA frames from an ffmpeg child.
pub struct FfmpegVideoSource {
    process: Option<FfmpegProcess>,
    width: u32,
    height: u32,
    frames: u64,
}

impl FfmpegVideoSource {
    /// Start decoding the first video stream of `source`.
    ///
    /// With `fps` set, ffmpeg duplicates or drops frames to hit that rate.
    pub fn spawn(
        ffmpeg: &Path,
        source: &Path,
        width: u32,
        height: u32,
        fps: Option<u32>,
    ) -> Result<Self> {
        let process = FfmpegProcess::spawn(ffmpeg, video_args(source, fps), "video")?;
        info!("Video decoder started: {width}x{height}");

        Ok(Self {
            process: Some(process),
            width,
            height,
            frames: 0,
        })
    }

    const fn frame_size(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

impl VideoSource for FfmpegVideoSource {
    fn next_frame(&mut self) -> Result<Option<RawVideoFrame>> {
        let frame_size = self.frame_size();
        let Some(process) = self.process.as_mut() else {
            return Ok(None);
        };

        let mut pixels = vec![0u8; frame_size];
        match process.read_full(&mut pixels)? {
            ReadOutcome::Full => {}
            ReadOutcome::Eof(0) => {
                process.finish()?;
                info!("Video stream ended after {} frames", self.frames);
                self.process = None;
                return Ok(None);
            }
            ReadOutcome::Eof(partial) => {
                warn!("Video stream ended mid-frame ({partial} of {frame_size} bytes)");
                process.finish()?;
                self.process = None;
                return Ok(None);
            }
        }

        self.frames += 1;
        RawVideoFrame::from_rgba(self.width, self.height, pixels)
            .map(Some)
            .ok_or_else(|| {
                debug!("Frame {} had the wrong size", self.frames);
                Error::CorruptFrame(format!("frame {} has the wrong size", self.frames))
            })
    }
}

fn video_args(source: &Path, fps: Option<u32>) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-v".into(), "error".into(), "-i".into()];
    args.push(source.as_os_str().to_owned());
    args.extend(["-map", "0:v:0", "-an"].map(OsString::from));
    if let Some(fps) = fps {
        args.push("-r".into());
        args.push(fps.to_string().into());
    }
    args.extend(["-f", "rawvideo", "-pix_fmt", "rgba", "pipe:1"].map(OsString::from));
    args
}
