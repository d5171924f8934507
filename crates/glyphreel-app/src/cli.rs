//! Command line interface.

use std::path::PathBuf;

use clap::Parser;
use glyphreel_core::{Charset, PlayerConfig};

#[derive(Debug, Parser)]
#[command(name = "glyphreel", version, about = "Play videos in the terminal")]
pub struct Cli {
    /// Video files, played one after another
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Character set: ascii, ascii_no_space or block
    #[arg(long)]
    pub charset: Option<Charset>,

    /// Draw with 24-bit colour
    #[arg(long)]
    pub color: bool,

    /// Character height/width ratio [default: from the terminal]
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub ratio: Option<u32>,

    /// Maximum width in columns
    #[arg(short = 'W', long, value_parser = clap::value_parser!(u32).range(1..))]
    pub width: Option<u32>,

    /// Maximum height in rows
    #[arg(short = 'H', long, value_parser = clap::value_parser!(u32).range(1..))]
    pub height: Option<u32>,

    /// Follow terminal size changes during playback
    #[arg(long)]
    pub resize: bool,

    /// Play at this frame rate instead of the source's
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub fps: Option<u32>,

    /// Play the video track only
    #[arg(long)]
    pub no_audio: bool,

    /// How far audio may fall behind before it is skipped forward
    #[arg(long, value_name = "MS")]
    pub desync_tolerance_ms: Option<u64>,

    /// Buffering latency to request from the audio device
    #[arg(long, value_name = "MS")]
    pub sink_latency_ms: Option<u64>,

    /// Config file [default: config.json in the user config directory]
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write logs to this file
    #[arg(long, value_name = "FILE")]
    pub log: Option<PathBuf>,
}

impl Cli {
    /// Override `config` with the flags that were given.
    pub fn apply(&self, config: &mut PlayerConfig) {
        let video = &mut config.video;
        if let Some(charset) = self.charset {
            video.charset = charset;
        }
        video.color |= self.color;
        video.auto_resize |= self.resize;
        video.ratio = self.ratio.or(video.ratio);
        video.width = self.width.or(video.width);
        video.height = self.height.or(video.height);
        video.fps = self.fps.or(video.fps);

        let audio = &mut config.audio;
        if self.no_audio {
            audio.enabled = false;
        }
        if let Some(ms) = self.desync_tolerance_ms {
            audio.desync_tolerance_ms = ms;
        }
        if let Some(ms) = self.sink_latency_ms {
            audio.sink_latency_ms = ms;
        }
    }
}
