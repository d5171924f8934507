//! Player configuration.
//!
//! Loaded from `config.json` in the platform config directory, then
//! overridden by command line flags.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::{Error, Result};

/// Glyph ramp used to map brightness to characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Charset {
    #[default]
    Ascii,
    AsciiNoSpace,
    Block,
}

impl std::str::FromStr for Charset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ascii" => Ok(Self::Ascii),
            "ascii_no_space" => Ok(Self::AsciiNoSpace),
            "block" => Ok(Self::Block),
            other => Err(Error::Config(format!("Unknown character set {other}"))),
        }
    }
}

/// Video path settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub charset: Charset,
    /// Emit 24-bit colour escape sequences.
    pub color: bool,
    /// Character height/width ratio. `None` derives it from the terminal.
    pub ratio: Option<u32>,
    /// Maximum width in columns. `None` fits the terminal.
    pub width: Option<u32>,
    /// Maximum height in rows. `None` fits the terminal.
    pub height: Option<u32>,
    /// Re-measure the terminal before every frame.
    pub auto_resize: bool,
    /// Override the source frame rate.
    pub fps: Option<u32>,
    /// Depth of the raw frame queue between decoder and converter.
    pub queue_depth: usize,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            charset: Charset::Ascii,
            color: false,
            ratio: None,
            width: None,
            height: None,
            auto_resize: false,
            fps: None,
            queue_depth: 10,
        }
    }
}

/// Audio path settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub enabled: bool,
    /// Desync allowed before audio is skipped forward.
    pub desync_tolerance_ms: u64,
    /// Buffering latency requested from the audio device.
    pub sink_latency_ms: u64,
    /// Stereo frames per decoded audio block.
    pub block_frames: usize,
    /// Resample audio to this rate instead of the source rate.
    pub sample_rate: Option<u32>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            desync_tolerance_ms: 20,
            sink_latency_ms: 100,
            block_frames: 1024,
            sample_rate: None,
        }
    }
}

impl AudioConfig {
    pub const fn desync_tolerance(&self) -> Duration {
        Duration::from_millis(self.desync_tolerance_ms)
    }

    pub const fn sink_latency(&self) -> Duration {
        Duration::from_millis(self.sink_latency_ms)
    }
}

/// External decoder executables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

/// Terminal session settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Draw on the alternate screen with the cursor hidden.
    pub alternate_screen: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            alternate_screen: true,
        }
    }
}

/// Complete player configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub video: VideoConfig,
    pub audio: AudioConfig,
    pub decoder: DecoderConfig,
    pub display: DisplayConfig,
}

impl PlayerConfig {
    /// Default location of the config file.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "glyphreel")
            .map(|d| d.config_dir().join("config.json"))
    }

    /// Load the config file at `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(Error::Config(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )))
            }
        };

        let config: Self = serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("Invalid {}: {e}", path.display())))?;
        config.validate()?;

        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load from the default location, or defaults if there is none.
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.video.queue_depth == 0 {
            return Err(Error::Config("video.queue_depth must be at least 1".into()));
        }
        if self.video.fps == Some(0) {
            return Err(Error::Config("video.fps must be positive".into()));
        }
        if self.video.ratio == Some(0) {
            return Err(Error::Config("video.ratio must be positive".into()));
        }
        if self.audio.block_frames == 0 {
            return Err(Error::Config("audio.block_frames must be at least 1".into()));
        }
        if self.audio.sample_rate == Some(0) {
            return Err(Error::Config("audio.sample_rate must be positive".into()));
        }
        Ok(())
    }
}
