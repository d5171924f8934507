//! Error types for glyphreel.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using glyphreel's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for glyphreel.
#[derive(Error, Debug)]
pub enum Error {
    // Setup errors
    #[error("could not find file \"{}\"", .0.display())]
    SourceNotFound(PathBuf),

    #[error("can't read \"{}\": is a directory", .0.display())]
    NotAFile(PathBuf),

    #[error("can't open file \"{}\": {message}", .path.display())]
    SourceUnreadable { path: PathBuf, message: String },

    #[error("Probe failed: {0}")]
    Probe(String),

    #[error("could not find video stream in file \"{}\"", .0.display())]
    NoVideoTrack(PathBuf),

    // Decode errors
    #[error("Video decode error: {0}")]
    VideoDecode(String),

    #[error("Audio decode error: {0}")]
    AudioDecode(String),

    /// A single frame or block could not be decoded; the stream continues.
    #[error("Corrupt frame skipped: {0}")]
    CorruptFrame(String),

    // Output errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    #[error("Display error: {0}")]
    Display(String),

    #[error("Terminal error: {0}")]
    Terminal(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Pipeline errors
    #[error("Playback interrupted")]
    Interrupted,

    #[error("Pipeline stage '{0}' panicked")]
    StagePanicked(&'static str),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns true if the error only affects a single item and the stage
    /// that hit it can keep going.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::CorruptFrame(_))
    }

    /// Returns true if this is the user-interrupt cause.
    pub const fn is_interrupt(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}
