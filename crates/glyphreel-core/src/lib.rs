//! # glyphreel-core
//!
//! Core types, collaborator traits, configuration and error handling for the
//! glyphreel terminal video player.

pub mod config;
pub mod error;
pub mod source;
pub mod types;

pub use config::{AudioConfig, Charset, DecoderConfig, DisplayConfig, PlayerConfig, VideoConfig};
pub use error::{Error, Result};
pub use source::{AudioSource, FrameRenderer, MediaOpener, OpenedMedia, VideoSource};
pub use types::*;
