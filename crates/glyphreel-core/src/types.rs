//! Core data model shared by every pipeline stage.

pub mod audio;
pub mod frame;
pub mod media;

pub use audio::{AudioBlock, StereoSample};
pub use frame::{DisplayFrame, RawVideoFrame};
pub use media::MediaInfo;
