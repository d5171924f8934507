//! Audio block types.

/// One stereo audio frame: left and right sample.
pub type StereoSample = [f32; 2];

/// A chunk of decoded audio, one `StereoSample` per audio frame.
///
/// The audio engine may consume a block partially before pulling the next.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioBlock {
    samples: Vec<StereoSample>,
}

impl AudioBlock {
    pub const fn new(samples: Vec<StereoSample>) -> Self {
        Self { samples }
    }

    /// Build a block from interleaved `L R L R ...` samples.
    ///
    /// A trailing unpaired sample is dropped.
    pub fn from_interleaved(interleaved: &[f32]) -> Self {
        let samples = interleaved
            .chunks_exact(2)
            .map(|pair| [pair[0], pair[1]])
            .collect();
        Self { samples }
    }

    /// A block of `len` silent frames.
    pub fn silence(len: usize) -> Self {
        Self {
            samples: vec![[0.0, 0.0]; len],
        }
    }

    pub fn samples(&self) -> &[StereoSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl From<Vec<StereoSample>> for AudioBlock {
    fn from(samples: Vec<StereoSample>) -> Self {
        Self::new(samples)
    }
}
