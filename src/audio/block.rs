//! One block of normalised samples plus the format it currently represents.
//!
//! An [`AudioBlock`] lives for a single conversion: it is decoded from a raw
//! buffer, transformed stage by stage, encoded, and dropped.  Every stage
//! consumes the block and returns its successor, so nothing can hold on to a
//! block between calls.

use super::codec::{self, CodecError};
use super::format::AudioFormat;
use super::mix::{mix_channels, MixError};
use super::resample::{resample, IndexClamp};
use super::volume::scale_volume;

/// Interleaved normalised samples tagged with their format.
///
/// `samples.len()` is always a whole number of frames for `format.channels()`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBlock {
    format: AudioFormat,
    samples: Vec<f64>,
}

impl AudioBlock {
    /// Wrap already-normalised samples.  A trailing partial frame is dropped.
    pub fn new(format: AudioFormat, mut samples: Vec<f64>) -> Self {
        let channels = usize::from(format.channels());
        samples.truncate(samples.len() - samples.len() % channels);
        Self { format, samples }
    }

    /// Decode a raw buffer in `format`.
    ///
    /// Trailing bytes that do not form a whole sample are dropped, and so is
    /// a trailing partial frame.
    pub fn decode(format: AudioFormat, bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(Self::new(format, codec::decode(&format, bytes)?))
    }

    pub fn format(&self) -> &AudioFormat {
        &self.format
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f64> {
        self.samples
    }

    /// Number of interleaved frames.
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.format.channels())
    }

    /// Apply a linear gain.  `1.0` is a no-op.
    pub fn scale_volume(mut self, gain: f64) -> Self {
        scale_volume(&mut self.samples, gain);
        self
    }

    /// Move the block to `output`'s rate and channel count, in that order.
    ///
    /// The returned block carries `output` as its format.  Bit depth and
    /// encoding only matter at [`encode`](Self::encode) time since the
    /// samples stay normalised.
    pub fn convert(self, output: AudioFormat, clamp: IndexClamp) -> Result<Self, MixError> {
        let Self { format, samples } = self;

        let samples = if format.sample_rate() != output.sample_rate() {
            resample(
                samples,
                format.channels(),
                format.sample_rate(),
                output.sample_rate(),
                clamp,
            )
        } else {
            samples
        };

        let samples = if format.channels() != output.channels() {
            mix_channels(samples, format.channels(), output.channels())?
        } else {
            samples
        };

        Ok(Self {
            format: output,
            samples,
        })
    }

    /// Encode the samples in this block's format.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        codec::encode(&self.format, &self.samples)
    }
}
