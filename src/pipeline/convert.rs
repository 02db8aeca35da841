//! Raw-bytes-to-raw-bytes conversion of one captured buffer.
//!
//! ```text
//! bytes (in) → decode → volume → resample → mix → encode → bytes (out)
//! ```
//!
//! [`Converter`] holds an immutable [`ConvertSettings`] and is safe to call
//! from any thread; it keeps no state between blocks.

use std::borrow::Cow;

use thiserror::Error;

use crate::audio::{AudioBlock, AudioFormat, CodecError, IndexClamp, MixError, SampleKind};

// ---------------------------------------------------------------------------
// ConvertError
// ---------------------------------------------------------------------------

/// A block could not be converted.  Nothing was produced for it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Mix(#[from] MixError),
}

// ---------------------------------------------------------------------------
// ConvertSettings
// ---------------------------------------------------------------------------

/// Target format and processing options for every block in a stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvertSettings {
    /// Format written downstream.
    pub output: AudioFormat,
    /// Linear gain; `1.0` is unity.
    pub gain: f64,
    /// Resampler index bound.
    pub index_clamp: IndexClamp,
}

impl ConvertSettings {
    /// Settings with unity gain and the default index clamp.
    pub fn new(output: AudioFormat) -> Self {
        Self {
            output,
            gain: 1.0,
            index_clamp: IndexClamp::default(),
        }
    }

    pub fn with_gain(mut self, gain: f64) -> Self {
        self.gain = gain;
        self
    }

    pub fn with_index_clamp(mut self, index_clamp: IndexClamp) -> Self {
        self.index_clamp = index_clamp;
        self
    }
}

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

/// Converts captured buffers into the configured output format.
///
/// # Example
///
/// ```rust
/// use pcm_pipe::audio::AudioFormat;
/// use pcm_pipe::pipeline::{ConvertSettings, Converter};
///
/// let stereo = AudioFormat::pcm(8_000, 2, 16).unwrap();
/// let mono = AudioFormat::pcm(8_000, 1, 16).unwrap();
/// let converter = Converter::new(ConvertSettings::new(mono)).unwrap();
///
/// // one stereo frame (0x0100, 0x0300) → one mono sample 0x0200
/// let out = converter.process(&stereo, &[0x00, 0x01, 0x00, 0x03]).unwrap();
/// assert_eq!(&*out, &[0x00, 0x02]);
/// ```
#[derive(Debug, Clone)]
pub struct Converter {
    settings: ConvertSettings,
}

impl Converter {
    /// Build a converter.
    ///
    /// # Errors
    ///
    /// [`ConvertError::Codec`] when the output format cannot be encoded, so
    /// an unusable target fails once instead of on every block.
    pub fn new(settings: ConvertSettings) -> Result<Self, ConvertError> {
        SampleKind::of(&settings.output)?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &ConvertSettings {
        &self.settings
    }

    /// `true` when blocks in `input` can be forwarded byte for byte.
    pub fn is_passthrough(&self, input: &AudioFormat) -> bool {
        self.settings.gain == 1.0 && *input == self.settings.output
    }

    /// Convert one block of decoded samples.
    ///
    /// Stages run in a fixed order: volume (skipped at unity gain), then
    /// resampling, then channel mixing.
    pub fn convert(&self, block: AudioBlock) -> Result<AudioBlock, ConvertError> {
        let block = if self.settings.gain != 1.0 {
            block.scale_volume(self.settings.gain)
        } else {
            block
        };
        Ok(block.convert(self.settings.output, self.settings.index_clamp)?)
    }

    /// Convert a raw buffer in `input` format into output-format bytes.
    ///
    /// When [`is_passthrough`](Self::is_passthrough) holds the input is
    /// returned as-is (including any trailing partial sample); otherwise it
    /// is decoded, converted and re-encoded.
    pub fn process<'a>(
        &self,
        input: &AudioFormat,
        bytes: &'a [u8],
    ) -> Result<Cow<'a, [u8]>, ConvertError> {
        if self.is_passthrough(input) {
            return Ok(Cow::Borrowed(bytes));
        }

        let block = AudioBlock::decode(*input, bytes)?;
        let block = self.convert(block)?;
        Ok(Cow::Owned(block.encode()?))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
