//! Stream format descriptors.
//!
//! [`AudioFormat`] describes one side of a conversion: sample rate, channel
//! count, bit depth and encoding.  It is created once per stream
//! configuration and never mutated afterwards.
//!
//! Construction only rejects values that make no sense for *any* stream
//! (zero rate, zero channels).  Whether a given `(encoding, bits)` pair can
//! actually be decoded or encoded is answered by [`SampleKind::of`], which the
//! codec consults at decode/encode time.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::codec::CodecError;

// ---------------------------------------------------------------------------
// SampleEncoding
// ---------------------------------------------------------------------------

/// How each sample is represented on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SampleEncoding {
    /// Little-endian two's-complement integers.
    SignedInteger,
    /// Little-endian IEEE-754 floating point.
    IeeeFloat,
}

impl Default for SampleEncoding {
    fn default() -> Self {
        Self::SignedInteger
    }
}

// ---------------------------------------------------------------------------
// FormatError
// ---------------------------------------------------------------------------

/// A format descriptor that cannot describe any stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("sample rate must be positive")]
    ZeroSampleRate,

    #[error("channel count must be positive")]
    ZeroChannels,
}

// ---------------------------------------------------------------------------
// AudioFormat
// ---------------------------------------------------------------------------

/// Immutable description of an interleaved sample stream.
///
/// # Example
///
/// ```rust
/// use pcm_pipe::audio::{AudioFormat, SampleEncoding};
///
/// let cd = AudioFormat::pcm(44_100, 2, 16).unwrap();
/// assert_eq!(cd.encoding(), SampleEncoding::SignedInteger);
/// assert_eq!(cd.bytes_per_frame(), 4);
/// assert_eq!(cd.to_string(), "44100 Hz, 2 ch, 16-bit signed integer");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioFormat {
    sample_rate: u32,
    channels: u16,
    bits_per_sample: u16,
    encoding: SampleEncoding,
}

impl AudioFormat {
    /// Build a format descriptor.
    ///
    /// # Errors
    ///
    /// [`FormatError::ZeroSampleRate`] or [`FormatError::ZeroChannels`].
    pub fn new(
        sample_rate: u32,
        channels: u16,
        bits_per_sample: u16,
        encoding: SampleEncoding,
    ) -> Result<Self, FormatError> {
        if sample_rate == 0 {
            return Err(FormatError::ZeroSampleRate);
        }
        if channels == 0 {
            return Err(FormatError::ZeroChannels);
        }
        Ok(Self {
            sample_rate,
            channels,
            bits_per_sample,
            encoding,
        })
    }

    /// Signed-integer PCM at the given bit depth.
    pub fn pcm(sample_rate: u32, channels: u16, bits_per_sample: u16) -> Result<Self, FormatError> {
        Self::new(
            sample_rate,
            channels,
            bits_per_sample,
            SampleEncoding::SignedInteger,
        )
    }

    /// 32-bit IEEE float, the only float width the codec handles.
    pub fn ieee_float(sample_rate: u32, channels: u16) -> Result<Self, FormatError> {
        Self::new(sample_rate, channels, 32, SampleEncoding::IeeeFloat)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.bits_per_sample
    }

    pub fn encoding(&self) -> SampleEncoding {
        self.encoding
    }

    /// Bytes occupied by one sample (rounded down to whole bytes).
    pub fn bytes_per_sample(&self) -> usize {
        usize::from(self.bits_per_sample / 8)
    }

    /// Bytes occupied by one interleaved frame.
    pub fn bytes_per_frame(&self) -> usize {
        self.bytes_per_sample() * usize::from(self.channels)
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoding = match self.encoding {
            SampleEncoding::SignedInteger => "signed integer",
            SampleEncoding::IeeeFloat => "float",
        };
        write!(
            f,
            "{} Hz, {} ch, {}-bit {}",
            self.sample_rate, self.channels, self.bits_per_sample, encoding
        )
    }
}

// ---------------------------------------------------------------------------
// SampleKind
// ---------------------------------------------------------------------------

/// The `(encoding, bits)` combinations the codec implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    I8,
    I16,
    I24,
    I32,
    F32,
}

impl SampleKind {
    /// Resolve the sample kind for `format`.
    ///
    /// # Errors
    ///
    /// [`CodecError::UnsupportedFormat`] for any pair not listed in
    /// [`SampleKind`] (e.g. 12-bit integers or 64-bit floats).
    pub fn of(format: &AudioFormat) -> Result<Self, CodecError> {
        match (format.encoding, format.bits_per_sample) {
            (SampleEncoding::SignedInteger, 8) => Ok(Self::I8),
            (SampleEncoding::SignedInteger, 16) => Ok(Self::I16),
            (SampleEncoding::SignedInteger, 24) => Ok(Self::I24),
            (SampleEncoding::SignedInteger, 32) => Ok(Self::I32),
            (SampleEncoding::IeeeFloat, 32) => Ok(Self::F32),
            (encoding, bits_per_sample) => Err(CodecError::UnsupportedFormat {
                encoding,
                bits_per_sample,
            }),
        }
    }

    /// Width of one sample in bytes.
    pub fn width(self) -> usize {
        match self {
            Self::I8 => 1,
            Self::I16 => 2,
            Self::I24 => 3,
            Self::I32 | Self::F32 => 4,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
