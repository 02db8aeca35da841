//! Raw sample codec: little-endian bytes ⇄ normalised `f64`.
//!
//! # Integer scaling
//!
//! Signed-integer samples are divided by the **positive** maximum of their
//! width on decode (`0x7F`, `0x7FFF`, `0x7FFFFF`, `0x7FFFFFFF`) and
//! multiplied by the same value on encode.  The scale is therefore
//! asymmetric: the most negative code decodes slightly below `-1.0`
//! (`i16::MIN` → `-1.000030518…`).  This is legacy behaviour kept on purpose;
//! streams produced by earlier versions of this tool rely on it being
//! bit-exact, so do not "fix" it to a symmetric `0x8000` divisor.
//!
//! # End of block
//!
//! Decoding stops when fewer than one sample's worth of bytes remain.  The
//! trailing partial sample is dropped, not reported.

use thiserror::Error;

use super::format::{AudioFormat, SampleEncoding, SampleKind};

// ---------------------------------------------------------------------------
// CodecError
// ---------------------------------------------------------------------------

/// Errors raised by [`decode`] and [`encode`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// No codec exists for this `(encoding, bits)` pair.
    #[error("unsupported sample format: {bits_per_sample}-bit {encoding:?}")]
    UnsupportedFormat {
        encoding: SampleEncoding,
        bits_per_sample: u16,
    },
}

// ---------------------------------------------------------------------------
// Integer ranges
// ---------------------------------------------------------------------------

/// Clamp range for one integer width; the positive maximum doubles as the
/// decode divisor and encode multiplier.
struct IntRange {
    min: i64,
    max: i64,
}

impl IntRange {
    const fn bits(bits: u32) -> Self {
        let max = (1_i64 << (bits - 1)) - 1;
        Self { min: -max - 1, max }
    }

    fn to_sample(&self, raw: i64) -> f64 {
        raw as f64 / self.max as f64
    }

    /// Truncate toward zero, then clamp.  Never wraps.
    fn to_int(&self, sample: f64) -> i64 {
        // `as` truncates toward zero and saturates (NaN → 0).
        let v = (sample * self.max as f64) as i64;
        v.clamp(self.min, self.max)
    }
}

const I8_RANGE: IntRange = IntRange::bits(8);
const I16_RANGE: IntRange = IntRange::bits(16);
const I24_RANGE: IntRange = IntRange::bits(24);
const I32_RANGE: IntRange = IntRange::bits(32);

// ---------------------------------------------------------------------------
// decode
// ---------------------------------------------------------------------------

/// Decode a raw little-endian buffer into normalised samples.
///
/// The output holds `bytes.len() / width` samples; any trailing partial
/// sample is ignored.
///
/// # Errors
///
/// [`CodecError::UnsupportedFormat`] before any sample is produced when the
/// format has no codec.
///
/// # Example
///
/// ```rust
/// use pcm_pipe::audio::{decode, AudioFormat};
///
/// let fmt = AudioFormat::pcm(8_000, 1, 16).unwrap();
/// // 0x7FFF, then one stray byte that is dropped
/// let samples = decode(&fmt, &[0xFF, 0x7F, 0x12]).unwrap();
/// assert_eq!(samples, vec![1.0]);
/// ```
pub fn decode(format: &AudioFormat, bytes: &[u8]) -> Result<Vec<f64>, CodecError> {
    let kind = SampleKind::of(format)?;
    let chunks = bytes.chunks_exact(kind.width());

    let samples: Vec<f64> = match kind {
        SampleKind::I8 => chunks
            .map(|b| I8_RANGE.to_sample(i64::from(b[0] as i8)))
            .collect(),
        SampleKind::I16 => chunks
            .map(|b| I16_RANGE.to_sample(i64::from(i16::from_le_bytes([b[0], b[1]]))))
            .collect(),
        SampleKind::I24 => chunks
            .map(|b| {
                // Sign-extend through the top byte of an i32.
                let raw = i32::from_le_bytes([0, b[0], b[1], b[2]]) >> 8;
                I24_RANGE.to_sample(i64::from(raw))
            })
            .collect(),
        SampleKind::I32 => chunks
            .map(|b| I32_RANGE.to_sample(i64::from(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))))
            .collect(),
        SampleKind::F32 => chunks
            .map(|b| f64::from(f32::from_le_bytes([b[0], b[1], b[2], b[3]])))
            .collect(),
    };

    Ok(samples)
}

// ---------------------------------------------------------------------------
// encode
// ---------------------------------------------------------------------------

/// Encode normalised samples into raw little-endian bytes.
///
/// Integer widths clamp out-of-range values to the width's `[min, max]`;
/// floats are narrowed to `f32` without clamping.  The output is always
/// exactly `samples.len() * width` bytes.
///
/// # Errors
///
/// [`CodecError::UnsupportedFormat`] when the format has no codec.
pub fn encode(format: &AudioFormat, samples: &[f64]) -> Result<Vec<u8>, CodecError> {
    let kind = SampleKind::of(format)?;
    let mut out = Vec::with_capacity(samples.len() * kind.width());

    match kind {
        SampleKind::I8 => {
            for &s in samples {
                out.push(I8_RANGE.to_int(s) as i8 as u8);
            }
        }
        SampleKind::I16 => {
            for &s in samples {
                out.extend_from_slice(&(I16_RANGE.to_int(s) as i16).to_le_bytes());
            }
        }
        SampleKind::I24 => {
            for &s in samples {
                let le = (I24_RANGE.to_int(s) as i32).to_le_bytes();
                out.extend_from_slice(&le[..3]);
            }
        }
        SampleKind::I32 => {
            for &s in samples {
                out.extend_from_slice(&(I32_RANGE.to_int(s) as i32).to_le_bytes());
            }
        }
        SampleKind::F32 => {
            for &s in samples {
                out.extend_from_slice(&(s as f32).to_le_bytes());
            }
        }
    }

    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
