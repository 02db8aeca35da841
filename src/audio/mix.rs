//! Channel-count conversion between mono and stereo.

use thiserror::Error;

/// A channel conversion this mixer does not implement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MixError {
    #[error("unsupported channel conversion: {from} ch -> {to} ch")]
    UnsupportedChannelConversion { from: u16, to: u16 },
}

/// Convert interleaved `samples` from `from` channels to `to` channels.
///
/// * `from == to` returns the input unchanged.
/// * mono → stereo duplicates each sample (`L = R = source`).
/// * stereo → mono averages each pair (`(L + R) / 2`).
///
/// # Errors
///
/// [`MixError::UnsupportedChannelConversion`] for every other pair.
///
/// # Example
///
/// ```rust
/// use pcm_pipe::audio::mix_channels;
///
/// let mono = mix_channels(vec![1.0, 1.0, 0.0, 0.0], 2, 1).unwrap();
/// assert_eq!(mono, vec![1.0, 0.0]);
/// ```
pub fn mix_channels(samples: Vec<f64>, from: u16, to: u16) -> Result<Vec<f64>, MixError> {
    match (from, to) {
        (a, b) if a == b => Ok(samples),
        (1, 2) => Ok(samples.iter().flat_map(|&s| [s, s]).collect()),
        (2, 1) => Ok(samples
            .chunks_exact(2)
            .map(|frame| (frame[0] + frame[1]) / 2.0)
            .collect()),
        (from, to) => Err(MixError::UnsupportedChannelConversion { from, to }),
    }
}
