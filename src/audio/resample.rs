//! Sample-rate conversion by linear interpolation.
//!
//! The resampler is deliberately lightweight: no band-limiting, no state
//! carried between blocks.  Each call maps one interleaved block onto the
//! output rate on its own.
//!
//! For output frame `j` the source position is `k = j * src_rate / dst_rate`;
//! the sample is interpolated between source frames `floor(k)` and
//! `ceil(k)` on the same channel with weight `k mod 1`.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// IndexClamp
// ---------------------------------------------------------------------------

/// Upper bound applied to source frame offsets before lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum IndexClamp {
    /// Clamp to the last whole frame of the source block.
    SourceLength,
    /// Legacy bound: clamp the sample offset to the numeric value of the
    /// source sample rate.  Differs from [`IndexClamp::SourceLength`] only
    /// for blocks holding more than `src_rate` samples, where it pins the
    /// tail of the block to one source position.  Still limited to the block
    /// length so lookups stay in bounds.
    SourceRate,
}

impl Default for IndexClamp {
    fn default() -> Self {
        Self::SourceLength
    }
}

// ---------------------------------------------------------------------------
// resample
// ---------------------------------------------------------------------------

/// Resample interleaved `samples` from `src_rate` to `dst_rate`.
///
/// * Equal rates return the input unchanged.
/// * The output holds `floor(frames * dst_rate / src_rate)` frames, computed
///   in integer arithmetic so it never drifts by one.
/// * Channel interleaving is preserved; any trailing partial frame is ignored.
///
/// # Example
///
/// ```rust
/// use pcm_pipe::audio::{resample, IndexClamp};
///
/// // 6 mono frames at 3 Hz → 4 frames at 2 Hz
/// let out = resample(vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0], 1, 3, 2, IndexClamp::SourceLength);
/// assert_eq!(out, vec![0.0, 1.5, 3.0, 4.5]);
/// ```
pub fn resample(
    samples: Vec<f64>,
    channels: u16,
    src_rate: u32,
    dst_rate: u32,
    clamp: IndexClamp,
) -> Vec<f64> {
    if src_rate == dst_rate {
        return samples;
    }

    let channels = usize::from(channels);
    if channels == 0 || src_rate == 0 {
        return Vec::new();
    }

    let total_frames = samples.len() / channels;
    if total_frames == 0 {
        return Vec::new();
    }

    let out_frames = (total_frames as u64 * u64::from(dst_rate) / u64::from(src_rate)) as usize;
    let out_total = out_frames * channels;
    let ratio = f64::from(src_rate) / f64::from(dst_rate);

    let last_frame_offset = (total_frames - 1) * channels;
    let bound = match clamp {
        IndexClamp::SourceLength => last_frame_offset,
        IndexClamp::SourceRate => (src_rate as usize).min(last_frame_offset),
    };

    let mut output = Vec::with_capacity(out_total);
    for i in 0..out_total {
        let j = i / channels;
        let ch = i % channels;

        let k = j as f64 * ratio;
        let k0 = k.floor() as usize;
        let k1 = k.ceil() as usize;
        let weight = k.fract();

        let idx0 = (k0 * channels).min(bound) + ch;
        let idx1 = (k1 * channels).min(bound) + ch;

        let s0 = samples[idx0];
        let s1 = samples[idx1];
        output.push(s0 + (s1 - s0) * weight);
    }

    output
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_rates_are_identity() {
        let input: Vec<f64> = (0..160).map(|i| f64::from(i) / 160.0).collect();
        let out = resample(input.clone(), 2, 44_100, 44_100, IndexClamp::SourceLength);
        assert_eq!(out, input);
    }

    #[test]
    fn empty_input() {
        let out = resample(Vec::new(), 1, 48_000, 16_000, IndexClamp::SourceLength);
        assert!(out.is_empty());
    }

    #[test]
    fn frame_count_is_floored() {
        // 441 frames @ 44.1 kHz → exactly 480 @ 48 kHz
        let out = resample(vec![0.0; 441], 1, 44_100, 48_000, IndexClamp::SourceLength);
        assert_eq!(out.len(), 480);

        // 1000 * 44100 / 48000 = 918.75 → 918
        let out = resample(vec![0.0; 1000], 1, 48_000, 44_100, IndexClamp::SourceLength);
        assert_eq!(out.len(), 918);

        // 7 * 3 / 2 = 10.5 → 10 frames, 20 samples in stereo
        let out = resample(vec![0.0; 14], 2, 2, 3, IndexClamp::SourceLength);
        assert_eq!(out.len(), 20);
    }

    #[test]
    fn downsample_48k_to_16k_output_length() {
        let out = resample(vec![0.5; 480], 1, 48_000, 16_000, IndexClamp::SourceLength);
        assert_eq!(out.len(), 160);
    }

    #[test]
    fn constant_signal_preserves_amplitude() {
        let out = resample(vec![0.5; 960], 2, 48_000, 44_100, IndexClamp::SourceLength);
        for &s in &out {
            assert!((s - 0.5).abs() < 1e-12, "amplitude drift: {s}");
        }
    }

    #[test]
    fn fractional_positions_interpolate() {
        let out = resample(
            vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0],
            1,
            3,
            2,
            IndexClamp::SourceLength,
        );
        assert_eq!(out, vec![0.0, 1.5, 3.0, 4.5]);
    }

    #[test]
    fn upsample_holds_last_frame() {
        let out = resample(vec![0.0, 1.0], 1, 1, 2, IndexClamp::SourceLength);
        assert_eq!(out, vec![0.0, 0.5, 1.0, 1.0]);
    }

    #[test]
    fn stereo_channels_stay_separate() {
        let out = resample(vec![0.0, 10.0, 1.0, 11.0], 2, 2, 4, IndexClamp::SourceLength);
        assert_eq!(out, vec![0.0, 10.0, 0.5, 10.5, 1.0, 11.0, 1.0, 11.0]);
    }

    #[test]
    fn clamp_modes_agree_for_short_blocks() {
        // 10 ms at 48 kHz holds far fewer than 48 000 samples
        let input: Vec<f64> = (0..960).map(|i| (f64::from(i) * 0.01).sin()).collect();
        let a = resample(input.clone(), 2, 48_000, 44_100, IndexClamp::SourceLength);
        let b = resample(input, 2, 48_000, 44_100, IndexClamp::SourceRate);
        assert_eq!(a, b);
    }

    #[test]
    fn source_rate_clamp_pins_long_blocks() {
        // 8 frames at 4 Hz is two seconds: the legacy bound stops at offset 4
        let input = vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let by_length = resample(input.clone(), 1, 4, 2, IndexClamp::SourceLength);
        let by_rate = resample(input, 1, 4, 2, IndexClamp::SourceRate);
        assert_eq!(by_length, vec![0.0, 2.0, 4.0, 6.0]);
        assert_eq!(by_rate, vec![0.0, 2.0, 4.0, 4.0]);
    }
}
