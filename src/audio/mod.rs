//! Audio formats, the sample codec, and the per-block transforms.
//!
//! # Pipeline
//!
//! ```text
//! raw bytes (in) → decode → scale_volume → resample → mix_channels → encode → raw bytes (out)
//! ```
//!
//! Samples are held as normalised `f64` between decode and encode, so bit
//! depth and encoding only matter at the two ends.
//!
//! # Quick Start
//!
//! ```rust
//! use pcm_pipe::audio::{AudioBlock, AudioFormat, IndexClamp};
//!
//! let input = AudioFormat::pcm(8_000, 1, 16).unwrap();
//! let output = AudioFormat::ieee_float(8_000, 2).unwrap();
//!
//! let block = AudioBlock::decode(input, &[0xFF, 0x7F]).unwrap();
//! let block = block.convert(output, IndexClamp::SourceLength).unwrap();
//! assert_eq!(block.samples(), &[1.0, 1.0]);
//! assert_eq!(block.encode().unwrap().len(), 8);
//! ```

pub mod block;
pub mod capture;
pub mod codec;
pub mod format;
pub mod mix;
pub mod resample;
pub mod volume;

pub use block::AudioBlock;
pub use capture::{
    capture_channel, AudioCapture, CaptureError, CaptureReceiver, CaptureSender, CaptureSource,
    RawBlock, StreamHandle,
};
pub use codec::{decode, encode, CodecError};
pub use format::{AudioFormat, FormatError, SampleEncoding, SampleKind};
pub use mix::{mix_channels, MixError};
pub use resample::{resample, IndexClamp};
pub use volume::{gain_from_percent, scale_volume};
