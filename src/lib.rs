//! Capture audio and re-emit it as raw interleaved samples in a chosen
//! format.
//!
//! * [`audio`]: format model, sample codec, volume/resample/mix stages,
//!   cpal capture.
//! * [`pipeline`]: the per-block [`Converter`](pipeline::Converter) and
//!   the relay loop feeding a byte sink.
//! * [`config`]: `settings.toml` persistence.
//! * [`cli`]: command-line flags layered over the config.

pub mod audio;
pub mod cli;
pub mod config;
pub mod pipeline;
