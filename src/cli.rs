//! Command-line flags.
//!
//! Flags override the values loaded from `settings.toml`; anything not given
//! on the command line keeps its configured value.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;

use crate::audio::{AudioFormat, CaptureSource, IndexClamp, SampleEncoding};
use crate::config::{AppConfig, AppPaths};
use crate::pipeline::OnError;

/// Capture audio and write raw samples to stdout in the requested format.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "pcm-pipe", version, about)]
pub struct Cli {
    /// Capture device.
    #[arg(short = 'd', long = "device", value_enum)]
    pub device: Option<CaptureSource>,

    /// Output sample rate in Hz, e.g. 44100.
    #[arg(short = 'r', long = "rate")]
    pub sample_rate: Option<u32>,

    /// Output channel count, e.g. 2.
    #[arg(short = 'c', long)]
    pub channels: Option<u16>,

    /// Output bits per sample, e.g. 16.
    #[arg(short = 'b', long = "bits")]
    pub bits_per_sample: Option<u16>,

    /// Volume in percent; 100 = unchanged.
    #[arg(short = 'v', long, allow_negative_numbers = true)]
    pub volume: Option<i32>,

    /// Write 32-bit IEEE float samples instead of signed integers.
    #[arg(long)]
    pub float: bool,

    /// Upper bound used by the resampler when looking up source frames.
    #[arg(long, value_enum)]
    pub index_clamp: Option<IndexClamp>,

    /// Stop on the first block that cannot be converted, or skip it.
    #[arg(long, value_enum)]
    pub on_error: Option<OnError>,

    /// Blocks queued between capture and output before new ones are dropped.
    #[arg(long)]
    pub capacity: Option<usize>,

    /// Do not print the header to stderr.
    #[arg(short = 'N', long)]
    pub no_header: bool,

    /// Check the arguments and print the resulting settings without recording.
    #[arg(long)]
    pub test: bool,

    /// Settings file to use instead of the platform default.
    #[arg(long, env = "PCM_PIPE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Write the effective settings back to the settings file and exit.
    #[arg(long)]
    pub save_config: bool,
}

impl Cli {
    /// `--config`, or the platform settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| AppPaths::new().settings_file)
    }

    /// Load `path` and overlay the flags.
    ///
    /// A settings file that cannot be read or parsed is replaced by the
    /// defaults with a warning, except under `--save-config`, where it is an
    /// error so the file is not overwritten.
    pub fn effective_config(&self, path: &Path) -> Result<AppConfig> {
        let mut config = match AppConfig::load_from(path) {
            Ok(config) => config,
            Err(e) if self.save_config => return Err(e),
            Err(e) => {
                log::warn!("Failed to load config ({e:#}); using defaults");
                AppConfig::default()
            }
        };
        self.apply(&mut config);
        Ok(config)
    }

    /// Overlay the flags that were given onto `config`.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(device) = self.device {
            config.capture.source = device;
        }
        if let Some(rate) = self.sample_rate {
            config.output.sample_rate = rate;
        }
        if let Some(channels) = self.channels {
            config.output.channels = channels;
        }
        if self.float {
            config.output.encoding = SampleEncoding::IeeeFloat;
            config.output.bits_per_sample = 32;
        }
        if let Some(bits) = self.bits_per_sample {
            config.output.bits_per_sample = bits;
        }
        if let Some(volume) = self.volume {
            config.output.volume = volume;
        }
        if let Some(clamp) = self.index_clamp {
            config.resample.index_clamp = clamp;
        }
        if let Some(on_error) = self.on_error {
            config.relay.on_error = on_error;
        }
        if let Some(capacity) = self.capacity {
            config.capture.channel_capacity = capacity;
        }
        if self.no_header {
            config.relay.show_header = false;
        }
    }
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Program name/version and the requested parameters.
pub fn write_header(w: &mut impl Write, config: &AppConfig) -> std::io::Result<()> {
    writeln!(w, "{} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))?;
    writeln!(w)?;
    writeln!(w, "parameter:")?;
    writeln!(w, "  sampling rate  {} Hz", config.output.sample_rate)?;
    writeln!(w, "  ch             {} ch", config.output.channels)?;
    writeln!(w, "  bits           {} bit", config.output.bits_per_sample)?;
    writeln!(w, "  encoding       {:?}", config.output.encoding)?;
    writeln!(w, "  capture device {:?}", config.capture.source)?;
    writeln!(w, "  vol            {}", config.output.volume)?;
    writeln!(w)
}

/// The format the device delivers and the format written to stdout.
pub fn write_formats(
    w: &mut impl Write,
    capture: &AudioFormat,
    output: &AudioFormat,
) -> std::io::Result<()> {
    writeln!(w, "capture format:")?;
    writeln!(w, "  {capture}")?;
    write_output_format(w, output)?;
    if capture == output {
        writeln!(w, "  (no conversion needed)")?;
    }
    writeln!(w)
}

/// The format written to stdout.
pub fn write_output_format(w: &mut impl Write, output: &AudioFormat) -> std::io::Result<()> {
    writeln!(w, "output format:")?;
    writeln!(w, "  {output}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
