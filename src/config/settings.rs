//! Settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`.
//! Every section is `#[serde(default)]`, so a settings file only needs the
//! keys it wants to change.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::audio::{gain_from_percent, AudioFormat, CaptureSource, IndexClamp, SampleEncoding, SampleKind};
use crate::pipeline::{ConvertSettings, OnError};

// ---------------------------------------------------------------------------
// OutputConfig
// ---------------------------------------------------------------------------

/// Format written to stdout and the volume applied on the way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Output channel count (1 or 2 unless the capture already matches).
    pub channels: u16,
    /// Output bit depth: 8, 16, 24 or 32 for integers, 32 for float.
    pub bits_per_sample: u16,
    pub encoding: SampleEncoding,
    /// Volume in percent; `100` leaves samples untouched.
    pub volume: i32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 2,
            bits_per_sample: 16,
            encoding: SampleEncoding::SignedInteger,
            volume: 100,
        }
    }
}

// ---------------------------------------------------------------------------
// CaptureConfig
// ---------------------------------------------------------------------------

/// Capture device selection and queueing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub source: CaptureSource,
    /// Blocks buffered between the capture callback and the relay before
    /// new blocks are dropped.
    pub channel_capacity: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source: CaptureSource::Microphone,
            channel_capacity: 32,
        }
    }
}

// ---------------------------------------------------------------------------
// ResampleConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResampleConfig {
    pub index_clamp: IndexClamp,
}

// ---------------------------------------------------------------------------
// RelayConfig
// ---------------------------------------------------------------------------

/// Relay behaviour and console output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Whether a block that fails to convert stops the stream.
    pub on_error: OnError,
    /// Print the banner and parameter summary to stderr on startup.
    pub show_header: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            on_error: OnError::Abort,
            show_header: true,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use pcm_pipe::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// let settings = config.convert_settings().unwrap();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub output: OutputConfig,
    pub capture: CaptureConfig,
    pub resample: ResampleConfig,
    pub relay: RelayConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// The output format described by `[output]`.
    ///
    /// # Errors
    ///
    /// Zero rate or channels, or a depth/encoding pair the codec cannot
    /// write.
    pub fn output_format(&self) -> Result<AudioFormat> {
        let o = &self.output;
        let format = AudioFormat::new(o.sample_rate, o.channels, o.bits_per_sample, o.encoding)
            .context("invalid output format")?;
        SampleKind::of(&format).context("invalid output format")?;
        Ok(format)
    }

    /// Immutable per-stream conversion settings.
    pub fn convert_settings(&self) -> Result<ConvertSettings> {
        Ok(ConvertSettings::new(self.output_format()?)
            .with_gain(gain_from_percent(self.output.volume))
            .with_index_clamp(self.resample.index_clamp))
    }

    /// Check everything that would otherwise fail later at startup.
    pub fn validate(&self) -> Result<()> {
        self.output_format()?;
        if self.capture.channel_capacity == 0 {
            bail!("capture.channel_capacity must be at least 1");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(original, loaded);
    }

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.output.sample_rate, 44_100);
        assert_eq!(cfg.output.channels, 2);
        assert_eq!(cfg.output.bits_per_sample, 16);
        assert_eq!(cfg.output.encoding, SampleEncoding::SignedInteger);
        assert_eq!(cfg.output.volume, 100);
        assert_eq!(cfg.capture.source, CaptureSource::Microphone);
        assert_eq!(cfg.capture.channel_capacity, 32);
        assert_eq!(cfg.resample.index_clamp, IndexClamp::SourceLength);
        assert_eq!(cfg.relay.on_error, OnError::Abort);
        assert!(cfg.relay.show_header);
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.output.sample_rate = 48_000;
        cfg.output.channels = 1;
        cfg.output.bits_per_sample = 32;
        cfg.output.encoding = SampleEncoding::IeeeFloat;
        cfg.output.volume = 150;
        cfg.capture.source = CaptureSource::Loopback;
        cfg.resample.index_clamp = IndexClamp::SourceRate;
        cfg.relay.on_error = OnError::Skip;
        cfg.relay.show_header = false;

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(
            &path,
            "[output]\nsample_rate = 16000\n\n[capture]\nsource = \"wasapiloopback\"\n",
        )
        .unwrap();

        let cfg = AppConfig::load_from(&path).unwrap();
        assert_eq!(cfg.output.sample_rate, 16_000);
        assert_eq!(cfg.output.channels, 2);
        assert_eq!(cfg.capture.source, CaptureSource::Loopback);
        assert_eq!(cfg.relay, RelayConfig::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[output\nsample_rate = ").unwrap();
        assert!(AppConfig::load_from(&path).is_err());
    }

    #[test]
    fn convert_settings_from_volume() {
        let mut cfg = AppConfig::default();
        cfg.output.volume = 50;
        let settings = cfg.convert_settings().unwrap();
        assert_eq!(settings.gain, 0.5);
        assert_eq!(settings.output, AudioFormat::pcm(44_100, 2, 16).unwrap());
    }

    #[test]
    fn invalid_output_is_rejected() {
        let mut cfg = AppConfig::default();
        cfg.output.bits_per_sample = 12;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.output.encoding = SampleEncoding::IeeeFloat;
        cfg.output.bits_per_sample = 16;
        assert!(cfg.convert_settings().is_err());

        let mut cfg = AppConfig::default();
        cfg.output.sample_rate = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.capture.channel_capacity = 0;
        assert!(cfg.validate().is_err());
    }
}
