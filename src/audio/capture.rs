//! Audio capture via `cpal`.
//!
//! [`AudioCapture`] wraps the cpal host/device/stream lifecycle.  Call
//! [`AudioCapture::start`] with the sending half of a [`capture_channel`] to
//! begin streaming [`RawBlock`]s.  The returned [`StreamHandle`] is a RAII
//! guard; dropping it stops the underlying cpal stream.
//!
//! The callback never blocks: when the consumer falls behind and the block
//! queue is full, the block is dropped and a warning is logged.  The stop
//! reason travels on a separate `watch` channel, which holds one value and
//! so is delivered even when the block queue is full.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, watch};

use super::format::{AudioFormat, FormatError, SampleEncoding};

// ---------------------------------------------------------------------------
// CaptureSource
// ---------------------------------------------------------------------------

/// Which signal to capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CaptureSource {
    /// Default input device (microphone / line in).
    #[value(name = "wavein", alias = "microphone")]
    #[serde(alias = "wavein")]
    Microphone,
    /// Mixed output of the default render device.
    #[value(name = "wasapiloopback", alias = "loopback")]
    #[serde(alias = "wasapiloopback")]
    Loopback,
}

impl Default for CaptureSource {
    fn default() -> Self {
        Self::Microphone
    }
}

// ---------------------------------------------------------------------------
// RawBlock / capture channel
// ---------------------------------------------------------------------------

/// One buffer exactly as the device delivered it.
#[derive(Debug, Clone)]
pub struct RawBlock {
    /// Format of `bytes`.
    pub format: AudioFormat,
    /// Interleaved little-endian sample bytes.
    pub bytes: Vec<u8>,
}

/// Producer half, owned by the cpal callbacks.
#[derive(Debug)]
pub struct CaptureSender {
    /// Bounded block queue.
    pub blocks: mpsc::Sender<RawBlock>,
    /// Set to `Some(reason)` once the stream has failed.
    pub stopped: watch::Sender<Option<String>>,
}

/// Consumer half, drained by the relay.
#[derive(Debug)]
pub struct CaptureReceiver {
    pub blocks: mpsc::Receiver<RawBlock>,
    pub stopped: watch::Receiver<Option<String>>,
}

impl CaptureSender {
    /// Record that the stream has stopped.  Never blocks and never fails,
    /// whatever the state of the block queue.
    pub fn stop(&self, reason: impl Into<String>) {
        self.stopped.send_replace(Some(reason.into()));
    }
}

/// Create a capture channel queueing at most `capacity` blocks.
///
/// # Panics
///
/// When `capacity` is zero (see `AppConfig::validate`).
pub fn capture_channel(capacity: usize) -> (CaptureSender, CaptureReceiver) {
    let (block_tx, block_rx) = mpsc::channel(capacity);
    let (stop_tx, stop_rx) = watch::channel(None);
    (
        CaptureSender {
            blocks: block_tx,
            stopped: stop_tx,
        },
        CaptureReceiver {
            blocks: block_rx,
            stopped: stop_rx,
        },
    )
}

// ---------------------------------------------------------------------------
// StreamHandle
// ---------------------------------------------------------------------------

/// RAII guard that keeps the cpal stream alive.
pub struct StreamHandle {
    _stream: cpal::Stream,
}

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while setting up or running the audio capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoInputDevice,

    #[error("no output device found for loopback capture")]
    NoOutputDevice,

    #[error("failed to query default stream config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("device sample format {0:?} is not supported")]
    UnsupportedSampleFormat(cpal::SampleFormat),

    #[error("device reported an invalid format: {0}")]
    InvalidFormat(#[from] FormatError),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

// ---------------------------------------------------------------------------
// Format mapping
// ---------------------------------------------------------------------------

/// Map a cpal stream description onto an [`AudioFormat`].
pub fn format_from_cpal(
    sample_format: cpal::SampleFormat,
    sample_rate: u32,
    channels: u16,
) -> Result<AudioFormat, CaptureError> {
    let (bits, encoding) = match sample_format {
        cpal::SampleFormat::I8 => (8, SampleEncoding::SignedInteger),
        cpal::SampleFormat::I16 => (16, SampleEncoding::SignedInteger),
        cpal::SampleFormat::I32 => (32, SampleEncoding::SignedInteger),
        cpal::SampleFormat::F32 => (32, SampleEncoding::IeeeFloat),
        other => return Err(CaptureError::UnsupportedSampleFormat(other)),
    };
    Ok(AudioFormat::new(sample_rate, channels, bits, encoding)?)
}

/// The cpal sample format that carries `format` natively, if any.
fn cpal_sample_format(format: &AudioFormat) -> Option<cpal::SampleFormat> {
    match (format.encoding(), format.bits_per_sample()) {
        (SampleEncoding::SignedInteger, 8) => Some(cpal::SampleFormat::I8),
        (SampleEncoding::SignedInteger, 16) => Some(cpal::SampleFormat::I16),
        (SampleEncoding::SignedInteger, 32) => Some(cpal::SampleFormat::I32),
        (SampleEncoding::IeeeFloat, 32) => Some(cpal::SampleFormat::F32),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// AudioCapture
// ---------------------------------------------------------------------------

/// Capture device wrapper built on top of `cpal`.
///
/// # Example
///
/// ```rust,no_run
/// use pcm_pipe::audio::{capture_channel, AudioCapture, CaptureSource};
///
/// # async fn example() {
/// let (tx, mut rx) = capture_channel(32);
/// let capture = AudioCapture::open(CaptureSource::Microphone, None).unwrap();
/// let _handle = capture.start(tx).unwrap();
/// while let Some(block) = rx.blocks.recv().await {
///     println!("{} bytes @ {}", block.bytes.len(), block.format);
/// }
/// # }
/// ```
pub struct AudioCapture {
    device: cpal::Device,
    config: cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    format: AudioFormat,
    source: CaptureSource,
}

impl AudioCapture {
    /// Open the default device for `source`.
    ///
    /// For [`CaptureSource::Microphone`], when `preferred` is given and the
    /// device advertises a matching rate/channels/sample format, that
    /// configuration is used so no conversion is needed downstream.
    /// Otherwise the device default is used.
    ///
    /// For [`CaptureSource::Loopback`] the default output device is opened
    /// in its mix format; hosts without loopback support fail when the
    /// stream is built.
    pub fn open(source: CaptureSource, preferred: Option<&AudioFormat>) -> Result<Self, CaptureError> {
        let host = cpal::default_host();

        let (device, supported) = match source {
            CaptureSource::Microphone => {
                let device = host
                    .default_input_device()
                    .ok_or(CaptureError::NoInputDevice)?;
                let supported = match preferred.and_then(|p| matching_input_config(&device, p)) {
                    Some(config) => config,
                    None => device.default_input_config()?,
                };
                (device, supported)
            }
            CaptureSource::Loopback => {
                let device = host
                    .default_output_device()
                    .ok_or(CaptureError::NoOutputDevice)?;
                let supported = device.default_output_config()?;
                (device, supported)
            }
        };

        let sample_format = supported.sample_format();
        let format = format_from_cpal(
            sample_format,
            supported.sample_rate().0,
            supported.channels(),
        )?;
        let config: cpal::StreamConfig = supported.into();

        log::info!(
            "capture device: {} ({:?}, {})",
            device.name().unwrap_or_else(|_| "<unnamed>".into()),
            source,
            format
        );

        Ok(Self {
            device,
            config,
            sample_format,
            format,
            source,
        })
    }

    /// Start capturing into `tx`.
    ///
    /// Each callback buffer is copied into a [`RawBlock`] and offered with
    /// `try_send`.  A stream error is reported through
    /// [`CaptureSender::stop`].
    pub fn start(&self, tx: CaptureSender) -> Result<StreamHandle, CaptureError> {
        let format = self.format;
        let CaptureSender { blocks, stopped } = tx;
        let mut dropped: u64 = 0;

        let stream = self.device.build_input_stream_raw(
            &self.config,
            self.sample_format,
            move |data: &cpal::Data, _: &cpal::InputCallbackInfo| {
                let block = RawBlock {
                    format,
                    bytes: data.bytes().to_vec(),
                };
                match blocks.try_send(block) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        dropped += 1;
                        log::warn!("relay is behind; dropped capture block ({dropped} so far)");
                    }
                    // Receiver gone; the relay has stopped.
                    Err(mpsc::error::TrySendError::Closed(_)) => {}
                }
            },
            move |err: cpal::StreamError| {
                log::error!("cpal stream error: {err}");
                stopped.send_replace(Some(err.to_string()));
            },
            None,
        )?;

        stream.play()?;
        Ok(StreamHandle { _stream: stream })
    }

    /// Format of the blocks this capture delivers.
    pub fn format(&self) -> &AudioFormat {
        &self.format
    }

    pub fn source(&self) -> CaptureSource {
        self.source
    }
}

/// Find an input configuration carrying `wanted` natively.
fn matching_input_config(
    device: &cpal::Device,
    wanted: &AudioFormat,
) -> Option<cpal::SupportedStreamConfig> {
    let sample_format = cpal_sample_format(wanted)?;
    let rate = cpal::SampleRate(wanted.sample_rate());

    let mut configs = match device.supported_input_configs() {
        Ok(configs) => configs,
        Err(e) => {
            log::debug!("cannot enumerate input configs: {e}");
            return None;
        }
    };

    configs
        .find(|range| {
            range.channels() == wanted.channels()
                && range.sample_format() == sample_format
                && range.min_sample_rate() <= rate
                && rate <= range.max_sample_rate()
        })
        .map(|range| range.with_sample_rate(rate))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_halves_are_send() {
        fn assert_send<T: Send>() {}
        assert_send::<CaptureSender>();
        assert_send::<CaptureReceiver>();
    }

    #[test]
    fn stop_is_delivered_when_block_queue_is_full() {
        let (tx, mut rx) = capture_channel(1);
        let block = RawBlock {
            format: AudioFormat::pcm(48_000, 1, 16).unwrap(),
            bytes: vec![0, 0],
        };
        tx.blocks.try_send(block.clone()).unwrap();
        assert!(matches!(
            tx.blocks.try_send(block),
            Err(mpsc::error::TrySendError::Full(_))
        ));

        tx.stop("device unplugged");
        assert!(rx.stopped.has_changed().unwrap());
        assert_eq!(
            rx.stopped.borrow_and_update().as_deref(),
            Some("device unplugged")
        );
    }

    #[test]
    fn cpal_formats_map_onto_audio_formats() {
        let fmt = format_from_cpal(cpal::SampleFormat::I16, 48_000, 2).unwrap();
        assert_eq!(fmt, AudioFormat::pcm(48_000, 2, 16).unwrap());

        let fmt = format_from_cpal(cpal::SampleFormat::F32, 44_100, 2).unwrap();
        assert_eq!(fmt, AudioFormat::ieee_float(44_100, 2).unwrap());

        assert!(matches!(
            format_from_cpal(cpal::SampleFormat::U16, 44_100, 2),
            Err(CaptureError::UnsupportedSampleFormat(cpal::SampleFormat::U16))
        ));
        assert!(matches!(
            format_from_cpal(cpal::SampleFormat::I16, 44_100, 0),
            Err(CaptureError::InvalidFormat(FormatError::ZeroChannels))
        ));
    }

    #[test]
    fn native_sample_format_lookup() {
        let fmt = AudioFormat::pcm(48_000, 2, 16).unwrap();
        assert_eq!(cpal_sample_format(&fmt), Some(cpal::SampleFormat::I16));

        let fmt = AudioFormat::pcm(48_000, 2, 24).unwrap();
        assert_eq!(cpal_sample_format(&fmt), None);
    }

    #[test]
    fn capture_source_accepts_legacy_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            source: CaptureSource,
        }
        let w: Wrapper = toml::from_str(r#"source = "wasapiloopback""#).unwrap();
        assert_eq!(w.source, CaptureSource::Loopback);
        let w: Wrapper = toml::from_str(r#"source = "microphone""#).unwrap();
        assert_eq!(w.source, CaptureSource::Microphone);
    }
}
