//! Conversion pipeline and the relay that drives it.
//!
//! # Architecture
//!
//! ```text
//! AudioCapture (cpal thread)
//!        │ RawBlock       try_send, bounded mpsc
//!        │ stop reason    watch (never full)
//!        ▼
//! run_relay()  ← single tokio task
//!        │
//!        ├─ Converter::process
//!        │     ├─ fast path: formats match, unity gain → bytes forwarded
//!        │     └─ decode → volume → resample → mix → encode
//!        │
//!        └─ sink (stdout) write_all + flush
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use pcm_pipe::audio::{capture_channel, AudioCapture, AudioFormat, CaptureSource};
//! use pcm_pipe::pipeline::{run_relay, ConvertSettings, Converter, OnError};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let output = AudioFormat::pcm(44_100, 2, 16)?;
//!     let converter = Converter::new(ConvertSettings::new(output))?;
//!
//!     let (tx, rx) = capture_channel(32);
//!     let capture = AudioCapture::open(CaptureSource::Microphone, Some(&output))?;
//!     let _stream = capture.start(tx)?;
//!
//!     let mut stdout = tokio::io::stdout();
//!     run_relay(rx, &converter, &mut stdout, OnError::Abort).await?;
//!     Ok(())
//! }
//! ```

pub mod convert;
pub mod runner;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use convert::{ConvertError, ConvertSettings, Converter};
pub use runner::{run_relay, OnError, RelayError, RelayStats};
