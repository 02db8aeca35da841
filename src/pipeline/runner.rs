//! Relay loop: drains captured blocks, converts them, writes them out.
//!
//! # Flow
//!
//! ```text
//! cpal callback ──try_send──▶ mpsc (bounded) ──recv──▶ run_relay()
//!               ──stop──────▶ watch ─────────changed──▶  │
//!                                                       ├─ Converter::process
//!                                                       └─ sink.write_all + flush
//! ```
//!
//! The capture side only ever pushes owned buffers into the channel, so the
//! relay is the single owner of every block it converts and no lock is held
//! across conversion.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::audio::{CaptureReceiver, RawBlock};

use super::convert::{ConvertError, Converter};

// ---------------------------------------------------------------------------
// OnError
// ---------------------------------------------------------------------------

/// What to do when a block fails to convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OnError {
    /// Stop the relay and report the error.
    Abort,
    /// Log the error, drop the block and carry on.
    Skip,
}

impl Default for OnError {
    fn default() -> Self {
        Self::Abort
    }
}

// ---------------------------------------------------------------------------
// RelayError / RelayStats
// ---------------------------------------------------------------------------

/// Reasons the relay stopped abnormally.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("conversion failed: {0}")]
    Convert(#[from] ConvertError),

    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

/// Counters reported when the relay ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Blocks received from capture.
    pub blocks: u64,
    /// Blocks forwarded without conversion.
    pub passthrough: u64,
    /// Blocks dropped under [`OnError::Skip`].
    pub skipped: u64,
    /// Bytes written to the sink.
    pub bytes_written: u64,
}

// ---------------------------------------------------------------------------
// run_relay
// ---------------------------------------------------------------------------

/// Consume captured blocks until the stream ends.
///
/// Returns normally when the block queue closes, capture reports a stop
/// (blocks already queued are written first), or the sink reports
/// [`BrokenPipe`](std::io::ErrorKind::BrokenPipe) (the downstream reader
/// went away).
///
/// # Errors
///
/// [`RelayError::Convert`] on the first conversion failure under
/// [`OnError::Abort`]; [`RelayError::Io`] for any other write failure.
pub async fn run_relay<W>(
    mut rx: CaptureReceiver,
    converter: &Converter,
    sink: &mut W,
    on_error: OnError,
) -> Result<RelayStats, RelayError>
where
    W: AsyncWrite + Unpin,
{
    let mut stats = RelayStats::default();
    log::info!(
        "relay started: output {}, gain {}",
        converter.settings().output,
        converter.settings().gain
    );

    // Cleared once the stop sender is gone, so `changed()` is not polled again.
    let mut watching_stop = true;

    loop {
        tokio::select! {
            biased;

            changed = rx.stopped.changed(), if watching_stop => {
                if changed.is_err() {
                    watching_stop = false;
                    continue;
                }
                let reason = rx.stopped.borrow_and_update().clone();
                let Some(reason) = reason else { continue };
                log::info!("capture stopped: {reason}");
                while let Ok(block) = rx.blocks.try_recv() {
                    if relay_block(block, converter, sink, on_error, &mut stats).await?
                        == Flow::Stop
                    {
                        break;
                    }
                }
                break;
            }

            block = rx.blocks.recv() => {
                let Some(block) = block else { break };
                if relay_block(block, converter, sink, on_error, &mut stats).await? == Flow::Stop {
                    break;
                }
            }
        }
    }

    log::info!(
        "relay finished: {} blocks ({} passthrough, {} skipped), {} bytes written",
        stats.blocks,
        stats.passthrough,
        stats.skipped,
        stats.bytes_written
    );
    Ok(stats)
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Convert and write one block, updating `stats`.
async fn relay_block<W>(
    block: RawBlock,
    converter: &Converter,
    sink: &mut W,
    on_error: OnError,
    stats: &mut RelayStats,
) -> Result<Flow, RelayError>
where
    W: AsyncWrite + Unpin,
{
    stats.blocks += 1;

    if converter.is_passthrough(&block.format) {
        stats.passthrough += 1;
    }

    let data = match converter.process(&block.format, &block.bytes) {
        Ok(data) => data,
        Err(e) => match on_error {
            OnError::Abort => return Err(e.into()),
            OnError::Skip => {
                log::warn!("skipping block {} ({}): {e}", stats.blocks, block.format);
                stats.skipped += 1;
                return Ok(Flow::Continue);
            }
        },
    };

    log::trace!(
        "block {}: {} bytes in, {} bytes out",
        stats.blocks,
        block.bytes.len(),
        data.len()
    );

    if data.is_empty() {
        return Ok(Flow::Continue);
    }

    match write_block(sink, &data).await {
        Ok(()) => {
            stats.bytes_written += data.len() as u64;
            Ok(Flow::Continue)
        }
        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
            log::info!("output closed by reader");
            Ok(Flow::Stop)
        }
        Err(e) => Err(e.into()),
    }
}

async fn write_block<W>(sink: &mut W, data: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    sink.write_all(data).await?;
    sink.flush().await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use std::time::Duration;

    use super::*;
    use crate::audio::{capture_channel, AudioFormat};
    use crate::pipeline::ConvertSettings;

    fn pcm(rate: u32, channels: u16) -> AudioFormat {
        AudioFormat::pcm(rate, channels, 16).unwrap()
    }

    fn block(format: AudioFormat, bytes: Vec<u8>) -> RawBlock {
        RawBlock { format, bytes }
    }

    /// Sink whose reader has gone away.
    struct ClosedPipe;

    impl AsyncWrite for ClosedPipe {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            Poll::Ready(Err(std::io::ErrorKind::BrokenPipe.into()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn passthrough_and_converted_blocks_are_written_in_order() {
        let out_fmt = pcm(48_000, 1);
        let converter = Converter::new(ConvertSettings::new(out_fmt)).unwrap();
        let (tx, rx) = capture_channel(8);

        tx.blocks.send(block(out_fmt, vec![1, 0, 2, 0])).await.unwrap();
        // stereo frame (4, 8) mixes down to 6
        tx.blocks.send(block(pcm(48_000, 2), vec![4, 0, 8, 0])).await.unwrap();
        drop(tx);

        let mut sink = Vec::new();
        let stats = run_relay(rx, &converter, &mut sink, OnError::Abort)
            .await
            .unwrap();

        assert_eq!(sink, vec![1, 0, 2, 0, 6, 0]);
        assert_eq!(
            stats,
            RelayStats {
                blocks: 2,
                passthrough: 1,
                skipped: 0,
                bytes_written: 6,
            }
        );
    }

    #[tokio::test]
    async fn abort_policy_returns_first_error() {
        let converter = Converter::new(ConvertSettings::new(pcm(48_000, 2))).unwrap();
        let (tx, rx) = capture_channel(8);
        tx.blocks.send(block(pcm(48_000, 3), vec![0; 6])).await.unwrap();
        drop(tx);

        let mut sink = Vec::new();
        let err = run_relay(rx, &converter, &mut sink, OnError::Abort)
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Convert(ConvertError::Mix(_))));
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn skip_policy_drops_bad_blocks() {
        let out_fmt = pcm(48_000, 2);
        let converter = Converter::new(ConvertSettings::new(out_fmt)).unwrap();
        let (tx, rx) = capture_channel(8);
        tx.blocks.send(block(pcm(48_000, 3), vec![0; 6])).await.unwrap();
        tx.blocks.send(block(out_fmt, vec![9, 9, 9, 9])).await.unwrap();
        drop(tx);

        let mut sink = Vec::new();
        let stats = run_relay(rx, &converter, &mut sink, OnError::Skip)
            .await
            .unwrap();
        assert_eq!(sink, vec![9, 9, 9, 9]);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.blocks, 2);
    }

    #[tokio::test]
    async fn stop_ends_relay_after_queued_blocks() {
        let out_fmt = pcm(48_000, 1);
        let converter = Converter::new(ConvertSettings::new(out_fmt)).unwrap();
        let (tx, rx) = capture_channel(8);
        tx.blocks.send(block(out_fmt, vec![1, 2])).await.unwrap();
        tx.stop("device unplugged");

        // `tx` stays alive, as it does inside a running cpal stream
        let mut sink = Vec::new();
        let stats = run_relay(rx, &converter, &mut sink, OnError::Abort)
            .await
            .unwrap();
        assert_eq!(stats.blocks, 1);
        assert_eq!(sink, vec![1, 2]);
        drop(tx);
    }

    #[tokio::test]
    async fn stop_with_full_queue_still_ends_relay() {
        let out_fmt = pcm(48_000, 1);
        let converter = Converter::new(ConvertSettings::new(out_fmt)).unwrap();
        let (tx, rx) = capture_channel(1);
        tx.blocks.try_send(block(out_fmt, vec![5, 6])).unwrap();
        assert!(tx.blocks.try_send(block(out_fmt, vec![7, 8])).is_err());

        let relay = tokio::spawn(async move {
            let mut sink = Vec::new();
            let stats = run_relay(rx, &converter, &mut sink, OnError::Abort).await;
            (stats, sink)
        });
        tokio::task::yield_now().await;
        tx.stop("device unplugged");

        let (stats, sink) = tokio::time::timeout(Duration::from_secs(5), relay)
            .await
            .expect("relay should stop without the block queue closing")
            .unwrap();
        assert_eq!(stats.unwrap().blocks, 1);
        assert_eq!(sink, vec![5, 6]);
        drop(tx);
    }

    #[tokio::test]
    async fn empty_conversions_are_not_written() {
        let converter = Converter::new(ConvertSettings::new(pcm(8_000, 1))).unwrap();
        let (tx, rx) = capture_channel(8);
        // a single byte decodes to zero samples
        tx.blocks.send(block(pcm(48_000, 1), vec![7])).await.unwrap();
        drop(tx);

        let mut sink = Vec::new();
        let stats = run_relay(rx, &converter, &mut sink, OnError::Abort)
            .await
            .unwrap();
        assert_eq!(stats.blocks, 1);
        assert_eq!(stats.bytes_written, 0);
    }

    #[tokio::test]
    async fn broken_pipe_is_a_clean_stop() {
        let out_fmt = pcm(48_000, 1);
        let converter = Converter::new(ConvertSettings::new(out_fmt)).unwrap();
        let (tx, rx) = capture_channel(8);
        tx.blocks.send(block(out_fmt, vec![1, 2])).await.unwrap();
        tx.blocks.send(block(out_fmt, vec![3, 4])).await.unwrap();
        drop(tx);

        let stats = run_relay(rx, &converter, &mut ClosedPipe, OnError::Abort)
            .await
            .unwrap();
        assert_eq!(stats.blocks, 1);
        assert_eq!(stats.bytes_written, 0);
    }
}
