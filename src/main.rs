//! Application entry point.
//!
//! # Startup sequence
//!
//! 1. Initialise logging (stderr; stdout is reserved for samples).
//! 2. Parse flags, load [`AppConfig`] and overlay the flags.
//! 3. Print the header, then stop early for `--test` / `--save-config`.
//! 4. Build the [`Converter`] from the immutable settings.
//! 5. Open the capture device and start streaming into a bounded channel.
//! 6. Run the relay on a tokio runtime until capture stops, stdout closes,
//!    or Ctrl-C.

use std::io::Write;

use anyhow::Context;
use clap::Parser;
use pcm_pipe::{
    audio::{capture_channel, AudioCapture},
    cli::{self, Cli},
    pipeline::{run_relay, Converter},
};

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. Configuration
    let args = Cli::parse();
    let settings_file = args.settings_file();
    let config = args.effective_config(&settings_file)?;

    // 3. Header
    let mut stderr = std::io::stderr().lock();
    if config.relay.show_header {
        cli::write_header(&mut stderr, &config)?;
    }
    config.validate()?;

    if args.save_config {
        config.save_to(&settings_file)?;
        log::info!("settings written to {}", settings_file.display());
        return Ok(());
    }
    if args.test {
        if config.relay.show_header {
            cli::write_output_format(&mut stderr, &config.output_format()?)?;
            writeln!(stderr)?;
        }
        writeln!(stderr, "argument test passed; not recording")?;
        return Ok(());
    }

    // 4. Converter
    let settings = config.convert_settings()?;
    let converter = Converter::new(settings)?;

    // 5. Capture
    let capture = AudioCapture::open(config.capture.source, Some(&settings.output))
        .context("opening capture device")?;
    if config.relay.show_header {
        cli::write_formats(&mut stderr, capture.format(), &settings.output)?;
    }
    drop(stderr);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    let (tx, rx) = capture_channel(config.capture.channel_capacity);
    // Dropping the handle at the end of main stops the stream.
    let _stream = capture.start(tx).context("starting capture stream")?;

    // 6. Relay
    rt.block_on(async {
        let mut stdout = tokio::io::stdout();
        tokio::select! {
            result = run_relay(rx, &converter, &mut stdout, config.relay.on_error) => {
                result?;
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("interrupted");
            }
        }
        Ok::<(), anyhow::Error>(())
    })
}
