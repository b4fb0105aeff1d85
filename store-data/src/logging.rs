use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber.
///
/// The filter comes from `RUST_LOG` and falls back to `info`. Events go to
/// stderr without timestamps or targets; when `log_file` is given they are
/// also appended there, timestamped and without ANSI colors.
pub fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::from("info"));

    let stderr_layer = fmt::layer()
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr);

    let file_layer = log_file
        .map(|path| -> Result<_> {
            let file: File = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            Ok(fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file)))
        })
        .transpose()?;

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;
    Ok(())
}
