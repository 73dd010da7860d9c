//! File logging; the terminal belongs to the UI.

use color_eyre::{eyre::eyre, Result};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::Config;

/// Initialize daily-rolling file logging.
///
/// `GITSPRINT_LOG` overrides the configured level. Keep the returned guard
/// alive until exit so buffered lines are flushed.
pub fn init(config: &Config) -> Result<WorkerGuard> {
  let directory = config.log_dir();
  std::fs::create_dir_all(&directory)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", directory.display(), e))?;

  let filter = EnvFilter::try_from_env("GITSPRINT_LOG")
    .or_else(|_| EnvFilter::try_new(&config.log.level))
    .map_err(|e| eyre!("Invalid log level '{}': {}", config.log.level, e))?;

  let appender = tracing_appender::rolling::daily(&directory, "gitsprint.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  Registry::default()
    .with(filter)
    .with(
      fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true),
    )
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  info!(directory = %directory.display(), "Logging initialized");
  Ok(guard)
}
