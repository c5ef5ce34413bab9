#[cfg(not(debug_assertions))]
use human_panic::setup_panic;
use tracing::subscriber::{DefaultGuard, SetGlobalDefaultError};

#[cfg(debug_assertions)]
extern crate better_panic;

use tracing_subscriber::{fmt, EnvFilter};

// [NOTE] tracing
//
// Log with structured fields rather than formatted messages:
//
//   info!(job, batch_size, stage = %Stage::Training, "training started");
//
// Verbosity comes from RUST_LOG (e.g. `RUST_LOG=retrain=debug`), default is info.

fn env_filter() -> EnvFilter {
  EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn install_logger() -> Result<(), SetGlobalDefaultError> {
  let subscriber = fmt().compact().with_env_filter(env_filter()).finish();
  tracing::subscriber::set_global_default(subscriber)
}

pub fn init_logging() -> Result<(), SetGlobalDefaultError> {
  // Human Panic. Only enabled when *not* debugging.
  #[cfg(not(debug_assertions))]
  {
    setup_panic!();
  }

  // Better Panic. Only enabled *when* debugging.
  #[cfg(debug_assertions)]
  {
    better_panic::Settings::debug()
      .most_recent_first(false)
      .lineno_suffix(true)
      .verbosity(better_panic::Verbosity::Full)
      .install();
  }

  // Setup Logging
  install_logger()?;

  Ok(())
}

/// Thread-local subscriber writing through the test harness; keep the guard alive.
pub fn init_logging_tests() -> DefaultGuard {
  let subscriber = fmt()
    .compact()
    .with_env_filter(env_filter())
    .with_test_writer()
    .finish();
  tracing::subscriber::set_default(subscriber)
}
