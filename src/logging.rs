//! Tracing subscriber setup
//!
//! Logs go to stderr so the CLI can keep stdout for the horizon JSON.

use std::io;

use tracing_subscriber::{
  fmt, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Json,
  Pretty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
  /// Base filter directive, e.g. `info` or `directive_arc=debug`
  pub level: String,
  pub format: LogFormat,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: "info".to_string(),
      format: LogFormat::Pretty,
    }
  }
}

impl LoggingConfig {
  /// `RUST_LOG` for the filter, `LOG_FORMAT=json` for JSON lines.
  pub fn from_env() -> Self {
    let level = std::env::var("RUST_LOG")
      .ok()
      .filter(|l| !l.trim().is_empty())
      .unwrap_or_else(|| "info".to_string());

    let format = match std::env::var("LOG_FORMAT").as_deref() {
      Ok(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
      _ => LogFormat::Pretty,
    };

    Self { level, format }
  }

  fn filter(&self) -> EnvFilter {
    EnvFilter::new(&self.level)
      .add_directive("hyper=warn".parse().unwrap_or_else(|_| tracing::Level::WARN.into()))
      .add_directive("reqwest=warn".parse().unwrap_or_else(|_| tracing::Level::WARN.into()))
  }

  /// Install the global subscriber. Fails if one is already set.
  pub fn init(&self) -> Result<(), TryInitError> {
    let registry = tracing_subscriber::registry().with(self.filter());

    match self.format {
      LogFormat::Json => registry
        .with(fmt::layer().with_target(true).with_writer(io::stderr).json())
        .try_init(),
      LogFormat::Pretty => registry
        .with(fmt::layer().with_target(true).with_writer(io::stderr))
        .try_init(),
    }
  }
}

/// Initialise from the environment.
pub fn init() -> Result<(), TryInitError> {
  LoggingConfig::from_env().init()
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
