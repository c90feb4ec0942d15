//! Runtime configuration loaded from the environment
//!
//! Every setting has a default except the API key; a missing key means the
//! generator is unavailable and every narration falls back to templates.

use thiserror::Error;
use url::Url;

/// ---------------------------------------------------------------------------
/// Defaults
/// ---------------------------------------------------------------------------

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_TEMPERATURE: f32 = 0.4;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1024;

/// ---------------------------------------------------------------------------
/// Error Types
/// ---------------------------------------------------------------------------

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
  #[error("{var} is not a valid URL: {reason}")]
  InvalidUrl { var: &'static str, reason: String },

  #[error("{var} could not be parsed: {value}")]
  InvalidNumber { var: &'static str, value: String },

  #[error("{var} is out of range: {value}")]
  OutOfRange { var: &'static str, value: String },
}

/// ---------------------------------------------------------------------------
/// Config
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
  pub api_key: Option<String>,
  pub model: String,
  pub api_url: Url,
  pub temperature: f32,
  pub max_output_tokens: u32,
}

impl Config {
  /// Read configuration from environment variables
  ///
  /// - `ANTHROPIC_API_KEY` (optional)
  /// - `DIRECTIVE_MODEL`
  /// - `DIRECTIVE_API_URL`
  /// - `DIRECTIVE_TEMPERATURE` in [0, 1]
  /// - `DIRECTIVE_MAX_OUTPUT_TOKENS` greater than zero
  pub fn from_env() -> Result<Self, ConfigError> {
    let api_key = std::env::var("ANTHROPIC_API_KEY")
      .ok()
      .map(|k| k.trim().to_string())
      .filter(|k| !k.is_empty());

    let model = std::env::var("DIRECTIVE_MODEL")
      .ok()
      .filter(|m| !m.trim().is_empty())
      .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    let raw_url = std::env::var("DIRECTIVE_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
    let api_url = Url::parse(&raw_url).map_err(|e| ConfigError::InvalidUrl {
      var: "DIRECTIVE_API_URL",
      reason: e.to_string(),
    })?;

    let temperature = match std::env::var("DIRECTIVE_TEMPERATURE") {
      Ok(raw) => {
        let value: f32 = raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
          var: "DIRECTIVE_TEMPERATURE",
          value: raw.clone(),
        })?;
        if !(0.0..=1.0).contains(&value) {
          return Err(ConfigError::OutOfRange {
            var: "DIRECTIVE_TEMPERATURE",
            value: raw,
          });
        }
        value
      }
      Err(_) => DEFAULT_TEMPERATURE,
    };

    let max_output_tokens = match std::env::var("DIRECTIVE_MAX_OUTPUT_TOKENS") {
      Ok(raw) => {
        let value: u32 = raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
          var: "DIRECTIVE_MAX_OUTPUT_TOKENS",
          value: raw.clone(),
        })?;
        if value == 0 {
          return Err(ConfigError::OutOfRange {
            var: "DIRECTIVE_MAX_OUTPUT_TOKENS",
            value: raw,
          });
        }
        value
      }
      Err(_) => DEFAULT_MAX_OUTPUT_TOKENS,
    };

    Ok(Self {
      api_key,
      model,
      api_url,
      temperature,
      max_output_tokens,
    })
  }

  pub fn has_api_key(&self) -> bool {
    self.api_key.is_some()
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
