//! Test utilities shared across module tests
//!
//! - Snapshot factories
//! - A scripted in-memory text provider
//! - Helper assertions

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::llm::{GenerationRequest, LlmError, TextProvider};
use crate::models::{ActivityHistory, BiometricSnapshot, SystemState};

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

/// A middling, unremarkable snapshot in the given state.
///
/// Vitality 70, sleep 80, HRV 60 over a 55 baseline, load 1200, stress 15%,
/// no recent history.
pub fn mock_snapshot(state: SystemState) -> BiometricSnapshot {
  BiometricSnapshot {
    as_of: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
    vitality: 70.0,
    sleep_score: 80.0,
    hrv_ms: 60.0,
    hrv_baseline_ms: 55.0,
    load_density: 1200.0,
    stress_elevated_pct: 15.0,
    state,
    history: ActivityHistory::default(),
  }
}

/// ---------------------------------------------------------------------------
/// Scripted Provider
/// ---------------------------------------------------------------------------

/// Replays canned responses in order and records every prompt it receives.
pub struct ScriptedProvider {
  available: bool,
  responses: Mutex<VecDeque<Result<String, LlmError>>>,
  prompts: Mutex<Vec<String>>,
  calls: AtomicUsize,
}

impl ScriptedProvider {
  pub fn new(responses: Vec<Result<String, LlmError>>) -> Self {
    Self {
      available: true,
      responses: Mutex::new(responses.into()),
      prompts: Mutex::new(Vec::new()),
      calls: AtomicUsize::new(0),
    }
  }

  /// Reports itself unavailable; any call is a test failure signal.
  pub fn unavailable() -> Self {
    Self {
      available: false,
      ..Self::new(Vec::new())
    }
  }

  pub fn call_count(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  pub fn prompts(&self) -> Vec<String> {
    self.prompts.lock().unwrap().clone()
  }
}

#[async_trait]
impl TextProvider for ScriptedProvider {
  fn name(&self) -> &str {
    "scripted"
  }

  fn is_available(&self) -> bool {
    self.available
  }

  async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.prompts.lock().unwrap().push(request.user_prompt.clone());
    self
      .responses
      .lock()
      .unwrap()
      .pop_front()
      .unwrap_or_else(|| Err(LlmError::Api("script exhausted".to_string())))
  }
}

/// ---------------------------------------------------------------------------
/// Test Macros
/// ---------------------------------------------------------------------------

/// Assert two floats are approximately equal within a tolerance
#[macro_export]
macro_rules! assert_approx_eq {
  ($left:expr, $right:expr, $tolerance:expr) => {
    let diff = ($left - $right).abs();
    assert!(
      diff < $tolerance,
      "Values not approximately equal: {} vs {} (diff: {}, tolerance: {})",
      $left,
      $right,
      diff,
      $tolerance
    );
  };
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_mock_snapshot_defaults() {
    let snapshot = mock_snapshot(SystemState::BuildingCapacity);
    assert_eq!(snapshot.state, SystemState::BuildingCapacity);
    assert!(!snapshot.hrv_suppressed());
    assert_eq!(snapshot.history.consecutive_load_days, 0);
  }

  #[tokio::test]
  async fn test_scripted_provider_replays_in_order() {
    let provider = ScriptedProvider::new(vec![Ok("one".to_string()), Ok("two".to_string())]);
    let request = GenerationRequest {
      system_instruction: String::new(),
      user_prompt: "prompt".to_string(),
      temperature: 0.0,
      max_output_tokens: 16,
    };

    assert_eq!(provider.generate(&request).await.unwrap(), "one");
    assert_eq!(provider.generate(&request).await.unwrap(), "two");
    assert!(provider.generate(&request).await.is_err());
    assert_eq!(provider.call_count(), 3);
    assert_eq!(provider.prompts().len(), 3);
  }
}
