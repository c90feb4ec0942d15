//! Guarded narration generation
//!
//! One call to `narrate` makes at most `MAX_ATTEMPTS` provider calls. A
//! rejected attempt is retried with a repair prompt listing the validator's
//! errors; anything still invalid after that is replaced by the request's
//! pre-validated fallback. Nothing escapes as an error.

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::llm::{extract_json, GenerationRequest, TextProvider};
use crate::models::{Narrated, NarrationContent};
use crate::prompts::NarrationRequest;
use crate::validation::{
  is_critical_failure, ContentValidator, PayloadValidator, ValidationIssue, ValidationResult,
};

/// Hard attempt budget per narration: the first try plus one repair.
pub const MAX_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationSettings {
  pub temperature: f32,
  pub max_output_tokens: u32,
}

impl Default for GenerationSettings {
  fn default() -> Self {
    Self {
      temperature: crate::config::DEFAULT_TEMPERATURE,
      max_output_tokens: crate::config::DEFAULT_MAX_OUTPUT_TOKENS,
    }
  }
}

impl From<&Config> for GenerationSettings {
  fn from(config: &Config) -> Self {
    Self {
      temperature: config.temperature,
      max_output_tokens: config.max_output_tokens,
    }
  }
}

pub struct GenerativeOrchestrator<P> {
  provider: P,
  validator: ContentValidator,
  settings: GenerationSettings,
}

impl<P: TextProvider> GenerativeOrchestrator<P> {
  pub fn new(provider: P, settings: GenerationSettings) -> Self {
    Self {
      provider,
      validator: ContentValidator::new(),
      settings,
    }
  }

  pub fn provider(&self) -> &P {
    &self.provider
  }

  /// Narrate with the default content validator.
  pub async fn narrate<T: NarrationContent>(&self, request: &NarrationRequest<T>) -> Narrated<T> {
    self.narrate_with(request, &self.validator).await
  }

  /// Narrate with a caller-supplied validator.
  pub async fn narrate_with<T, V>(&self, request: &NarrationRequest<T>, validator: &V) -> Narrated<T>
  where
    T: NarrationContent,
    V: PayloadValidator<T> + ?Sized,
  {
    let schema = T::SCHEMA;

    if !self.provider.is_available() {
      info!(?schema, provider = self.provider.name(), "Provider unavailable, using fallback");
      return Narrated::fallback(request.fallback.clone(), 0);
    }

    let mut prompt = request.user_prompt.clone();

    for attempt in 1..=MAX_ATTEMPTS {
      let generation = GenerationRequest {
        system_instruction: request.system_instruction.clone(),
        user_prompt: prompt.clone(),
        temperature: self.settings.temperature,
        max_output_tokens: self.settings.max_output_tokens,
      };

      let text = match self.provider.generate(&generation).await {
        Ok(text) => text,
        Err(e) => {
          warn!(attempt, ?schema, error = %e, "Provider call failed");
          prompt = request.user_prompt.clone();
          continue;
        }
      };

      let result = match parse_payload::<T>(&text) {
        Ok(payload) => {
          let result = validator.validate(&payload, &request.context);
          if result.valid {
            for warning in &result.warnings {
              debug!(attempt, ?schema, warning = %warning, "Narration accepted with warning");
            }
            info!(attempt, ?schema, "Narration generated");
            return Narrated::generated(payload, attempt - 1);
          }
          result
        }
        Err(issue) => ValidationResult::invalid(vec![issue.to_string()]),
      };

      warn!(
        attempt,
        ?schema,
        errors = result.errors.len(),
        critical = result.critical_errors().count(),
        "Narration rejected"
      );
      prompt = repair_prompt(&request.user_prompt, &result);
    }

    warn!(?schema, attempts = MAX_ATTEMPTS, "Attempts exhausted, using fallback");
    Narrated::fallback(request.fallback.clone(), MAX_ATTEMPTS - 1)
  }
}

/// Strip fences and parse; any failure counts as a validation failure.
fn parse_payload<T: NarrationContent>(text: &str) -> Result<T, ValidationIssue> {
  let json = extract_json(text).map_err(|e| ValidationIssue::Unparseable(e.to_string()))?;
  serde_json::from_str(&json).map_err(|e| ValidationIssue::Unparseable(e.to_string()))
}

/// Original prompt plus the itemized errors, critical ones first.
pub fn repair_prompt(original: &str, result: &ValidationResult) -> String {
  let mut errors: Vec<&String> = result.errors.iter().collect();
  errors.sort_by_key(|e| !is_critical_failure(e));

  let items = errors
    .iter()
    .enumerate()
    .map(|(i, e)| format!("{}. {}", i + 1, e))
    .collect::<Vec<_>>()
    .join("\n");

  format!(
    "{original}\n\nYour previous response was rejected for these reasons:\n{items}\n\n\
     Fix only the listed issues and preserve the meaning of everything else. \
     Respond with the corrected JSON object only."
  )
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::llm::LlmError;
  use crate::models::{
    Category, Directive, DirectiveNarration, NarrationConstraints, NarrationSource, StimulusType,
  };
  use crate::models::SystemState;
  use crate::prompts::{activity_suggestion_request, welcome_request};
  use crate::scoring::ScoringEngine;
  use crate::templates::FallbackTemplateStore;
  use crate::test_utils::{mock_snapshot, ScriptedProvider};
  use crate::validation::ValidationContext;

  const VALID_OVERLOAD: &str = r#"{"sessionFocus":"Add a little load to your main lifts and keep each rep controlled.","avoidCue":"Skip ego lifts past clean form.","insightSummary":"Sleep and readiness both support a build day."}"#;

  struct RejectEverything;

  impl<T> PayloadValidator<T> for RejectEverything {
    fn validate(&self, _payload: &T, _context: &ValidationContext) -> ValidationResult {
      ValidationResult::invalid(vec!["sessionFocus is empty".to_string()])
    }
  }

  fn overload_request() -> NarrationRequest<DirectiveNarration> {
    NarrationRequest {
      system_instruction: "Return JSON.".to_string(),
      user_prompt: "Narrate STRENGTH/OVERLOAD.".to_string(),
      context: ValidationContext::new(
        Some(Directive::new(Category::Strength, StimulusType::Overload)),
        NarrationConstraints::PERMISSIVE,
      )
      .with_evidence(vec!["sleep".to_string()]),
      fallback: FallbackTemplateStore::new().directive(Category::Strength, StimulusType::Overload),
    }
  }

  fn orchestrator(provider: ScriptedProvider) -> GenerativeOrchestrator<ScriptedProvider> {
    GenerativeOrchestrator::new(provider, GenerationSettings::default())
  }

  #[tokio::test]
  async fn test_unavailable_provider_short_circuits_to_fallback() {
    let orchestrator = orchestrator(ScriptedProvider::unavailable());
    let request = overload_request();

    let payload = orchestrator.narrate(&request).await;

    assert_eq!(payload.source, NarrationSource::Fallback);
    assert_eq!(payload.retry_count, 0);
    assert_eq!(payload.content, request.fallback);
    assert_eq!(orchestrator.provider().call_count(), 0);
  }

  #[tokio::test]
  async fn test_valid_first_attempt_is_generated() {
    let orchestrator = orchestrator(ScriptedProvider::new(vec![Ok(VALID_OVERLOAD.to_string())]));

    let payload = orchestrator.narrate(&overload_request()).await;

    assert_eq!(payload.source, NarrationSource::Generated);
    assert_eq!(payload.retry_count, 0);
    assert!(payload.content.session_focus.starts_with("Add a little load"));
    assert_eq!(orchestrator.provider().call_count(), 1);
  }

  #[tokio::test]
  async fn test_fenced_response_is_accepted() {
    let fenced = format!("```json\n{}\n```", VALID_OVERLOAD);
    let orchestrator = orchestrator(ScriptedProvider::new(vec![Ok(fenced)]));

    let payload = orchestrator.narrate(&overload_request()).await;

    assert_eq!(payload.source, NarrationSource::Generated);
  }

  #[tokio::test]
  async fn test_invalid_then_valid_uses_repair_prompt() {
    // Arrange: first response trips the banned-term check
    let rejected = r#"{"sessionFocus":"Beast mode lifting.","avoidCue":"Skip ego lifts.","insightSummary":"Sleep looks fine."}"#;
    let orchestrator = orchestrator(ScriptedProvider::new(vec![
      Ok(rejected.to_string()),
      Ok(VALID_OVERLOAD.to_string()),
    ]));

    // Act
    let payload = orchestrator.narrate(&overload_request()).await;

    // Assert
    assert_eq!(payload.source, NarrationSource::Generated);
    assert_eq!(payload.retry_count, 1);

    let prompts = orchestrator.provider().prompts();
    assert_eq!(prompts.len(), 2);
    assert_eq!(prompts[0], "Narrate STRENGTH/OVERLOAD.");
    assert!(prompts[1].starts_with("Narrate STRENGTH/OVERLOAD."));
    assert!(prompts[1].contains("1. sessionFocus contains banned term \"beast mode\""));
    assert!(prompts[1].contains("Fix only the listed issues"));
  }

  #[tokio::test]
  async fn test_always_invalid_validator_calls_provider_twice_then_falls_back() {
    let orchestrator = orchestrator(ScriptedProvider::new(vec![
      Ok(VALID_OVERLOAD.to_string()),
      Ok(VALID_OVERLOAD.to_string()),
      Ok(VALID_OVERLOAD.to_string()),
    ]));
    let request = overload_request();

    let payload = orchestrator.narrate_with(&request, &RejectEverything).await;

    assert_eq!(orchestrator.provider().call_count(), 2);
    assert_eq!(payload.source, NarrationSource::Fallback);
    assert_eq!(payload.retry_count, 1);
    assert_eq!(payload.content, request.fallback);
  }

  #[tokio::test]
  async fn test_unparseable_output_counts_as_a_failed_attempt() {
    let orchestrator = orchestrator(ScriptedProvider::new(vec![
      Ok("I'd rather not.".to_string()),
      Ok("{ not json".to_string()),
    ]));

    let payload = orchestrator.narrate(&overload_request()).await;

    assert!(payload.is_fallback());
    assert_eq!(payload.retry_count, 1);
    assert!(orchestrator.provider().prompts()[1].contains("not a valid JSON object"));
  }

  #[tokio::test]
  async fn test_provider_error_retries_with_original_prompt() {
    let orchestrator = orchestrator(ScriptedProvider::new(vec![
      Err(LlmError::Request("connection reset".to_string())),
      Ok(VALID_OVERLOAD.to_string()),
    ]));

    let payload = orchestrator.narrate(&overload_request()).await;

    assert_eq!(payload.source, NarrationSource::Generated);
    assert_eq!(payload.retry_count, 1);
    let prompts = orchestrator.provider().prompts();
    assert_eq!(prompts[0], prompts[1]);
  }

  #[tokio::test]
  async fn test_overlong_welcome_twice_falls_back_to_stored_welcome() {
    let store = FallbackTemplateStore::new();
    let overlong = r#"{"headline":"Welcome aboard, here is how your daily arc works","message":"Each morning your sleep and recovery signals shape one clear plan."}"#;
    let orchestrator = orchestrator(ScriptedProvider::new(vec![
      Ok(overlong.to_string()),
      Ok(overlong.to_string()),
    ]));

    let payload = orchestrator.narrate(&welcome_request(&store)).await;

    assert_eq!(orchestrator.provider().call_count(), 2);
    assert!(orchestrator.provider().prompts()[1].contains("headline is too long"));
    assert_eq!(payload.source, NarrationSource::Fallback);
    assert_eq!(payload.retry_count, 1);
    assert_eq!(payload.content, store.welcome());
  }

  #[tokio::test]
  async fn test_fenced_activity_suggestion_is_generated() {
    let store = FallbackTemplateStore::new();
    let snapshot = mock_snapshot(SystemState::BuildingCapacity);
    let evaluation = ScoringEngine::new().evaluate(&snapshot);
    let response = "```json\n{\"title\":\"Tempo ride on rolling roads\",\"summary\":\"Forty minutes of steady riding with three short tempo blocks.\",\"why\":\"Sleep and load both support a steady build today.\",\"intensity\":\"moderate\"}\n```";
    let orchestrator = orchestrator(ScriptedProvider::new(vec![Ok(response.to_string())]));

    let payload = orchestrator
      .narrate(&activity_suggestion_request(&snapshot, &evaluation, &store))
      .await;

    assert_eq!(payload.source, NarrationSource::Generated);
    assert_eq!(payload.retry_count, 0);
    assert_eq!(payload.content.title, "Tempo ride on rolling roads");
    assert_eq!(orchestrator.provider().call_count(), 1);
  }

  #[test]
  fn test_repair_prompt_lists_critical_errors_first() {
    let result = ValidationResult::invalid(vec![
      "avoidCue must explicitly rule out impact work, e.g. \"avoid impact\"".to_string(),
      "sessionFocus is too long (161/160 chars)".to_string(),
    ]);

    let prompt = repair_prompt("Original.", &result);

    let too_long = prompt.find("1. sessionFocus is too long").unwrap();
    let impact = prompt.find("2. avoidCue must explicitly").unwrap();
    assert!(too_long < impact);
    assert!(prompt.starts_with("Original.\n\n"));
  }
}
