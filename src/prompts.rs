//! Prompt construction for each narration call site
//!
//! A `NarrationRequest` bundles everything the orchestrator needs for one
//! call: the prompts, what the output must be consistent with, and the
//! fallback to return if generation does not produce a valid payload.

use crate::models::{
  ActivityInsight, ActivitySuggestion, BiometricSnapshot, Category, DirectiveNarration,
  NarrationConstraints, NarrationContent, WelcomeMessage,
};
use crate::scoring::Evaluation;
use crate::templates::FallbackTemplateStore;
use crate::validation::ValidationContext;

const NARRATION_SYSTEM: &str = include_str!("prompts/narration_system.txt");

#[derive(Debug, Clone)]
pub struct NarrationRequest<T> {
  pub system_instruction: String,
  pub user_prompt: String,
  pub context: ValidationContext,
  pub fallback: T,
}

/// A completed session the host wants an insight for.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedActivity {
  pub category: Category,
  pub name: String,
  pub duration_minutes: u32,
  /// Session RPE, 1-10
  pub perceived_effort: Option<u8>,
}

fn system_instruction<T: NarrationContent>() -> String {
  format!(
    "{}\nFields:\n{}",
    NARRATION_SYSTEM.trim_end(),
    T::SCHEMA.describe()
  )
}

fn signals_block(snapshot: &BiometricSnapshot) -> String {
  let mut lines = vec![
    format!("- Date: {}", snapshot.as_of),
    format!("- System state: {}", snapshot.state),
    format!("- Readiness (vitality): {:.0}/100", snapshot.vitality),
    format!("- Sleep score: {:.0}/100", snapshot.sleep_score),
  ];
  if snapshot.hrv_baseline_ms > 0.0 {
    lines.push(format!(
      "- HRV: {:.0} ms against a {:.0} ms baseline",
      snapshot.hrv_ms, snapshot.hrv_baseline_ms
    ));
  }
  lines.push(format!("- Load density: {:.0}", snapshot.load_density));
  lines.push(format!(
    "- Time with elevated stress: {:.0}%",
    snapshot.stress_elevated_pct
  ));
  lines.push(format!(
    "- Sessions in the last 7 days: {}, consecutive load days: {}",
    snapshot.history.sessions_last_7_days, snapshot.history.consecutive_load_days
  ));
  lines.join("\n")
}

fn envelope_line(constraints: &NarrationConstraints) -> String {
  if constraints.no_impact {
    format!("Max load {}/10. Impact work is NOT allowed.", constraints.max_load)
  } else {
    format!("Max load {}/10. Impact work is allowed.", constraints.max_load)
  }
}

/// Day-0 narration grounded in the winning candidate and what it beat.
pub fn directive_request(
  snapshot: &BiometricSnapshot,
  evaluation: &Evaluation,
  store: &FallbackTemplateStore,
) -> NarrationRequest<DirectiveNarration> {
  let winner = evaluation.winner();
  let directive = winner.directive();
  let constraints = evaluation.envelope.constraints();

  let rejected = evaluation.rejected();
  let rejected_block = if rejected.is_empty() {
    "- none (every other option was masked out by the current state)".to_string()
  } else {
    rejected.iter().map(|r| format!("- {}", r)).collect::<Vec<_>>().join("\n")
  };

  let user_prompt = format!(
    r#"Today's directive: {directive} (score {score:.2})
Why it won: {reason}

Alternatives considered and rejected:
{rejected_block}

Safety envelope: {envelope}

Signals:
{signals}

Write the session focus, the avoid cue, and a short insight summary explaining why today looks like this."#,
    directive = directive,
    score = winner.score,
    reason = winner.reason,
    rejected_block = rejected_block,
    envelope = envelope_line(&constraints),
    signals = signals_block(snapshot),
  );

  NarrationRequest {
    system_instruction: system_instruction::<DirectiveNarration>(),
    user_prompt,
    context: ValidationContext::new(Some(directive), constraints)
      .with_evidence(snapshot.evidence_keywords()),
    fallback: store.directive(directive.category, directive.stimulus_type),
  }
}

/// First-run welcome; no directive or biometrics yet.
pub fn welcome_request(store: &FallbackTemplateStore) -> NarrationRequest<WelcomeMessage> {
  let user_prompt = "Write a short welcome for someone opening the planner for the first time. \
     Explain that each morning their sleep, HRV, and recovery signals become one clear plan for the day \
     plus a look at the next two days."
    .to_string();

  NarrationRequest {
    system_instruction: system_instruction::<WelcomeMessage>(),
    user_prompt,
    context: ValidationContext::new(None, NarrationConstraints::PERMISSIVE)
      .with_evidence(vec!["sleep".to_string(), "recovery".to_string()]),
    fallback: store.welcome(),
  }
}

/// Post-session insight, checked against today's envelope when one is known.
pub fn activity_insight_request(
  activity: &CompletedActivity,
  snapshot: Option<&BiometricSnapshot>,
  evaluation: Option<&Evaluation>,
  store: &FallbackTemplateStore,
) -> NarrationRequest<ActivityInsight> {
  let effort = activity
    .perceived_effort
    .map(|rpe| format!("{}/10", rpe))
    .unwrap_or_else(|| "not reported".to_string());

  let mut user_prompt = format!(
    "The athlete just finished: {} ({} category), {} minutes, perceived effort {}.",
    activity.name,
    activity.category.as_str(),
    activity.duration_minutes,
    effort
  );
  if let Some(snapshot) = snapshot {
    user_prompt.push_str("\n\nSignals this morning:\n");
    user_prompt.push_str(&signals_block(snapshot));
  }
  user_prompt.push_str(
    "\n\nWrite a headline, a summary of what the session did, optionally the physiology behind it, \
     and optionally guidance for the rest of the day.",
  );

  let directive = evaluation.map(|e| e.winner().directive());
  let constraints = evaluation
    .map(|e| e.envelope.constraints())
    .unwrap_or(NarrationConstraints::PERMISSIVE);
  let evidence = snapshot.map(BiometricSnapshot::evidence_keywords).unwrap_or_default();

  NarrationRequest {
    system_instruction: system_instruction::<ActivityInsight>(),
    user_prompt,
    context: ValidationContext::new(directive, constraints).with_evidence(evidence),
    fallback: store.activity_insight(activity.category),
  }
}

/// Concrete session idea for today's winning category.
pub fn activity_suggestion_request(
  snapshot: &BiometricSnapshot,
  evaluation: &Evaluation,
  store: &FallbackTemplateStore,
) -> NarrationRequest<ActivitySuggestion> {
  let directive = evaluation.winner().directive();
  let constraints = evaluation.envelope.constraints();

  let user_prompt = format!(
    r#"Suggest one concrete session that fits today's directive: {directive}.

Safety envelope: {envelope}

Signals:
{signals}

Give it a title, a one-line summary, optionally why it fits, a duration in minutes, and an intensity label."#,
    directive = directive,
    envelope = envelope_line(&constraints),
    signals = signals_block(snapshot),
  );

  NarrationRequest {
    system_instruction: system_instruction::<ActivitySuggestion>(),
    user_prompt,
    context: ValidationContext::new(Some(directive), constraints)
      .with_evidence(snapshot.evidence_keywords()),
    fallback: store.activity_suggestion(directive.category),
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
