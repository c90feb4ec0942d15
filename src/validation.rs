//! Content validation for generated narration
//!
//! One validator serves every narration schema. Each schema declares its own
//! field ceilings; the lexicon checks and directive-consistency rules are
//! shared. Issues are typed so their rendered text stays stable for repair
//! prompts and for `is_critical_failure`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Directive, NarrationConstraints, NarrationContent, NarrationSchema, StimulusType};

/// ---------------------------------------------------------------------------
/// Lexicons
/// ---------------------------------------------------------------------------

/// Command, jargon and hype phrasing that never ships.
pub const BANNED_TERMS: &[&str] = &[
  // commands
  "you must",
  "you need to",
  "you have to",
  "no excuses",
  "mandatory",
  "obey",
  // jargon
  "supercompensation",
  "parasympathetic",
  "sympathetic tone",
  "allostatic",
  "mitochondrial",
  "lactate threshold",
  "cns fatigue",
  // hype
  "crush",
  "beast mode",
  "smash",
  "destroy",
  "unstoppable",
  "no pain no gain",
  "insane",
  "epic",
  "game-changer",
  "killer",
  "optimal",
  "hack",
];

/// Language that contradicts a FLUSH day.
pub const INTENSITY_TERMS: &[&str] = &[
  "max",
  "push",
  "explosive",
  "all-out",
  "sprint",
  "intense",
  "heavy",
  "to failure",
  "redline",
  "hard effort",
];

/// Language that undercuts an OVERLOAD day.
pub const LOW_INTENSITY_TERMS: &[&str] = &[
  "easy",
  "gentle",
  "rest day",
  "take it easy",
  "light effort",
  "recovery only",
  "skip training",
  "low intensity",
  "low-intensity",
];

/// Whole words that negate the mention that follows them.
pub const NEGATION_WORDS: &[&str] = &["avoid", "no", "don't", "dont", "skip", "without", "not", "never"];

/// How many words back a negation may sit, within the same clause.
const NEGATION_WINDOW: usize = 6;

/// ---------------------------------------------------------------------------
/// Field Specifications
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRole {
  /// Describes what to do; subject to directive-consistency rules
  Primary,
  /// Describes what to stay away from; lexicon hits must be negated
  Avoidance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
  pub name: &'static str,
  pub max_chars: usize,
  pub required: bool,
  pub role: FieldRole,
}

impl FieldSpec {
  const fn required(name: &'static str, max_chars: usize) -> Self {
    Self {
      name,
      max_chars,
      required: true,
      role: FieldRole::Primary,
    }
  }

  const fn optional(name: &'static str, max_chars: usize) -> Self {
    Self {
      name,
      max_chars,
      required: false,
      role: FieldRole::Primary,
    }
  }

  const fn avoidance(name: &'static str, max_chars: usize) -> Self {
    Self {
      name,
      max_chars,
      required: true,
      role: FieldRole::Avoidance,
    }
  }
}

const DIRECTIVE_FIELDS: &[FieldSpec] = &[
  FieldSpec::required("sessionFocus", 160),
  FieldSpec::avoidance("avoidCue", 120),
  FieldSpec::required("insightSummary", 300),
  FieldSpec::optional("insightDetail", 1500),
];

const WELCOME_FIELDS: &[FieldSpec] = &[
  FieldSpec::required("headline", 32),
  FieldSpec::required("message", 220),
];

const INSIGHT_FIELDS: &[FieldSpec] = &[
  FieldSpec::required("headline", 50),
  FieldSpec::required("summary", 200),
  FieldSpec::optional("physiology", 300),
  FieldSpec::optional("guidance", 200),
];

const SUGGESTION_FIELDS: &[FieldSpec] = &[
  FieldSpec::required("title", 50),
  FieldSpec::required("summary", 120),
  FieldSpec::optional("why", 200),
  FieldSpec::optional("intensity", 20),
];

impl NarrationSchema {
  /// Field ceilings for this call site.
  pub fn fields(&self) -> &'static [FieldSpec] {
    match self {
      NarrationSchema::DirectiveNarration => DIRECTIVE_FIELDS,
      NarrationSchema::OnboardingWelcome => WELCOME_FIELDS,
      NarrationSchema::PostActivityInsight => INSIGHT_FIELDS,
      NarrationSchema::ActivitySuggestion => SUGGESTION_FIELDS,
    }
  }

  /// Prompt-ready description of the expected JSON shape.
  pub fn describe(&self) -> String {
    self
      .fields()
      .iter()
      .map(|f| {
        format!(
          "- \"{}\": string, {}, at most {} characters",
          f.name,
          if f.required { "required" } else { "optional" },
          f.max_chars
        )
      })
      .collect::<Vec<_>>()
      .join("\n")
  }
}

/// ---------------------------------------------------------------------------
/// Issues and Results
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationIssue {
  #[error("{field} is empty")]
  Empty { field: String },

  #[error("{field} is too long ({len}/{max} chars)")]
  TooLong { field: String, len: usize, max: usize },

  #[error("{field} contains banned term \"{term}\"")]
  BannedTerm { field: String, term: String },

  #[error("{field} uses intensity language \"{term}\" on a FLUSH day")]
  IntensityOnFlush { field: String, term: String },

  #[error("{field} reads as low-intensity (\"{term}\") on an OVERLOAD day")]
  LowIntensityOnOverload { field: String, term: String },

  #[error("{field} must explicitly rule out impact work, e.g. \"avoid impact\"")]
  MissingImpactRestriction { field: String },

  #[error("response is not a valid JSON object for this schema: {0}")]
  Unparseable(String),
}

impl ValidationIssue {
  pub fn is_critical(&self) -> bool {
    matches!(
      self,
      ValidationIssue::Empty { .. }
        | ValidationIssue::TooLong { .. }
        | ValidationIssue::BannedTerm { .. }
    )
  }
}

/// Flags the empty / too-long / banned-term failures repair prompts list first.
pub fn is_critical_failure(error: &str) -> bool {
  error.ends_with(" is empty") || error.contains(" is too long (") || error.contains(" contains banned term ")
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationResult {
  pub valid: bool,
  pub errors: Vec<String>,
  pub warnings: Vec<String>,
  pub retryable: bool,
}

impl ValidationResult {
  fn from_issues(issues: Vec<ValidationIssue>, warnings: Vec<String>) -> Self {
    let valid = issues.is_empty();
    Self {
      valid,
      errors: issues.iter().map(ToString::to_string).collect(),
      warnings,
      // Every failure the validator raises is field-level
      retryable: !valid,
    }
  }

  pub fn invalid(errors: Vec<String>) -> Self {
    Self {
      valid: false,
      errors,
      warnings: Vec::new(),
      retryable: true,
    }
  }

  pub fn critical_errors(&self) -> impl Iterator<Item = &String> {
    self.errors.iter().filter(|e| is_critical_failure(e))
  }
}

/// What the narration must be consistent with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationContext {
  pub directive: Option<Directive>,
  pub constraints: NarrationConstraints,
  /// Keywords the narration should reference (soft check)
  pub evidence: Vec<String>,
}

impl ValidationContext {
  pub fn new(directive: Option<Directive>, constraints: NarrationConstraints) -> Self {
    Self {
      directive,
      constraints,
      evidence: Vec::new(),
    }
  }

  pub fn with_evidence(mut self, evidence: Vec<String>) -> Self {
    self.evidence = evidence;
    self
  }
}

/// ---------------------------------------------------------------------------
/// Validator
/// ---------------------------------------------------------------------------

/// Seam the orchestrator validates through.
pub trait PayloadValidator<T>: Send + Sync {
  fn validate(&self, payload: &T, context: &ValidationContext) -> ValidationResult;
}

#[derive(Debug, Clone)]
pub struct ContentValidator {
  banned: Vec<String>,
  intensity: Vec<String>,
  low_intensity: Vec<String>,
}

impl Default for ContentValidator {
  fn default() -> Self {
    Self::with_lexicons(BANNED_TERMS, INTENSITY_TERMS, LOW_INTENSITY_TERMS)
  }
}

impl ContentValidator {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_lexicons(banned: &[&str], intensity: &[&str], low_intensity: &[&str]) -> Self {
    let lower = |terms: &[&str]| -> Vec<String> { terms.iter().map(|t| t.to_lowercase()).collect() };
    Self {
      banned: lower(banned),
      intensity: lower(intensity),
      low_intensity: lower(low_intensity),
    }
  }

  /// Validate a typed payload against its schema's ceilings.
  pub fn validate_payload<T: NarrationContent>(
    &self,
    payload: &T,
    context: &ValidationContext,
  ) -> ValidationResult {
    self.validate_fields(&payload.text_fields(), T::SCHEMA.fields(), context)
  }

  /// Validate named text fields against caller-supplied ceilings.
  pub fn validate_fields(
    &self,
    fields: &[(&str, Option<&str>)],
    specs: &[FieldSpec],
    context: &ValidationContext,
  ) -> ValidationResult {
    let mut issues = Vec::new();
    let stimulus = context.directive.map(|d| d.stimulus_type);

    for spec in specs {
      let text = fields
        .iter()
        .find(|(name, _)| *name == spec.name)
        .and_then(|(_, text)| *text);

      let Some(text) = text else {
        if spec.required {
          issues.push(ValidationIssue::Empty {
            field: spec.name.to_string(),
          });
        }
        continue;
      };

      let trimmed = text.trim();
      if trimmed.is_empty() {
        // An optional field sent as "" is as good as absent
        if spec.required {
          issues.push(ValidationIssue::Empty {
            field: spec.name.to_string(),
          });
        }
        continue;
      }

      let len = text.chars().count();
      if len > spec.max_chars {
        issues.push(ValidationIssue::TooLong {
          field: spec.name.to_string(),
          len,
          max: spec.max_chars,
        });
      }

      let lower = text.to_lowercase();

      if let Some(term) = first_hit(&lower, &self.banned) {
        issues.push(ValidationIssue::BannedTerm {
          field: spec.name.to_string(),
          term: term.to_string(),
        });
      }

      // Avoidance fields may name what to stay away from, but only as a negation
      let contradiction = |terms: &[String]| match spec.role {
        FieldRole::Primary => first_hit(&lower, terms).map(str::to_string),
        FieldRole::Avoidance => first_unnegated_hit(&lower, terms).map(str::to_string),
      };
      match stimulus {
        Some(StimulusType::Flush) => {
          if let Some(term) = contradiction(self.intensity.as_slice()) {
            issues.push(ValidationIssue::IntensityOnFlush {
              field: spec.name.to_string(),
              term,
            });
          }
        }
        Some(StimulusType::Overload) => {
          if let Some(term) = contradiction(self.low_intensity.as_slice()) {
            issues.push(ValidationIssue::LowIntensityOnOverload {
              field: spec.name.to_string(),
              term,
            });
          }
        }
        _ => {}
      }

      if spec.role == FieldRole::Avoidance
        && context.constraints.no_impact
        && !names_impact_restriction(&lower)
      {
        issues.push(ValidationIssue::MissingImpactRestriction {
          field: spec.name.to_string(),
        });
      }
    }

    let mut warnings = Vec::new();
    if !context.evidence.is_empty() {
      let combined = fields
        .iter()
        .filter_map(|(_, text)| *text)
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
      let grounded = context
        .evidence
        .iter()
        .any(|keyword| combined.contains(&keyword.to_lowercase()));
      if !grounded {
        warnings.push(format!(
          "narration does not reference any supplied evidence ({})",
          context.evidence.join(", ")
        ));
      }
    }

    ValidationResult::from_issues(issues, warnings)
  }
}

impl<T: NarrationContent> PayloadValidator<T> for ContentValidator {
  fn validate(&self, payload: &T, context: &ValidationContext) -> ValidationResult {
    self.validate_payload(payload, context)
  }
}

fn first_hit<'a>(lower_text: &str, terms: &'a [String]) -> Option<&'a str> {
  terms
    .iter()
    .find(|term| lower_text.contains(term.as_str()))
    .map(String::as_str)
}

/// First term with at least one mention no negation word governs.
fn first_unnegated_hit<'a>(lower_text: &str, terms: &'a [String]) -> Option<&'a str> {
  let text = normalize_apostrophes(lower_text);
  terms
    .iter()
    .find(|term| {
      clauses(&text).any(|clause| {
        clause
          .match_indices(term.as_str())
          .any(|(pos, _)| !negated_at(clause, pos))
      })
    })
    .map(String::as_str)
}

/// True when some clause negates a mention of impact.
fn names_impact_restriction(lower_text: &str) -> bool {
  let text = normalize_apostrophes(lower_text);
  let found = clauses(&text).any(|clause| {
    clause
      .match_indices("impact")
      .any(|(pos, _)| negated_at(clause, pos))
  });
  found
}

fn normalize_apostrophes(text: &str) -> String {
  text.replace('\u{2019}', "'")
}

fn clauses(text: &str) -> impl Iterator<Item = &str> {
  text.split(|c: char| matches!(c, ',' | ';' | ':' | '.' | '!' | '?' | '(' | ')'))
}

/// A negation word within `NEGATION_WINDOW` words before `pos` in this clause.
fn negated_at(clause: &str, pos: usize) -> bool {
  let before: Vec<&str> = clause[..pos]
    .split(|c: char| !(c.is_alphanumeric() || c == '\''))
    .filter(|w| !w.is_empty())
    .collect();
  before
    .iter()
    .rev()
    .take(NEGATION_WINDOW)
    .any(|word| NEGATION_WORDS.contains(word))
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::{Category, DirectiveNarration, WelcomeMessage};

  fn narration(focus: &str, avoid: &str, summary: &str) -> DirectiveNarration {
    DirectiveNarration {
      session_focus: focus.to_string(),
      avoid_cue: avoid.to_string(),
      insight_summary: summary.to_string(),
      insight_detail: None,
    }
  }

  fn context(stimulus: StimulusType, no_impact: bool) -> ValidationContext {
    ValidationContext::new(
      Some(Directive::new(Category::Endurance, stimulus)),
      NarrationConstraints {
        max_load: if no_impact { 3 } else { 10 },
        no_impact,
      },
    )
  }

  #[test]
  fn test_clean_payload_is_valid() {
    let payload = narration(
      "Steady aerobic ride at a conversational effort.",
      "Don't add intervals on top.",
      "Sleep was solid and readiness is holding.",
    );
    let result = ContentValidator::new().validate_payload(&payload, &context(StimulusType::Maintenance, false));
    assert!(result.valid, "{:?}", result.errors);
    assert!(!result.retryable);
  }

  #[test]
  fn test_banned_term_any_casing() {
    let validator = ContentValidator::new();
    for focus in ["Time to CRUSH it", "Beast Mode today", "an OpTiMaL session"] {
      let payload = narration(focus, "Avoid impact.", "Summary.");
      let result = validator.validate_payload(&payload, &context(StimulusType::Maintenance, false));
      assert!(!result.valid, "{} slipped through", focus);
      assert!(result.errors[0].contains("banned term"));
      assert!(is_critical_failure(&result.errors[0]));
    }
  }

  #[test]
  fn test_ceiling_exceeded_by_one_character() {
    let validator = ContentValidator::new();
    let at_limit = "a".repeat(160);
    let over_limit = "a".repeat(161);

    let ok = validator.validate_payload(
      &narration(&at_limit, "Avoid impact.", "Summary."),
      &context(StimulusType::Maintenance, false),
    );
    assert!(ok.valid, "{:?}", ok.errors);

    let too_long = validator.validate_payload(
      &narration(&over_limit, "Avoid impact.", "Summary."),
      &context(StimulusType::Maintenance, false),
    );
    assert!(!too_long.valid);
    assert_eq!(too_long.errors, vec!["sessionFocus is too long (161/160 chars)".to_string()]);
  }

  #[test]
  fn test_ceiling_counts_characters_not_bytes() {
    let accented = "é".repeat(120);
    let result = ContentValidator::new().validate_payload(
      &narration("Walk.", &accented, "Summary."),
      &context(StimulusType::Maintenance, false),
    );
    assert!(result.valid, "{:?}", result.errors);
  }

  #[test]
  fn test_empty_required_field() {
    let result = ContentValidator::new().validate_payload(
      &narration("  ", "Avoid impact.", "Summary."),
      &context(StimulusType::Maintenance, false),
    );
    assert_eq!(result.errors, vec!["sessionFocus is empty".to_string()]);
    assert!(result.retryable);
  }

  #[test]
  fn test_flush_rejects_intensity_language_in_session_focus() {
    let validator = ContentValidator::new();

    let rejected = validator.validate_payload(
      &narration("Push the pace on a short loop.", "Avoid impact.", "Summary."),
      &context(StimulusType::Flush, false),
    );
    assert!(!rejected.valid);
    assert!(rejected.errors[0].contains("intensity language \"push\""));
    assert!(!is_critical_failure(&rejected.errors[0]));

    let allowed = validator.validate_payload(
      &narration("Relaxed walk.", "Avoid max efforts and impact.", "Summary."),
      &context(StimulusType::Flush, true),
    );
    assert!(allowed.valid, "{:?}", allowed.errors);
  }

  #[test]
  fn test_flush_avoid_cue_must_negate_intensity_language() {
    let validator = ContentValidator::new();
    let ctx = context(StimulusType::Flush, false);

    let rejected = validator.validate_payload(
      &narration("Relaxed walk.", "Push to max with all-out sprints.", "Summary."),
      &ctx,
    );
    assert!(!rejected.valid);
    assert_eq!(
      rejected.errors,
      vec!["avoidCue uses intensity language \"push\" on a FLUSH day".to_string()]
    );

    // Negated in one clause, encouraged in the next
    let mixed = validator.validate_payload(
      &narration("Relaxed walk.", "Avoid hills, then sprint home.", "Summary."),
      &ctx,
    );
    assert!(!mixed.valid);

    for cue in ["Avoid max efforts.", "No sprints or heavy lifting today.", "Don't push the pace."] {
      let result = validator.validate_payload(&narration("Relaxed walk.", cue, "Summary."), &ctx);
      assert!(result.valid, "{} rejected: {:?}", cue, result.errors);
    }
  }

  #[test]
  fn test_overload_avoid_cue_must_negate_low_intensity_language() {
    let validator = ContentValidator::new();
    let ctx = context(StimulusType::Overload, false);

    let rejected = validator.validate_payload(
      &narration("Long steady ride.", "Keep it gentle throughout.", "Summary."),
      &ctx,
    );
    assert!(!rejected.valid);
    assert!(rejected.errors[0].starts_with("avoidCue reads as low-intensity"));

    let allowed = validator.validate_payload(
      &narration("Long steady ride.", "Don't settle for an easy spin.", "Summary."),
      &ctx,
    );
    assert!(allowed.valid, "{:?}", allowed.errors);
  }

  #[test]
  fn test_overload_rejects_low_intensity_language() {
    let result = ContentValidator::new().validate_payload(
      &narration("Take it easy today.", "Avoid impact.", "Summary."),
      &context(StimulusType::Overload, false),
    );
    assert!(!result.valid);
    assert!(result.errors[0].contains("low-intensity"));
  }

  #[test]
  fn test_no_impact_requires_negated_impact_mention() {
    let validator = ContentValidator::new();
    let ctx = context(StimulusType::Flush, true);

    let missing = validator.validate_payload(&narration("Walk.", "Stay relaxed.", "Summary."), &ctx);
    assert_eq!(
      missing.errors,
      vec!["avoidCue must explicitly rule out impact work, e.g. \"avoid impact\"".to_string()]
    );

    for cue in [
      "Low impact is fine.",
      "No worries, high impact jumps are great.",
      "Impact drills are fine, skip the stretching.",
    ] {
      let result = validator.validate_payload(&narration("Walk.", cue, "Summary."), &ctx);
      assert!(!result.valid, "{} slipped through", cue);
    }

    for cue in ["No impact today.", "Don't do impact work.", "Don’t add impact.", "Skip high-impact moves."] {
      let result = validator.validate_payload(&narration("Walk.", cue, "Summary."), &ctx);
      assert!(result.valid, "{} rejected: {:?}", cue, result.errors);
    }
  }

  #[test]
  fn test_impact_rule_ignored_when_impact_allowed() {
    let result = ContentValidator::new().validate_payload(
      &narration("Walk.", "Stay relaxed.", "Summary."),
      &context(StimulusType::Flush, false),
    );
    assert!(result.valid);
  }

  #[test]
  fn test_evidence_miss_is_warning_not_error() {
    let ctx = context(StimulusType::Maintenance, false).with_evidence(vec!["hrv".to_string(), "sleep".to_string()]);
    let validator = ContentValidator::new();

    let ungrounded = validator.validate_payload(&narration("Walk.", "Avoid impact.", "Nice day."), &ctx);
    assert!(ungrounded.valid);
    assert_eq!(ungrounded.warnings.len(), 1);

    let grounded = validator.validate_payload(&narration("Walk.", "Avoid impact.", "Your HRV is up."), &ctx);
    assert!(grounded.warnings.is_empty());
  }

  #[test]
  fn test_schema_specific_ceilings() {
    let welcome = WelcomeMessage {
      headline: "x".repeat(33),
      message: "Glad you are here.".to_string(),
    };
    let result = ContentValidator::new().validate_payload(&welcome, &ValidationContext::new(None, NarrationConstraints::PERMISSIVE));
    assert_eq!(result.errors, vec!["headline is too long (33/32 chars)".to_string()]);
  }

  #[test]
  fn test_errors_keep_field_order() {
    let result = ContentValidator::new().validate_payload(
      &narration("", "", ""),
      &context(StimulusType::Maintenance, false),
    );
    assert_eq!(
      result.errors,
      vec![
        "sessionFocus is empty".to_string(),
        "avoidCue is empty".to_string(),
        "insightSummary is empty".to_string(),
      ]
    );
  }

  #[test]
  fn test_critical_failure_classifier() {
    assert!(is_critical_failure("avoidCue is empty"));
    assert!(is_critical_failure("insightSummary is too long (301/300 chars)"));
    assert!(is_critical_failure("sessionFocus contains banned term \"epic\""));
    assert!(!is_critical_failure("avoidCue must explicitly rule out impact work, e.g. \"avoid impact\""));
    assert!(!is_critical_failure(&ValidationIssue::Unparseable("eof".into()).to_string()));
  }

  #[test]
  fn test_issue_criticality_matches_string_classifier() {
    let issues = vec![
      ValidationIssue::Empty { field: "title".into() },
      ValidationIssue::TooLong { field: "title".into(), len: 51, max: 50 },
      ValidationIssue::BannedTerm { field: "title".into(), term: "hack".into() },
      ValidationIssue::IntensityOnFlush { field: "title".into(), term: "max".into() },
      ValidationIssue::LowIntensityOnOverload { field: "title".into(), term: "easy".into() },
      ValidationIssue::MissingImpactRestriction { field: "title".into() },
      ValidationIssue::Unparseable("trailing characters".into()),
    ];
    for issue in issues {
      assert_eq!(issue.is_critical(), is_critical_failure(&issue.to_string()), "{}", issue);
    }
  }
}
