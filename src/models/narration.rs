use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// ---------------------------------------------------------------------------
/// Provenance
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NarrationSource {
  Generated,
  Fallback,
}

/// Validated content plus where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Narrated<T> {
  #[serde(flatten)]
  pub content: T,
  pub source: NarrationSource,
  pub retry_count: u32,
}

impl<T> Narrated<T> {
  pub fn generated(content: T, retry_count: u32) -> Self {
    Self {
      content,
      source: NarrationSource::Generated,
      retry_count,
    }
  }

  pub fn fallback(content: T, retry_count: u32) -> Self {
    Self {
      content,
      source: NarrationSource::Fallback,
      retry_count,
    }
  }

  pub fn is_fallback(&self) -> bool {
    self.source == NarrationSource::Fallback
  }
}

/// Directive narration as handed to the host.
pub type NarrationPayload = Narrated<DirectiveNarration>;

/// ---------------------------------------------------------------------------
/// Schemas
/// ---------------------------------------------------------------------------

/// The JSON shapes the generator can be asked for. Each call site has its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrationSchema {
  DirectiveNarration,
  OnboardingWelcome,
  PostActivityInsight,
  ActivitySuggestion,
}

/// A payload the orchestrator can request, parse and validate.
pub trait NarrationContent: Serialize + DeserializeOwned + Clone + Send + Sync {
  const SCHEMA: NarrationSchema;

  /// Text fields by wire name, `None` for an absent optional field.
  fn text_fields(&self) -> Vec<(&'static str, Option<&str>)>;
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectiveNarration {
  #[serde(default)]
  pub session_focus: String,
  #[serde(default)]
  pub avoid_cue: String,
  #[serde(default)]
  pub insight_summary: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub insight_detail: Option<String>,
}

impl NarrationContent for DirectiveNarration {
  const SCHEMA: NarrationSchema = NarrationSchema::DirectiveNarration;

  fn text_fields(&self) -> Vec<(&'static str, Option<&str>)> {
    vec![
      ("sessionFocus", Some(self.session_focus.as_str())),
      ("avoidCue", Some(self.avoid_cue.as_str())),
      ("insightSummary", Some(self.insight_summary.as_str())),
      ("insightDetail", self.insight_detail.as_deref()),
    ]
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WelcomeMessage {
  #[serde(default)]
  pub headline: String,
  #[serde(default)]
  pub message: String,
}

impl NarrationContent for WelcomeMessage {
  const SCHEMA: NarrationSchema = NarrationSchema::OnboardingWelcome;

  fn text_fields(&self) -> Vec<(&'static str, Option<&str>)> {
    vec![
      ("headline", Some(self.headline.as_str())),
      ("message", Some(self.message.as_str())),
    ]
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityInsight {
  #[serde(default)]
  pub headline: String,
  #[serde(default)]
  pub summary: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub physiology: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub guidance: Option<String>,
}

impl NarrationContent for ActivityInsight {
  const SCHEMA: NarrationSchema = NarrationSchema::PostActivityInsight;

  fn text_fields(&self) -> Vec<(&'static str, Option<&str>)> {
    vec![
      ("headline", Some(self.headline.as_str())),
      ("summary", Some(self.summary.as_str())),
      ("physiology", self.physiology.as_deref()),
      ("guidance", self.guidance.as_deref()),
    ]
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySuggestion {
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub summary: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub why: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub duration_minutes: Option<u32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub intensity: Option<String>,
}

impl NarrationContent for ActivitySuggestion {
  const SCHEMA: NarrationSchema = NarrationSchema::ActivitySuggestion;

  fn text_fields(&self) -> Vec<(&'static str, Option<&str>)> {
    vec![
      ("title", Some(self.title.as_str())),
      ("summary", Some(self.summary.as_str())),
      ("why", self.why.as_deref()),
      ("intensity", self.intensity.as_deref()),
    ]
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
