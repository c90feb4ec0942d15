use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// ---------------------------------------------------------------------------
/// Directive
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
  Strength,
  Endurance,
  Neural,
  Regulation,
}

impl Category {
  pub const ALL: [Category; 4] = [
    Category::Strength,
    Category::Endurance,
    Category::Neural,
    Category::Regulation,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Category::Strength => "STRENGTH",
      Category::Endurance => "ENDURANCE",
      Category::Neural => "NEURAL",
      Category::Regulation => "REGULATION",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StimulusType {
  Overload,
  Maintenance,
  Flush,
  Test,
}

impl StimulusType {
  pub const ALL: [StimulusType; 4] = [
    StimulusType::Overload,
    StimulusType::Maintenance,
    StimulusType::Flush,
    StimulusType::Test,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      StimulusType::Overload => "OVERLOAD",
      StimulusType::Maintenance => "MAINTENANCE",
      StimulusType::Flush => "FLUSH",
      StimulusType::Test => "TEST",
    }
  }

  /// Rank used to break score ties; lower wins.
  ///
  /// FLUSH > MAINTENANCE > OVERLOAD > TEST: the safer stimulus takes a tie.
  pub fn tie_break_rank(&self) -> u8 {
    match self {
      StimulusType::Flush => 0,
      StimulusType::Maintenance => 1,
      StimulusType::Overload => 2,
      StimulusType::Test => 3,
    }
  }

  /// Category a candidate of this stimulus falls under when the state's own
  /// directive uses a different stimulus.
  pub fn default_category(&self) -> Category {
    match self {
      StimulusType::Overload => Category::Strength,
      StimulusType::Maintenance => Category::Endurance,
      StimulusType::Flush => Category::Regulation,
      StimulusType::Test => Category::Neural,
    }
  }
}

impl std::fmt::Display for StimulusType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A (category, stimulus) pair recommended for one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Directive {
  pub category: Category,
  pub stimulus_type: StimulusType,
}

impl Directive {
  pub const fn new(category: Category, stimulus_type: StimulusType) -> Self {
    Self {
      category,
      stimulus_type,
    }
  }
}

impl std::fmt::Display for Directive {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}/{}", self.category.as_str(), self.stimulus_type.as_str())
  }
}

/// One scored option produced by the scoring engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectiveCandidate {
  pub category: Category,
  pub stimulus_type: StimulusType,
  /// Clamped to [0, 1]
  pub score: f64,
  /// Diagnostic breakdown of how the score was reached
  pub reason: String,
}

impl DirectiveCandidate {
  pub fn directive(&self) -> Directive {
    Directive::new(self.category, self.stimulus_type)
  }

  /// One-line summary handed to the narrator for rejected options.
  pub fn diagnostic(&self) -> String {
    format!("{} scored {:.2} ({})", self.directive(), self.score, self.reason)
  }
}

/// ---------------------------------------------------------------------------
/// Safety Envelope
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Modality {
  Yoga,
  Walking,
  Mobility,
  Meditation,
  Running,
  Cycling,
  Swimming,
  Strength,
  Hiit,
}

impl Modality {
  /// Modalities that load joints with repeated ground contact.
  pub fn is_impact(&self) -> bool {
    matches!(self, Modality::Running | Modality::Hiit)
  }
}

/// Either every modality or an explicit allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllowedModalities {
  All,
  Only(BTreeSet<Modality>),
}

impl AllowedModalities {
  pub fn only<I: IntoIterator<Item = Modality>>(modalities: I) -> Self {
    AllowedModalities::Only(modalities.into_iter().collect())
  }

  pub fn permits(&self, modality: Modality) -> bool {
    match self {
      AllowedModalities::All => true,
      AllowedModalities::Only(set) => set.contains(&modality),
    }
  }

  pub fn permits_impact(&self) -> bool {
    match self {
      AllowedModalities::All => true,
      AllowedModalities::Only(set) => set.iter().any(Modality::is_impact),
    }
  }
}

/// Hard bounds derived from system state alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyEnvelope {
  /// 0-10
  pub max_load: u8,
  pub allowed_modalities: AllowedModalities,
}

impl SafetyEnvelope {
  pub fn constraints(&self) -> NarrationConstraints {
    NarrationConstraints {
      max_load: self.max_load,
      no_impact: !self.allowed_modalities.permits_impact(),
    }
  }
}

/// The part of the envelope narration has to respect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrationConstraints {
  pub max_load: u8,
  pub no_impact: bool,
}

impl NarrationConstraints {
  pub const PERMISSIVE: NarrationConstraints = NarrationConstraints {
    max_load: 10,
    no_impact: false,
  };

  pub const STRICTEST: NarrationConstraints = NarrationConstraints {
    max_load: 0,
    no_impact: true,
  };
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
