pub mod directive;
pub mod narration;
pub mod snapshot;

pub use directive::{
  AllowedModalities, Category, Directive, DirectiveCandidate, Modality, NarrationConstraints,
  SafetyEnvelope, StimulusType,
};
pub use narration::{
  ActivityInsight, ActivitySuggestion, DirectiveNarration, Narrated, NarrationContent,
  NarrationPayload, NarrationSchema, NarrationSource, WelcomeMessage,
};
pub use snapshot::{ActivityHistory, BiometricSnapshot, SystemState, Trend};
