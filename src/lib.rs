//! Readiness-driven daily training directives.
//!
//! Scores candidate directives from a biometric snapshot, narrates the
//! winner through a validated generation loop with template fallback, and
//! forecasts two further days from a fixed state machine.

pub mod config;
pub mod llm;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod planner;
pub mod prompts;
pub mod scoring;
pub mod templates;
pub mod validation;

#[cfg(test)]
mod test_utils;

pub use config::{Config, ConfigError};
pub use llm::{ClaudeClient, GenerationRequest, LlmError, TextProvider};
pub use orchestrator::{GenerationSettings, GenerativeOrchestrator, MAX_ATTEMPTS};
pub use planner::{ArcPlanner, DayEntry, HorizonContract};
pub use scoring::{Evaluation, ScoringEngine};
pub use templates::{FallbackTemplateStore, TemplateDefect};
pub use validation::{ContentValidator, ValidationContext, ValidationResult};
