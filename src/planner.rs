//! Three-day horizon planning
//!
//! Day 0 comes from the scoring engine and is narrated. Days 1 and 2 are a
//! pure state machine over `SystemState` plus a fixed state-to-directive
//! table; they never call the generator.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::llm::TextProvider;
use crate::models::{
  BiometricSnapshot, Category, Directive, NarrationPayload, SafetyEnvelope, StimulusType,
  SystemState, Trend,
};
use crate::orchestrator::GenerativeOrchestrator;
use crate::prompts::directive_request;
use crate::scoring::{permitted_stimuli, safety_envelope, ScoringEngine};
use crate::templates::FallbackTemplateStore;

/// Forecast offsets after today.
pub const FORECAST_OFFSETS: [u8; 2] = [1, 2];

/// ---------------------------------------------------------------------------
/// Tables
/// ---------------------------------------------------------------------------

/// The directive a state calls for when nothing has been scored.
pub fn determine_daily_directive(state: SystemState) -> Directive {
  use Category::*;
  use StimulusType::*;

  match state {
    SystemState::RecoveryMode | SystemState::PhysicalStrain | SystemState::Overreaching => {
      Directive::new(Regulation, Flush)
    }
    SystemState::HighStrain => Directive::new(Endurance, Flush),
    SystemState::NeedsStimulation => Directive::new(Endurance, Overload),
    SystemState::BuildingCapacity | SystemState::MetabolicHealth | SystemState::Calculating => {
      Directive::new(Endurance, Maintenance)
    }
    SystemState::ReadyForLoad => Directive::new(Strength, Overload),
    SystemState::PrimedToPerform => Directive::new(Neural, Test),
  }
}

/// Next day's state given today's state, recovery trend and how far out
/// the forecast day is. Total and pure.
pub fn predict_next_state(state: SystemState, trend: Trend, day_offset: u8) -> SystemState {
  use SystemState::*;

  match (state, trend) {
    (RecoveryMode, Trend::Rising) => BuildingCapacity,
    (RecoveryMode, _) => RecoveryMode,

    (PhysicalStrain, Trend::Rising) => BuildingCapacity,
    (PhysicalStrain, _) => RecoveryMode,

    (HighStrain, Trend::Rising) => BuildingCapacity,
    (HighStrain, Trend::Falling) => PhysicalStrain,
    (HighStrain, Trend::Stable) => HighStrain,

    (NeedsStimulation, Trend::Falling) => BuildingCapacity,
    (NeedsStimulation, _) => ReadyForLoad,

    (BuildingCapacity, Trend::Rising) => ReadyForLoad,
    (BuildingCapacity, Trend::Falling) => HighStrain,
    (BuildingCapacity, Trend::Stable) => BuildingCapacity,

    // A load day costs the following day
    (ReadyForLoad, _) if day_offset == 1 => MetabolicHealth,
    (ReadyForLoad, _) => ReadyForLoad,

    (MetabolicHealth, Trend::Rising) => ReadyForLoad,
    (MetabolicHealth, Trend::Falling) => BuildingCapacity,
    (MetabolicHealth, Trend::Stable) => MetabolicHealth,

    // Peaks are followed by recovery
    (PrimedToPerform, _) if day_offset == 1 => RecoveryMode,
    (PrimedToPerform, _) => PrimedToPerform,

    (Overreaching, _) => RecoveryMode,

    (Calculating, _) => BuildingCapacity,
  }
}

/// Chain the state machine across both forecast days.
pub fn forecast_states(state: SystemState, trend: Trend) -> [SystemState; 2] {
  let day1 = predict_next_state(state, trend, FORECAST_OFFSETS[0]);
  let day2 = predict_next_state(day1, trend, FORECAST_OFFSETS[1]);
  [day1, day2]
}

#[derive(Debug, Clone, Error)]
#[error("planner tables are inconsistent: {}", errors.join("; "))]
pub struct TableDefect {
  pub errors: Vec<String>,
}

/// Startup check that the directive table agrees with the state masks and
/// that forecasting never produces an unresolved state.
pub fn check_tables() -> Result<(), TableDefect> {
  let mut errors = Vec::new();

  for state in SystemState::ALL {
    let directive = determine_daily_directive(state);
    if !permitted_stimuli(state).contains(&directive.stimulus_type) {
      errors.push(format!(
        "{} maps to {} but its mask forbids {}",
        state, directive, directive.stimulus_type
      ));
    }

    for trend in Trend::ALL {
      for offset in FORECAST_OFFSETS {
        let next = predict_next_state(state, trend, offset);
        if next == SystemState::Calculating {
          errors.push(format!("{} on {:?} day {} forecasts CALCULATING", state, trend, offset));
        }
      }
    }
  }

  if errors.is_empty() {
    Ok(())
  } else {
    Err(TableDefect { errors })
  }
}

/// ---------------------------------------------------------------------------
/// Horizon
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayEntry {
  pub offset: u8,
  pub date: NaiveDate,
  pub state: SystemState,
  pub directive: Directive,
  pub constraints: SafetyEnvelope,
  /// Present on day 0 only
  #[serde(skip_serializing_if = "Option::is_none")]
  pub narration: Option<NarrationPayload>,
}

/// Exactly three days: today and two forecast days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HorizonContract {
  pub trend: Trend,
  pub days: [DayEntry; 3],
}

impl HorizonContract {
  pub fn today(&self) -> &DayEntry {
    &self.days[0]
  }
}

fn day_date(as_of: NaiveDate, offset: u8) -> NaiveDate {
  as_of
    .checked_add_signed(Duration::days(i64::from(offset)))
    .unwrap_or(as_of)
}

fn forecast_entry(as_of: NaiveDate, offset: u8, state: SystemState) -> DayEntry {
  DayEntry {
    offset,
    date: day_date(as_of, offset),
    state,
    directive: determine_daily_directive(state),
    constraints: safety_envelope(state),
    narration: None,
  }
}

pub struct ArcPlanner<P> {
  engine: ScoringEngine,
  orchestrator: GenerativeOrchestrator<P>,
  templates: FallbackTemplateStore,
}

impl<P: TextProvider> ArcPlanner<P> {
  pub fn new(orchestrator: GenerativeOrchestrator<P>) -> Self {
    Self {
      engine: ScoringEngine::new(),
      orchestrator,
      templates: FallbackTemplateStore::new(),
    }
  }

  pub fn orchestrator(&self) -> &GenerativeOrchestrator<P> {
    &self.orchestrator
  }

  /// Score and narrate today, then forecast the next two days.
  pub async fn plan_horizon(&self, snapshot: &BiometricSnapshot, trend: Trend) -> HorizonContract {
    let evaluation = self.engine.evaluate(snapshot);
    let winner = evaluation.winner().directive();

    let request = directive_request(snapshot, &evaluation, &self.templates);
    let narration = self.orchestrator.narrate(&request).await;

    let today = DayEntry {
      offset: 0,
      date: snapshot.as_of,
      state: snapshot.state,
      directive: winner,
      constraints: evaluation.envelope.clone(),
      narration: Some(narration),
    };

    let [day1, day2] = forecast_states(snapshot.state, trend);
    debug!(
      state = %snapshot.state,
      ?trend,
      day1 = %day1,
      day2 = %day2,
      "Forecast transitions"
    );

    let horizon = HorizonContract {
      trend,
      days: [
        today,
        forecast_entry(snapshot.as_of, FORECAST_OFFSETS[0], day1),
        forecast_entry(snapshot.as_of, FORECAST_OFFSETS[1], day2),
      ],
    };

    info!(
      as_of = %snapshot.as_of,
      directive = %winner,
      fallback = horizon.today().narration.as_ref().map(|n| n.is_fallback()).unwrap_or(true),
      "Horizon planned"
    );

    horizon
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
