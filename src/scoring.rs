//! Deterministic directive scoring
//!
//! Maps a biometric snapshot to ranked directive candidates and a safety
//! envelope. The envelope and the stimulus mask come from fixed per-state
//! tables; preference scores never widen either of them.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, warn};

use crate::models::{
  AllowedModalities, BiometricSnapshot, Category, DirectiveCandidate, Modality, SafetyEnvelope,
  StimulusType, SystemState,
};
use crate::planner::determine_daily_directive;

/// ---------------------------------------------------------------------------
/// Thresholds
/// ---------------------------------------------------------------------------

/// Load density above which overload is penalised
const LOAD_DENSITY_HIGH: f64 = 2000.0;

/// Load density above which a flush is boosted
const LOAD_DENSITY_OVERREACH: f64 = 2500.0;

/// Elevated-stress share (percent) treated as a strain signal
const STRESS_ELEVATED_PCT: f64 = 40.0;

/// Lower edge of the "moderate stress" window that suits maintenance work
const STRESS_MODERATE_PCT: f64 = 20.0;

/// Back-to-back load days before the engine starts pulling back
const CONSECUTIVE_LOAD_DAYS: u32 = 3;

/// ---------------------------------------------------------------------------
/// Vitality Banding
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VitalityBand {
  Depleted, // < 40
  Low,      // 40-59
  Moderate, // 60-79
  High,     // >= 80
}

impl VitalityBand {
  pub fn from_vitality(vitality: f64) -> Self {
    match vitality {
      v if v >= 80.0 => VitalityBand::High,
      v if v >= 60.0 => VitalityBand::Moderate,
      v if v >= 40.0 => VitalityBand::Low,
      _ => VitalityBand::Depleted,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      VitalityBand::Depleted => "depleted",
      VitalityBand::Low => "low",
      VitalityBand::Moderate => "moderate",
      VitalityBand::High => "high",
    }
  }
}

/// ---------------------------------------------------------------------------
/// State Tables
/// ---------------------------------------------------------------------------

/// Stimulus types a state allows the engine to even consider.
pub fn permitted_stimuli(state: SystemState) -> &'static [StimulusType] {
  use StimulusType::*;
  match state {
    SystemState::RecoveryMode | SystemState::PhysicalStrain => &[Flush],
    SystemState::HighStrain => &[Maintenance, Flush],
    SystemState::NeedsStimulation => &[Overload, Maintenance, Test],
    SystemState::BuildingCapacity
    | SystemState::ReadyForLoad
    | SystemState::MetabolicHealth
    | SystemState::PrimedToPerform
    | SystemState::Overreaching
    | SystemState::Calculating => &[Overload, Maintenance, Flush, Test],
  }
}

/// Hard load and modality bounds for a state.
pub fn safety_envelope(state: SystemState) -> SafetyEnvelope {
  match state {
    SystemState::RecoveryMode | SystemState::PhysicalStrain => SafetyEnvelope {
      max_load: 3,
      allowed_modalities: AllowedModalities::only([
        Modality::Yoga,
        Modality::Walking,
        Modality::Mobility,
        Modality::Meditation,
      ]),
    },
    SystemState::HighStrain => SafetyEnvelope {
      max_load: 5,
      allowed_modalities: AllowedModalities::only([
        Modality::Running,
        Modality::Cycling,
        Modality::Yoga,
        Modality::Swimming,
      ]),
    },
    _ => SafetyEnvelope {
      max_load: 10,
      allowed_modalities: AllowedModalities::All,
    },
  }
}

/// ---------------------------------------------------------------------------
/// Engine
/// ---------------------------------------------------------------------------

/// Result of one evaluation: candidates best-first plus the hard bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
  /// Never empty
  pub ranked: Vec<DirectiveCandidate>,
  pub envelope: SafetyEnvelope,
}

impl Evaluation {
  pub fn winner(&self) -> &DirectiveCandidate {
    // `ranked` is non-empty by construction in `ScoringEngine::evaluate`
    &self.ranked[0]
  }

  /// Diagnostic lines for every candidate that lost.
  pub fn rejected(&self) -> Vec<String> {
    self.ranked.iter().skip(1).map(DirectiveCandidate::diagnostic).collect()
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringEngine;

impl ScoringEngine {
  pub fn new() -> Self {
    Self
  }

  /// Score every stimulus the state permits and rank best-first.
  pub fn evaluate(&self, snapshot: &BiometricSnapshot) -> Evaluation {
    let permitted = permitted_stimuli(snapshot.state);
    let candidates = permitted
      .iter()
      .map(|stimulus| score_stimulus(snapshot, *stimulus))
      .collect();

    let ranked = finalize_ranking(candidates);
    debug!(
      state = %snapshot.state,
      winner = %ranked[0].directive(),
      score = ranked[0].score,
      candidates = ranked.len(),
      "Directive candidates ranked"
    );

    Evaluation {
      ranked,
      envelope: safety_envelope(snapshot.state),
    }
  }
}

/// Sort best-first with the fixed tie-break, synthesising a forced flush when
/// nothing survived masking.
fn finalize_ranking(mut candidates: Vec<DirectiveCandidate>) -> Vec<DirectiveCandidate> {
  if candidates.is_empty() {
    warn!("Stimulus mask produced no candidates, forcing REGULATION/FLUSH");
    return vec![DirectiveCandidate {
      category: Category::Regulation,
      stimulus_type: StimulusType::Flush,
      score: 1.0,
      reason: "forced: no candidate survived the state mask".to_string(),
    }];
  }

  candidates.sort_by(|a, b| match b.score.total_cmp(&a.score) {
    Ordering::Equal => a
      .stimulus_type
      .tie_break_rank()
      .cmp(&b.stimulus_type.tie_break_rank()),
    other => other,
  });
  candidates
}

/// Category a stimulus is narrated under for this state.
fn category_for(state: SystemState, stimulus: StimulusType) -> Category {
  let mapped = determine_daily_directive(state);
  if mapped.stimulus_type == stimulus {
    mapped.category
  } else {
    stimulus.default_category()
  }
}

/// ---------------------------------------------------------------------------
/// Per-Stimulus Scoring
/// ---------------------------------------------------------------------------

/// Running score with a human-readable trail of every adjustment.
struct Tally {
  score: f64,
  reasons: Vec<String>,
}

impl Tally {
  fn new(base: f64) -> Self {
    Self {
      score: base,
      reasons: vec![format!("base {:.2}", base)],
    }
  }

  fn adjust(&mut self, delta: f64, why: impl Into<String>) {
    self.score += delta;
    self.reasons.push(format!("{} {:+.2}", why.into(), delta));
  }

  fn finish(self, category: Category, stimulus_type: StimulusType) -> DirectiveCandidate {
    let score = if self.score.is_finite() {
      (self.score.clamp(0.0, 1.0) * 10_000.0).round() / 10_000.0
    } else {
      0.0
    };
    DirectiveCandidate {
      category,
      stimulus_type,
      score,
      reason: self.reasons.join(", "),
    }
  }
}

fn score_stimulus(snapshot: &BiometricSnapshot, stimulus: StimulusType) -> DirectiveCandidate {
  let category = category_for(snapshot.state, stimulus);
  let band = VitalityBand::from_vitality(snapshot.vitality);

  let tally = match stimulus {
    StimulusType::Overload => score_overload(snapshot, band),
    StimulusType::Maintenance => score_maintenance(snapshot, band),
    StimulusType::Flush => score_flush(snapshot, band),
    StimulusType::Test => score_test(snapshot, band),
  };

  tally.finish(category, stimulus)
}

fn score_overload(snapshot: &BiometricSnapshot, band: VitalityBand) -> Tally {
  let mut tally = Tally::new(0.50);

  match band {
    VitalityBand::High => tally.adjust(0.25, "vitality high"),
    VitalityBand::Moderate => tally.adjust(0.10, "vitality moderate"),
    VitalityBand::Low => tally.adjust(-0.10, "vitality low"),
    VitalityBand::Depleted => tally.adjust(-0.25, "vitality depleted"),
  }
  if snapshot.sleep_score >= 80.0 {
    tally.adjust(0.05, "sleep strong");
  } else if snapshot.sleep_score < 50.0 {
    tally.adjust(-0.10, "sleep poor");
  }
  if matches!(
    snapshot.state,
    SystemState::ReadyForLoad | SystemState::NeedsStimulation
  ) {
    tally.adjust(0.15, format!("state {}", snapshot.state));
  }
  if snapshot.load_density > LOAD_DENSITY_HIGH {
    tally.adjust(-0.20, format!("load density {:.0}", snapshot.load_density));
  }
  if snapshot.hrv_suppressed() {
    tally.adjust(-0.15, "hrv below baseline");
  }
  if snapshot.stress_elevated_pct > STRESS_ELEVATED_PCT {
    tally.adjust(-0.10, format!("stress {:.0}%", snapshot.stress_elevated_pct));
  }
  if snapshot.history.consecutive_load_days >= CONSECUTIVE_LOAD_DAYS {
    tally.adjust(-0.10, "consecutive load days");
  }

  tally
}

fn score_maintenance(snapshot: &BiometricSnapshot, band: VitalityBand) -> Tally {
  let mut tally = Tally::new(0.50);

  if snapshot.state == SystemState::BuildingCapacity {
    tally.adjust(0.20, format!("state {}", snapshot.state));
  }
  if (STRESS_MODERATE_PCT..=STRESS_ELEVATED_PCT).contains(&snapshot.stress_elevated_pct) {
    tally.adjust(0.10, "moderate stress");
  }
  if band == VitalityBand::Moderate {
    tally.adjust(0.05, "vitality moderate");
  }

  tally
}

fn score_flush(snapshot: &BiometricSnapshot, band: VitalityBand) -> Tally {
  if snapshot.state.is_protective() {
    let mut tally = Tally::new(1.0);
    tally.reasons = vec![format!("forced: state {}", snapshot.state)];
    return tally;
  }

  let mut tally = Tally::new(0.30);

  match snapshot.state {
    SystemState::HighStrain => tally.adjust(0.35, format!("state {}", snapshot.state)),
    SystemState::Overreaching => tally.adjust(0.30, format!("state {}", snapshot.state)),
    _ => {}
  }
  if snapshot.load_density > LOAD_DENSITY_OVERREACH {
    tally.adjust(0.30, format!("load density {:.0}", snapshot.load_density));
  }
  match band {
    VitalityBand::Depleted => tally.adjust(0.20, "vitality depleted"),
    VitalityBand::Low => tally.adjust(0.10, "vitality low"),
    _ => {}
  }
  if snapshot.hrv_suppressed() {
    tally.adjust(0.10, "hrv below baseline");
  }
  if snapshot.history.consecutive_load_days >= CONSECUTIVE_LOAD_DAYS {
    tally.adjust(0.10, "consecutive load days");
  }

  tally
}

fn score_test(snapshot: &BiometricSnapshot, band: VitalityBand) -> Tally {
  let mut tally = Tally::new(0.40);

  if snapshot.state == SystemState::PrimedToPerform {
    tally.adjust(0.35, format!("state {}", snapshot.state));
  }
  match band {
    VitalityBand::High => tally.adjust(0.15, "vitality high"),
    VitalityBand::Low | VitalityBand::Depleted => {
      tally.adjust(-0.20, format!("vitality {}", band.as_str()))
    }
    VitalityBand::Moderate => {}
  }
  if snapshot.sleep_score >= 85.0 {
    tally.adjust(0.05, "sleep strong");
  }
  if snapshot.load_density > LOAD_DENSITY_HIGH {
    tally.adjust(-0.20, format!("load density {:.0}", snapshot.load_density));
  }
  if snapshot.hrv_suppressed() {
    tally.adjust(-0.15, "hrv below baseline");
  }
  if snapshot.stress_elevated_pct > STRESS_ELEVATED_PCT {
    tally.adjust(-0.10, format!("stress {:.0}%", snapshot.stress_elevated_pct));
  }
  if snapshot.history.consecutive_load_days >= CONSECUTIVE_LOAD_DAYS {
    tally.adjust(-0.10, "consecutive load days");
  }

  tally
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
