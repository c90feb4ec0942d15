use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// ---------------------------------------------------------------------------
/// System State
/// ---------------------------------------------------------------------------

/// Physiological readiness classification supplied by the data layer.
///
/// Unknown labels deserialize to `Calculating`, which the forecaster treats
/// as "no usable signal" and resolves to `BuildingCapacity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemState {
  RecoveryMode,
  PhysicalStrain,
  HighStrain,
  NeedsStimulation,
  BuildingCapacity,
  ReadyForLoad,
  MetabolicHealth,
  PrimedToPerform,
  Overreaching,
  #[serde(other)]
  Calculating,
}

impl SystemState {
  pub const ALL: [SystemState; 10] = [
    SystemState::RecoveryMode,
    SystemState::PhysicalStrain,
    SystemState::HighStrain,
    SystemState::NeedsStimulation,
    SystemState::BuildingCapacity,
    SystemState::ReadyForLoad,
    SystemState::MetabolicHealth,
    SystemState::PrimedToPerform,
    SystemState::Overreaching,
    SystemState::Calculating,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      SystemState::RecoveryMode => "RECOVERY_MODE",
      SystemState::PhysicalStrain => "PHYSICAL_STRAIN",
      SystemState::HighStrain => "HIGH_STRAIN",
      SystemState::NeedsStimulation => "NEEDS_STIMULATION",
      SystemState::BuildingCapacity => "BUILDING_CAPACITY",
      SystemState::ReadyForLoad => "READY_FOR_LOAD",
      SystemState::MetabolicHealth => "METABOLIC_HEALTH",
      SystemState::PrimedToPerform => "PRIMED_TO_PERFORM",
      SystemState::Overreaching => "OVERREACHING",
      SystemState::Calculating => "CALCULATING",
    }
  }

  /// States where the body is still absorbing prior stress.
  pub fn is_protective(&self) -> bool {
    matches!(self, SystemState::RecoveryMode | SystemState::PhysicalStrain)
  }
}

impl std::fmt::Display for SystemState {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// ---------------------------------------------------------------------------
/// Recovery Trend
/// ---------------------------------------------------------------------------

/// Direction of recent recovery, used by the forecaster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trend {
  Rising,
  Falling,
  Stable,
}

/// Vitality points either side of the mean treated as noise.
const TREND_DEAD_BAND: f64 = 3.0;

impl Trend {
  pub const ALL: [Trend; 3] = [Trend::Rising, Trend::Falling, Trend::Stable];

  /// Classify a chronological vitality series (oldest first).
  ///
  /// Compares the latest value against the mean of the earlier ones. Fewer
  /// than two points carries no direction and reads as `Stable`.
  pub fn from_vitality_series(series: &[f64]) -> Self {
    let Some((latest, earlier)) = series.split_last() else {
      return Trend::Stable;
    };
    if earlier.is_empty() {
      return Trend::Stable;
    }

    let mean = earlier.iter().sum::<f64>() / earlier.len() as f64;
    let delta = latest - mean;

    if delta > TREND_DEAD_BAND {
      Trend::Rising
    } else if delta < -TREND_DEAD_BAND {
      Trend::Falling
    } else {
      Trend::Stable
    }
  }
}

impl std::str::FromStr for Trend {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_uppercase().as_str() {
      "RISING" => Ok(Trend::Rising),
      "FALLING" => Ok(Trend::Falling),
      "STABLE" => Ok(Trend::Stable),
      _ => Err(format!("Unknown trend: {}", s)),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Biometric Snapshot
/// ---------------------------------------------------------------------------

/// Summary of recent sessions, computed upstream from the activity log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityHistory {
  pub sessions_last_7_days: u32,
  pub consecutive_load_days: u32,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub days_since_last_session: Option<u32>,
}

/// Read-only readiness input for one evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BiometricSnapshot {
  /// Day the snapshot describes; horizon entries are dated from it
  pub as_of: NaiveDate,

  /// Composite readiness, 0-100
  pub vitality: f64,

  /// Last night's sleep score, 0-100
  pub sleep_score: f64,

  /// Overnight HRV in ms
  pub hrv_ms: f64,

  /// Trailing HRV baseline in ms (0 when unknown)
  pub hrv_baseline_ms: f64,

  /// Accumulated recent training stress
  pub load_density: f64,

  /// Share of the day with elevated stress, 0-100
  pub stress_elevated_pct: f64,

  pub state: SystemState,

  #[serde(default)]
  pub history: ActivityHistory,
}

impl BiometricSnapshot {
  /// HRV is suppressed when it sits below a known baseline.
  pub fn hrv_suppressed(&self) -> bool {
    self.hrv_baseline_ms > 0.0 && self.hrv_ms < self.hrv_baseline_ms
  }

  /// Keyword evidence a narration may ground itself in.
  pub fn evidence_keywords(&self) -> Vec<String> {
    let mut evidence = vec!["sleep".to_string(), "readiness".to_string()];
    if self.hrv_baseline_ms > 0.0 {
      evidence.push("hrv".to_string());
    }
    if self.load_density > 0.0 {
      evidence.push("load".to_string());
    }
    if self.stress_elevated_pct > 0.0 {
      evidence.push("stress".to_string());
    }
    evidence
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
