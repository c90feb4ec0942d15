//! `directive-arc <snapshot.json> [RISING|FALLING|STABLE]`
//!
//! Plans a three-day horizon for one snapshot and prints it as JSON.

use std::process::ExitCode;

use directive_arc::models::{BiometricSnapshot, Trend};
use directive_arc::{
  planner, ArcPlanner, ClaudeClient, Config, FallbackTemplateStore, GenerationSettings,
  GenerativeOrchestrator,
};
use tracing::{error, info};

const USAGE: &str = "usage: directive-arc <snapshot.json> [RISING|FALLING|STABLE]";

#[tokio::main]
async fn main() -> ExitCode {
  dotenvy::dotenv().ok();

  if let Err(e) = directive_arc::logging::init() {
    eprintln!("Failed to initialise logging: {}", e);
  }

  match run().await {
    Ok(()) => ExitCode::SUCCESS,
    Err(message) => {
      error!("{}", message);
      eprintln!("{}", message);
      ExitCode::FAILURE
    }
  }
}

async fn run() -> Result<(), String> {
  let mut args = std::env::args().skip(1);
  let path = args.next().ok_or_else(|| USAGE.to_string())?;
  let trend = match args.next() {
    Some(raw) => raw.parse::<Trend>()?,
    None => Trend::Stable,
  };

  FallbackTemplateStore::new().verify().map_err(|e| e.to_string())?;
  planner::check_tables().map_err(|e| e.to_string())?;

  let config = Config::from_env().map_err(|e| e.to_string())?;

  let raw = std::fs::read_to_string(&path).map_err(|e| format!("Failed to read {}: {}", path, e))?;
  let snapshot: BiometricSnapshot =
    serde_json::from_str(&raw).map_err(|e| format!("Invalid snapshot {}: {}", path, e))?;

  info!(
    as_of = %snapshot.as_of,
    state = %snapshot.state,
    ?trend,
    provider_available = config.has_api_key(),
    "Planning horizon"
  );

  let provider = ClaudeClient::from_config(&config);
  let orchestrator = GenerativeOrchestrator::new(provider, GenerationSettings::from(&config));
  let horizon = ArcPlanner::new(orchestrator).plan_horizon(&snapshot, trend).await;

  let json = serde_json::to_string_pretty(&horizon).map_err(|e| e.to_string())?;
  println!("{}", json);

  Ok(())
}
