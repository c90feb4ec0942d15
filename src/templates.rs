//! Pre-validated fallback narration
//!
//! Every schema has a deterministic entry the orchestrator can substitute
//! when generation fails. Entries are written to pass the content validator
//! under the strictest constraints, so a fallback is valid wherever it lands.
//! `self_check` proves that; run it at startup, never per request.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{
  ActivityInsight, ActivitySuggestion, Category, Directive, DirectiveNarration, NarrationConstraints,
  NarrationContent, NarrationPayload, StimulusType, WelcomeMessage,
};
use crate::validation::{ContentValidator, ValidationContext};

/// ---------------------------------------------------------------------------
/// Directive Table
/// ---------------------------------------------------------------------------

struct DirectiveTemplate {
  session_focus: &'static str,
  avoid_cue: &'static str,
  insight_summary: &'static str,
}

fn directive_template(category: Category, stimulus: StimulusType) -> DirectiveTemplate {
  use Category::*;
  use StimulusType::*;

  let (session_focus, avoid_cue, insight_summary) = match (category, stimulus) {
    (Strength, Overload) => (
      "Progressive strength session: add a small amount of load to your main lifts and keep every rep controlled.",
      "Avoid impact work like jumps between sets; no ego lifts past clean form.",
      "Readiness and sleep support a build day. Small, deliberate increases in load are how strength adapts.",
    ),
    (Strength, Maintenance) => (
      "Steady strength session at familiar weights, focused on crisp technique and full range.",
      "Don't chase new numbers or add impact drills; hold today's loads where they are.",
      "Your signals point to holding capacity. Repeating known loads keeps strength while recovery catches up.",
    ),
    (Strength, Flush) => (
      "Light mobility and bodyweight movement to keep joints moving without adding load.",
      "Avoid impact and loaded lifts today; no jumping or barbell work.",
      "Recovery is the priority. Moving through comfortable ranges helps circulation without adding stress.",
    ),
    (Strength, Test) => (
      "Technique check on one main lift: work up to a solid, repeatable single and note how it moves.",
      "Avoid impact drills before the check and skip any attempt that breaks form.",
      "Readiness looks high enough to measure where your strength sits today. Treat it as information, not a verdict.",
    ),
    (Endurance, Overload) => (
      "Extended aerobic session: go a little longer than usual at a steady, conversational-to-firm effort.",
      "Avoid adding impact if running feels rough; no surges in the opening half.",
      "Your readiness supports more aerobic volume today. Extending duration is the main driver of endurance gains.",
    ),
    (Endurance, Maintenance) => (
      "Steady aerobic session at a comfortable, conversational effort for your usual duration.",
      "Don't stack extra intervals or impact work on top; keep the pace even.",
      "Signals suggest holding your current base. Consistent steady work maintains fitness without extra strain.",
    ),
    (Endurance, Flush) => (
      "Short, relaxed spin or walk to promote blood flow and loosen up.",
      "Avoid impact and steep climbs; no running today.",
      "Your body is still absorbing recent training. Low-effort movement aids recovery better than full rest.",
    ),
    (Endurance, Test) => (
      "Benchmark effort over a familiar route or duration, paced evenly so the result is comparable.",
      "Avoid impact-heavy terrain and don't start faster than you can hold.",
      "Readiness is high, which makes today a fair day to check your aerobic progress against past efforts.",
    ),
    (Neural, Overload) => (
      "Speed and coordination work: short, crisp efforts with full recovery between each one.",
      "Avoid impact drills once form slips; no extra reps when speed drops off.",
      "Freshness is good, so the nervous system can handle quality work today. Quality matters more than volume.",
    ),
    (Neural, Maintenance) => (
      "Brief coordination and agility practice at moderate effort to keep movement sharp.",
      "Don't turn drills into conditioning and avoid repeated impact landings.",
      "Holding skill work steady keeps you sharp without taxing recovery.",
    ),
    (Neural, Flush) => (
      "Breathing practice and slow, deliberate movement to settle the nervous system.",
      "Avoid impact and fast-paced drills; no reaction or speed work today.",
      "Stress and recovery markers suggest calming the system. Slow breathing and easy movement help you downshift.",
    ),
    (Neural, Test) => (
      "Short reaction or speed check after a thorough warm-up, with long rests between attempts.",
      "Avoid impact work beforehand and stop after a few quality attempts.",
      "You look primed. A brief, well-rested test shows how ready your nervous system is to perform.",
    ),
    (Regulation, Overload) => (
      "Extended breathwork or mobility session that challenges range and control a step beyond usual.",
      "Avoid impact and forcing end ranges; no bouncing into stretches.",
      "Readiness supports a longer regulation session today. Building tolerance to deeper ranges takes patient volume.",
    ),
    (Regulation, Maintenance) => (
      "Regular mobility and breathing routine at a comfortable pace.",
      "Don't add impact or new drills; keep the routine familiar.",
      "Consistency keeps regulation habits working. Today is about repeating what already helps.",
    ),
    (Regulation, Flush) => (
      "Restorative session: walking, mobility, or guided breathing for 20 to 30 minutes.",
      "Avoid impact, running, and anything that raises your heart rate sharply.",
      "Your body is asking for recovery. Gentle movement and calm breathing help readiness rebound for the days ahead.",
    ),
    (Regulation, Test) => (
      "Calm check-in: a few minutes of steady breathing, then note how rested and settled you feel.",
      "Avoid impact or strenuous work before the check-in; no caffeine rush.",
      "Readiness is strong enough to take a clean read on how well you are recovering.",
    ),
  };

  DirectiveTemplate {
    session_focus,
    avoid_cue,
    insight_summary,
  }
}

/// ---------------------------------------------------------------------------
/// Companion Tables
/// ---------------------------------------------------------------------------

fn insight_template(category: Category) -> ActivityInsight {
  let (headline, summary, physiology, guidance) = match category {
    Category::Strength => (
      "Strength session logged",
      "Nice work getting the session in. Strength builds over weeks, so consistency counts more than any single day.",
      Some("Resistance work creates small amounts of muscle stress that the body repairs during sleep, which is how strength builds over time."),
      Some("Prioritise protein, water, and a solid night of sleep to help the session pay off."),
    ),
    Category::Endurance => (
      "Endurance session logged",
      "Aerobic time adds up. Sessions like this strengthen your heart and improve how efficiently you use energy.",
      Some("Steady aerobic work grows the network of small blood vessels in working muscles, making oxygen delivery more efficient."),
      Some("Refuel with carbohydrates and fluids, and keep tomorrow's plan in mind."),
    ),
    Category::Neural => (
      "Skill session logged",
      "Coordination work sharpens how your brain and muscles communicate, which carries over to every other session.",
      None,
      Some("Keep the rest of the evening calm so the session settles in."),
    ),
    Category::Regulation => (
      "Recovery session logged",
      "Taking time to recover is part of training. Sessions like this help your readiness bounce back.",
      Some("Slow breathing and relaxed movement shift the body toward a rest-and-digest state, which supports repair."),
      Some("Aim for an early night to carry the benefit into tomorrow."),
    ),
  };

  ActivityInsight {
    headline: headline.to_string(),
    summary: summary.to_string(),
    physiology: physiology.map(str::to_string),
    guidance: guidance.map(str::to_string),
  }
}

fn suggestion_template(category: Category) -> ActivitySuggestion {
  let (title, summary, why, duration_minutes, intensity) = match category {
    Category::Strength => (
      "Full-body strength circuit",
      "Squat, hinge, press, and pull patterns at steady, controlled weights.",
      "Covers every major movement pattern in one session.",
      40,
      "moderate",
    ),
    Category::Endurance => (
      "Steady aerobic ride",
      "Thirty to forty-five minutes at a pace where you can still hold a conversation.",
      "Builds your aerobic base without much recovery cost.",
      40,
      "moderate",
    ),
    Category::Neural => (
      "Coordination and balance drills",
      "Ladder footwork, single-leg balance, and reaction catches in short sets.",
      "Keeps movement sharp with little fatigue.",
      20,
      "moderate",
    ),
    Category::Regulation => (
      "Mobility and breathing reset",
      "Hips, spine, and shoulder mobility followed by five minutes of slow breathing.",
      "Helps the body shift toward recovery.",
      25,
      "low",
    ),
  };

  ActivitySuggestion {
    title: title.to_string(),
    summary: summary.to_string(),
    why: Some(why.to_string()),
    duration_minutes: Some(duration_minutes),
    intensity: Some(intensity.to_string()),
  }
}

/// ---------------------------------------------------------------------------
/// Store
/// ---------------------------------------------------------------------------

/// Outcome of re-validating every fallback entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateCheck {
  pub valid: bool,
  pub errors: Vec<String>,
}

/// A fallback entry failed validation. Fatal: the table itself is wrong.
#[derive(Debug, Clone, Error)]
#[error("fallback template store is defective: {}", errors.join("; "))]
pub struct TemplateDefect {
  pub errors: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackTemplateStore;

impl FallbackTemplateStore {
  pub fn new() -> Self {
    Self
  }

  pub fn directive(&self, category: Category, stimulus: StimulusType) -> DirectiveNarration {
    let template = directive_template(category, stimulus);
    DirectiveNarration {
      session_focus: template.session_focus.to_string(),
      avoid_cue: template.avoid_cue.to_string(),
      insight_summary: template.insight_summary.to_string(),
      insight_detail: None,
    }
  }

  /// Fallback narration for a directive, marked as such.
  pub fn get_template(&self, category: Category, stimulus: StimulusType) -> NarrationPayload {
    NarrationPayload::fallback(self.directive(category, stimulus), 0)
  }

  pub fn welcome(&self) -> WelcomeMessage {
    WelcomeMessage {
      headline: "Welcome to your daily arc".to_string(),
      message: "Each morning we read your sleep, HRV, and recovery signals and turn them into one clear plan for the day, plus a look at the two days after."
        .to_string(),
    }
  }

  pub fn activity_insight(&self, category: Category) -> ActivityInsight {
    insight_template(category)
  }

  pub fn activity_suggestion(&self, category: Category) -> ActivitySuggestion {
    suggestion_template(category)
  }

  /// Re-validate every entry under permissive and strictest constraints.
  ///
  /// Directive entries are checked against their own directive; companion
  /// entries against no directive and against every directive, since the
  /// host decides which day they accompany.
  pub fn self_check(&self) -> TemplateCheck {
    let validator = ContentValidator::new();
    let constraint_sets = [NarrationConstraints::PERMISSIVE, NarrationConstraints::STRICTEST];
    let mut all_directives: Vec<Option<Directive>> = vec![None];
    for category in Category::ALL {
      for stimulus in StimulusType::ALL {
        all_directives.push(Some(Directive::new(category, stimulus)));
      }
    }

    let mut errors = Vec::new();

    for category in Category::ALL {
      for stimulus in StimulusType::ALL {
        let directive = Directive::new(category, stimulus);
        let entry = self.directive(category, stimulus);
        for constraints in constraint_sets {
          collect_errors(
            &validator,
            &entry,
            &ValidationContext::new(Some(directive), constraints),
            &format!("directive {}", directive),
            &mut errors,
          );
        }
      }
    }

    for directive in &all_directives {
      for constraints in constraint_sets {
        let context = ValidationContext::new(*directive, constraints);
        collect_errors(&validator, &self.welcome(), &context, "welcome", &mut errors);
        for category in Category::ALL {
          collect_errors(
            &validator,
            &self.activity_insight(category),
            &context,
            &format!("insight {}", category.as_str()),
            &mut errors,
          );
          collect_errors(
            &validator,
            &self.activity_suggestion(category),
            &context,
            &format!("suggestion {}", category.as_str()),
            &mut errors,
          );
        }
      }
    }

    errors.sort();
    errors.dedup();

    TemplateCheck {
      valid: errors.is_empty(),
      errors,
    }
  }

  /// Startup gate: a defective table must never reach a request path.
  pub fn verify(&self) -> Result<(), TemplateDefect> {
    let check = self.self_check();
    if check.valid {
      Ok(())
    } else {
      Err(TemplateDefect { errors: check.errors })
    }
  }
}

fn collect_errors<T: NarrationContent>(
  validator: &ContentValidator,
  entry: &T,
  context: &ValidationContext,
  label: &str,
  errors: &mut Vec<String>,
) {
  let result = validator.validate_payload(entry, context);
  errors.extend(result.errors.into_iter().map(|e| format!("{}: {}", label, e)));
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
