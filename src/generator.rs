//! Plan generation: the initial challenge batch for a topic, and adapted
//! follow-up challenges driven by the learner's average score.
//!
//! Both modes share the challenge contract
//! `{title, description, success_criteria, hints[]}`; the initial mode adds a
//! plan-level `description`.

use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::config::{AdaptationPolicy, Prompts};
use crate::contract::{extract_as, FieldKind, Shape};
use crate::domain::{ChallengeSpec, ChallengeStatus, Difficulty};
use crate::engine::{log_violation, Engine};
use crate::error::EngineError;
use crate::gateway::ChatMessage;
use crate::util::{fill_template, non_blank};

pub const MIN_CHALLENGES: u32 = 3;
pub const MAX_CHALLENGES: u32 = 10;
pub const DEFAULT_CHALLENGES: u32 = 5;
pub const GENERATION_TEMPERATURE: f32 = 0.7;

/// Validated input for the initial generation mode.
#[derive(Clone, Debug, PartialEq)]
pub struct PlanRequest {
  topic: String,
  context: Option<String>,
  difficulty: Difficulty,
  num_challenges: u32,
}

impl PlanRequest {
  /// Trims topic/context, defaults difficulty to beginner and clamps the count into 3..=10 (default 5).
  pub fn new(
    topic: &str,
    context: Option<&str>,
    difficulty: Option<Difficulty>,
    num_challenges: Option<u32>,
  ) -> Result<Self, EngineError> {
    let topic = topic.trim();
    if topic.is_empty() {
      return Err(EngineError::invalid_input("topic is required"));
    }
    Ok(Self {
      topic: topic.to_string(),
      context: non_blank(context),
      difficulty: difficulty.unwrap_or_default(),
      num_challenges: num_challenges.unwrap_or(DEFAULT_CHALLENGES).clamp(MIN_CHALLENGES, MAX_CHALLENGES),
    })
  }

  pub fn topic(&self) -> &str { &self.topic }
  pub fn context(&self) -> Option<&str> { self.context.as_deref() }
  pub fn difficulty(&self) -> Difficulty { self.difficulty }
  pub fn num_challenges(&self) -> u32 { self.num_challenges }
}

/// Output of the initial mode, in generation order.
#[derive(Clone, Debug)]
pub struct GeneratedPlan {
  pub description: String,
  pub challenges: Vec<ChallengeSpec>,
  /// The user prompt exactly as sent, kept for auditability.
  pub prompt_used: String,
  pub(crate) raw_response: String,
}

/// What the adaptation prompt is told about a completed challenge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletedChallenge {
  pub title: String,
  pub status: ChallengeStatus,
}

#[derive(Clone, Debug)]
pub struct AdaptationRequest<'a> {
  pub topic: &'a str,
  pub completed: &'a [CompletedChallenge],
  pub average_score: f64,
  pub count: usize,
}

#[derive(Deserialize)]
struct PlanPayload {
  description: String,
  challenges: Vec<ChallengeSpec>,
}

#[derive(Deserialize)]
struct AdaptedPayload {
  challenges: Vec<ChallengeSpec>,
}

fn challenge_shape() -> Shape {
  Shape::new()
    .required("title", FieldKind::Text)
    .required("description", FieldKind::Text)
    .required("success_criteria", FieldKind::Text)
    .with_default("hints", FieldKind::TextList, json!([]))
}

pub fn plan_shape() -> Shape {
  Shape::new()
    .required("description", FieldKind::Text)
    .required("challenges", FieldKind::ObjectList(challenge_shape()))
}

pub fn adapted_shape() -> Shape {
  Shape::new().required("challenges", FieldKind::ObjectList(challenge_shape()))
}

/// System + user messages for the initial mode.
pub fn build_plan_messages(prompts: &Prompts, req: &PlanRequest) -> Vec<ChatMessage> {
  let count = req.num_challenges.to_string();
  let difficulty = req.difficulty.as_str();
  let context_block = req
    .context
    .as_deref()
    .map(|c| format!("\nAdditional context from learner: {c}\n"))
    .unwrap_or_default();

  let system = fill_template(&prompts.plan_system, &[("count", count.as_str()), ("difficulty", difficulty)]);
  let user = fill_template(
    &prompts.plan_user_template,
    &[
      ("topic", req.topic.as_str()),
      ("context_block", context_block.as_str()),
      ("difficulty", difficulty),
      ("count", count.as_str()),
    ],
  );
  vec![ChatMessage::system(system), ChatMessage::user(user)]
}

/// Which way the adaptation prompt should push, given the average score.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Adjustment {
  Harder,
  Scaffold,
  Steady,
}

pub fn adjustment_for(average_score: f64, policy: &AdaptationPolicy) -> Adjustment {
  if average_score > policy.raise_difficulty_above {
    Adjustment::Harder
  } else if average_score < policy.scaffold_below {
    Adjustment::Scaffold
  } else {
    Adjustment::Steady
  }
}

/// System + user messages for the adaptation mode. Completed challenges are
/// summarized as title and status only, to keep the prompt bounded.
pub fn build_adaptation_messages(prompts: &Prompts, policy: &AdaptationPolicy, req: &AdaptationRequest<'_>) -> Vec<ChatMessage> {
  let count = req.count.to_string();
  let guidance = match adjustment_for(req.average_score, policy) {
    Adjustment::Harder => prompts.adapt_guidance_harder.as_str(),
    Adjustment::Scaffold => prompts.adapt_guidance_scaffold.as_str(),
    Adjustment::Steady => prompts.adapt_guidance_steady.as_str(),
  };
  let completed = req
    .completed
    .iter()
    .map(|c| format!("- {}: {}", c.title, c.status.as_str()))
    .collect::<Vec<_>>()
    .join("\n");
  let average = format!("{:.0}", req.average_score);

  let system = fill_template(&prompts.adapt_system, &[("count", count.as_str()), ("guidance", guidance)]);
  let user = fill_template(
    &prompts.adapt_user_template,
    &[
      ("topic", req.topic),
      ("completed", completed.as_str()),
      ("average", average.as_str()),
      ("count", count.as_str()),
    ],
  );
  vec![ChatMessage::system(system), ChatMessage::user(user)]
}

impl Engine {
  /// Initial mode. The challenge count is whatever the model returned; see `Engine::generate_plan`.
  #[instrument(level = "info", skip(self, req), fields(difficulty = %req.difficulty, count = req.num_challenges))]
  pub async fn generate_plan_content(&self, req: &PlanRequest) -> Result<GeneratedPlan, EngineError> {
    let messages = build_plan_messages(&self.config.prompts, req);
    let raw = self.call_model(&messages, GENERATION_TEMPERATURE).await?;

    let payload: PlanPayload = extract_as(&raw, &plan_shape()).inspect_err(|e| log_violation("generate_plan", e))?;
    info!(target: "plan", challenges = payload.challenges.len(), "Plan content generated");

    Ok(GeneratedPlan {
      description: payload.description,
      challenges: payload.challenges,
      prompt_used: messages[1].text.clone(),
      raw_response: raw,
    })
  }

  /// Adaptation mode: new challenge specs only, no plan description.
  #[instrument(level = "info", skip(self, req), fields(average = req.average_score, count = req.count, completed = req.completed.len()))]
  pub async fn generate_adapted_challenges(&self, req: &AdaptationRequest<'_>) -> Result<Vec<ChallengeSpec>, EngineError> {
    let messages = build_adaptation_messages(&self.config.prompts, &self.config.adaptation, req);
    let raw = self.call_model(&messages, GENERATION_TEMPERATURE).await?;

    let payload: AdaptedPayload = extract_as(&raw, &adapted_shape()).inspect_err(|e| log_violation("adapt_plan", e))?;
    info!(target: "plan", requested = req.count, returned = payload.challenges.len(), "Adapted challenges generated");
    Ok(payload.challenges)
  }
}
