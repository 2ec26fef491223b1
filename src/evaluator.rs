//! Grading a single submission against a challenge's success criteria.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};

use crate::config::Prompts;
use crate::contract::{extract_as, FieldKind, Shape};
use crate::domain::{Challenge, ChallengeSpec};
use crate::engine::{log_violation, Engine};
use crate::error::EngineError;
use crate::gateway::ChatMessage;
use crate::util::fill_template;

/// Lower than generation to keep grading consistent.
pub const EVALUATION_TEMPERATURE: f32 = 0.3;
/// Score the rubric tells the model to require for a pass. Not re-checked locally.
pub const RUBRIC_PASS_SCORE: u8 = 70;
pub const MISSING_FEEDBACK: &str = "No feedback provided";

/// The parts of a challenge the grader sees.
#[derive(Clone, Copy, Debug)]
pub struct GradingTarget<'a> {
  pub title: &'a str,
  pub description: &'a str,
  pub success_criteria: &'a str,
}

impl<'a> From<&'a Challenge> for GradingTarget<'a> {
  fn from(c: &'a Challenge) -> Self {
    Self { title: &c.title, description: &c.description, success_criteria: &c.success_criteria }
  }
}

impl<'a> From<&'a ChallengeSpec> for GradingTarget<'a> {
  fn from(c: &'a ChallengeSpec) -> Self {
    Self { title: &c.title, description: &c.description, success_criteria: &c.success_criteria }
  }
}

/// Verdict as returned by the model, after coercion. `passed` is authoritative;
/// it is not required to agree with `score`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
  pub passed: bool,
  pub feedback: String,
  pub score: u8,
}

pub fn evaluation_shape() -> Shape {
  Shape::new()
    .required("passed", FieldKind::Boolean)
    .with_default("feedback", FieldKind::Text, json!(MISSING_FEEDBACK))
    .required("score", FieldKind::BoundedInt { min: 0, max: 100 })
}

pub fn build_evaluation_messages(prompts: &Prompts, target: GradingTarget<'_>, submission: &str) -> Vec<ChatMessage> {
  let pass_score = RUBRIC_PASS_SCORE.to_string();
  let system = fill_template(&prompts.eval_system, &[("pass_score", pass_score.as_str())]);
  let user = fill_template(
    &prompts.eval_user_template,
    &[
      ("title", target.title),
      ("description", target.description),
      ("success_criteria", target.success_criteria),
      ("submission", submission),
    ],
  );
  vec![ChatMessage::system(system), ChatMessage::user(user)]
}

impl Engine {
  /// EvaluateSubmission: blank submissions are rejected before any model call.
  #[instrument(level = "info", skip(self, target, submission), fields(title = %target.title, submission_len = submission.len()))]
  pub async fn evaluate_submission(&self, target: GradingTarget<'_>, submission: &str) -> Result<Evaluation, EngineError> {
    let submission = submission.trim();
    if submission.is_empty() {
      return Err(EngineError::invalid_input("submission content is required"));
    }

    let messages = build_evaluation_messages(&self.config.prompts, target, submission);
    let raw = self.call_model(&messages, EVALUATION_TEMPERATURE).await?;
    let eval: Evaluation = extract_as(&raw, &evaluation_shape()).inspect_err(|e| log_violation("evaluate_submission", e))?;

    info!(target: "evaluation", passed = eval.passed, score = eval.score, "Submission evaluated");
    Ok(eval)
  }
}
