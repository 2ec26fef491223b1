//! Domain models: plans, challenges, submissions and their status enums.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Difficulty tag requested for a plan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
  #[default]
  Beginner,
  Intermediate,
  Advanced,
}

impl Difficulty {
  pub fn as_str(&self) -> &'static str {
    match self {
      Difficulty::Beginner => "beginner",
      Difficulty::Intermediate => "intermediate",
      Difficulty::Advanced => "advanced",
    }
  }
}

impl std::fmt::Display for Difficulty {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
  #[default]
  Active,
  Completed,
  Archived,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeStatus {
  #[default]
  Pending,
  InProgress,
  Passed,
  Failed,
}

impl ChallengeStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      ChallengeStatus::Pending => "pending",
      ChallengeStatus::InProgress => "in_progress",
      ChallengeStatus::Passed => "passed",
      ChallengeStatus::Failed => "failed",
    }
  }

  /// Passed or failed: the learner has received at least one verdict.
  pub fn is_completed(&self) -> bool {
    matches!(self, ChallengeStatus::Passed | ChallengeStatus::Failed)
  }

  /// Pending or in progress: still counts as runway for the learner.
  pub fn is_open(&self) -> bool {
    matches!(self, ChallengeStatus::Pending | ChallengeStatus::InProgress)
  }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
  #[default]
  Pending,
  Evaluating,
  Passed,
  Failed,
}

impl SubmissionStatus {
  pub fn is_terminal(&self) -> bool {
    matches!(self, SubmissionStatus::Passed | SubmissionStatus::Failed)
  }
}

/// Free-form metadata recorded alongside a plan.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanMetadata {
  pub difficulty: Difficulty,
  #[serde(default)] pub tags: Vec<String>,
  #[serde(default)] pub model_used: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Plan {
  pub id: Uuid,
  pub user_id: String,
  pub topic: String,
  pub description: String,
  /// Exact user prompt sent to the model when the plan was generated.
  pub prompt_used: String,
  pub metadata: PlanMetadata,
  pub status: PlanStatus,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Challenge {
  pub id: Uuid,
  pub plan_id: Uuid,
  /// Zero-based, dense and unique within a plan.
  pub order_index: u32,
  pub title: String,
  pub description: String,
  pub success_criteria: String,
  #[serde(default)] pub hints: Vec<String>,
  pub status: ChallengeStatus,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Submission {
  pub id: Uuid,
  pub challenge_id: Uuid,
  pub user_id: String,
  pub content: String,
  pub status: SubmissionStatus,
  pub feedback: Option<String>,
  /// Always within 0..=100 once evaluated.
  pub score: Option<u8>,
  pub created_at: DateTime<Utc>,
}

/// Challenge content as produced by the model, before it is given an id or position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeSpec {
  pub title: String,
  pub description: String,
  pub success_criteria: String,
  #[serde(default)] pub hints: Vec<String>,
}

impl Challenge {
  /// Materialize a generated spec at `order_index` under `plan_id`, status pending.
  pub fn from_spec(plan_id: Uuid, order_index: u32, spec: ChallengeSpec, now: DateTime<Utc>) -> Self {
    Self {
      id: Uuid::new_v4(),
      plan_id,
      order_index,
      title: spec.title,
      description: spec.description,
      success_criteria: spec.success_criteria,
      hints: spec.hints,
      status: ChallengeStatus::Pending,
      created_at: now,
      updated_at: now,
    }
  }
}
