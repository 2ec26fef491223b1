//! Public protocol structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Challenge, Difficulty, Plan, PlanStatus, Submission};

#[derive(Debug, Deserialize)]
pub struct GeneratePlanIn {
    pub topic: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    /// Clamped into 3..=10; out-of-range values are not an error.
    #[serde(default)]
    pub num_challenges: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlanWithChallengesOut {
    pub plan: Plan,
    pub challenges: Vec<Challenge>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlanSummaryOut {
    pub plan: Plan,
    pub total_challenges: usize,
    pub passed_challenges: usize,
    pub progress: u8,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChallengeDetailOut {
    pub challenge: Challenge,
    pub submissions: Vec<Submission>,
}

#[derive(Debug, Deserialize)]
pub struct EvaluateIn {
    pub challenge_id: Uuid,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EvaluateOut {
    pub submission: Submission,
    pub passed: bool,
    pub feedback: String,
    pub score: u8,
    pub plan_status: PlanStatus,
}

#[derive(Debug, Deserialize)]
pub struct RecomputeIn {
    pub plan_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecomputeOut {
    pub message: String,
    pub updated_challenges: Vec<Challenge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_score: Option<u8>,
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressOut {
    pub plans: usize,
    pub active_plans: usize,
    pub completed_plans: usize,
    pub challenges: usize,
    pub passed_challenges: usize,
    pub progress: u8,
    pub submissions: usize,
    /// Mean score of evaluated submissions, rounded.
    pub average_score: Option<u8>,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub model_configured: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorOut {
    pub error: String,
}
