//! Adaptive recomputation of a plan's upcoming challenges.
//!
//! `decide` is a pure function over the current challenge and submission
//! lists; `Engine::recompute_plan` runs it and, when work is warranted, asks
//! the generator for new challenges positioned after the current maximum index.
//! Repeating the call while enough open challenges exist is always a no-op.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::AdaptationPolicy;
use crate::domain::{Challenge, ChallengeSpec, Submission, SubmissionStatus};
use crate::engine::Engine;
use crate::error::EngineError;
use crate::generator::{AdaptationRequest, CompletedChallenge};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum NoOpReason {
  /// No challenge has been passed or failed yet.
  NothingCompleted,
  /// Pending + in-progress challenges already cover the runway.
  EnoughRunway { open: usize },
}

impl NoOpReason {
  pub fn message(&self) -> &'static str {
    match self {
      NoOpReason::NothingCompleted => "No completed challenges to adapt from",
      NoOpReason::EnoughRunway { .. } => "Enough pending challenges exist",
    }
  }
}

#[derive(Clone, Debug, PartialEq)]
pub enum RecomputeDecision {
  NoOp(NoOpReason),
  Generate {
    completed: Vec<CompletedChallenge>,
    average_score: f64,
    count: usize,
    next_order_index: u32,
  },
}

/// A generated challenge and the position it should take in the plan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewChallenge {
  pub order_index: u32,
  pub spec: ChallengeSpec,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RecomputeOutcome {
  NoOp(NoOpReason),
  Generated { new_challenges: Vec<NewChallenge>, average_score: f64 },
}

/// Mean score of passed, scored submissions on the given challenges, or
/// `neutral` when there are none.
pub fn average_score(submissions: &[Submission], completed_ids: &HashSet<Uuid>, neutral: f64) -> f64 {
  let scores: Vec<f64> = submissions
    .iter()
    .filter(|s| s.status == SubmissionStatus::Passed && completed_ids.contains(&s.challenge_id))
    .filter_map(|s| s.score)
    .map(f64::from)
    .collect();

  if scores.is_empty() {
    neutral
  } else {
    scores.iter().sum::<f64>() / scores.len() as f64
  }
}

/// Decide whether the plan needs more challenges, and how many.
/// `submissions` must already be restricted to the plan owner's submissions.
pub fn decide(challenges: &[Challenge], submissions: &[Submission], policy: &AdaptationPolicy) -> RecomputeDecision {
  let mut ordered: Vec<&Challenge> = challenges.iter().collect();
  ordered.sort_by_key(|c| c.order_index);

  let completed: Vec<&Challenge> = ordered.iter().copied().filter(|c| c.status.is_completed()).collect();
  if completed.is_empty() {
    return RecomputeDecision::NoOp(NoOpReason::NothingCompleted);
  }

  let open = ordered.iter().filter(|c| c.status.is_open()).count();
  if open >= policy.runway {
    return RecomputeDecision::NoOp(NoOpReason::EnoughRunway { open });
  }

  let completed_ids: HashSet<Uuid> = completed.iter().map(|c| c.id).collect();
  let average = average_score(submissions, &completed_ids, policy.neutral_average);
  let next_order_index = ordered.last().map(|c| c.order_index + 1).unwrap_or(0);

  RecomputeDecision::Generate {
    completed: completed
      .iter()
      .map(|c| CompletedChallenge { title: c.title.clone(), status: c.status })
      .collect(),
    average_score: average,
    count: (policy.runway - open).min(policy.runway),
    next_order_index,
  }
}

impl Engine {
  /// RecomputePlan: no-op when there is nothing to adapt from or enough runway,
  /// otherwise one adaptation call. Fewer challenges than requested are
  /// accepted as-is. Extras beyond the requested count are dropped, so the
  /// open count never exceeds the runway.
  #[instrument(level = "info", skip(self, challenges, submissions), fields(challenges = challenges.len(), submissions = submissions.len()))]
  pub async fn recompute_plan(
    &self,
    topic: &str,
    challenges: &[Challenge],
    submissions: &[Submission],
  ) -> Result<RecomputeOutcome, EngineError> {
    let (completed, average_score, count, next_order_index) = match decide(challenges, submissions, &self.config.adaptation) {
      RecomputeDecision::NoOp(reason) => {
        info!(target: "plan", ?reason, "Recompute skipped");
        return Ok(RecomputeOutcome::NoOp(reason));
      }
      RecomputeDecision::Generate { completed, average_score, count, next_order_index } => {
        (completed, average_score, count, next_order_index)
      }
    };

    let req = AdaptationRequest { topic, completed: &completed, average_score, count };
    let mut specs = self.generate_adapted_challenges(&req).await?;
    specs.truncate(count);

    let new_challenges = specs
      .into_iter()
      .zip(next_order_index..)
      .map(|(spec, order_index)| NewChallenge { order_index, spec })
      .collect::<Vec<_>>();
    info!(target: "plan", requested = count, generated = new_challenges.len(), average_score, "Recompute generated challenges");
    Ok(RecomputeOutcome::Generated { new_challenges, average_score })
  }
}
