//! Status transitions for plans, challenges and submissions.
//!
//! Plan completion is derived: it is recomputed by scanning the current
//! challenge statuses every time, never tracked with a counter.

use crate::domain::{ChallengeStatus, PlanStatus, SubmissionStatus};
use crate::error::EngineError;

/// First learner engagement (view or submission) moves a pending challenge to in progress.
pub fn challenge_on_engagement(current: ChallengeStatus) -> ChallengeStatus {
  match current {
    ChallengeStatus::Pending => ChallengeStatus::InProgress,
    other => other,
  }
}

/// Apply a verdict to a challenge. Passed is terminal; failed stays open to resubmission.
pub fn challenge_on_verdict(current: ChallengeStatus, passed: bool) -> ChallengeStatus {
  match (current, passed) {
    (ChallengeStatus::Passed, _) => ChallengeStatus::Passed,
    (_, true) => ChallengeStatus::Passed,
    (_, false) => ChallengeStatus::Failed,
  }
}

/// pending -> evaluating. Anything else means the submission was already picked up.
pub fn submission_begin_evaluation(current: SubmissionStatus) -> Result<SubmissionStatus, EngineError> {
  match current {
    SubmissionStatus::Pending => Ok(SubmissionStatus::Evaluating),
    other => Err(EngineError::invalid_input(format!("submission cannot start evaluation from {other:?}"))),
  }
}

/// evaluating -> passed | failed. Submissions are never re-evaluated.
pub fn submission_record_verdict(current: SubmissionStatus, passed: bool) -> Result<SubmissionStatus, EngineError> {
  match current {
    SubmissionStatus::Evaluating if passed => Ok(SubmissionStatus::Passed),
    SubmissionStatus::Evaluating => Ok(SubmissionStatus::Failed),
    done if done.is_terminal() => Err(EngineError::invalid_input(format!("submission already has a verdict ({done:?})"))),
    other => Err(EngineError::invalid_input(format!("submission cannot record a verdict from {other:?}"))),
  }
}

/// True when the plan has at least one challenge and every challenge passed.
pub fn plan_is_complete<I>(statuses: I) -> bool
where
  I: IntoIterator<Item = ChallengeStatus>,
{
  let mut any = false;
  for s in statuses {
    if s != ChallengeStatus::Passed {
      return false;
    }
    any = true;
  }
  any
}

/// Plan status derived from its challenges. Archival is sticky and decided elsewhere.
pub fn derive_plan_status<I>(current: PlanStatus, statuses: I) -> PlanStatus
where
  I: IntoIterator<Item = ChallengeStatus>,
{
  match current {
    PlanStatus::Archived => PlanStatus::Archived,
    _ if plan_is_complete(statuses) => PlanStatus::Completed,
    _ => PlanStatus::Active,
  }
}
