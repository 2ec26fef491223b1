//! Request workflows: the engine plus storage, ownership and lifecycle updates.
//!
//! Handlers stay thin and forward here. Each workflow is one unit of work for
//! one caller; engine calls are wrapped in the configured timeout.

use std::collections::HashSet;
use std::future::Future;

use chrono::Utc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::adapt::RecomputeOutcome;
use crate::domain::{Challenge, ChallengeStatus, Plan, PlanMetadata, PlanStatus, Submission, SubmissionStatus};
use crate::error::{EngineError, ServiceError};
use crate::evaluator::Evaluation;
use crate::generator::{PlanRequest, MAX_CHALLENGES, MIN_CHALLENGES};
use crate::lifecycle;
use crate::protocol::{
  ChallengeDetailOut, EvaluateOut, GeneratePlanIn, PlanSummaryOut, PlanWithChallengesOut, ProgressOut, RecomputeOut,
};
use crate::state::AppState;
use crate::util::calculate_progress;

async fn with_timeout<T, F>(state: &AppState, fut: F) -> Result<T, EngineError>
where
  F: Future<Output = Result<T, EngineError>>,
{
  match tokio::time::timeout(state.request_timeout, fut).await {
    Ok(res) => res,
    Err(_) => Err(EngineError::GatewayUnavailable(format!(
      "model call exceeded {}s",
      state.request_timeout.as_secs()
    ))),
  }
}

async fn owned_plan(state: &AppState, user_id: &str, plan_id: Uuid) -> Result<Plan, ServiceError> {
  let plan = state.store.get_plan(plan_id).await.ok_or_else(|| ServiceError::not_found("plan", plan_id))?;
  if plan.user_id != user_id {
    return Err(ServiceError::Forbidden("plan"));
  }
  Ok(plan)
}

/// A challenge together with its plan, after checking the caller owns the plan.
async fn owned_challenge(state: &AppState, user_id: &str, challenge_id: Uuid) -> Result<(Challenge, Plan), ServiceError> {
  let challenge = state
    .store
    .get_challenge(challenge_id)
    .await
    .ok_or_else(|| ServiceError::not_found("challenge", challenge_id))?;
  let plan = owned_plan(state, user_id, challenge.plan_id).await?;
  Ok((challenge, plan))
}

/// Re-derive the stored plan status from its current challenges. Reads the
/// stored status, not a snapshot, so an archive during a model call sticks.
async fn refresh_plan_status(state: &AppState, plan_id: Uuid) -> Result<PlanStatus, ServiceError> {
  let (before, after) = state
    .store
    .refresh_plan_status(plan_id, Utc::now())
    .await
    .ok_or_else(|| ServiceError::not_found("plan", plan_id))?;
  if before != after {
    info!(target: "plan", %plan_id, from = ?before, to = ?after, "Plan status changed");
  }
  Ok(after)
}

#[instrument(level = "info", skip(state, input), fields(%user_id, topic_len = input.topic.len()))]
pub async fn create_plan(state: &AppState, user_id: &str, input: GeneratePlanIn) -> Result<PlanWithChallengesOut, ServiceError> {
  let count = input
    .num_challenges
    .map(|n| n.clamp(MIN_CHALLENGES as i64, MAX_CHALLENGES as i64) as u32);
  let req = PlanRequest::new(&input.topic, input.context.as_deref(), input.difficulty, count)?;

  let generated = with_timeout(state, state.engine.generate_plan(&req)).await?;

  let now = Utc::now();
  let plan = Plan {
    id: Uuid::new_v4(),
    user_id: user_id.to_string(),
    topic: req.topic().to_string(),
    description: generated.description,
    prompt_used: generated.prompt_used,
    metadata: PlanMetadata {
      difficulty: req.difficulty(),
      tags: vec![req.topic().to_lowercase()],
      model_used: Some(state.engine.model().to_string()),
    },
    status: PlanStatus::Active,
    created_at: now,
    updated_at: now,
  };
  let challenges: Vec<Challenge> = generated
    .challenges
    .into_iter()
    .zip(0u32..)
    .map(|(spec, idx)| Challenge::from_spec(plan.id, idx, spec, now))
    .collect();

  state.store.insert_plan(plan.clone()).await;
  let challenges = match state.store.append_challenges(plan.id, challenges).await {
    Ok(cs) => cs,
    Err(e) => {
      error!(target: "plan", plan_id = %plan.id, error = %e, "Challenge insertion failed; removing plan");
      state.store.delete_plan(plan.id).await;
      return Err(e);
    }
  };

  info!(target: "plan", plan_id = %plan.id, challenges = challenges.len(), "Plan created");
  Ok(PlanWithChallengesOut { plan, challenges })
}

#[instrument(level = "info", skip(state), fields(%user_id))]
pub async fn list_plans(state: &AppState, user_id: &str) -> Vec<PlanSummaryOut> {
  let mut out = Vec::new();
  for plan in state.store.plans_for_user(user_id).await {
    let challenges = state.store.challenges_for_plan(plan.id).await;
    let passed = challenges.iter().filter(|c| c.status == ChallengeStatus::Passed).count();
    out.push(PlanSummaryOut {
      plan,
      total_challenges: challenges.len(),
      passed_challenges: passed,
      progress: calculate_progress(passed, challenges.len()),
    });
  }
  out
}

#[instrument(level = "info", skip(state), fields(%user_id, %plan_id))]
pub async fn get_plan(state: &AppState, user_id: &str, plan_id: Uuid) -> Result<PlanWithChallengesOut, ServiceError> {
  let plan = owned_plan(state, user_id, plan_id).await?;
  let challenges = state.store.challenges_for_plan(plan.id).await;
  Ok(PlanWithChallengesOut { plan, challenges })
}

#[instrument(level = "info", skip(state), fields(%user_id, %plan_id))]
pub async fn archive_plan(state: &AppState, user_id: &str, plan_id: Uuid) -> Result<Plan, ServiceError> {
  let plan = owned_plan(state, user_id, plan_id).await?;
  state
    .store
    .set_plan_status(plan.id, PlanStatus::Archived, Utc::now())
    .await
    .ok_or_else(|| ServiceError::not_found("plan", plan_id))
}

/// Learner opens a challenge: first view moves it from pending to in progress.
#[instrument(level = "info", skip(state), fields(%user_id, %challenge_id))]
pub async fn open_challenge(state: &AppState, user_id: &str, challenge_id: Uuid) -> Result<ChallengeDetailOut, ServiceError> {
  let (challenge, _plan) = owned_challenge(state, user_id, challenge_id).await?;

  let challenge = state
    .store
    .update_challenge_status(challenge.id, Utc::now(), lifecycle::challenge_on_engagement)
    .await
    .ok_or_else(|| ServiceError::not_found("challenge", challenge_id))?;
  let submissions = state.store.submissions_for(user_id, &HashSet::from([challenge.id])).await;
  Ok(ChallengeDetailOut { challenge, submissions })
}

/// Record, grade and apply one submission.
///
/// The submission is stored as `evaluating` before the model is called; if the
/// call fails it stays that way and the error is returned.
#[instrument(level = "info", skip(state, content), fields(%user_id, %challenge_id, content_len = content.len()))]
pub async fn submit_and_evaluate(
  state: &AppState,
  user_id: &str,
  challenge_id: Uuid,
  content: &str,
) -> Result<EvaluateOut, ServiceError> {
  let content = content.trim();
  if content.is_empty() {
    return Err(EngineError::invalid_input("submission content is required").into());
  }
  let (challenge, plan) = owned_challenge(state, user_id, challenge_id).await?;

  let now = Utc::now();
  let submission = Submission {
    id: Uuid::new_v4(),
    challenge_id: challenge.id,
    user_id: user_id.to_string(),
    content: content.to_string(),
    status: lifecycle::submission_begin_evaluation(SubmissionStatus::Pending)?,
    feedback: None,
    score: None,
    created_at: now,
  };
  let submission = state.store.insert_submission(submission).await?;

  state.store.update_challenge_status(challenge.id, now, lifecycle::challenge_on_engagement).await;

  let evaluation: Evaluation = match with_timeout(state, state.engine.evaluate_submission((&challenge).into(), content)).await {
    Ok(e) => e,
    Err(e) => {
      warn!(target: "evaluation", submission_id = %submission.id, kind = e.kind(), error = %e, "Evaluation failed; submission left in evaluating state");
      return Err(e.into());
    }
  };

  let verdict_status = lifecycle::submission_record_verdict(submission.status, evaluation.passed)?;
  let submission = state
    .store
    .update_submission(submission.id, |s| {
      s.status = verdict_status;
      s.feedback = Some(evaluation.feedback.clone());
      s.score = Some(evaluation.score);
    })
    .await
    .ok_or_else(|| ServiceError::not_found("submission", submission.id))?;

  let passed = evaluation.passed;
  let next = state
    .store
    .update_challenge_status(challenge.id, Utc::now(), |current| lifecycle::challenge_on_verdict(current, passed))
    .await
    .map(|c| c.status)
    .ok_or_else(|| ServiceError::not_found("challenge", challenge.id))?;

  let plan_status = refresh_plan_status(state, plan.id).await?;
  info!(target: "evaluation", submission_id = %submission.id, passed = evaluation.passed, score = evaluation.score, challenge_status = next.as_str(), "Submission applied");

  Ok(EvaluateOut {
    submission,
    passed: evaluation.passed,
    feedback: evaluation.feedback,
    score: evaluation.score,
    plan_status,
  })
}

/// Ask the engine for more challenges when the plan is running out of runway.
#[instrument(level = "info", skip(state), fields(%user_id, %plan_id))]
pub async fn recompute_plan(state: &AppState, user_id: &str, plan_id: Uuid) -> Result<RecomputeOut, ServiceError> {
  let plan = owned_plan(state, user_id, plan_id).await?;
  let challenges = state.store.challenges_for_plan(plan.id).await;
  let ids: HashSet<Uuid> = challenges.iter().map(|c| c.id).collect();
  let submissions = state.store.submissions_for(user_id, &ids).await;

  let outcome = with_timeout(state, state.engine.recompute_plan(&plan.topic, &challenges, &submissions)).await?;
  let (new_challenges, average_score) = match outcome {
    RecomputeOutcome::NoOp(reason) => {
      return Ok(RecomputeOut { message: reason.message().to_string(), updated_challenges: vec![], average_score: None });
    }
    RecomputeOutcome::Generated { new_challenges, average_score } => (new_challenges, average_score),
  };

  let now = Utc::now();
  let batch: Vec<Challenge> = new_challenges
    .into_iter()
    .map(|nc| Challenge::from_spec(plan.id, nc.order_index, nc.spec, now))
    .collect();
  let inserted = state.store.append_challenges(plan.id, batch).await?;
  state.store.update_plan(plan.id, now, |_| {}).await;
  refresh_plan_status(state, plan.id).await?;

  info!(target: "plan", plan_id = %plan.id, added = inserted.len(), average_score, "Plan recomputed");
  Ok(RecomputeOut {
    message: "Plan recomputed successfully".into(),
    updated_challenges: inserted,
    average_score: Some(average_score.round().clamp(0.0, 100.0) as u8),
  })
}

#[instrument(level = "info", skip(state), fields(%user_id))]
pub async fn progress(state: &AppState, user_id: &str) -> ProgressOut {
  let plans = state.store.plans_for_user(user_id).await;
  let mut out = ProgressOut { plans: plans.len(), ..Default::default() };
  let mut ids = HashSet::new();

  for plan in &plans {
    match plan.status {
      PlanStatus::Active => out.active_plans += 1,
      PlanStatus::Completed => out.completed_plans += 1,
      PlanStatus::Archived => {}
    }
    for c in state.store.challenges_for_plan(plan.id).await {
      out.challenges += 1;
      if c.status == ChallengeStatus::Passed {
        out.passed_challenges += 1;
      }
      ids.insert(c.id);
    }
  }
  out.progress = calculate_progress(out.passed_challenges, out.challenges);

  let submissions = state.store.submissions_for(user_id, &ids).await;
  out.submissions = submissions.len();
  let scores: Vec<f64> = submissions.iter().filter_map(|s| s.score).map(f64::from).collect();
  if !scores.is_empty() {
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    out.average_score = Some(mean.round() as u8);
  }
  out
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;
  use std::time::Duration;

  use serde_json::json;

  use async_trait::async_trait;

  use super::*;
  use crate::config::EngineConfig;
  use crate::engine::Engine;
  use crate::gateway::fake::ScriptedGateway;
  use crate::gateway::{ChatMessage, GenerationOptions, ModelGateway};
  use crate::store::Store;

  fn plan_reply(n: usize) -> String {
    let items: Vec<_> = (0..n)
      .map(|i| json!({"title": format!("Step {i}"), "description": "Explain", "success_criteria": "Clear", "hints": ["h1", "h2"]}))
      .collect();
    json!({"description": "A plan.", "challenges": items}).to_string()
  }

  fn state_with(replies: Vec<Result<String, EngineError>>) -> (AppState, Arc<ScriptedGateway>) {
    let gw = Arc::new(ScriptedGateway::new(replies));
    let state = AppState::with_gateway(gw.clone(), EngineConfig::default(), "test/model", Duration::from_secs(5));
    (state, gw)
  }

  fn gen_in(n: i64) -> GeneratePlanIn {
    GeneratePlanIn { topic: " Linear Algebra ".into(), context: None, difficulty: None, num_challenges: Some(n) }
  }

  #[tokio::test]
  async fn create_plan_persists_ordered_pending_challenges() {
    let (state, _) = state_with(vec![Ok(plan_reply(3))]);
    let out = create_plan(&state, "u1", gen_in(3)).await.unwrap();

    assert_eq!(out.plan.topic, "Linear Algebra");
    assert_eq!(out.plan.metadata.tags, vec!["linear algebra".to_string()]);
    assert_eq!(out.plan.metadata.model_used.as_deref(), Some("test/model"));
    assert!(out.plan.prompt_used.contains("Linear Algebra"));
    let idx: Vec<u32> = out.challenges.iter().map(|c| c.order_index).collect();
    assert_eq!(idx, [0, 1, 2]);
    assert!(out.challenges.iter().all(|c| c.status == ChallengeStatus::Pending));
    assert_eq!(state.store.challenges_for_plan(out.plan.id).await.len(), 3);
  }

  #[tokio::test]
  async fn failed_generation_stores_nothing() {
    let (state, _) = state_with(vec![Ok("no json here".into())]);
    let err = create_plan(&state, "u1", gen_in(3)).await.unwrap_err();
    assert!(matches!(err, ServiceError::Engine(EngineError::ContractViolation { .. })));
    assert!(state.store.plans_for_user("u1").await.is_empty());
  }

  #[tokio::test]
  async fn out_of_range_count_is_clamped() {
    let (state, gw) = state_with(vec![Ok(plan_reply(10))]);
    let out = create_plan(&state, "u1", gen_in(-4)).await.unwrap();
    assert_eq!(out.challenges.len(), 3);
    let (msgs, _) = gw.last_call();
    assert!(msgs[0].text.contains("Create exactly 3 challenges"));
  }

  #[tokio::test]
  async fn passing_every_challenge_completes_the_plan() {
    let (state, _) = state_with(vec![
      Ok(plan_reply(3)),
      Ok(r#"{"passed": true, "score": 90, "feedback": "Great"}"#.into()),
      Ok(r#"{"passed": true, "score": 80, "feedback": "Good"}"#.into()),
      Ok(r#"{"passed": true, "score": 70, "feedback": "Ok"}"#.into()),
    ]);
    let created = create_plan(&state, "u1", gen_in(3)).await.unwrap();

    let mut last = None;
    for c in &created.challenges {
      last = Some(submit_and_evaluate(&state, "u1", c.id, "my answer").await.unwrap());
    }
    let last = last.unwrap();
    assert_eq!(last.plan_status, PlanStatus::Completed);
    assert_eq!(state.store.get_plan(created.plan.id).await.unwrap().status, PlanStatus::Completed);
  }

  #[tokio::test]
  async fn failing_verdict_marks_challenge_failed_and_allows_resubmission() {
    let (state, _) = state_with(vec![
      Ok(plan_reply(3)),
      Ok(r#"{"passed": false, "score": 40, "feedback": "Missing detail"}"#.into()),
      Ok(r#"{"passed": true, "score": 85, "feedback": "Now complete"}"#.into()),
    ]);
    let created = create_plan(&state, "u1", gen_in(3)).await.unwrap();
    let cid = created.challenges[0].id;

    let first = submit_and_evaluate(&state, "u1", cid, "draft").await.unwrap();
    assert_eq!(first.submission.status, SubmissionStatus::Failed);
    assert_eq!(state.store.get_challenge(cid).await.unwrap().status, ChallengeStatus::Failed);

    let second = submit_and_evaluate(&state, "u1", cid, "better").await.unwrap();
    assert_eq!(second.submission.status, SubmissionStatus::Passed);
    assert_eq!(state.store.get_challenge(cid).await.unwrap().status, ChallengeStatus::Passed);
    assert_eq!(second.plan_status, PlanStatus::Active);
  }

  #[tokio::test]
  async fn gateway_failure_leaves_submission_evaluating() {
    let (state, _) = state_with(vec![
      Ok(plan_reply(3)),
      Err(EngineError::GatewayUnavailable("connection reset".into())),
    ]);
    let created = create_plan(&state, "u1", gen_in(3)).await.unwrap();
    let cid = created.challenges[0].id;

    let err = submit_and_evaluate(&state, "u1", cid, "answer").await.unwrap_err();
    assert!(matches!(err, ServiceError::Engine(EngineError::GatewayUnavailable(_))));

    let subs = state.store.submissions_for("u1", &HashSet::from([cid])).await;
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0].status, SubmissionStatus::Evaluating);
    assert_eq!(state.store.get_challenge(cid).await.unwrap().status, ChallengeStatus::InProgress);
  }

  #[tokio::test]
  async fn other_users_cannot_touch_a_plan() {
    let (state, gw) = state_with(vec![Ok(plan_reply(3))]);
    let created = create_plan(&state, "owner", gen_in(3)).await.unwrap();

    let err = submit_and_evaluate(&state, "intruder", created.challenges[0].id, "hi").await.unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden("plan")));
    assert!(matches!(recompute_plan(&state, "intruder", created.plan.id).await, Err(ServiceError::Forbidden(_))));
    assert_eq!(gw.call_count(), 1);
  }

  #[tokio::test]
  async fn opening_a_challenge_marks_it_in_progress() {
    let (state, _) = state_with(vec![Ok(plan_reply(3))]);
    let created = create_plan(&state, "u1", gen_in(3)).await.unwrap();
    let detail = open_challenge(&state, "u1", created.challenges[1].id).await.unwrap();
    assert_eq!(detail.challenge.status, ChallengeStatus::InProgress);
    assert!(detail.submissions.is_empty());
  }

  #[tokio::test]
  async fn recompute_appends_after_existing_challenges() {
    let adapted = json!({"challenges": [
      {"title": "Next 1", "description": "d", "success_criteria": "s"},
      {"title": "Next 2", "description": "d", "success_criteria": "s"}
    ]})
    .to_string();
    let (state, _) = state_with(vec![
      Ok(plan_reply(3)),
      Ok(r#"{"passed": true, "score": 92, "feedback": "Great"}"#.into()),
      Ok(adapted),
    ]);
    let created = create_plan(&state, "u1", gen_in(3)).await.unwrap();
    submit_and_evaluate(&state, "u1", created.challenges[0].id, "answer").await.unwrap();

    let out = recompute_plan(&state, "u1", created.plan.id).await.unwrap();
    assert_eq!(out.average_score, Some(92));
    let idx: Vec<u32> = out.updated_challenges.iter().map(|c| c.order_index).collect();
    assert_eq!(idx, [3]);
    assert_eq!(state.store.challenges_for_plan(created.plan.id).await.len(), 4);

    let again = recompute_plan(&state, "u1", created.plan.id).await.unwrap();
    assert!(again.updated_challenges.is_empty());
    assert_eq!(again.message, "Enough pending challenges exist");
  }

  #[tokio::test]
  async fn progress_summarizes_caller_plans() {
    let (state, _) = state_with(vec![
      Ok(plan_reply(4)),
      Ok(r#"{"passed": true, "score": 81}"#.into()),
    ]);
    let created = create_plan(&state, "u1", gen_in(4)).await.unwrap();
    submit_and_evaluate(&state, "u1", created.challenges[0].id, "answer").await.unwrap();

    let p = progress(&state, "u1").await;
    assert_eq!(p.plans, 1);
    assert_eq!(p.active_plans, 1);
    assert_eq!(p.challenges, 4);
    assert_eq!(p.passed_challenges, 1);
    assert_eq!(p.progress, 25);
    assert_eq!(p.average_score, Some(81));
    assert_eq!(progress(&state, "someone-else").await, ProgressOut::default());
  }

  /// Archives the plan while "grading", then passes the submission.
  struct ArchivingGateway {
    store: Store,
    plan_id: Uuid,
  }

  #[async_trait]
  impl ModelGateway for ArchivingGateway {
    async fn generate(&self, _messages: &[ChatMessage], _options: &GenerationOptions) -> Result<String, EngineError> {
      self.store.set_plan_status(self.plan_id, PlanStatus::Archived, Utc::now()).await;
      Ok(r#"{"passed": true, "score": 90}"#.into())
    }
  }

  /// Passes answers containing "correct", fails the rest, yielding mid-call.
  struct ContentGateway;

  #[async_trait]
  impl ModelGateway for ContentGateway {
    async fn generate(&self, messages: &[ChatMessage], _options: &GenerationOptions) -> Result<String, EngineError> {
      tokio::task::yield_now().await;
      let passed = messages.last().is_some_and(|m| m.text.contains("correct answer"));
      Ok(json!({"passed": passed, "score": if passed { 90 } else { 20 }}).to_string())
    }
  }

  fn sharing_store(state: &AppState, gateway: Arc<dyn ModelGateway>) -> AppState {
    AppState {
      store: state.store.clone(),
      engine: Engine::new(gateway, EngineConfig::default(), "test/model", 256),
      request_timeout: state.request_timeout,
      model_configured: true,
    }
  }

  #[tokio::test]
  async fn archiving_during_grading_is_not_overwritten() {
    let (state, _) = state_with(vec![
      Ok(plan_reply(3)),
      Ok(r#"{"passed": true, "score": 90}"#.into()),
      Ok(r#"{"passed": true, "score": 90}"#.into()),
    ]);
    let created = create_plan(&state, "u1", gen_in(3)).await.unwrap();
    for c in &created.challenges[..2] {
      submit_and_evaluate(&state, "u1", c.id, "answer").await.unwrap();
    }

    let archiving = sharing_store(&state, Arc::new(ArchivingGateway { store: state.store.clone(), plan_id: created.plan.id }));
    let out = submit_and_evaluate(&archiving, "u1", created.challenges[2].id, "answer").await.unwrap();

    assert!(out.passed);
    assert_eq!(out.plan_status, PlanStatus::Archived);
    assert_eq!(state.store.get_plan(created.plan.id).await.unwrap().status, PlanStatus::Archived);
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn concurrent_failing_verdict_never_reverts_a_pass() {
    let (state, _) = state_with(vec![Ok(plan_reply(3))]);
    let created = create_plan(&state, "u1", gen_in(3)).await.unwrap();
    let grading = Arc::new(sharing_store(&state, Arc::new(ContentGateway)));

    let mut tasks = Vec::new();
    for i in 0..16 {
      let st = grading.clone();
      let cid = created.challenges[0].id;
      let content = if i % 2 == 0 { "the correct answer" } else { "a wrong guess" };
      tasks.push(tokio::spawn(async move { submit_and_evaluate(&st, "u1", cid, content).await }));
    }
    for t in tasks {
      t.await.unwrap().unwrap();
    }

    let c = state.store.get_challenge(created.challenges[0].id).await.unwrap();
    assert_eq!(c.status, ChallengeStatus::Passed);
    let subs = state.store.submissions_for("u1", &HashSet::from([c.id])).await;
    assert_eq!(subs.len(), 16);
    assert_eq!(subs.iter().filter(|s| s.status == SubmissionStatus::Passed).count(), 8);
  }

  #[tokio::test]
  async fn failing_after_a_pass_keeps_the_challenge_passed() {
    let (state, _) = state_with(vec![
      Ok(plan_reply(3)),
      Ok(r#"{"passed": true, "score": 88}"#.into()),
      Ok(r#"{"passed": false, "score": 30}"#.into()),
    ]);
    let created = create_plan(&state, "u1", gen_in(3)).await.unwrap();
    let cid = created.challenges[0].id;
    submit_and_evaluate(&state, "u1", cid, "good").await.unwrap();
    let late = submit_and_evaluate(&state, "u1", cid, "worse").await.unwrap();

    assert_eq!(late.submission.status, SubmissionStatus::Failed);
    assert_eq!(state.store.get_challenge(cid).await.unwrap().status, ChallengeStatus::Passed);
  }
}
