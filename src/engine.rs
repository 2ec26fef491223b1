//! The adaptive challenge engine: plan generation, submission grading and
//! adaptive recomputation over an injected `ModelGateway`.
//!
//! Every operation is one request/response unit of work with at most one
//! model call. Nothing is retried and nothing is persisted here; callers own
//! timeouts, retries and storage.

use std::sync::Arc;

use tracing::{instrument, warn};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::gateway::{ChatMessage, GenerationOptions, ModelGateway};
use crate::generator::{GeneratedPlan, PlanRequest};
use crate::util::trunc_for_log;

#[derive(Clone)]
pub struct Engine {
  gateway: Arc<dyn ModelGateway>,
  pub(crate) config: EngineConfig,
  model: String,
  max_tokens: u32,
}

impl Engine {
  pub fn new(gateway: Arc<dyn ModelGateway>, config: EngineConfig, model: impl Into<String>, max_tokens: u32) -> Self {
    Self { gateway, config, model: model.into(), max_tokens }
  }

  pub fn model(&self) -> &str {
    &self.model
  }

  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  /// Single model call; errors from the gateway propagate unchanged.
  pub(crate) async fn call_model(&self, messages: &[ChatMessage], temperature: f32) -> Result<String, EngineError> {
    let options = GenerationOptions::new(self.model.clone(), temperature, self.max_tokens);
    self.gateway.generate(messages, &options).await
  }

  /// GeneratePlan: exactly `num_challenges` specs (after clamping to 3..=10) or a typed error.
  ///
  /// Extra challenges beyond the requested count are dropped; too few is a
  /// `ContractViolation`, never a silently short plan.
  #[instrument(level = "info", skip(self, request), fields(topic_len = request.topic().len(), difficulty = %request.difficulty(), count = request.num_challenges()))]
  pub async fn generate_plan(&self, request: &PlanRequest) -> Result<GeneratedPlan, EngineError> {
    let mut plan = self.generate_plan_content(request).await?;
    let wanted = request.num_challenges() as usize;

    if plan.challenges.len() < wanted {
      let got = plan.challenges.len();
      warn!(target: "plan", wanted, got, "Model returned too few challenges");
      return Err(EngineError::ContractViolation {
        reason: format!("expected {wanted} challenges, model returned {got}"),
        raw: plan.raw_response,
      });
    }
    if plan.challenges.len() > wanted {
      warn!(target: "plan", wanted, got = plan.challenges.len(), "Model returned extra challenges; keeping the first ones");
      plan.challenges.truncate(wanted);
    }
    Ok(plan)
  }
}

/// Log the raw model text behind a contract violation (never surfaced to end users).
pub(crate) fn log_violation(target_op: &'static str, err: &EngineError) {
  if let EngineError::ContractViolation { reason, raw } = err {
    warn!(target: "openlesson_backend", op = target_op, %reason, raw = %trunc_for_log(raw, 600), "Model output rejected by contract");
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::gateway::fake::ScriptedGateway;

  fn spec(i: usize) -> serde_json::Value {
    json!({
      "title": format!("Challenge {i}"),
      "description": "Do the thing",
      "success_criteria": "Thing is done",
      "hints": ["start small"]
    })
  }

  fn plan_reply(n: usize) -> String {
    json!({"description": "Learn it.", "challenges": (0..n).map(spec).collect::<Vec<_>>()}).to_string()
  }

  fn engine(gw: Arc<ScriptedGateway>) -> Engine {
    Engine::new(gw, EngineConfig::default(), "test/model", 1024)
  }

  #[tokio::test]
  async fn exact_count_is_returned_for_every_allowed_size() {
    for n in 3..=10u32 {
      let gw = Arc::new(ScriptedGateway::replying(&plan_reply(n as usize)));
      let req = PlanRequest::new("Linear Algebra", None, None, Some(n)).unwrap();
      let plan = engine(gw).generate_plan(&req).await.unwrap();
      assert_eq!(plan.challenges.len(), n as usize);
    }
  }

  #[tokio::test]
  async fn short_plan_is_a_typed_error() {
    let gw = Arc::new(ScriptedGateway::replying(&plan_reply(2)));
    let req = PlanRequest::new("Linear Algebra", None, None, Some(4)).unwrap();
    let err = engine(gw).generate_plan(&req).await.unwrap_err();
    assert!(matches!(err, EngineError::ContractViolation { .. }));
  }

  #[tokio::test]
  async fn long_plan_is_cut_to_requested_size_in_order() {
    let gw = Arc::new(ScriptedGateway::replying(&plan_reply(7)));
    let req = PlanRequest::new("Linear Algebra", None, None, Some(3)).unwrap();
    let plan = engine(gw).generate_plan(&req).await.unwrap();
    let titles: Vec<_> = plan.challenges.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, ["Challenge 0", "Challenge 1", "Challenge 2"]);
  }

  #[tokio::test]
  async fn gateway_errors_propagate_unchanged() {
    let gw = Arc::new(ScriptedGateway::new(vec![Err(EngineError::GatewayRejected { status: Some(401), message: "bad key".into() })]));
    let req = PlanRequest::new("Rust", None, None, None).unwrap();
    match engine(gw).generate_plan(&req).await.unwrap_err() {
      EngineError::GatewayRejected { status, message } => {
        assert_eq!(status, Some(401));
        assert_eq!(message, "bad key");
      }
      other => panic!("unexpected {other:?}"),
    }
  }
}
