//! HTTP endpoint handlers. These are thin wrappers that forward to the service workflows.
//! Each handler is instrumented; errors are mapped to status codes in one place (`ApiError`).

use std::sync::Arc;

use axum::{
  async_trait,
  extract::{FromRequestParts, Path, State},
  http::{request::Parts, StatusCode},
  response::{IntoResponse, Response},
  Json,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::Plan;
use crate::error::{EngineError, ServiceError};
use crate::protocol::*;
use crate::routes::USER_HEADER;
use crate::service;
use crate::state::AppState;

/// Caller identity taken from `x-user-id`.
#[derive(Debug, Clone)]
pub struct CallerId(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CallerId {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    parts
      .headers
      .get(USER_HEADER)
      .and_then(|v| v.to_str().ok())
      .map(str::trim)
      .filter(|v| !v.is_empty())
      .map(|v| CallerId(v.to_string()))
      .ok_or(ApiError(ServiceError::Unauthenticated))
  }
}

#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
  fn from(e: ServiceError) -> Self { ApiError(e) }
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match &self.0 {
      ServiceError::Engine(EngineError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
      ServiceError::Engine(EngineError::GatewayUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
      ServiceError::Engine(EngineError::GatewayRejected { .. }) => StatusCode::BAD_GATEWAY,
      ServiceError::Engine(EngineError::ContractViolation { .. }) => StatusCode::BAD_GATEWAY,
      ServiceError::Unauthenticated => StatusCode::UNAUTHORIZED,
      ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
      ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
      ServiceError::Conflict(_) => StatusCode::CONFLICT,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      error!(target: "openlesson_backend", %status, error = %self.0, "Request failed");
    } else {
      warn!(target: "openlesson_backend", %status, error = %self.0, "Request rejected");
    }
    (status, Json(ErrorOut { error: self.0.to_string() })).into_response()
  }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, model_configured: state.model_configured })
}

#[instrument(level = "info", skip(state, caller, body), fields(user = %caller.0, topic_len = body.topic.len()))]
pub async fn http_generate_plan(
  State(state): State<Arc<AppState>>,
  caller: CallerId,
  Json(body): Json<GeneratePlanIn>,
) -> ApiResult<PlanWithChallengesOut> {
  let out = service::create_plan(&state, &caller.0, body).await?;
  info!(target: "plan", plan_id = %out.plan.id, challenges = out.challenges.len(), "HTTP plan generated");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, caller), fields(user = %caller.0))]
pub async fn http_list_plans(State(state): State<Arc<AppState>>, caller: CallerId) -> ApiResult<Vec<PlanSummaryOut>> {
  Ok(Json(service::list_plans(&state, &caller.0).await))
}

#[instrument(level = "info", skip(state, caller), fields(user = %caller.0, %plan_id))]
pub async fn http_get_plan(
  State(state): State<Arc<AppState>>,
  caller: CallerId,
  Path(plan_id): Path<Uuid>,
) -> ApiResult<PlanWithChallengesOut> {
  Ok(Json(service::get_plan(&state, &caller.0, plan_id).await?))
}

#[instrument(level = "info", skip(state, caller), fields(user = %caller.0, %plan_id))]
pub async fn http_archive_plan(
  State(state): State<Arc<AppState>>,
  caller: CallerId,
  Path(plan_id): Path<Uuid>,
) -> ApiResult<Plan> {
  Ok(Json(service::archive_plan(&state, &caller.0, plan_id).await?))
}

#[instrument(level = "info", skip(state, caller, body), fields(user = %caller.0, plan_id = %body.plan_id))]
pub async fn http_recompute_plan(
  State(state): State<Arc<AppState>>,
  caller: CallerId,
  Json(body): Json<RecomputeIn>,
) -> ApiResult<RecomputeOut> {
  let out = service::recompute_plan(&state, &caller.0, body.plan_id).await?;
  info!(target: "plan", plan_id = %body.plan_id, added = out.updated_challenges.len(), "HTTP recompute served");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, caller), fields(user = %caller.0, %challenge_id))]
pub async fn http_get_challenge(
  State(state): State<Arc<AppState>>,
  caller: CallerId,
  Path(challenge_id): Path<Uuid>,
) -> ApiResult<ChallengeDetailOut> {
  Ok(Json(service::open_challenge(&state, &caller.0, challenge_id).await?))
}

#[instrument(level = "info", skip(state, caller, body), fields(user = %caller.0, challenge_id = %body.challenge_id, content_len = body.content.len()))]
pub async fn http_evaluate_submission(
  State(state): State<Arc<AppState>>,
  caller: CallerId,
  Json(body): Json<EvaluateIn>,
) -> ApiResult<EvaluateOut> {
  let out = service::submit_and_evaluate(&state, &caller.0, body.challenge_id, &body.content).await?;
  info!(target: "evaluation", challenge_id = %body.challenge_id, passed = out.passed, score = out.score, "HTTP submission evaluated");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, caller), fields(user = %caller.0))]
pub async fn http_progress(State(state): State<Arc<AppState>>, caller: CallerId) -> ApiResult<ProgressOut> {
  Ok(Json(service::progress(&state, &caller.0).await))
}
