//! End-to-end HTTP tests: the real router and store over a scripted model gateway.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use openlesson_backend::config::EngineConfig;
use openlesson_backend::error::EngineError;
use openlesson_backend::gateway::{ChatMessage, GenerationOptions, ModelGateway};
use openlesson_backend::routes::{build_router, USER_HEADER};
use openlesson_backend::state::AppState;

struct Scripted {
  replies: Mutex<VecDeque<String>>,
  calls: AtomicUsize,
}

#[async_trait]
impl ModelGateway for Scripted {
  async fn generate(&self, _messages: &[ChatMessage], _options: &GenerationOptions) -> Result<String, EngineError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self
      .replies
      .lock()
      .unwrap()
      .pop_front()
      .ok_or_else(|| EngineError::GatewayUnavailable("script exhausted".into()))
  }
}

fn app(replies: &[String]) -> (Router, Arc<Scripted>) {
  let gateway = Arc::new(Scripted {
    replies: Mutex::new(replies.iter().cloned().collect()),
    calls: AtomicUsize::new(0),
  });
  let state = AppState::with_gateway(gateway.clone(), EngineConfig::default(), "test/model", Duration::from_secs(5));
  (build_router(Arc::new(state)), gateway)
}

fn plan_reply(n: usize) -> String {
  let challenges: Vec<Value> = (1..=n)
    .map(|i| {
      json!({
        "title": format!("Challenge {i}"),
        "description": format!("Work through part {i}."),
        "success_criteria": format!("Part {i} is correct."),
        "hints": ["Start small"]
      })
    })
    .collect();
  format!(
    "Here is your plan:\n```json\n{}\n```",
    json!({ "description": "A short course.", "challenges": challenges })
  )
}

async fn call(app: &Router, method: &str, uri: &str, user: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
  let mut req = Request::builder().method(method).uri(uri);
  if let Some(u) = user {
    req = req.header(USER_HEADER, u);
  }
  let req = match body {
    Some(b) => req.header("content-type", "application/json").body(Body::from(b.to_string())).unwrap(),
    None => req.body(Body::empty()).unwrap(),
  };
  let res = app.clone().oneshot(req).await.unwrap();
  let status = res.status();
  let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
  (status, value)
}

#[tokio::test]
async fn health_reports_model_configured() {
  let (app, _) = app(&[]);
  let (status, body) = call(&app, "GET", "/api/v1/health", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["ok"], true);
  assert_eq!(body["model_configured"], true);
}

#[tokio::test]
async fn generate_plan_returns_requested_number_of_challenges() {
  let (app, gw) = app(&[plan_reply(3)]);
  let (status, body) = call(
    &app,
    "POST",
    "/api/v1/plans/generate",
    Some("learner-1"),
    Some(json!({ "topic": "Linear Algebra", "num_challenges": 3 })),
  )
  .await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(gw.calls.load(Ordering::SeqCst), 1);
  assert_eq!(body["plan"]["topic"], "Linear Algebra");
  assert_eq!(body["plan"]["status"], "active");
  assert_eq!(body["plan"]["metadata"]["difficulty"], "beginner");
  let challenges = body["challenges"].as_array().unwrap();
  assert_eq!(challenges.len(), 3);
  for (i, c) in challenges.iter().enumerate() {
    assert_eq!(c["order_index"], i as u64);
    assert_eq!(c["status"], "pending");
    assert!(!c["title"].as_str().unwrap().is_empty());
    assert!(!c["description"].as_str().unwrap().is_empty());
    assert!(!c["success_criteria"].as_str().unwrap().is_empty());
  }
}

#[tokio::test]
async fn missing_user_header_is_unauthorized() {
  let (app, gw) = app(&[plan_reply(3)]);
  let (status, body) = call(&app, "POST", "/api/v1/plans/generate", None, Some(json!({ "topic": "Rust" }))).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert!(body["error"].is_string());
  assert_eq!(gw.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn blank_topic_is_bad_request() {
  let (app, gw) = app(&[]);
  let (status, _) = call(&app, "POST", "/api/v1/plans/generate", Some("u"), Some(json!({ "topic": "   " }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(gw.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unparseable_model_output_is_bad_gateway_without_raw_text() {
  let (app, _) = app(&["I cannot help with SECRET-RAW-OUTPUT today".to_string()]);
  let (status, body) =
    call(&app, "POST", "/api/v1/plans/generate", Some("u"), Some(json!({ "topic": "Chemistry" }))).await;
  assert_eq!(status, StatusCode::BAD_GATEWAY);
  assert!(!body["error"].as_str().unwrap().contains("SECRET-RAW-OUTPUT"));

  let (_, plans) = call(&app, "GET", "/api/v1/plans", Some("u"), None).await;
  assert_eq!(plans.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn exhausted_gateway_is_service_unavailable() {
  let (app, _) = app(&[]);
  let (status, _) = call(&app, "POST", "/api/v1/plans/generate", Some("u"), Some(json!({ "topic": "Go" }))).await;
  assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn submit_flow_updates_challenge_and_progress() {
  let verdict = json!({ "passed": true, "feedback": "Nice work.", "score": 90 }).to_string();
  let (app, gw) = app(&[plan_reply(3), verdict]);

  let (_, plan) =
    call(&app, "POST", "/api/v1/plans/generate", Some("u"), Some(json!({ "topic": "Linear Algebra", "num_challenges": 3 })))
      .await;
  let challenge_id = plan["challenges"][0]["id"].as_str().unwrap().to_string();

  let (status, empty) = call(
    &app,
    "POST",
    "/api/v1/submissions/evaluate",
    Some("u"),
    Some(json!({ "challenge_id": challenge_id, "content": "  \n " })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(empty["error"].is_string());
  assert_eq!(gw.calls.load(Ordering::SeqCst), 1);

  let (status, out) = call(
    &app,
    "POST",
    "/api/v1/submissions/evaluate",
    Some("u"),
    Some(json!({ "challenge_id": challenge_id, "content": "det(A) = ad - bc" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(out["passed"], true);
  assert_eq!(out["score"], 90);
  assert_eq!(out["submission"]["status"], "passed");
  assert_eq!(out["plan_status"], "active");

  let (_, detail) = call(&app, "GET", &format!("/api/v1/challenges/{challenge_id}"), Some("u"), None).await;
  assert_eq!(detail["challenge"]["status"], "passed");
  assert_eq!(detail["submissions"].as_array().unwrap().len(), 1);

  let (_, progress) = call(&app, "GET", "/api/v1/progress", Some("u"), None).await;
  assert_eq!(progress["plans"], 1);
  assert_eq!(progress["challenges"], 3);
  assert_eq!(progress["passed_challenges"], 1);
  assert_eq!(progress["progress"], 33);
  assert_eq!(progress["average_score"], 90);
}

#[tokio::test]
async fn other_users_cannot_read_a_plan() {
  let (app, _) = app(&[plan_reply(3)]);
  let (_, plan) = call(&app, "POST", "/api/v1/plans/generate", Some("owner"), Some(json!({ "topic": "Rust" }))).await;
  let plan_id = plan["plan"]["id"].as_str().unwrap().to_string();

  let (status, _) = call(&app, "GET", &format!("/api/v1/plans/{plan_id}"), Some("intruder"), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _) =
    call(&app, "GET", "/api/v1/plans/00000000-0000-0000-0000-000000000000", Some("owner"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn recompute_without_completed_challenges_is_a_no_op() {
  let (app, gw) = app(&[plan_reply(3)]);
  let (_, plan) = call(&app, "POST", "/api/v1/plans/generate", Some("u"), Some(json!({ "topic": "Rust" }))).await;
  let plan_id = plan["plan"]["id"].as_str().unwrap().to_string();

  let (status, out) =
    call(&app, "POST", "/api/v1/plans/recompute", Some("u"), Some(json!({ "plan_id": plan_id }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(out["message"], "No completed challenges to adapt from");
  assert_eq!(out["updated_challenges"].as_array().unwrap().len(), 0);
  assert!(out.get("average_score").is_none());
  assert_eq!(gw.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn archive_marks_plan_archived() {
  let (app, _) = app(&[plan_reply(3)]);
  let (_, plan) = call(&app, "POST", "/api/v1/plans/generate", Some("u"), Some(json!({ "topic": "Rust" }))).await;
  let plan_id = plan["plan"]["id"].as_str().unwrap().to_string();

  let (status, archived) = call(&app, "POST", &format!("/api/v1/plans/{plan_id}/archive"), Some("u"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(archived["status"], "archived");

  let (_, list) = call(&app, "GET", "/api/v1/plans", Some("u"), None).await;
  assert_eq!(list[0]["plan"]["status"], "archived");
  assert_eq!(list[0]["total_challenges"], 3);
}
