//! OpenLesson · adaptive challenge backend
//!
//! - Axum HTTP API under /api/v1
//! - Model access through OpenRouter chat completions
//! - In-memory plan/challenge/submission store
//!
//! Important env variables:
//!   PORT                   : u16 (default 3000)
//!   OPENROUTER_API_KEY     : enables plan generation and grading
//!   OPENROUTER_BASE_URL    : default "https://openrouter.ai/api/v1"
//!   OPENLESSON_MODEL       : default "google/gemini-3-pro-preview"
//!   OPENLESSON_CONFIG_PATH : TOML with prompt and adaptation overrides
//!   LOG_LEVEL              : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT             : "pretty" (default) or "json"

use std::{net::SocketAddr, sync::Arc};

use tokio::net::TcpListener;
use tracing::{info, warn};

use openlesson_backend::config::Settings;
use openlesson_backend::routes::build_router;
use openlesson_backend::state::AppState;
use openlesson_backend::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let settings = Settings::from_env();
  let state = Arc::new(AppState::from_settings(&settings));
  let app = build_router(state);

  let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
  let listener = TcpListener::bind(addr).await?;
  info!(target: "openlesson_backend", %addr, model = %settings.model, "HTTP server listening");
  axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
  info!(target: "openlesson_backend", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(target: "openlesson_backend", error = %e, "Failed to listen for ctrl-c; running until killed");
    std::future::pending::<()>().await;
  }
  info!(target: "openlesson_backend", "Shutdown signal received");
}
