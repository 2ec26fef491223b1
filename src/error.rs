//! Error taxonomy for the challenge engine and the service built around it.

use thiserror::Error;

/// Failures of the core engine operations. None are recovered locally.
#[derive(Debug, Error)]
pub enum EngineError {
  /// Caller-supplied data violates a precondition. Not retryable.
  #[error("invalid input: {0}")]
  InvalidInput(String),

  /// Credential missing or the model could not be reached. Safe to retry later.
  #[error("model gateway unavailable: {0}")]
  GatewayUnavailable(String),

  /// Upstream answered with a non-success result.
  #[error("model gateway rejected the request{}: {message}", http_status_suffix(.status))]
  GatewayRejected { status: Option<u16>, message: String },

  /// Model output could not be shaped into the required contract.
  /// `raw` is kept for diagnostics and is never part of the display text.
  #[error("model output violated the response contract: {reason}")]
  ContractViolation { reason: String, raw: String },
}

impl EngineError {
  pub fn invalid_input(msg: impl Into<String>) -> Self {
    EngineError::InvalidInput(msg.into())
  }

  pub fn contract(reason: impl Into<String>, raw: &str) -> Self {
    EngineError::ContractViolation { reason: reason.into(), raw: raw.to_string() }
  }

  /// Short machine-friendly kind, used as a log field.
  pub fn kind(&self) -> &'static str {
    match self {
      EngineError::InvalidInput(_) => "invalid_input",
      EngineError::GatewayUnavailable(_) => "gateway_unavailable",
      EngineError::GatewayRejected { .. } => "gateway_rejected",
      EngineError::ContractViolation { .. } => "contract_violation",
    }
  }
}

fn http_status_suffix(status: &Option<u16>) -> String {
  status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

/// Failures of the request workflows (engine + storage + ownership).
#[derive(Debug, Error)]
pub enum ServiceError {
  #[error(transparent)]
  Engine(#[from] EngineError),

  #[error("missing caller identity")]
  Unauthenticated,

  #[error("{entity} not found: {id}")]
  NotFound { entity: &'static str, id: String },

  #[error("caller does not own this {0}")]
  Forbidden(&'static str),

  #[error("conflict: {0}")]
  Conflict(String),
}

impl ServiceError {
  pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
    ServiceError::NotFound { entity, id: id.to_string() }
  }
}
