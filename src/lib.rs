//! OpenLesson backend: adaptive challenge plans generated and graded by a language model.
//!
//! The engine (`generator`, `evaluator`, `adapt`) talks to the model only through
//! `gateway::ModelGateway` and validates every reply with `contract`. Persistence and
//! ownership live in `store` and `service`; `routes` exposes them over HTTP.

pub mod adapt;
pub mod config;
pub mod contract;
pub mod domain;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod gateway;
pub mod generator;
pub mod lifecycle;
pub mod protocol;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod util;
