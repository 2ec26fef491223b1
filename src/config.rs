//! Runtime settings (environment) and engine configuration (optional TOML).
//!
//! Environment:
//!   PORT                            : u16 (default 3000)
//!   OPENROUTER_API_KEY              : model credential; absent means every model call fails as unavailable
//!   OPENROUTER_BASE_URL             : default "https://openrouter.ai/api/v1"
//!   OPENLESSON_MODEL                : default "google/gemini-3-pro-preview"
//!   OPENLESSON_MAX_TOKENS           : default 4096
//!   OPENLESSON_REQUEST_TIMEOUT_SECS : caller-side limit around each model call (default 120)
//!   APP_URL                         : sent as HTTP-Referer (default "http://localhost:3000")
//!   OPENLESSON_CONFIG_PATH          : path to TOML with `[prompts]` and `[adaptation]` overrides

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

use crate::gateway::GatewayConfig;

pub const DEFAULT_MODEL: &str = "google/gemini-3-pro-preview";

#[derive(Clone, Debug)]
pub struct Settings {
  pub port: u16,
  pub gateway: GatewayConfig,
  pub model: String,
  pub max_tokens: u32,
  pub request_timeout: Duration,
  pub engine: EngineConfig,
}

impl Settings {
  pub fn from_env() -> Self {
    let var = |k: &str| std::env::var(k).ok().filter(|v| !v.trim().is_empty());
    let defaults = GatewayConfig::default();

    let gateway = GatewayConfig {
      api_key: var("OPENROUTER_API_KEY"),
      base_url: var("OPENROUTER_BASE_URL").unwrap_or(defaults.base_url),
      referer: var("APP_URL").unwrap_or(defaults.referer),
      app_title: defaults.app_title,
    };

    Self {
      port: var("PORT").and_then(|p| p.parse().ok()).unwrap_or(3000),
      gateway,
      model: var("OPENLESSON_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into()),
      max_tokens: var("OPENLESSON_MAX_TOKENS").and_then(|v| v.parse().ok()).unwrap_or(4096),
      request_timeout: Duration::from_secs(
        var("OPENLESSON_REQUEST_TIMEOUT_SECS").and_then(|v| v.parse().ok()).unwrap_or(120),
      ),
      engine: load_engine_config_from_env().unwrap_or_default(),
    }
  }
}

/// TOML-overridable engine configuration.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct EngineConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub adaptation: AdaptationPolicy,
}

/// Thresholds driving adaptive recomputation.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct AdaptationPolicy {
  /// Open (pending + in progress) challenges a plan should keep ahead of the learner.
  pub runway: usize,
  /// Average assumed when no scored passing submission exists. Heuristic, not derived.
  pub neutral_average: f64,
  /// Averages strictly above this ask for harder challenges.
  pub raise_difficulty_above: f64,
  /// Averages strictly below this ask for more scaffolding.
  pub scaffold_below: f64,
}

impl Default for AdaptationPolicy {
  fn default() -> Self {
    Self { runway: 3, neutral_average: 70.0, raise_difficulty_above: 85.0, scaffold_below: 60.0 }
  }
}

/// Prompts used by the engine. `{key}` placeholders are filled per call.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  // Initial plan generation: {count}, {difficulty}
  pub plan_system: String,
  // {topic}, {context_block}, {difficulty}, {count}
  pub plan_user_template: String,
  // Adaptation: {count}, {guidance}
  pub adapt_system: String,
  // {topic}, {completed}, {average}, {count}
  pub adapt_user_template: String,
  pub adapt_guidance_harder: String,
  pub adapt_guidance_scaffold: String,
  pub adapt_guidance_steady: String,
  // Evaluation: {pass_score}
  pub eval_system: String,
  // {title}, {description}, {success_criteria}, {submission}
  pub eval_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      plan_system: r#"You are an expert educational content creator. Your task is to create engaging, structured learning plans with practical challenges.

Your response MUST be valid JSON with this exact structure:
{
  "description": "A 2-3 sentence description of what the learner will accomplish",
  "challenges": [
    {
      "title": "Short challenge title",
      "description": "Detailed description of what the learner needs to do",
      "success_criteria": "Clear criteria for what constitutes a successful answer",
      "hints": ["Hint 1", "Hint 2"]
    }
  ]
}

Guidelines:
- Create exactly {count} challenges
- Challenges should be progressive, building on previous knowledge
- Each challenge should be practical and require a written response
- Success criteria should be specific and measurable
- Include 2-3 hints per challenge
- Tailor difficulty to the {difficulty} level
- Make challenges engaging and focused on real understanding, not memorization"#.into(),
      plan_user_template: "Create a learning plan for: \"{topic}\"\n{context_block}\nDifficulty level: {difficulty}\nNumber of challenges: {count}\n\nReturn ONLY valid JSON, no markdown or additional text.".into(),
      adapt_system: r#"You are an expert educational content creator. Your task is to create new challenges that adapt to the learner's demonstrated level.

Your response MUST be valid JSON with this exact structure:
{
  "challenges": [
    {
      "title": "Short challenge title",
      "description": "Detailed description of what the learner needs to do",
      "success_criteria": "Clear criteria for what constitutes a successful answer",
      "hints": ["Hint 1", "Hint 2"]
    }
  ]
}

Guidelines:
- Create exactly {count} new challenges
- {guidance}
- Build on concepts from completed challenges
- Each challenge should be practical and require a written response"#.into(),
      adapt_user_template: "Topic: \"{topic}\"\n\nCompleted challenges:\n{completed}\n\nLearner's average score: {average}%\n\nCreate {count} new adapted challenges. Return ONLY valid JSON.".into(),
      adapt_guidance_harder: "The learner is scoring highly: make these challenges more difficult than the completed ones".into(),
      adapt_guidance_scaffold: "The learner is struggling: provide more scaffolding and simpler, smaller steps".into(),
      adapt_guidance_steady: "Keep the difficulty at the level of the completed challenges".into(),
      eval_system: r#"You are an expert educational evaluator. Your task is to evaluate a learner's submission against specific success criteria.

Your response MUST be valid JSON with this exact structure:
{
  "passed": true/false,
  "feedback": "Detailed constructive feedback explaining what was good and what could be improved",
  "score": 0-100
}

Evaluation guidelines:
- Be encouraging but honest
- A score of {pass_score}+ with all key criteria met = passed
- Provide specific, actionable feedback
- Reference the success criteria in your evaluation
- If the answer is mostly correct but incomplete, still provide a reasonable score
- Maximum feedback length: 3-4 sentences"#.into(),
      eval_user_template: "Challenge: {title}\n\nDescription: {description}\n\nSuccess Criteria: {success_criteria}\n\nLearner's Submission:\n\"\"\"\n{submission}\n\"\"\"\n\nEvaluate this submission and return ONLY valid JSON.".into(),
    }
  }
}

/// Attempt to load `EngineConfig` from OPENLESSON_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_engine_config_from_env() -> Option<EngineConfig> {
  let path = std::env::var("OPENLESSON_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_engine_config(&s) {
      Ok(cfg) => {
        info!(target: "openlesson_backend", %path, "Loaded engine config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "openlesson_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "openlesson_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

pub fn parse_engine_config(s: &str) -> Result<EngineConfig, toml::de::Error> {
  toml::from_str::<EngineConfig>(s)
}
