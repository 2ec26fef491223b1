//! Application state: storage, the challenge engine and request limits.

use std::{sync::Arc, time::Duration};

use tracing::{info, instrument, warn};

use crate::config::{EngineConfig, Settings};
use crate::engine::Engine;
use crate::gateway::{ModelGateway, OpenRouterGateway};
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub engine: Engine,
    /// Caller-side limit around each model call.
    pub request_timeout: Duration,
    pub model_configured: bool,
}

impl AppState {
    /// Build state from settings: OpenRouter gateway + empty in-memory store.
    #[instrument(level = "info", skip_all)]
    pub fn from_settings(settings: &Settings) -> Self {
        let gateway = OpenRouterGateway::new(settings.gateway.clone());
        let model_configured = gateway.has_credential();
        if model_configured {
            info!(target: "openlesson_backend", base_url = %gateway.base_url(), model = %settings.model, max_tokens = settings.max_tokens, "Model gateway enabled.");
        } else {
            warn!(target: "openlesson_backend", "OPENROUTER_API_KEY not set; plan generation and grading will fail as unavailable.");
        }
        info!(
            target: "openlesson_backend",
            runway = settings.engine.adaptation.runway,
            neutral_average = settings.engine.adaptation.neutral_average,
            "Adaptation policy"
        );

        let engine = Engine::new(Arc::new(gateway), settings.engine.clone(), settings.model.clone(), settings.max_tokens);
        Self {
            store: Store::new(),
            engine,
            request_timeout: settings.request_timeout,
            model_configured,
        }
    }

    /// State over an arbitrary gateway (tests, alternative providers).
    pub fn with_gateway(gateway: Arc<dyn ModelGateway>, config: EngineConfig, model: &str, request_timeout: Duration) -> Self {
        Self {
            store: Store::new(),
            engine: Engine::new(gateway, config, model, 4096),
            request_timeout,
            model_configured: true,
        }
    }
}
