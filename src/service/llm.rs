//! Shared LLM client and provider routing
//!
//! Wraps the rig-core provider clients behind a single `CompletionProvider` seam and
//! routes each request to a provider based on its model identifier.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::{anthropic, gemini, openai};
use serde::{Deserialize, Serialize};

use crate::model::ProviderSettings;

const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
const ENV_ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[serde(alias = "gpt")]
    OpenAi,
    #[serde(alias = "claude")]
    Anthropic,
    Gemini,
}

impl ProviderKind {
    /// Infer the provider from a model identifier, if it names one
    pub fn for_model(model: &str) -> Option<ProviderKind> {
        let model = model.trim().to_ascii_lowercase();
        if model.starts_with("gpt")
            || model.starts_with("o1")
            || model.starts_with("o3")
            || model.starts_with("o4")
            || model == "openai"
        {
            Some(ProviderKind::OpenAi)
        } else if model.starts_with("claude") || model == "anthropic" {
            Some(ProviderKind::Anthropic)
        } else if model.starts_with("gemini") {
            Some(ProviderKind::Gemini)
        } else {
            None
        }
    }

    /// Whether `model` is a bare provider flag rather than a concrete model id
    fn is_flag(model: &str) -> bool {
        matches!(
            model.trim().to_ascii_lowercase().as_str(),
            "" | "gpt" | "openai" | "claude" | "anthropic" | "gemini"
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Gemini => "gemini",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LlmError {
    #[error("No API key configured for provider {0}")]
    ProviderNotConfigured(ProviderKind),

    #[error("Failed to create {provider} client: {message}")]
    ClientInit {
        provider: ProviderKind,
        message: String,
    },

    #[error("{provider} completion failed: {message}")]
    Completion {
        provider: ProviderKind,
        message: String,
    },

    #[error("{0} returned an empty completion")]
    EmptyResponse(ProviderKind),
}

/// A single prompt/response exchange
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub system: String,
    pub prompt: String,
    pub max_tokens: u64,
    pub temperature: f64,
}

/// Provider seam; one implementation per hosted LLM API
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

enum RigClient {
    OpenAi(openai::Client),
    Anthropic(anthropic::Client),
    Gemini(gemini::Client),
}

/// rig-core backed provider
pub struct RigProvider {
    client: RigClient,
}

impl RigProvider {
    pub fn openai(api_key: &str) -> Self {
        Self {
            client: RigClient::OpenAi(openai::Client::new(api_key)),
        }
    }

    pub fn anthropic(api_key: &str) -> Result<Self, LlmError> {
        let client = anthropic::Client::builder(api_key)
            .build()
            .map_err(|e| LlmError::ClientInit {
                provider: ProviderKind::Anthropic,
                message: e.to_string(),
            })?;
        Ok(Self {
            client: RigClient::Anthropic(client),
        })
    }

    pub fn gemini(api_key: &str) -> Result<Self, LlmError> {
        let client = gemini::Client::builder(api_key)
            .build()
            .map_err(|e| LlmError::ClientInit {
                provider: ProviderKind::Gemini,
                message: e.to_string(),
            })?;
        Ok(Self {
            client: RigClient::Gemini(client),
        })
    }
}

#[async_trait]
impl CompletionProvider for RigProvider {
    fn kind(&self) -> ProviderKind {
        match self.client {
            RigClient::OpenAi(_) => ProviderKind::OpenAi,
            RigClient::Anthropic(_) => ProviderKind::Anthropic,
            RigClient::Gemini(_) => ProviderKind::Gemini,
        }
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let provider = self.kind();
        let to_error = |e: rig::completion::PromptError| LlmError::Completion {
            provider,
            message: e.to_string(),
        };

        let text = match &self.client {
            RigClient::OpenAi(client) => {
                let agent = client
                    .agent(&request.model)
                    .preamble(&request.system)
                    .max_tokens(request.max_tokens)
                    .temperature(request.temperature)
                    .build();
                agent.prompt(request.prompt.as_str()).await.map_err(to_error)?
            }
            RigClient::Anthropic(client) => {
                let agent = client
                    .agent(&request.model)
                    .preamble(&request.system)
                    .max_tokens(request.max_tokens)
                    .temperature(request.temperature)
                    .build();
                agent.prompt(request.prompt.as_str()).await.map_err(to_error)?
            }
            RigClient::Gemini(client) => {
                let agent = client
                    .agent(&request.model)
                    .preamble(&request.system)
                    .max_tokens(request.max_tokens)
                    .temperature(request.temperature)
                    .build();
                agent.prompt(request.prompt.as_str()).await.map_err(to_error)?
            }
        };

        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse(provider));
        }
        Ok(text)
    }
}

/// Completion text plus where it came from
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub provider: ProviderKind,
    pub model: String,
}

/// Routes completions to the enabled providers
#[derive(Clone)]
pub struct LlmRouter {
    providers: HashMap<ProviderKind, Arc<dyn CompletionProvider>>,
    settings: ProviderSettings,
}

impl LlmRouter {
    /// Create a router with no providers enabled
    pub fn new(settings: ProviderSettings) -> Self {
        Self {
            providers: HashMap::new(),
            settings,
        }
    }

    /// Enable every provider whose API key is present in the environment
    pub fn from_env(settings: ProviderSettings) -> Result<Self, LlmError> {
        let mut router = Self::new(settings);

        if let Ok(key) = std::env::var(ENV_OPENAI_API_KEY) {
            router = router.with_provider(Arc::new(RigProvider::openai(&key)));
        }
        if let Ok(key) = std::env::var(ENV_ANTHROPIC_API_KEY) {
            router = router.with_provider(Arc::new(RigProvider::anthropic(&key)?));
        }
        if let Ok(key) = std::env::var(ENV_GEMINI_API_KEY) {
            router = router.with_provider(Arc::new(RigProvider::gemini(&key)?));
        }

        tracing::info!(providers = ?router.enabled(), "LLM router initialized");

        Ok(router)
    }

    pub fn with_provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.providers.insert(provider.kind(), provider);
        self
    }

    /// Enabled providers in a stable order
    pub fn enabled(&self) -> Vec<ProviderKind> {
        let mut kinds: Vec<_> = self.providers.keys().copied().collect();
        kinds.sort_by_key(|k| k.as_str());
        kinds
    }

    /// Resolve a model identifier into a provider and concrete model id
    pub fn resolve(&self, model: &str) -> (ProviderKind, String) {
        match ProviderKind::for_model(model) {
            Some(kind) if !ProviderKind::is_flag(model) => (kind, model.trim().to_string()),
            Some(kind) => (kind, self.settings.default_model_for(kind).to_string()),
            None => {
                let kind = self.settings.default_provider;
                (kind, self.settings.default_model_for(kind).to_string())
            }
        }
    }

    /// Complete with whichever provider `model` resolves to
    pub async fn complete_for_model(
        &self,
        model: &str,
        system: &str,
        prompt: &str,
    ) -> Result<Completion, LlmError> {
        let (kind, model) = self.resolve(model);
        self.complete(kind, model, system, prompt).await
    }

    /// Complete with a specific provider's configured default model
    pub async fn complete_with(
        &self,
        kind: ProviderKind,
        system: &str,
        prompt: &str,
    ) -> Result<Completion, LlmError> {
        let model = self.settings.default_model_for(kind).to_string();
        self.complete(kind, model, system, prompt).await
    }

    async fn complete(
        &self,
        kind: ProviderKind,
        model: String,
        system: &str,
        prompt: &str,
    ) -> Result<Completion, LlmError> {
        let provider = self
            .providers
            .get(&kind)
            .ok_or(LlmError::ProviderNotConfigured(kind))?;

        let request = CompletionRequest {
            model,
            system: system.to_string(),
            prompt: prompt.to_string(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };

        let start_time = std::time::Instant::now();

        tracing::debug!(
            provider = %kind,
            model = %request.model,
            prompt_length = request.prompt.len(),
            "Initiating LLM completion"
        );

        match provider.complete(&request).await {
            Ok(text) => {
                tracing::info!(
                    provider = %kind,
                    model = %request.model,
                    elapsed_ms = start_time.elapsed().as_millis(),
                    prompt_length = request.prompt.len(),
                    response_length = text.len(),
                    "LLM completion succeeded"
                );
                Ok(Completion {
                    text,
                    provider: kind,
                    model: request.model,
                })
            }
            Err(e) => {
                tracing::error!(
                    provider = %kind,
                    model = %request.model,
                    elapsed_ms = start_time.elapsed().as_millis(),
                    prompt_length = request.prompt.len(),
                    error = %e,
                    "LLM completion failed"
                );
                Err(e)
            }
        }
    }
}
