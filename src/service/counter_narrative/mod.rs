//! Counter-narrative generation service

use crate::model::{AnalysisRequest, CounterNarrativeResponse};
use crate::service::cache::{AnalysisCache, CacheError};
use crate::service::cache_keys::exchange_cache_key;
use crate::service::llm::{LlmError, LlmRouter, ProviderKind};

pub mod prompts;

use prompts::{COUNTER_NARRATIVE_SYSTEM_PROMPT, build_counter_narrative_prompt};

const KIND_COUNTER_NARRATIVE: &str = "counter-narrative";

/// Model flag selecting OpenAI; every other value goes to Anthropic
const OPENAI_FLAG: &str = "gpt";

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CounterNarrativeError {
    #[error("Invalid counter-narrative request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

pub struct CounterNarrativeService {
    llm: LlmRouter,
    cache: Option<AnalysisCache>,
}

impl CounterNarrativeService {
    pub fn new(llm: LlmRouter, cache: Option<AnalysisCache>) -> Self {
        Self { llm, cache }
    }

    /// Provider for a counter-narrative request's model flag
    pub fn provider_for(model: &str) -> ProviderKind {
        if model == OPENAI_FLAG {
            ProviderKind::OpenAi
        } else {
            ProviderKind::Anthropic
        }
    }

    pub async fn generate(
        &self,
        request: &AnalysisRequest,
    ) -> Result<CounterNarrativeResponse, CounterNarrativeError> {
        request
            .validate()
            .map_err(CounterNarrativeError::InvalidRequest)?;

        let provider = Self::provider_for(&request.model);
        let prompt = build_counter_narrative_prompt(request);
        let cache_key = exchange_cache_key(
            KIND_COUNTER_NARRATIVE,
            provider.as_str(),
            COUNTER_NARRATIVE_SYSTEM_PROMPT,
            &prompt,
        );

        if let Some(cache) = &self.cache {
            match cache.get_counter_narrative(&cache_key).await {
                Ok(cached) => return Ok(cached),
                Err(CacheError::Miss(_)) => {}
                Err(e) => tracing::warn!(error = %e, "Counter-narrative cache lookup failed"),
            }
        }

        let completion = self
            .llm
            .complete_with(provider, COUNTER_NARRATIVE_SYSTEM_PROMPT, &prompt)
            .await?;

        let response = CounterNarrativeResponse {
            narrative: completion.text.trim().to_string(),
            raw_prompt: prompt,
            raw_response: completion.text,
        };

        if let Some(cache) = &self.cache
            && let Err(e) = cache.set_counter_narrative(&cache_key, &response).await
        {
            tracing::warn!(error = %e, "Failed to cache counter-narrative");
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::{DocumentMetadata, ProviderSettings};
    use crate::service::llm::testing::ScriptedProvider;

    fn request(model: &str) -> AnalysisRequest {
        AnalysisRequest {
            source: "The harvest was bountiful and all rejoiced.".to_string(),
            metadata: DocumentMetadata::default(),
            perspective: "peasant".to_string(),
            model: model.to_string(),
        }
    }

    #[test]
    fn test_only_exact_gpt_flag_selects_openai() {
        assert_eq!(CounterNarrativeService::provider_for("gpt"), ProviderKind::OpenAi);
        assert_eq!(CounterNarrativeService::provider_for("gpt-4o"), ProviderKind::Anthropic);
        assert_eq!(CounterNarrativeService::provider_for(""), ProviderKind::Anthropic);
    }

    #[tokio::test]
    async fn test_dispatches_to_provider_by_flag() {
        let openai = Arc::new(ScriptedProvider::replying(ProviderKind::OpenAi, " From OpenAI "));
        let anthropic = Arc::new(ScriptedProvider::replying(ProviderKind::Anthropic, "From Claude"));
        let router = LlmRouter::new(ProviderSettings::default())
            .with_provider(openai.clone())
            .with_provider(anthropic.clone());
        let service = CounterNarrativeService::new(router, None);

        let gpt = service.generate(&request("gpt")).await.unwrap();
        let claude = service.generate(&request("claude-3-opus")).await.unwrap();

        assert_eq!(gpt.narrative, "From OpenAI");
        assert_eq!(gpt.raw_response, " From OpenAI ");
        assert_eq!(claude.narrative, "From Claude");
        assert_eq!(
            anthropic.last_request().unwrap().model,
            ProviderSettings::default().anthropic_model
        );
        assert!(openai.last_request().unwrap().prompt.contains("peasant"));
    }

    #[tokio::test]
    async fn test_unconfigured_provider_is_an_error() {
        let service = CounterNarrativeService::new(LlmRouter::new(ProviderSettings::default()), None);

        let result = service.generate(&request("gpt")).await;

        assert!(matches!(
            result,
            Err(CounterNarrativeError::Llm(LlmError::ProviderNotConfigured(ProviderKind::OpenAi)))
        ));
    }
}
