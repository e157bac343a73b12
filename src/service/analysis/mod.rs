//! Primary-source analysis service
//!
//! Backs both analysis endpoints: the full initial analysis, which must produce a
//! complete result, and the lightweight analysis, which salvages whatever the model
//! returns.

use serde::{Serialize, de::DeserializeOwned};

use crate::model::{
    AnalysisExchange, AnalysisRequest, AnalysisSettings, PartialAnalysisExchange,
};
use crate::service::cache::{AnalysisCache, CacheError};
use crate::service::cache_keys::{analysis_cache_key, request_fingerprint};
use crate::service::llm::{LlmError, LlmRouter};

pub mod parse;
pub mod prompts;

use parse::{parse_lenient, parse_strict, truncate_source};
use prompts::{
    BASIC_ANALYSIS_SYSTEM_PROMPT, INITIAL_ANALYSIS_SYSTEM_PROMPT, build_basic_analysis_prompt,
    build_initial_analysis_prompt,
};

const KIND_INITIAL: &str = "initial";
const KIND_BASIC: &str = "basic";

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AnalysisServiceError {
    #[error("Invalid analysis request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Model reply could not be interpreted: {0}")]
    MalformedResponse(String),
}

/// Service for LLM analyses of primary sources
pub struct AnalysisService {
    llm: LlmRouter,
    cache: Option<AnalysisCache>,
    settings: AnalysisSettings,
}

impl AnalysisService {
    pub fn new(llm: LlmRouter, cache: Option<AnalysisCache>, settings: AnalysisSettings) -> Self {
        tracing::info!(
            max_source_chars = settings.max_source_chars,
            cache = cache.is_some(),
            "Analysis service initialized"
        );
        Self {
            llm,
            cache,
            settings,
        }
    }

    /// Full analysis; fails when the model reply is not a complete analysis
    pub async fn initial_analysis(
        &self,
        request: &AnalysisRequest,
    ) -> Result<AnalysisExchange, AnalysisServiceError> {
        request
            .validate()
            .map_err(AnalysisServiceError::InvalidRequest)?;

        let source = truncate_source(&request.source, self.settings.max_source_chars);
        let prompt = build_initial_analysis_prompt(request, &source);
        let cache_key =
            self.cache_key(KIND_INITIAL, INITIAL_ANALYSIS_SYSTEM_PROMPT, &prompt, request);

        if let Some(cached) = self.cached::<AnalysisExchange>(&cache_key).await {
            tracing::debug!(
                request = %request_fingerprint(request),
                "Initial analysis served from cache"
            );
            return Ok(cached);
        }

        let completion = self
            .llm
            .complete_for_model(&request.model, INITIAL_ANALYSIS_SYSTEM_PROMPT, &prompt)
            .await?;

        let analysis = parse_strict(&completion.text).map_err(|reason| {
            tracing::warn!(
                request = %request_fingerprint(request),
                provider = %completion.provider,
                reason = %reason,
                "Initial analysis reply rejected"
            );
            AnalysisServiceError::MalformedResponse(reason)
        })?;

        let exchange = AnalysisExchange {
            analysis,
            raw_prompt: prompt,
            raw_response: completion.text,
            content_length: Some(request.source.chars().count() as u64),
        };

        self.store(&cache_key, &exchange).await;

        Ok(exchange)
    }

    /// Lightweight analysis; malformed replies yield a partial (possibly empty) analysis
    pub async fn basic_analysis(
        &self,
        request: &AnalysisRequest,
    ) -> Result<PartialAnalysisExchange, AnalysisServiceError> {
        request
            .validate()
            .map_err(AnalysisServiceError::InvalidRequest)?;

        let source = truncate_source(&request.source, self.settings.max_source_chars);
        let prompt = build_basic_analysis_prompt(request, &source);
        let cache_key = self.cache_key(KIND_BASIC, BASIC_ANALYSIS_SYSTEM_PROMPT, &prompt, request);

        if let Some(cached) = self.cached::<PartialAnalysisExchange>(&cache_key).await {
            return Ok(cached);
        }

        let completion = self
            .llm
            .complete_for_model(&request.model, BASIC_ANALYSIS_SYSTEM_PROMPT, &prompt)
            .await?;

        let partial = parse_lenient(&completion.text);
        if !partial.is_complete() {
            tracing::debug!(
                request = %request_fingerprint(request),
                "Basic analysis reply is partial"
            );
        }

        let exchange = PartialAnalysisExchange {
            analysis: Some(partial),
            raw_prompt: prompt,
            raw_response: completion.text,
        };

        self.store(&cache_key, &exchange).await;

        Ok(exchange)
    }

    fn cache_key(
        &self,
        kind: &str,
        system: &str,
        prompt: &str,
        request: &AnalysisRequest,
    ) -> String {
        let (_, model_id) = self.llm.resolve(&request.model);
        analysis_cache_key(kind, &model_id, system, prompt, request.source.chars().count())
    }

    async fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let cache = self.cache.as_ref()?;
        match cache.get_analysis(key).await {
            Ok(value) => Some(value),
            Err(CacheError::Miss(_)) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Analysis cache lookup failed");
                None
            }
        }
    }

    async fn store<T: Serialize>(&self, key: &str, value: &T) {
        if let Some(cache) = &self.cache
            && let Err(e) = cache.set_analysis(key, value).await
        {
            tracing::warn!(error = %e, "Failed to cache analysis");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::{DocumentMetadata, ProviderSettings};
    use crate::service::llm::ProviderKind;
    use crate::service::llm::testing::ScriptedProvider;

    fn service(provider: ScriptedProvider, max_source_chars: usize) -> AnalysisService {
        let router =
            LlmRouter::new(ProviderSettings::default()).with_provider(Arc::new(provider));
        AnalysisService::new(router, None, AnalysisSettings { max_source_chars })
    }

    fn request() -> AnalysisRequest {
        AnalysisRequest {
            source: "To the honourable the Commons of England in Parliament assembled".to_string(),
            metadata: DocumentMetadata {
                title: Some("Petition of the Levellers".to_string()),
                date: Some("1648".to_string()),
                ..Default::default()
            },
            perspective: "political theorist".to_string(),
            model: "gpt-4o".to_string(),
        }
    }

    #[tokio::test]
    async fn test_initial_analysis_returns_exchange() {
        let reply = r#"```json
{"summary": "A radical petition.", "analysis": "The Levellers argue...", "followupQuestions": ["Who signed it?"]}
```"#;
        let service = service(ScriptedProvider::replying(ProviderKind::OpenAi, reply), 10_000);

        let exchange = service.initial_analysis(&request()).await.unwrap();

        assert_eq!(exchange.analysis.summary, "A radical petition.");
        assert_eq!(exchange.raw_response, reply);
        assert!(exchange.raw_prompt.contains("political theorist"));
        assert_eq!(exchange.content_length, Some(request().source.chars().count() as u64));
    }

    #[tokio::test]
    async fn test_initial_analysis_rejects_prose_reply() {
        let service = service(
            ScriptedProvider::replying(ProviderKind::OpenAi, "I think this is a petition."),
            10_000,
        );

        let result = service.initial_analysis(&request()).await;

        assert!(matches!(result, Err(AnalysisServiceError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn test_blank_source_never_reaches_provider() {
        let provider = Arc::new(ScriptedProvider::replying(ProviderKind::OpenAi, "{}"));
        let router = LlmRouter::new(ProviderSettings::default()).with_provider(provider.clone());
        let service = AnalysisService::new(router, None, AnalysisSettings::default());

        let mut req = request();
        req.source = "   ".to_string();

        let result = service.initial_analysis(&req).await;

        assert!(matches!(result, Err(AnalysisServiceError::InvalidRequest(_))));
        assert!(provider.last_request().is_none());
    }

    #[tokio::test]
    async fn test_basic_analysis_salvages_partial_reply() {
        let service = service(
            ScriptedProvider::replying(ProviderKind::OpenAi, r#"{"summary": "Short."}"#),
            10_000,
        );

        let exchange = service.basic_analysis(&request()).await.unwrap();
        let analysis = exchange.analysis.unwrap();

        assert_eq!(analysis.summary.as_deref(), Some("Short."));
        assert!(analysis.analysis_body.is_none());
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let service = service(
            ScriptedProvider::failing(ProviderKind::OpenAi, "rate limited"),
            10_000,
        );

        let result = service.basic_analysis(&request()).await;

        assert!(matches!(result, Err(AnalysisServiceError::Llm(_))));
    }

    #[test]
    fn test_sources_differing_past_truncation_get_distinct_cache_keys() {
        let service = service(ScriptedProvider::replying(ProviderKind::OpenAi, "{}"), 10);
        let short = request();
        let mut long = request();
        long.source.push_str(" and so forth");

        let short_prompt = build_initial_analysis_prompt(
            &short,
            &truncate_source(&short.source, 10),
        );
        let long_prompt =
            build_initial_analysis_prompt(&long, &truncate_source(&long.source, 10));
        assert_eq!(short_prompt, long_prompt);

        assert_ne!(
            service.cache_key(KIND_INITIAL, INITIAL_ANALYSIS_SYSTEM_PROMPT, &short_prompt, &short),
            service.cache_key(KIND_INITIAL, INITIAL_ANALYSIS_SYSTEM_PROMPT, &long_prompt, &long)
        );
    }

    #[tokio::test]
    async fn test_long_source_is_truncated_in_prompt() {
        let provider = Arc::new(ScriptedProvider::replying(
            ProviderKind::OpenAi,
            r#"{"summary": "s", "analysis": "a"}"#,
        ));
        let router = LlmRouter::new(ProviderSettings::default()).with_provider(provider.clone());
        let service = AnalysisService::new(router, None, AnalysisSettings { max_source_chars: 10 });

        service.initial_analysis(&request()).await.unwrap();

        let prompt = provider.last_request().unwrap().prompt;
        assert!(prompt.contains("[... truncated ...]"));
        assert!(!prompt.contains("Parliament assembled"));
    }
}
