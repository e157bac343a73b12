//! Application state and service initialization
//!
//! This module centralizes all service initialization and dependency injection,
//! making it easier to manage the application lifecycle and test services.

use actix_web::web;

use crate::model::Config;
use crate::service::llm::LlmError;
use crate::service::{AnalysisCache, AnalysisService, CounterNarrativeService, LlmRouter};

/// Application state containing all services and shared resources
pub struct AppState {
    /// Enabled LLM providers
    pub llm_router: web::Data<LlmRouter>,
    /// Redis cache (optional)
    pub cache: web::Data<Option<AnalysisCache>>,
    pub analysis_service: web::Data<AnalysisService>,
    pub counter_narrative_service: web::Data<CounterNarrativeService>,
}

impl AppState {
    /// Initialize all services and build application state
    ///
    /// This performs:
    /// 1. LLM provider initialization (at least one API key is required)
    /// 2. Redis cache initialization (optional)
    /// 3. Service construction
    pub async fn new(config: Config) -> Result<Self, AppError> {
        let llm_router = LlmRouter::from_env(config.providers.clone()).map_err(AppError::Llm)?;

        if llm_router.enabled().is_empty() {
            return Err(AppError::MissingConfig(
                "OPENAI_API_KEY, ANTHROPIC_API_KEY or GEMINI_API_KEY",
            ));
        }

        // Optional - will log warning if Redis is unavailable
        let cache = match AnalysisCache::new().await {
            Ok(cache) => {
                tracing::info!("Redis cache enabled");
                Some(cache)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Redis cache unavailable, running without cache");
                None
            }
        };

        let analysis_service =
            AnalysisService::new(llm_router.clone(), cache.clone(), config.analysis);
        let counter_narrative_service =
            CounterNarrativeService::new(llm_router.clone(), cache.clone());

        Ok(Self {
            llm_router: web::Data::new(llm_router),
            cache: web::Data::new(cache),
            analysis_service: web::Data::new(analysis_service),
            counter_narrative_service: web::Data::new(counter_narrative_service),
        })
    }
}

/// Application-level errors
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AppError {
    /// Missing required configuration
    #[error("Missing required configuration: {0}")]
    MissingConfig(&'static str),

    /// A provider client could not be created
    #[error("LLM provider initialization failed: {0}")]
    Llm(LlmError),
}
