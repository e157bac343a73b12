//! Analysis fetch strategies
//!
//! The orchestrator tries these in order. The primary strategy asks for a complete
//! analysis and fails on anything less; the fallback accepts partial content and fills
//! the gaps with fixed defaults.

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use super::ClientConfig;
use super::progress::StepReporter;
use crate::model::{
    AnalysisExchange, AnalysisRequest, PartialAnalysisExchange, ProcessingMetadata,
    ProcessingStep,
};

const INITIAL_ANALYSIS_PATH: &str = "/api/initial-analysis";
const BASIC_ANALYSIS_PATH: &str = "/api/analysis";

#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    #[error("Invalid endpoint: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

/// One way of obtaining an analysis for a request
#[async_trait]
pub trait AnalysisStrategy: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(
        &self,
        request: &AnalysisRequest,
        reporter: &StepReporter,
    ) -> Result<AnalysisExchange, StrategyError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResponseShape {
    /// Every field must be present
    Complete,
    /// Missing or unreadable content is replaced with defaults
    Partial,
}

/// Strategy backed by one of the server's analysis endpoints
pub struct HttpAnalysisStrategy {
    name: &'static str,
    client: Client,
    url: Url,
    shape: ResponseShape,
}

impl HttpAnalysisStrategy {
    pub fn primary(config: &ClientConfig) -> Result<Self, StrategyError> {
        Self::build("initial-analysis", config, INITIAL_ANALYSIS_PATH, ResponseShape::Complete)
    }

    pub fn fallback(config: &ClientConfig) -> Result<Self, StrategyError> {
        Self::build("basic-analysis", config, BASIC_ANALYSIS_PATH, ResponseShape::Partial)
    }

    fn build(
        name: &'static str,
        config: &ClientConfig,
        path: &str,
        shape: ResponseShape,
    ) -> Result<Self, StrategyError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            name,
            client,
            url: config.endpoint(path)?,
            shape,
        })
    }

    fn decode(&self, body: String) -> Result<AnalysisExchange, StrategyError> {
        match self.shape {
            ResponseShape::Complete => serde_json::from_str(&body)
                .map_err(|e| StrategyError::ParseError(format!("Incomplete analysis: {}", e))),
            ResponseShape::Partial => {
                let partial = serde_json::from_str::<PartialAnalysisExchange>(&body)
                    .unwrap_or_else(|e| {
                        tracing::warn!(
                            strategy = self.name,
                            error = %e,
                            "Unreadable analysis response, using default content"
                        );
                        PartialAnalysisExchange {
                            raw_response: body,
                            ..Default::default()
                        }
                    });
                Ok(partial.into_exchange())
            }
        }
    }
}

#[async_trait]
impl AnalysisStrategy for HttpAnalysisStrategy {
    fn name(&self) -> &str {
        self.name
    }

    async fn fetch(
        &self,
        request: &AnalysisRequest,
        reporter: &StepReporter,
    ) -> Result<AnalysisExchange, StrategyError> {
        tracing::debug!(strategy = self.name, url = %self.url, "Requesting analysis");

        reporter.advance(
            ProcessingStep::SendingRequest,
            ProcessingMetadata {
                provider: Some(request.model.clone()),
                ..Default::default()
            },
        );

        let response = self
            .client
            .post(self.url.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StrategyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        reporter.advance(
            ProcessingStep::ReceivingResponse,
            ProcessingMetadata {
                content_length: Some(body.len() as u64),
                ..Default::default()
            },
        );

        self.decode(body)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::CannedServer;
    use super::*;
    use crate::client::{ProgressEmitter, SessionStore};
    use crate::model::{DEFAULT_FOLLOWUP_QUESTIONS, DEFAULT_SUMMARY, DocumentMetadata};

    fn request() -> AnalysisRequest {
        AnalysisRequest {
            source: "Dearly beloved brethren".to_string(),
            metadata: DocumentMetadata::default(),
            perspective: "social historian".to_string(),
            model: "claude".to_string(),
        }
    }

    fn reporter() -> (SessionStore, StepReporter) {
        let store = SessionStore::default();
        let reporter = StepReporter::new(store.clone(), ProgressEmitter::new());
        (store, reporter)
    }

    #[actix_web::test]
    async fn test_primary_decodes_complete_exchange() {
        let server = CannedServer::new(&[(
            INITIAL_ANALYSIS_PATH,
            200,
            r#"{"analysis":{"summary":"S","analysis":"A","followupQuestions":["Q"]},"rawPrompt":"p","rawResponse":"r"}"#,
        )]);
        let strategy = HttpAnalysisStrategy::primary(&server.start()).unwrap();
        let (store, reporter) = reporter();

        let exchange = strategy.fetch(&request(), &reporter).await.unwrap();

        assert_eq!(exchange.analysis.summary, "S");
        assert_eq!(exchange.raw_prompt, "p");
        assert_eq!(
            store.snapshot().processing.step,
            ProcessingStep::ReceivingResponse
        );
    }

    #[actix_web::test]
    async fn test_primary_rejects_error_status() {
        let server = CannedServer::new(&[(INITIAL_ANALYSIS_PATH, 500, r#"{"error":"x"}"#)]);
        let strategy = HttpAnalysisStrategy::primary(&server.start()).unwrap();
        let (store, reporter) = reporter();

        let result = strategy.fetch(&request(), &reporter).await;

        assert!(matches!(result, Err(StrategyError::Status { status: 500, .. })));
        assert_eq!(store.snapshot().processing.step, ProcessingStep::SendingRequest);
    }

    #[actix_web::test]
    async fn test_primary_rejects_partial_body() {
        let server = CannedServer::new(&[(INITIAL_ANALYSIS_PATH, 200, r#"{"analysis":{}}"#)]);
        let strategy = HttpAnalysisStrategy::primary(&server.start()).unwrap();
        let (_, reporter) = reporter();

        let result = strategy.fetch(&request(), &reporter).await;

        assert!(matches!(result, Err(StrategyError::ParseError(_))));
    }

    #[actix_web::test]
    async fn test_fallback_fills_defaults_for_empty_body() {
        let server = CannedServer::new(&[(BASIC_ANALYSIS_PATH, 200, "{}")]);
        let strategy = HttpAnalysisStrategy::fallback(&server.start()).unwrap();
        let (_, reporter) = reporter();

        let exchange = strategy.fetch(&request(), &reporter).await.unwrap();

        assert_eq!(exchange.analysis.summary, DEFAULT_SUMMARY);
        assert_eq!(
            exchange.analysis.followup_questions,
            DEFAULT_FOLLOWUP_QUESTIONS
        );
    }

    #[actix_web::test]
    async fn test_fallback_fills_defaults_for_empty_analysis() {
        let server = CannedServer::new(&[(
            BASIC_ANALYSIS_PATH,
            200,
            r#"{"analysis":{"summary":"  "},"rawPrompt":"p","rawResponse":"r"}"#,
        )]);
        let strategy = HttpAnalysisStrategy::fallback(&server.start()).unwrap();
        let (_, reporter) = reporter();

        let exchange = strategy.fetch(&request(), &reporter).await.unwrap();

        assert_eq!(exchange.analysis, crate::model::AnalysisResult::default());
        assert_eq!(exchange.raw_prompt, "p");
        assert_eq!(server.hits(BASIC_ANALYSIS_PATH), 1);
    }

    #[actix_web::test]
    async fn test_fallback_recovers_from_unreadable_body() {
        let server = CannedServer::new(&[(BASIC_ANALYSIS_PATH, 200, "not json at all")]);
        let strategy = HttpAnalysisStrategy::fallback(&server.start()).unwrap();
        let (_, reporter) = reporter();

        let exchange = strategy.fetch(&request(), &reporter).await.unwrap();

        assert_eq!(exchange.analysis.summary, DEFAULT_SUMMARY);
        assert_eq!(exchange.raw_response, "not json at all");
    }

    #[actix_web::test]
    async fn test_fallback_error_status_is_terminal() {
        let server = CannedServer::new(&[(BASIC_ANALYSIS_PATH, 503, "")]);
        let strategy = HttpAnalysisStrategy::fallback(&server.start()).unwrap();
        let (_, reporter) = reporter();

        let result = strategy.fetch(&request(), &reporter).await;

        assert!(matches!(result, Err(StrategyError::Status { status: 503, .. })));
    }
}
