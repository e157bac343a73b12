//! Unified API error handling
//!
//! This module provides a consistent error response format across all API endpoints.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::service::analysis::AnalysisServiceError;
use crate::service::counter_narrative::CounterNarrativeError;
use crate::service::llm::LlmError;

/// Standard error response format
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error type/code
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Unique request ID for tracing
    pub request_id: String,
}

/// Unified API error type
///
/// All API endpoints should return `Result<T, ApiError>` for consistent error handling.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ApiError {
    /// Bad request / validation error (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// No provider configured for the requested model (503)
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// LLM provider failed or replied with something unusable (502)
    #[error("External service error: {0}")]
    ExternalService(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::ExternalService(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error_type = match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unavailable(_) => "provider_unavailable",
            ApiError::ExternalService(_) => "external_service_error",
        };

        tracing::error!(
            error_type = error_type,
            status = status.as_u16(),
            message = %self,
            "API error"
        );

        HttpResponse::build(status).json(ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
            request_id: Uuid::new_v4().to_string(),
        })
    }
}

// ============================================================================
// From conversions for service errors
// ============================================================================

impl From<LlmError> for ApiError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::ProviderNotConfigured(_) => ApiError::Unavailable(err.to_string()),
            _ => ApiError::ExternalService(err.to_string()),
        }
    }
}

impl From<AnalysisServiceError> for ApiError {
    fn from(err: AnalysisServiceError) -> Self {
        match err {
            AnalysisServiceError::InvalidRequest(msg) => ApiError::BadRequest(msg),
            AnalysisServiceError::Llm(e) => e.into(),
            AnalysisServiceError::MalformedResponse(msg) => ApiError::ExternalService(msg),
        }
    }
}

impl From<CounterNarrativeError> for ApiError {
    fn from(err: CounterNarrativeError) -> Self {
        match err {
            CounterNarrativeError::InvalidRequest(msg) => ApiError::BadRequest(msg),
            CounterNarrativeError::Llm(e) => e.into(),
        }
    }
}
