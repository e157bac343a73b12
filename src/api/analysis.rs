//! REST API endpoints for source analysis

use actix_web::{HttpResponse, post, web};

use crate::api::error::{ApiError, ErrorResponse};
use crate::model::{AnalysisExchange, AnalysisRequest, CounterNarrativeResponse, PartialAnalysisExchange};
use crate::service::{AnalysisService, CounterNarrativeService};

/// Full analysis of a primary source
#[utoipa::path(
    post,
    path = "/api/initial-analysis",
    request_body = AnalysisRequest,
    responses(
        (status = 200, description = "Analysis generated", body = AnalysisExchange),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 502, description = "Provider failed or replied with an unusable analysis", body = ErrorResponse),
        (status = 503, description = "No provider configured for the model", body = ErrorResponse)
    ),
    tag = "analysis"
)]
#[post("/api/initial-analysis")]
pub async fn initial_analysis(
    service: web::Data<AnalysisService>,
    body: web::Json<AnalysisRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner();

    tracing::info!(
        model = %request.model,
        perspective = %request.perspective,
        source_length = request.source.len(),
        "Initial analysis requested"
    );

    let exchange = service.initial_analysis(&request).await?;
    Ok(HttpResponse::Ok().json(exchange))
}

/// Lightweight analysis; the reply may be partial
#[utoipa::path(
    post,
    path = "/api/analysis",
    request_body = AnalysisRequest,
    responses(
        (status = 200, description = "Analysis generated (fields may be missing)", body = PartialAnalysisExchange),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 502, description = "Provider failed", body = ErrorResponse),
        (status = 503, description = "No provider configured for the model", body = ErrorResponse)
    ),
    tag = "analysis"
)]
#[post("/api/analysis")]
pub async fn basic_analysis(
    service: web::Data<AnalysisService>,
    body: web::Json<AnalysisRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner();

    tracing::info!(model = %request.model, "Basic analysis requested");

    let exchange = service.basic_analysis(&request).await?;
    Ok(HttpResponse::Ok().json(exchange))
}

/// Counter-narrative to a primary source
#[utoipa::path(
    post,
    path = "/api/counter-narrative",
    request_body = AnalysisRequest,
    responses(
        (status = 200, description = "Counter-narrative generated", body = CounterNarrativeResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 502, description = "Provider failed", body = ErrorResponse),
        (status = 503, description = "Provider not configured", body = ErrorResponse)
    ),
    tag = "analysis"
)]
#[post("/api/counter-narrative")]
pub async fn counter_narrative(
    service: web::Data<CounterNarrativeService>,
    body: web::Json<AnalysisRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner();

    tracing::info!(model = %request.model, "Counter-narrative requested");

    let response = service.generate(&request).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Configure analysis routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(initial_analysis)
        .service(basic_analysis)
        .service(counter_narrative);
}
