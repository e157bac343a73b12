pub mod analysis;
pub mod error;
pub mod health;
pub mod openapi;

use actix_web::{ResponseError, error::InternalError, web};

use error::ApiError;

/// JSON extractor config that reports malformed bodies in the API error format
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let message = err.to_string();
        let response = ApiError::BadRequest(message).error_response();
        InternalError::from_response(err, response).into()
    })
}

/// Configure all routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .configure(analysis::configure)
        .configure(health::configure)
        .configure(openapi::configure);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, http::StatusCode, http::header, test};

    use super::*;
    use crate::model::{AnalysisSettings, ProviderSettings};
    use crate::service::llm::ProviderKind;
    use crate::service::llm::testing::ScriptedProvider;
    use crate::service::{AnalysisService, LlmRouter};

    #[actix_web::test]
    async fn test_malformed_json_body_is_bad_request() {
        let router = LlmRouter::new(ProviderSettings::default())
            .with_provider(Arc::new(ScriptedProvider::replying(ProviderKind::OpenAi, "{}")));
        let service = web::Data::new(AnalysisService::new(
            router,
            None,
            AnalysisSettings::default(),
        ));
        let app = test::init_service(App::new().app_data(service).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/initial-analysis")
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .set_payload("{\"source\": ")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "bad_request");
        assert!(body["request_id"].is_string());
    }
}
