use actix_web::{App, HttpServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sourcelens::api;
use sourcelens::app::AppState;
use sourcelens::model::Config;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present (ignore if missing)
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let bind_addr = config.bind_addr();

    let state = AppState::new(config).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to initialize application");
        std::io::Error::other(e)
    })?;

    tracing::info!("Starting SourceLens server on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(state.llm_router.clone())
            .app_data(state.cache.clone())
            .app_data(state.analysis_service.clone())
            .app_data(state.counter_narrative_service.clone())
            .configure(api::configure)
    })
    .bind(&bind_addr)?
    .run()
    .await
}
