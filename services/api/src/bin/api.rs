//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{db::PgClientStore, redraft_llm::OpenAiRedraftAdapter},
    config::Config,
    error::ApiError,
    web::{api_router, rest::ApiDoc, state::AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let client_store = Arc::new(PgClientStore::new(db_pool.clone()));
    info!("Running database migrations...");
    client_store.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize the Generation Service Adapter ---
    let api_key = config
        .openai_api_key
        .clone()
        .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?;
    let openai_config = OpenAIConfig::new().with_api_key(api_key);
    let openai_client = Client::with_config(openai_config);
    let redraft_adapter = Arc::new(OpenAiRedraftAdapter::new(
        openai_client,
        config.redraft_model.clone(),
    ));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        clients: client_store,
        redraft: redraft_adapter,
        config: config.clone(),
    });

    let frontend_origin = config
        .frontend_origin
        .parse::<HeaderValue>()
        .map_err(|e| {
            ApiError::Internal(format!(
                "Invalid FRONTEND_ORIGIN '{}': {}",
                config.frontend_origin, e
            ))
        })?;
    let cors = CorsLayer::new()
        .allow_origin(frontend_origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router(app_state).layer(cors))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
