use std::sync::Arc;

use api_router::{api_routes_v1, api_state::ApiState};
use axum::Router;
use common::{
    storage::db::SurrealDbClient,
    utils::{
        chat::ChatProvider,
        config::get_config,
        embedding::{EmbeddingBackend, EmbeddingProvider},
    },
};
use ingestion_pipeline::source::SubtitleApiSource;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    // Get config
    let config = get_config()?;

    // Set up storage
    let db = Arc::new(
        SurrealDbClient::new(
            &config.surrealdb_address,
            &config.surrealdb_username,
            &config.surrealdb_password,
            &config.surrealdb_namespace,
            &config.surrealdb_database,
        )
        .await?,
    );
    db.ensure_initialized().await?;

    // Capability providers based on config
    let backend: EmbeddingBackend = config.embedding_backend.parse()?;
    let (embedder, chat) = match backend {
        EmbeddingBackend::Hashed => (
            EmbeddingProvider::new_hashed(config.embedding_dimensions as usize),
            ChatProvider::new_scripted("no language model is configured"),
        ),
        EmbeddingBackend::OpenAI => {
            let api_key = config
                .openai_api_key
                .clone()
                .ok_or("openai_api_key is required for the openai backend")?;
            let openai_client = Arc::new(async_openai::Client::with_config(
                async_openai::config::OpenAIConfig::new()
                    .with_api_key(api_key)
                    .with_api_base(&config.openai_base_url),
            ));
            (
                EmbeddingProvider::new_openai(
                    Arc::clone(&openai_client),
                    config.embedding_model.clone(),
                    config.embedding_dimensions,
                ),
                ChatProvider::new_openai(openai_client, config.chat_model.clone()),
            )
        }
    };
    info!(
        embedding_backend = embedder.backend_label(),
        embedding_dimension = embedder.dimension(),
        chat_backend = chat.backend_label(),
        "Capability providers initialized"
    );

    let transcripts = Arc::new(SubtitleApiSource::new(config.subtitle_base_url.clone()));

    let api_state = ApiState::new(config.clone(), db, embedder, chat, transcripts);

    // Create Axum router
    let app = Router::new()
        .nest("/api/v1", api_routes_v1())
        .layer(CorsLayer::permissive())
        .with_state(api_state);

    info!("Starting server listening on 0.0.0.0:{}", config.http_port);
    let serve_address = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(serve_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
