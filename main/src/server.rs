use std::sync::Arc;

use api_router::{api_routes, api_state::ApiState};
use axum::Router;
use common::{
    storage::{
        citation_store::SurrealCitationStore, db::SurrealDbClient,
        document_store::SurrealDocumentStore, indexes::ensure_indexes,
        vector_store::SurrealVectorStore,
    },
    utils::{
        config::{get_config, AppConfig},
        embedding::{EmbeddingProvider, TextEmbedder},
    },
};
use corpus_pipeline::CorpusStores;
use namespace_registry::MetadataRegistry;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn openai_client(config: &AppConfig) -> Option<Arc<async_openai::Client<async_openai::config::OpenAIConfig>>> {
    config.openai_api_key.as_ref().map(|api_key| {
        Arc::new(async_openai::Client::with_config(
            async_openai::config::OpenAIConfig::new()
                .with_api_key(api_key)
                .with_api_base(&config.openai_base_url),
        ))
    })
}

fn build_stores(
    db: &Arc<SurrealDbClient>,
    embedder: Arc<dyn TextEmbedder>,
    config: &AppConfig,
) -> CorpusStores {
    CorpusStores::new(
        Arc::new(SurrealCitationStore::new(Arc::clone(db))),
        Arc::new(SurrealDocumentStore::new(Arc::clone(db))),
        Arc::new(
            SurrealVectorStore::new(Arc::clone(db), embedder, config.max_sentence_chars)
                .with_batch_rows(config.vector_batch_rows),
        ),
    )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let config = get_config()?;

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

    let embedding_provider = Arc::new(
        EmbeddingProvider::from_config(&config, openai_client(&config)).await?,
    );
    info!(
        embedding_backend = embedding_provider.backend_label(),
        embedding_dimension = embedding_provider.dimension(),
        "Embedding provider initialized"
    );

    ensure_indexes(&db, embedding_provider.dimension()).await?;

    let registry = Arc::new(MetadataRegistry::new(Arc::clone(&db)));
    let stores = build_stores(&db, embedding_provider, &config);
    let state = ApiState::new(Arc::clone(&db), registry, stores, config.clone());

    let app = Router::new().merge(api_routes()).with_state(state);

    info!("Starting server listening on 0.0.0.0:{}", config.http_port);
    let listener =
        tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.http_port)).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
