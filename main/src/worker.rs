use std::{sync::Arc, time::Duration};

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
use corpus_pipeline::{deletion::run_deletion_worker, CorpusStores};
use namespace_registry::MetadataRegistry;
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
    ensure_indexes(&db, embedding_provider.dimension()).await?;

    let registry = Arc::new(MetadataRegistry::new(Arc::clone(&db)));
    let stores = CorpusStores::new(
        Arc::new(SurrealCitationStore::new(Arc::clone(&db))),
        Arc::new(SurrealDocumentStore::new(Arc::clone(&db))),
        Arc::new(
            SurrealVectorStore::new(Arc::clone(&db), embedding_provider, config.max_sentence_chars)
                .with_batch_rows(config.vector_batch_rows),
        ),
    );

    run_deletion_worker(
        db,
        registry,
        stores,
        Duration::from_secs(config.deletion_grace_secs),
    )
    .await
}
