use std::sync::Arc;

use common::{storage::db::SurrealDbClient, utils::config::AppConfig};
use corpus_pipeline::CorpusStores;
use namespace_registry::MetadataRegistry;

#[derive(Clone)]
pub struct ApiState {
    pub db: Arc<SurrealDbClient>,
    pub registry: Arc<MetadataRegistry>,
    pub stores: CorpusStores,
    pub config: AppConfig,
}

impl ApiState {
    pub fn new(
        db: Arc<SurrealDbClient>,
        registry: Arc<MetadataRegistry>,
        stores: CorpusStores,
        config: AppConfig,
    ) -> Self {
        Self {
            db,
            registry,
            stores,
            config,
        }
    }
}
