use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        types::{
            document_record::{Citation, DocumentRecord},
            StoredRecord,
        },
    },
};

/// Per-document provenance keyed by (corpus id, document id).
#[async_trait]
pub trait CitationStore: Send + Sync {
    /// Record a document's citation together with its segment count.
    async fn put(
        &self,
        corpus_id: Uuid,
        document_id: Uuid,
        segment_count: usize,
        citation: &Citation,
    ) -> Result<bool, AppError>;

    /// Fetch a document's citation; `NotFound` when the document is unknown.
    async fn get(&self, corpus_id: Uuid, document_id: Uuid) -> Result<Citation, AppError>;

    /// Remove every citation row belonging to the corpus.
    async fn delete_corpus(&self, corpus_id: Uuid) -> Result<(), AppError>;
}

pub struct SurrealCitationStore {
    db: Arc<SurrealDbClient>,
}

impl SurrealCitationStore {
    pub fn new(db: Arc<SurrealDbClient>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CitationStore for SurrealCitationStore {
    async fn put(
        &self,
        corpus_id: Uuid,
        document_id: Uuid,
        segment_count: usize,
        citation: &Citation,
    ) -> Result<bool, AppError> {
        let record = DocumentRecord::new(corpus_id, document_id, segment_count, citation);
        self.db.store_item(record).await?;
        Ok(true)
    }

    async fn get(&self, corpus_id: Uuid, document_id: Uuid) -> Result<Citation, AppError> {
        let key = DocumentRecord::composite_key(corpus_id, document_id);
        let record: Option<DocumentRecord> = self.db.get_item(&key).await?;
        record.map(|record| record.citation()).ok_or_else(|| {
            AppError::NotFound(format!(
                "citation for document {document_id} in corpus {corpus_id}"
            ))
        })
    }

    async fn delete_corpus(&self, corpus_id: Uuid) -> Result<(), AppError> {
        let sql = format!(
            "DELETE {} WHERE corpus_id = $corpus_id;",
            DocumentRecord::table_name()
        );
        self.db
            .client
            .query(sql)
            .bind(("corpus_id", corpus_id.to_string()))
            .await?;
        Ok(())
    }
}
