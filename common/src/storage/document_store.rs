use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        types::{chunk_record::ChunkRecord, name_entry::deserialize_flexible_id, StoredRecord},
    },
};

/// How many lexical hits a single search returns at most.
pub const DOC_SEARCH_LIMIT: usize = 10;

/// A scored hit from the lexical index. Higher scores are better.
#[derive(Debug, Clone)]
pub struct DocumentHit {
    pub score: f32,
    pub corpus_id: Uuid,
    pub document_id: Uuid,
    pub document_name: String,
    pub text: String,
}

/// Lexical full-text index over document chunks, keyed by corpus id.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist all chunk rows of one document in a single batched call.
    /// Returns whether every row was written.
    async fn save_chunks(&self, chunks: Vec<ChunkRecord>) -> Result<bool, AppError>;

    /// Full-text search across the given corpora, best first.
    async fn search(&self, corpus_ids: &[Uuid], clue: &str)
        -> Result<Vec<DocumentHit>, AppError>;

    /// Remove every chunk belonging to the corpus.
    async fn delete_corpus(&self, corpus_id: Uuid) -> Result<(), AppError>;
}

#[derive(Debug, Deserialize)]
struct ChunkScoreRow {
    #[serde(deserialize_with = "deserialize_flexible_id")]
    #[allow(dead_code)]
    id: String,
    corpus_id: String,
    document_id: String,
    document_name: String,
    text: String,
    score: Option<f32>,
}

pub struct SurrealDocumentStore {
    db: Arc<SurrealDbClient>,
}

impl SurrealDocumentStore {
    pub fn new(db: Arc<SurrealDbClient>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DocumentStore for SurrealDocumentStore {
    async fn save_chunks(&self, chunks: Vec<ChunkRecord>) -> Result<bool, AppError> {
        if chunks.is_empty() {
            return Ok(true);
        }
        let expected = chunks.len();

        let sql = format!("INSERT INTO {} $chunks;", ChunkRecord::table_name());
        let mut response = self.db.client.query(sql).bind(("chunks", chunks)).await?;
        let created: Vec<ChunkRecord> = response.take(0)?;

        Ok(created.len() == expected)
    }

    async fn search(
        &self,
        corpus_ids: &[Uuid],
        clue: &str,
    ) -> Result<Vec<DocumentHit>, AppError> {
        if corpus_ids.is_empty() {
            return Ok(Vec::new());
        }

        debug!(corpora = corpus_ids.len(), "Searching document store");

        let sql = format!(
            "SELECT id, corpus_id, document_id, document_name, text, \
             (IF search::score(0) != NONE THEN search::score(0) ELSE 0 END) AS score \
             FROM {table} \
             WHERE text @0@ $clue \
               AND corpus_id IN $corpus_ids \
             ORDER BY score DESC \
             LIMIT $limit",
            table = ChunkRecord::table_name()
        );

        let ids: Vec<String> = corpus_ids.iter().map(Uuid::to_string).collect();
        let mut response = self
            .db
            .client
            .query(sql)
            .bind(("clue", clue.to_owned()))
            .bind(("corpus_ids", ids))
            .bind(("limit", DOC_SEARCH_LIMIT as i64))
            .await?;

        let rows: Vec<ChunkScoreRow> = response.take(0)?;

        let mut hits = Vec::with_capacity(rows.len());
        for row in rows {
            hits.push(DocumentHit {
                score: row.score.unwrap_or_default(),
                corpus_id: parse_uuid_field(&row.corpus_id, "corpus_id")?,
                document_id: parse_uuid_field(&row.document_id, "document_id")?,
                document_name: row.document_name,
                text: row.text,
            });
        }
        Ok(hits)
    }

    async fn delete_corpus(&self, corpus_id: Uuid) -> Result<(), AppError> {
        let sql = format!(
            "DELETE {} WHERE corpus_id = $corpus_id;",
            ChunkRecord::table_name()
        );
        self.db
            .client
            .query(sql)
            .bind(("corpus_id", corpus_id.to_string()))
            .await?;
        Ok(())
    }
}

pub(crate) fn parse_uuid_field(value: &str, field: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(value).map_err(|_| {
        AppError::InternalInconsistency(format!("stored {field} \"{value}\" is not a uuid"))
    })
}
