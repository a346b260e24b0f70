use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use serde::Deserialize;
use tokio_retry::{
    strategy::{jitter, ExponentialBackoff},
    Retry,
};
use tracing::debug;
use uuid::Uuid;

use crate::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        document_store::parse_uuid_field,
        types::{vector_record::VectorRecord, StoredRecord},
    },
    utils::{
        embedding::{l2_normalize, TextEmbedder},
        segmenter::segment_with_offsets,
    },
};

/// How many nearest neighbours a single search returns at most.
pub const VECTOR_SEARCH_LIMIT: usize = 100;
/// HNSW search effort.
const SEARCH_EF: usize = 40;
/// Default cap on rows per insert batch. Large documents produce many
/// sentence rows; batches are split at this threshold and awaited one at a
/// time, which bounds how much the store has in flight.
pub const DEFAULT_BATCH_ROWS: usize = 512;

/// A nearest-neighbour hit. Distances are L2 over unit vectors, so lower is
/// better and values stay within [0, 2]. The span locates `text` inside the
/// original document.
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub distance: f32,
    pub corpus_id: Uuid,
    pub document_id: Uuid,
    pub document_name: String,
    pub text: String,
    pub start_offset: usize,
    pub end_offset: usize,
}

/// Sentence-level similarity index keyed by corpus id. Implementations own
/// their internal re-segmentation and embedding strategy.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Segment, embed and persist a whole document. Returns whether every
    /// sentence row was written.
    async fn save_document(
        &self,
        corpus_id: Uuid,
        document_id: Uuid,
        document_name: &str,
        text: &str,
    ) -> Result<bool, AppError>;

    /// Nearest-neighbour search across the given corpora, closest first.
    async fn search(&self, corpus_ids: &[Uuid], clue: &str) -> Result<Vec<VectorHit>, AppError>;

    /// Remove every vector row belonging to the corpus.
    async fn delete_corpus(&self, corpus_id: Uuid) -> Result<(), AppError>;
}

#[derive(Debug, Deserialize)]
struct VectorHitRow {
    corpus_id: String,
    document_id: String,
    document_name: String,
    text: String,
    start_offset: i64,
    end_offset: i64,
    distance: f32,
}

pub struct SurrealVectorStore {
    db: Arc<SurrealDbClient>,
    embedder: Arc<dyn TextEmbedder>,
    max_sentence_chars: usize,
    batch_rows: usize,
}

impl SurrealVectorStore {
    pub fn new(
        db: Arc<SurrealDbClient>,
        embedder: Arc<dyn TextEmbedder>,
        max_sentence_chars: usize,
    ) -> Self {
        Self {
            db,
            embedder,
            max_sentence_chars,
            batch_rows: DEFAULT_BATCH_ROWS,
        }
    }

    pub fn with_batch_rows(mut self, batch_rows: usize) -> Self {
        self.batch_rows = batch_rows.max(1);
        self
    }

    async fn embed_batch_with_retry(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, AppError> {
        let retry_strategy = ExponentialBackoff::from_millis(100).map(jitter).take(3);
        Retry::spawn(retry_strategy, || self.embedder.embed_batch(texts.clone())).await
    }
}

#[async_trait]
impl VectorStore for SurrealVectorStore {
    async fn save_document(
        &self,
        corpus_id: Uuid,
        document_id: Uuid,
        document_name: &str,
        text: &str,
    ) -> Result<bool, AppError> {
        let sentences = segment_with_offsets(text, self.max_sentence_chars);
        if sentences.is_empty() {
            return Ok(true);
        }

        debug!(
            %corpus_id,
            %document_id,
            sentences = sentences.len(),
            "Saving vectors"
        );

        let mut embeddings = self
            .embed_batch_with_retry(
                sentences
                    .iter()
                    .map(|sentence| sentence.text.clone())
                    .collect(),
            )
            .await?;
        for embedding in &mut embeddings {
            l2_normalize(embedding);
        }

        // The sentence hash deduplicates identical sentences within one
        // document, so repeated rows collapse to the first occurrence.
        let mut seen: HashSet<String> = HashSet::new();
        let mut rows = Vec::with_capacity(sentences.len());
        for (sentence, embedding) in sentences.into_iter().zip(embeddings) {
            let row = VectorRecord::new(
                corpus_id,
                document_id,
                document_name,
                sentence.text,
                embedding,
                sentence.start,
                sentence.end,
            );
            if seen.insert(row.id.clone()) {
                rows.push(row);
            }
        }
        let expected = rows.len();

        // Insert in bounded batches, awaiting each before submitting the
        // next, so one oversized document cannot flood the store.
        let mut inserted = 0usize;
        while !rows.is_empty() {
            let batch: Vec<VectorRecord> =
                rows.drain(..rows.len().min(self.batch_rows)).collect();
            let sql = format!("INSERT INTO {} $rows;", VectorRecord::table_name());
            let mut response = self.db.client.query(sql).bind(("rows", batch)).await?;
            let created: Vec<VectorRecord> = response.take(0)?;
            inserted += created.len();
        }

        Ok(inserted == expected)
    }

    async fn search(&self, corpus_ids: &[Uuid], clue: &str) -> Result<Vec<VectorHit>, AppError> {
        if corpus_ids.is_empty() {
            return Ok(Vec::new());
        }

        debug!(corpora = corpus_ids.len(), "Searching vector store");

        let mut clue_embedding = self.embedder.embed(clue).await?;
        l2_normalize(&mut clue_embedding);

        let sql = format!(
            "SELECT corpus_id, document_id, document_name, text, start_offset, end_offset, \
             vector::distance::knn() AS distance \
             FROM {table} \
             WHERE corpus_id IN $corpus_ids \
               AND embedding <|{limit},{ef}|> {embedding:?} \
             ORDER BY distance ASC",
            table = VectorRecord::table_name(),
            limit = VECTOR_SEARCH_LIMIT,
            ef = SEARCH_EF,
            embedding = clue_embedding,
        );

        let ids: Vec<String> = corpus_ids.iter().map(Uuid::to_string).collect();
        let mut response = self
            .db
            .client
            .query(sql)
            .bind(("corpus_ids", ids))
            .await?;
        let rows: Vec<VectorHitRow> = response.take(0)?;

        let mut hits = Vec::with_capacity(rows.len());
        for row in rows {
            hits.push(VectorHit {
                distance: row.distance,
                corpus_id: parse_uuid_field(&row.corpus_id, "corpus_id")?,
                document_id: parse_uuid_field(&row.document_id, "document_id")?,
                document_name: row.document_name,
                text: row.text,
                start_offset: row.start_offset.max(0) as usize,
                end_offset: row.end_offset.max(0) as usize,
            });
        }
        Ok(hits)
    }

    async fn delete_corpus(&self, corpus_id: Uuid) -> Result<(), AppError> {
        let sql = format!(
            "DELETE {} WHERE corpus_id = $corpus_id;",
            VectorRecord::table_name()
        );
        self.db
            .client
            .query(sql)
            .bind(("corpus_id", corpus_id.to_string()))
            .await?;
        Ok(())
    }
}
