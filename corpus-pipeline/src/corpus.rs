use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use common::{
    error::AppError,
    storage::{
        citation_store::CitationStore,
        document_store::DocumentStore,
        types::{chunk_record::ChunkRecord, document_record::Citation},
        vector_store::VectorStore,
    },
    utils::segmenter::segment,
};
use namespace_registry::CorpusInfo;

use crate::{fusion::ScoredHit, searching::corpora_search};

/// Default chunk budget for the lexical index.
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 1536;

/// The three backing stores a corpus writes to and searches. Handed around
/// explicitly; components never reach for ambient store instances.
#[derive(Clone)]
pub struct CorpusStores {
    pub citations: Arc<dyn CitationStore>,
    pub documents: Arc<dyn DocumentStore>,
    pub vectors: Arc<dyn VectorStore>,
}

impl CorpusStores {
    pub fn new(
        citations: Arc<dyn CitationStore>,
        documents: Arc<dyn DocumentStore>,
        vectors: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            citations,
            documents,
            vectors,
        }
    }

    /// Purge every row the corpus owns across all three stores. The writes
    /// are independent and idempotent, so they run concurrently and absent
    /// rows are a no-op.
    pub async fn delete_all_content(&self, corpus_id: Uuid) -> Result<(), AppError> {
        tokio::try_join!(
            self.citations.delete_corpus(corpus_id),
            self.documents.delete_corpus(corpus_id),
            self.vectors.delete_corpus(corpus_id),
        )?;
        Ok(())
    }
}

/// Ingestion and retrieval for a single corpus.
pub struct Corpus {
    info: CorpusInfo,
    stores: CorpusStores,
    max_chunk_chars: usize,
}

impl Corpus {
    pub fn new(info: CorpusInfo, stores: CorpusStores) -> Self {
        Self {
            info,
            stores,
            max_chunk_chars: DEFAULT_MAX_CHUNK_CHARS,
        }
    }

    pub fn with_max_chunk_chars(mut self, max_chunk_chars: usize) -> Self {
        self.max_chunk_chars = max_chunk_chars;
        self
    }

    pub fn info(&self) -> &CorpusInfo {
        &self.info
    }

    /// Store one document: citation row with segment count, the whole
    /// document into the vector store, and the bounded-length chunks into
    /// the document store in one batch.
    ///
    /// The three writes target independent backends and run concurrently.
    /// Returns the AND of their outcomes; a partial failure is reported as
    /// `false` and is not rolled back.
    pub async fn store_and_index(
        &self,
        document: &str,
        citation: &Citation,
    ) -> Result<bool, AppError> {
        let corpus_id = self.info.corpus_id;
        debug!(corpus_id = %corpus_id, "Corpus storing and indexing");

        let document_id = Uuid::new_v4();
        let segments = segment(document, self.max_chunk_chars);
        let segment_count = segments.len();

        let chunks: Vec<ChunkRecord> = segments
            .into_iter()
            .enumerate()
            .map(|(index, text)| {
                ChunkRecord::new(
                    corpus_id,
                    document_id,
                    &citation.document_name,
                    index as u32 + 1,
                    text,
                )
            })
            .collect();

        let (citation_ok, vectors_ok, chunks_ok) = tokio::try_join!(
            self.stores
                .citations
                .put(corpus_id, document_id, segment_count, citation),
            self.stores.vectors.save_document(
                corpus_id,
                document_id,
                &citation.document_name,
                document
            ),
            self.stores.documents.save_chunks(chunks),
        )?;

        Ok(citation_ok && vectors_ok && chunks_ok)
    }

    /// Hybrid search against this corpus only.
    pub async fn search(&self, clue: &str) -> Result<Vec<ScoredHit>, AppError> {
        debug!(corpus_id = %self.info.corpus_id, "Corpus searching");
        corpora_search(&self.stores, &[self.info.corpus_id], clue).await
    }

    /// Purge this corpus's content from all three stores.
    pub async fn delete_all_content(&self) -> Result<(), AppError> {
        self.stores.delete_all_content(self.info.corpus_id).await
    }
}
