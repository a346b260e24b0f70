use crate::stored_record;
use uuid::Uuid;

/// Immutable provenance of a stored document; one per document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Citation {
    pub source_uri: String,
    pub source_name: String,
    pub description: String,
    pub document_name: String,
}

// One row per stored document, keyed by the (corpus, document) composite so
// citation lookups during search are single-record reads.
stored_record!(DocumentRecord, "document_meta", {
    corpus_id: String,
    document_id: String,
    document_name: String,
    source_uri: String,
    source_name: String,
    description: String,
    segment_count: i64
});

impl DocumentRecord {
    pub fn composite_key(corpus_id: Uuid, document_id: Uuid) -> String {
        format!("{}{}", corpus_id.simple(), document_id.simple())
    }

    pub fn new(
        corpus_id: Uuid,
        document_id: Uuid,
        segment_count: usize,
        citation: &Citation,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Self::composite_key(corpus_id, document_id),
            created_at: now,
            updated_at: now,
            corpus_id: corpus_id.to_string(),
            document_id: document_id.to_string(),
            document_name: citation.document_name.clone(),
            source_uri: citation.source_uri.clone(),
            source_name: citation.source_name.clone(),
            description: citation.description.clone(),
            segment_count: segment_count as i64,
        }
    }

    pub fn citation(&self) -> Citation {
        Citation {
            source_uri: self.source_uri.clone(),
            source_name: self.source_name.clone(),
            description: self.description.clone(),
            document_name: self.document_name.clone(),
        }
    }
}
