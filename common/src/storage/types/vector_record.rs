use crate::stored_record;
use sha2::{Digest, Sha256};
use uuid::Uuid;

// One vector-index row per embedded sentence. `start_offset`/`end_offset` is
// the sentence's character span inside the original document; the span length
// must always equal the character count of `text`.
stored_record!(VectorRecord, "vector_chunk", {
    corpus_id: String,
    document_id: String,
    document_name: String,
    text: String,
    embedding: Vec<f32>,
    start_offset: i64,
    end_offset: i64
});

/// Deterministic per-(document, sentence) hash, 32 hex characters. Storing
/// the same sentence of the same document twice lands on the same row.
pub fn sentence_hash(document_id: Uuid, sentence: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document_id.as_bytes());
    hasher.update(sentence.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(32);
    for byte in digest.iter().take(16) {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

impl VectorRecord {
    pub fn composite_key(document_id: Uuid, sentence: &str) -> String {
        format!("{}{}", document_id.simple(), sentence_hash(document_id, sentence))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        corpus_id: Uuid,
        document_id: Uuid,
        document_name: &str,
        text: String,
        embedding: Vec<f32>,
        start_offset: usize,
        end_offset: usize,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Self::composite_key(document_id, &text),
            created_at: now,
            updated_at: now,
            corpus_id: corpus_id.to_string(),
            document_id: document_id.to_string(),
            document_name: document_name.to_owned(),
            text,
            embedding,
            start_offset: start_offset as i64,
            end_offset: end_offset as i64,
        }
    }
}
