use crate::stored_record;
use uuid::Uuid;

// One lexical-index row per document chunk. The record key concatenates the
// document uuid with the 1-based chunk sequence so all chunks of a document
// share a prefix.
stored_record!(ChunkRecord, "doc_chunk", {
    corpus_id: String,
    document_id: String,
    document_name: String,
    text: String
});

impl ChunkRecord {
    pub fn composite_key(document_id: Uuid, sequence: u32) -> String {
        format!("{}{sequence:08x}", document_id.simple())
    }

    pub fn new(
        corpus_id: Uuid,
        document_id: Uuid,
        document_name: &str,
        sequence: u32,
        text: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Self::composite_key(document_id, sequence),
            created_at: now,
            updated_at: now,
            corpus_id: corpus_id.to_string(),
            document_id: document_id.to_string(),
            document_name: document_name.to_owned(),
            text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_key_is_prefix_ordered_per_document() {
        let document_id = Uuid::new_v4();
        let first = ChunkRecord::composite_key(document_id, 1);
        let second = ChunkRecord::composite_key(document_id, 2);

        assert!(first.starts_with(&document_id.simple().to_string()));
        assert_eq!(first.len(), 32 + 8);
        assert!(second > first);
    }
}
