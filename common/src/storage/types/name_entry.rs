use crate::stored_record;

// Single global pathname -> id mapping, covering both namespaces and corpora.
// The record key is the full pathname; winning the CREATE on this table is
// what makes a name creation exclusive.
stored_record!(NameEntry, "name_index", {
    target_id: String
});

impl NameEntry {
    pub fn new(pathname: String, target_id: uuid::Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: pathname,
            created_at: now,
            updated_at: now,
            target_id: target_id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn record_key_is_the_pathname() {
        let id = Uuid::new_v4();
        let entry = NameEntry::new("acme.team:kb".into(), id);
        assert_eq!(entry.record_key(), "acme.team:kb");
        assert_eq!(entry.target_id, id.to_string());
    }
}
