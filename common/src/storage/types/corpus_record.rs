use crate::stored_record;

/// Corpus flavor. Determines the fixed permission bitmask at creation time
/// and which result group a corpus lands in during multi-corpus search.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum CorpusType {
    Knowledge,
    Conversation,
}

impl CorpusType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Knowledge => "knowledge",
            Self::Conversation => "conversation",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "knowledge" => Some(Self::Knowledge),
            "conversation" => Some(Self::Conversation),
            _ => None,
        }
    }
}

/// Lifecycle status shared by namespace and corpus rows. A corpus in
/// `Deleting` still has a metadata row but no name-index entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleStatus {
    Active,
    Deleting,
}

impl LifecycleStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Deleting => "deleting",
        }
    }
}

pub const READ_PERMISSION: i64 = 1;
pub const WRITE_PERMISSION: i64 = 2;
pub const READ_AND_WRITE: i64 = READ_PERMISSION | WRITE_PERMISSION;

// Record key is the corpus uuid; the parent namespace id is duplicated here
// so a lookup can be validated against the caller's expectation.
stored_record!(CorpusRecord, "corpus_meta", {
    parent_id: String,
    parent_pathname: String,
    name: String,
    corpus_type: CorpusType,
    permissions: i64,
    status: LifecycleStatus
});
