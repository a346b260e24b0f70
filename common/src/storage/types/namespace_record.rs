use crate::stored_record;

use super::corpus_record::LifecycleStatus;

// Record key is the namespace uuid. `query_default_corpora` holds composite
// "{namespace_id}:{corpus_id}" references to shared corpora that descendants
// query by default; direct child corpora are never stored here since they are
// always queried anyway.
stored_record!(NamespaceRecord, "namespace_meta", {
    parent_id: String,
    parent_pathname: String,
    name: String,
    query_default_corpora: Vec<String>,
    status: LifecycleStatus
});
