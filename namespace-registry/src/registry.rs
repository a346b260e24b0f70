use std::{collections::BTreeMap, sync::Arc};

use chrono::Utc;
use surrealdb::sql::Datetime as SurrealDatetime;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use common::{
    error::AppError,
    storage::{
        db::{is_record_exists_conflict, SurrealDbClient},
        types::{
            corpus_record::{
                CorpusRecord, CorpusType, LifecycleStatus, READ_AND_WRITE, READ_PERMISSION,
            },
            name_entry::NameEntry,
            namespace_record::NamespaceRecord,
            parent_link::ParentLink,
            StoredRecord,
        },
    },
};

use crate::pathname::{
    compose_corpus_ref, mangle_corpus_pathname, parse_corpus_ref, split_corpus_pathname,
    split_namespace_pathname, ROOT_ID, ROOT_NAME,
};

/// Registry view of a corpus, reconstructed from its metadata row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorpusInfo {
    pub corpus_pathname: String,
    pub namespace_id: Uuid,
    pub corpus_id: Uuid,
    pub corpus_type: CorpusType,
}

/// Name resolution, namespace/corpus lifecycle and staged corpus deletion.
///
/// Correctness under concurrent callers rests on the storage layer's atomic
/// create-if-absent and conditional-write statements; the registry never
/// takes an in-process lock.
pub struct MetadataRegistry {
    db: Arc<SurrealDbClient>,
}

impl MetadataRegistry {
    pub fn new(db: Arc<SurrealDbClient>) -> Self {
        Self { db }
    }

    async fn get_id_by_name(&self, fullname: &str) -> Result<Uuid, AppError> {
        // the root namespace only exists logically
        if fullname == ROOT_NAME {
            return Ok(ROOT_ID);
        }

        let entry: Option<NameEntry> = self.db.get_item(fullname).await?;
        let entry = entry.ok_or_else(|| AppError::NamespaceDoesNotExist(fullname.to_owned()))?;
        Uuid::parse_str(&entry.target_id).map_err(|_| {
            AppError::InternalInconsistency(format!(
                "name index entry for \"{fullname}\" holds a malformed id"
            ))
        })
    }

    pub async fn get_namespace_ids_by_name(
        &self,
        pathname: &str,
    ) -> Result<(Uuid, Uuid), AppError> {
        let (parent_pathname, _) = split_namespace_pathname(pathname)?;
        let child_id = self.get_id_by_name(pathname).await?;
        let parent_id = self.get_id_by_name(&parent_pathname).await?;
        Ok((parent_id, child_id))
    }

    pub async fn get_corpus_ids_by_name(&self, pathname: &str) -> Result<(Uuid, Uuid), AppError> {
        let (parent_pathname, _) = split_corpus_pathname(pathname)?;
        let child_id = self.get_id_by_name(pathname).await?;
        let parent_id = self.get_id_by_name(&parent_pathname).await?;
        Ok((parent_id, child_id))
    }

    /// Insert the pathname into the global name index. Winning this insert is
    /// what makes a creation exclusive; losing it maps to `NameExists`.
    async fn insert_name_entry(&self, pathname: &str, target_id: Uuid) -> Result<(), AppError> {
        match self
            .db
            .store_item(NameEntry::new(pathname.to_owned(), target_id))
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if is_record_exists_conflict(&err) => {
                info!(pathname = %pathname, "Name already exists");
                Err(AppError::NameExists(pathname.to_owned()))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn create_namespace(
        &self,
        namespace_pathname: &str,
        parent_id: Option<Uuid>,
    ) -> Result<Uuid, AppError> {
        debug!(namespace_pathname = %namespace_pathname, "Creating namespace");

        if namespace_pathname == ROOT_NAME {
            // "" is reserved for the root namespace
            return Err(AppError::NameExists(namespace_pathname.to_owned()));
        }

        let (parent_pathname, child_name) = split_namespace_pathname(namespace_pathname)?;
        let parent_id = match parent_id {
            Some(id) => id,
            None => self.get_id_by_name(&parent_pathname).await?,
        };

        let namespace_id = Uuid::new_v4();
        self.insert_name_entry(namespace_pathname, namespace_id)
            .await?;

        // Info row and parent back-reference land in one batch; the name
        // index entry above is already the point of no return.
        let sql = format!(
            "BEGIN TRANSACTION; \
             CREATE type::thing('{ns_table}', $id) SET \
                parent_id = $parent_id, parent_pathname = $parent_pathname, \
                name = $name, query_default_corpora = [], status = $status, \
                created_at = $now, updated_at = $now; \
             CREATE type::thing('{link_table}', $id) SET \
                parent_id = $parent_id, created_at = $now, updated_at = $now; \
             COMMIT TRANSACTION;",
            ns_table = NamespaceRecord::table_name(),
            link_table = ParentLink::table_name(),
        );
        let response = self
            .db
            .client
            .query(sql)
            .bind(("id", namespace_id.to_string()))
            .bind(("parent_id", parent_id.to_string()))
            .bind(("parent_pathname", parent_pathname))
            .bind(("name", child_name))
            .bind(("status", LifecycleStatus::Active))
            .bind(("now", SurrealDatetime::from(Utc::now())))
            .await?;
        response.check()?;

        Ok(namespace_id)
    }

    async fn create_corpus(
        &self,
        corpus_pathname: &str,
        corpus_type: CorpusType,
        permissions: i64,
        parent_id: Option<Uuid>,
    ) -> Result<Uuid, AppError> {
        debug!(
            corpus_pathname = %corpus_pathname,
            corpus_type = corpus_type.as_str(),
            "Creating corpus"
        );

        let (parent_pathname, corpus_name) = split_corpus_pathname(corpus_pathname)?;
        let parent_id = match parent_id {
            Some(id) => id,
            None => self.get_id_by_name(&parent_pathname).await?,
        };

        let corpus_id = Uuid::new_v4();
        self.insert_name_entry(corpus_pathname, corpus_id).await?;

        let sql = format!(
            "BEGIN TRANSACTION; \
             CREATE type::thing('{corpus_table}', $id) SET \
                parent_id = $parent_id, parent_pathname = $parent_pathname, \
                name = $name, corpus_type = $corpus_type, permissions = $permissions, \
                status = $status, created_at = $now, updated_at = $now; \
             CREATE type::thing('{link_table}', $id) SET \
                parent_id = $parent_id, created_at = $now, updated_at = $now; \
             COMMIT TRANSACTION;",
            corpus_table = CorpusRecord::table_name(),
            link_table = ParentLink::table_name(),
        );
        let response = self
            .db
            .client
            .query(sql)
            .bind(("id", corpus_id.to_string()))
            .bind(("parent_id", parent_id.to_string()))
            .bind(("parent_pathname", parent_pathname))
            .bind(("name", corpus_name))
            .bind(("corpus_type", corpus_type))
            .bind(("permissions", permissions))
            .bind(("status", LifecycleStatus::Active))
            .bind(("now", SurrealDatetime::from(Utc::now())))
            .await?;
        response.check()?;

        Ok(corpus_id)
    }

    pub async fn create_conversation_corpus(
        &self,
        corpus_pathname: &str,
        parent_id: Option<Uuid>,
    ) -> Result<Uuid, AppError> {
        self.create_corpus(
            corpus_pathname,
            CorpusType::Conversation,
            READ_AND_WRITE,
            parent_id,
        )
        .await
    }

    pub async fn create_knowledge_corpus(
        &self,
        corpus_pathname: &str,
        parent_id: Option<Uuid>,
    ) -> Result<Uuid, AppError> {
        self.create_corpus(
            corpus_pathname,
            CorpusType::Knowledge,
            READ_PERMISSION,
            parent_id,
        )
        .await
    }

    async fn load_corpus_record(
        &self,
        namespace_id: Uuid,
        corpus_id: Uuid,
    ) -> Result<CorpusRecord, AppError> {
        let record: Option<CorpusRecord> = self.db.get_item(&corpus_id.to_string()).await?;
        let record = record.ok_or_else(|| {
            AppError::InternalInconsistency(format!(
                "corpus {corpus_id} creation or delete incomplete"
            ))
        })?;
        if record.parent_id != namespace_id.to_string() {
            return Err(AppError::InternalInconsistency(format!(
                "corpus {corpus_id} belongs to namespace {}, not {namespace_id}",
                record.parent_id
            )));
        }
        Ok(record)
    }

    /// Direct lookup bypassing the name index; the name entry may already be
    /// gone during deletion recovery.
    pub async fn get_corpus_info_by_id(
        &self,
        namespace_id: Uuid,
        corpus_id: Uuid,
    ) -> Result<CorpusInfo, AppError> {
        let record = self.load_corpus_record(namespace_id, corpus_id).await?;
        Ok(CorpusInfo {
            corpus_pathname: mangle_corpus_pathname(&record.parent_pathname, &record.name),
            namespace_id,
            corpus_id,
            corpus_type: record.corpus_type,
        })
    }

    pub async fn get_corpus_info(&self, corpus_pathname: &str) -> Result<CorpusInfo, AppError> {
        let (parent_id, corpus_id) = self.get_corpus_ids_by_name(corpus_pathname).await?;
        let info = self.get_corpus_info_by_id(parent_id, corpus_id).await?;
        if info.corpus_pathname != corpus_pathname {
            error!(
                stored = %info.corpus_pathname,
                requested = %corpus_pathname,
                "Corpus row and name index disagree"
            );
            return Err(AppError::InternalInconsistency(format!(
                "inconsistent corpus info vs name index, \"{}\" != \"{corpus_pathname}\"",
                info.corpus_pathname
            )));
        }
        Ok(info)
    }

    /// The corpora a namespace queries by default: its registered shared set
    /// (pruned of refs that no longer resolve) plus all of its own active
    /// child corpora.
    pub async fn get_query_corpora(
        &self,
        namespace_pathname: &str,
    ) -> Result<Vec<CorpusInfo>, AppError> {
        let (_, namespace_id) = self.get_namespace_ids_by_name(namespace_pathname).await?;
        let record: Option<NamespaceRecord> =
            self.db.get_item(&namespace_id.to_string()).await?;
        let record = record.ok_or_else(|| {
            AppError::InternalInconsistency(format!(
                "namespace row missing for \"{namespace_pathname}\""
            ))
        })?;

        let mut by_id: BTreeMap<Uuid, CorpusInfo> = BTreeMap::new();
        let mut stale: Vec<String> = Vec::new();

        for reference in &record.query_default_corpora {
            let Some((ref_namespace_id, ref_corpus_id)) = parse_corpus_ref(reference) else {
                stale.push(reference.clone());
                continue;
            };
            match self.load_corpus_record(ref_namespace_id, ref_corpus_id).await {
                Ok(corpus) if corpus.status == LifecycleStatus::Active => {
                    by_id.insert(
                        ref_corpus_id,
                        CorpusInfo {
                            corpus_pathname: mangle_corpus_pathname(
                                &corpus.parent_pathname,
                                &corpus.name,
                            ),
                            namespace_id: ref_namespace_id,
                            corpus_id: ref_corpus_id,
                            corpus_type: corpus.corpus_type,
                        },
                    );
                }
                // Mid-deletion: hidden from queries, but not prunable yet.
                Ok(_) => {}
                Err(AppError::InternalInconsistency(_)) => stale.push(reference.clone()),
                Err(err) => return Err(err),
            }
        }

        // Refs that no longer resolve were deleted; rewrite the stored set.
        if !stale.is_empty() {
            warn!(
                namespace_pathname = %namespace_pathname,
                pruned = stale.len(),
                "Pruning stale default query corpora"
            );
            let pruned: Vec<String> = record
                .query_default_corpora
                .iter()
                .filter(|reference| !stale.contains(reference))
                .cloned()
                .collect();
            let sql = format!(
                "UPDATE type::thing('{table}', $id) SET \
                 query_default_corpora = $pruned, updated_at = $now;",
                table = NamespaceRecord::table_name()
            );
            self.db
                .client
                .query(sql)
                .bind(("id", namespace_id.to_string()))
                .bind(("pruned", pruned))
                .bind(("now", SurrealDatetime::from(Utc::now())))
                .await?;
        }

        let sql = format!(
            "SELECT * FROM {table} WHERE parent_id = $parent_id AND status = $status;",
            table = CorpusRecord::table_name()
        );
        let mut response = self
            .db
            .client
            .query(sql)
            .bind(("parent_id", namespace_id.to_string()))
            .bind(("status", LifecycleStatus::Active))
            .await?;
        let children: Vec<CorpusRecord> = response.take(0)?;

        for corpus in children {
            let corpus_id = Uuid::parse_str(&corpus.id).map_err(|_| {
                AppError::InternalInconsistency(format!(
                    "corpus row \"{}\" has a malformed id",
                    corpus.id
                ))
            })?;
            by_id.insert(
                corpus_id,
                CorpusInfo {
                    corpus_pathname: mangle_corpus_pathname(
                        &corpus.parent_pathname,
                        &corpus.name,
                    ),
                    namespace_id,
                    corpus_id,
                    corpus_type: corpus.corpus_type,
                },
            );
        }

        Ok(by_id.into_values().collect())
    }

    /// Register a shared corpus in a namespace's default query set.
    pub async fn add_query_default_corpus(
        &self,
        namespace_pathname: &str,
        corpus_pathname: &str,
    ) -> Result<(), AppError> {
        let (_, namespace_id) = self.get_namespace_ids_by_name(namespace_pathname).await?;
        let (corpus_parent_id, corpus_id) = self.get_corpus_ids_by_name(corpus_pathname).await?;
        let reference = compose_corpus_ref(corpus_parent_id, corpus_id);

        let sql = format!(
            "UPDATE type::thing('{table}', $id) SET \
             query_default_corpora = array::union(query_default_corpora, [$reference]), \
             updated_at = $now;",
            table = NamespaceRecord::table_name()
        );
        self.db
            .client
            .query(sql)
            .bind(("id", namespace_id.to_string()))
            .bind(("reference", reference))
            .bind(("now", SurrealDatetime::from(Utc::now())))
            .await?;
        Ok(())
    }

    /// First, synchronous phase of the staged delete. Step 1 frees the
    /// pathname, guarded on the entry still pointing at this corpus; step 2
    /// marks the corpus row. Re-running after a crash between the steps is
    /// safe: step 1 then reports `NamespaceDoesNotExist`, which callers read
    /// as "already initiated".
    pub async fn initiate_delete_corpus(
        &self,
        parent_id: Uuid,
        corpus_id: Uuid,
        corpus_pathname: &str,
    ) -> Result<(), AppError> {
        debug!(
            corpus_pathname = %corpus_pathname,
            corpus_id = %corpus_id,
            "Initiating corpus delete"
        );

        let sql = format!(
            "DELETE type::thing('{table}', $pathname) \
             WHERE target_id = $target_id RETURN BEFORE;",
            table = NameEntry::table_name()
        );
        let mut response = self
            .db
            .client
            .query(sql)
            .bind(("pathname", corpus_pathname.to_owned()))
            .bind(("target_id", corpus_id.to_string()))
            .await?;
        let deleted: Vec<NameEntry> = response.take(0)?;
        if deleted.is_empty() {
            info!(
                corpus_pathname = %corpus_pathname,
                corpus_id = %corpus_id,
                "Corpus name already released"
            );
            return Err(AppError::NamespaceDoesNotExist(corpus_pathname.to_owned()));
        }

        let sql = format!(
            "UPDATE type::thing('{table}', $id) SET status = $status, updated_at = $now \
             WHERE parent_id = $parent_id RETURN AFTER;",
            table = CorpusRecord::table_name()
        );
        let mut response = self
            .db
            .client
            .query(sql)
            .bind(("id", corpus_id.to_string()))
            .bind(("status", LifecycleStatus::Deleting))
            .bind(("parent_id", parent_id.to_string()))
            .bind(("now", SurrealDatetime::from(Utc::now())))
            .await?;
        let updated: Option<CorpusRecord> = response.take(0)?;
        if updated.is_none() {
            error!(
                corpus_id = %corpus_id,
                parent_id = %parent_id,
                "Corpus row already deleted while its name index entry remained"
            );
            return Err(AppError::InternalInconsistency(format!(
                "corpus row {corpus_id} already deleted but its name index entry wasn't"
            )));
        }

        Ok(())
    }

    /// Remove the remaining corpus metadata. The name index entry must have
    /// been deleted and all corpus content purged before this call.
    pub async fn finish_delete_corpus(
        &self,
        namespace_id: Uuid,
        corpus_id: Uuid,
    ) -> Result<(), AppError> {
        debug!(
            namespace_id = %namespace_id,
            corpus_id = %corpus_id,
            "Finishing corpus delete"
        );

        let sql = format!(
            "BEGIN TRANSACTION; \
             DELETE type::thing('{corpus_table}', $id); \
             DELETE type::thing('{link_table}', $id); \
             COMMIT TRANSACTION;",
            corpus_table = CorpusRecord::table_name(),
            link_table = ParentLink::table_name(),
        );
        let response = self
            .db
            .client
            .query(sql)
            .bind(("id", corpus_id.to_string()))
            .await?;
        response.check()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::storage::types::namespace_record::NamespaceRecord;

    async fn registry() -> MetadataRegistry {
        let db = Arc::new(
            SurrealDbClient::memory("registry_ns", &Uuid::new_v4().to_string())
                .await
                .expect("Failed to start in-memory surrealdb"),
        );
        MetadataRegistry::new(db)
    }

    #[tokio::test]
    async fn namespace_creation_is_exclusive() {
        let registry = registry().await;

        let id = registry
            .create_namespace("acme", None)
            .await
            .expect("first create succeeds");
        assert!(!id.is_nil());

        let err = registry
            .create_namespace("acme", None)
            .await
            .expect_err("second create must fail");
        assert!(matches!(err, AppError::NameExists(p) if p == "acme"));
    }

    #[tokio::test]
    async fn root_name_is_reserved() {
        let registry = registry().await;
        let err = registry
            .create_namespace("", None)
            .await
            .expect_err("root name must be rejected");
        assert!(matches!(err, AppError::NameExists(_)));
    }

    #[tokio::test]
    async fn nested_namespace_requires_existing_parent() {
        let registry = registry().await;

        let err = registry
            .create_namespace("acme.team", None)
            .await
            .expect_err("missing parent must fail");
        assert!(matches!(err, AppError::NamespaceDoesNotExist(p) if p == "acme"));

        let parent = registry.create_namespace("acme", None).await.expect("parent");
        let child = registry
            .create_namespace("acme.team", None)
            .await
            .expect("child");

        let (resolved_parent, resolved_child) = registry
            .get_namespace_ids_by_name("acme.team")
            .await
            .expect("ids resolve");
        assert_eq!(resolved_parent, parent);
        assert_eq!(resolved_child, child);
    }

    #[tokio::test]
    async fn illegal_pathnames_are_rejected_before_any_write() {
        let registry = registry().await;
        registry.create_namespace("acme", None).await.expect("ns");

        for bad in ["a..b", "with space", "acme:corpus:extra", "acme:"] {
            let err_ns = registry.create_namespace(bad, None).await;
            let err_corpus = registry.create_conversation_corpus(bad, None).await;
            assert!(
                matches!(err_ns, Err(AppError::IllegalName(_)))
                    || matches!(err_corpus, Err(AppError::IllegalName(_))),
                "{bad} should be illegal somewhere"
            );
        }
    }

    #[tokio::test]
    async fn corpus_info_round_trips_through_the_name_index() {
        let registry = registry().await;
        let namespace_id = registry.create_namespace("acme", None).await.expect("ns");
        let corpus_id = registry
            .create_knowledge_corpus("acme:kb1", None)
            .await
            .expect("corpus");

        let info = registry
            .get_corpus_info("acme:kb1")
            .await
            .expect("info resolves");
        assert_eq!(info.corpus_pathname, "acme:kb1");
        assert_eq!(info.namespace_id, namespace_id);
        assert_eq!(info.corpus_id, corpus_id);
        assert_eq!(info.corpus_type, CorpusType::Knowledge);

        let by_id = registry
            .get_corpus_info_by_id(namespace_id, corpus_id)
            .await
            .expect("by id resolves");
        assert_eq!(by_id, info);
    }

    #[tokio::test]
    async fn corpus_names_collide_with_namespace_names_globally() {
        let registry = registry().await;
        registry.create_namespace("acme", None).await.expect("ns");
        registry
            .create_conversation_corpus("acme:chat", None)
            .await
            .expect("corpus");

        let err = registry
            .create_knowledge_corpus("acme:chat", None)
            .await
            .expect_err("same pathname must collide");
        assert!(matches!(err, AppError::NameExists(p) if p == "acme:chat"));
    }

    #[tokio::test]
    async fn initiate_delete_hides_the_name_but_keeps_the_row() {
        let registry = registry().await;
        let namespace_id = registry.create_namespace("acme", None).await.expect("ns");
        let corpus_id = registry
            .create_knowledge_corpus("acme:kb1", None)
            .await
            .expect("corpus");

        registry
            .initiate_delete_corpus(namespace_id, corpus_id, "acme:kb1")
            .await
            .expect("initiate succeeds");

        // The pathname no longer resolves...
        let err = registry
            .get_corpus_info("acme:kb1")
            .await
            .expect_err("name must be gone");
        assert!(matches!(err, AppError::NamespaceDoesNotExist(_)));

        // ...but the row is still reachable by id for the deletion worker.
        let info = registry
            .get_corpus_info_by_id(namespace_id, corpus_id)
            .await
            .expect("by id still resolves");
        assert_eq!(info.corpus_pathname, "acme:kb1");
    }

    #[tokio::test]
    async fn initiate_delete_is_idempotent_via_name_not_found() {
        let registry = registry().await;
        let namespace_id = registry.create_namespace("acme", None).await.expect("ns");
        let corpus_id = registry
            .create_knowledge_corpus("acme:kb1", None)
            .await
            .expect("corpus");

        registry
            .initiate_delete_corpus(namespace_id, corpus_id, "acme:kb1")
            .await
            .expect("first initiate");

        let err = registry
            .initiate_delete_corpus(namespace_id, corpus_id, "acme:kb1")
            .await
            .expect_err("second initiate reports the released name");
        assert!(matches!(err, AppError::NamespaceDoesNotExist(_)));

        // State is intact: the row is still marked deleting, nothing corrupted.
        registry
            .get_corpus_info_by_id(namespace_id, corpus_id)
            .await
            .expect("row still present");
    }

    #[tokio::test]
    async fn released_names_are_reusable_before_finish() {
        let registry = registry().await;
        let namespace_id = registry.create_namespace("acme", None).await.expect("ns");
        let old_corpus = registry
            .create_knowledge_corpus("acme:kb1", None)
            .await
            .expect("corpus");

        registry
            .initiate_delete_corpus(namespace_id, old_corpus, "acme:kb1")
            .await
            .expect("initiate");

        let new_corpus = registry
            .create_knowledge_corpus("acme:kb1", None)
            .await
            .expect("name is free for reuse");
        assert_ne!(new_corpus, old_corpus);

        // A retried initiate for the old corpus must not touch the new one.
        let err = registry
            .initiate_delete_corpus(namespace_id, old_corpus, "acme:kb1")
            .await
            .expect_err("guarded delete must miss");
        assert!(matches!(err, AppError::NamespaceDoesNotExist(_)));
        registry
            .get_corpus_info("acme:kb1")
            .await
            .expect("new corpus unaffected");
    }

    #[tokio::test]
    async fn finish_delete_removes_the_row() {
        let registry = registry().await;
        let namespace_id = registry.create_namespace("acme", None).await.expect("ns");
        let corpus_id = registry
            .create_knowledge_corpus("acme:kb1", None)
            .await
            .expect("corpus");

        registry
            .initiate_delete_corpus(namespace_id, corpus_id, "acme:kb1")
            .await
            .expect("initiate");
        registry
            .finish_delete_corpus(namespace_id, corpus_id)
            .await
            .expect("finish");

        let err = registry
            .get_corpus_info_by_id(namespace_id, corpus_id)
            .await
            .expect_err("row must be gone");
        assert!(matches!(err, AppError::InternalInconsistency(_)));
    }

    #[tokio::test]
    async fn query_corpora_unions_children_and_shared_set() {
        let registry = registry().await;
        let acme = registry.create_namespace("acme", None).await.expect("ns");
        let kb1 = registry
            .create_knowledge_corpus("acme:kb1", None)
            .await
            .expect("kb1");
        let chat = registry
            .create_conversation_corpus("acme:chat", None)
            .await
            .expect("chat");

        registry.create_namespace("team", None).await.expect("team");
        let shared = registry
            .create_knowledge_corpus("team:shared", None)
            .await
            .expect("shared");
        registry
            .add_query_default_corpus("acme", "team:shared")
            .await
            .expect("register shared corpus");

        let corpora = registry
            .get_query_corpora("acme")
            .await
            .expect("query corpora");
        let ids: Vec<Uuid> = corpora.iter().map(|info| info.corpus_id).collect();
        assert_eq!(corpora.len(), 3);
        assert!(ids.contains(&kb1));
        assert!(ids.contains(&chat));
        assert!(ids.contains(&shared));
        let _ = acme;
    }

    #[tokio::test]
    async fn deleting_children_are_hidden_from_query_corpora() {
        let registry = registry().await;
        let acme = registry.create_namespace("acme", None).await.expect("ns");
        let kb1 = registry
            .create_knowledge_corpus("acme:kb1", None)
            .await
            .expect("kb1");
        let kb2 = registry
            .create_knowledge_corpus("acme:kb2", None)
            .await
            .expect("kb2");

        registry
            .initiate_delete_corpus(acme, kb2, "acme:kb2")
            .await
            .expect("initiate");

        let corpora = registry
            .get_query_corpora("acme")
            .await
            .expect("query corpora");
        assert_eq!(corpora.len(), 1);
        assert_eq!(corpora[0].corpus_id, kb1);
    }

    #[tokio::test]
    async fn stale_shared_refs_are_pruned_on_read() {
        let registry = registry().await;
        registry.create_namespace("acme", None).await.expect("ns");
        let team = registry.create_namespace("team", None).await.expect("team");
        let shared = registry
            .create_knowledge_corpus("team:shared", None)
            .await
            .expect("shared");
        registry
            .add_query_default_corpus("acme", "team:shared")
            .await
            .expect("register");

        // Fully delete the shared corpus out from under the reference.
        registry
            .initiate_delete_corpus(team, shared, "team:shared")
            .await
            .expect("initiate");
        registry
            .finish_delete_corpus(team, shared)
            .await
            .expect("finish");

        let corpora = registry
            .get_query_corpora("acme")
            .await
            .expect("query corpora");
        assert!(corpora.is_empty());

        // Self-healing: the stored set was rewritten without the stale ref.
        let (_, acme_id) = registry
            .get_namespace_ids_by_name("acme")
            .await
            .expect("ids");
        let record: Option<NamespaceRecord> = registry
            .db
            .get_item(&acme_id.to_string())
            .await
            .expect("namespace row");
        assert!(record.expect("row exists").query_default_corpora.is_empty());
    }
}
