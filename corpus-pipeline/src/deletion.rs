use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use common::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        types::deletion_task::{DeletionTask, DEFAULT_LEASE_SECS},
    },
};
use namespace_registry::MetadataRegistry;

use crate::corpus::CorpusStores;

/// Complete a staged corpus deletion: re-derive where the synchronous phase
/// got to, re-run it if it was interrupted, purge the corpus content, and
/// drop the remaining metadata. Safe to re-enter from any intermediate
/// state, including after the deletion already completed.
pub async fn process_deletion(
    registry: &MetadataRegistry,
    stores: &CorpusStores,
    task: &DeletionTask,
    grace: Duration,
) -> Result<(), AppError> {
    // Let the synchronous phase's writes settle before re-deriving state.
    sleep(grace).await;

    let namespace_id = parse_task_uuid(&task.namespace_id, "namespace_id")?;
    let corpus_id = parse_task_uuid(&task.corpus_id, "corpus_id")?;

    let mut needs_initiate = false;
    match registry.get_corpus_info(&task.corpus_pathname).await {
        // The name still points at this corpus: the synchronous phase never
        // finished. Re-run it before purging.
        Ok(info) if info.corpus_id == corpus_id => needs_initiate = true,
        // The pathname was already reused by a different corpus; this
        // deletion proceeds purely by id and must not touch the new owner.
        Ok(_) => {}
        // Expected: the original initiate already released the name.
        Err(AppError::NamespaceDoesNotExist(_)) => {
            debug!(corpus_pathname = %task.corpus_pathname, "Name already released")
        }
        Err(err) => return Err(err),
    }

    if needs_initiate {
        registry
            .initiate_delete_corpus(namespace_id, corpus_id, &task.corpus_pathname)
            .await?;
        warn!(
            corpus_id = %corpus_id,
            corpus_pathname = %task.corpus_pathname,
            "Corpus deletion was interrupted earlier but recovered"
        );
    }

    // On re-delivery after a completed run the metadata row is already gone;
    // the purge and finish below are no-ops then.
    match registry.get_corpus_info_by_id(namespace_id, corpus_id).await {
        Ok(_) => {}
        Err(AppError::InternalInconsistency(_)) => {
            debug!(corpus_id = %corpus_id, "Corpus metadata row already removed")
        }
        Err(err) => return Err(err),
    }

    // Content must be purged before the metadata row goes away, otherwise a
    // crash here would orphan unreachable rows in the content stores.
    stores.delete_all_content(corpus_id).await?;
    registry.finish_delete_corpus(namespace_id, corpus_id).await
}

fn parse_task_uuid(value: &str, field: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(value)
        .map_err(|_| AppError::Validation(format!("deletion task {field} \"{value}\" is not a uuid")))
}

/// Claim-and-process loop for deferred corpus deletions. One instance per
/// worker process; concurrent workers coordinate through the task lease.
pub async fn run_deletion_worker(
    db: Arc<SurrealDbClient>,
    registry: Arc<MetadataRegistry>,
    stores: CorpusStores,
    grace: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let worker_id = format!("deletion-worker-{}", Uuid::new_v4());
    let lease_duration = Duration::from_secs(DEFAULT_LEASE_SECS as u64);
    let idle_backoff = Duration::from_millis(500);

    loop {
        match DeletionTask::claim_next_ready(&db, &worker_id, Utc::now(), lease_duration).await {
            Ok(Some(task)) => {
                info!(
                    %worker_id,
                    task_id = %task.id,
                    corpus_pathname = %task.corpus_pathname,
                    attempt = task.attempts,
                    "claimed corpus deletion task"
                );
                match process_deletion(&registry, &stores, &task, grace).await {
                    Ok(()) => {
                        if let Err(err) = task.mark_succeeded(&db).await {
                            error!(%worker_id, task_id = %task.id, error = %err, "failed to mark deletion task done");
                        }
                    }
                    Err(err) => {
                        error!(%worker_id, task_id = %task.id, error = %err, "corpus deletion task failed");
                        if let Err(mark_err) = task.mark_failed(err.to_string(), &db).await {
                            error!(%worker_id, task_id = %task.id, error = %mark_err, "failed to mark deletion task failed");
                        }
                    }
                }
            }
            Ok(None) => {
                sleep(idle_backoff).await;
            }
            Err(err) => {
                error!(%worker_id, error = %err, "failed to claim deletion task");
                sleep(Duration::from_secs(1)).await;
            }
        }
    }
}
