use std::time::Duration;

use surrealdb::sql::Datetime as SurrealDatetime;
use uuid::Uuid;

use crate::{error::AppError, storage::db::SurrealDbClient, stored_record};

pub const MAX_ATTEMPTS: i64 = 3;
pub const DEFAULT_LEASE_SECS: i64 = 300;

#[derive(Debug, Default, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeletionState {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl DeletionState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

// Deferred corpus-deletion work item. The synchronous delete phase enqueues
// one of these after freeing the corpus pathname; a worker claims it under a
// lease and completes the content purge. Tasks must stay safe to re-deliver.
stored_record!(DeletionTask, "deletion_task", {
    namespace_id: String,
    corpus_id: String,
    corpus_pathname: String,
    state: DeletionState,
    attempts: i64,
    max_attempts: i64,
    lease_duration_secs: i64,
    worker_id: Option<String>,
    #[serde(
        serialize_with = "serialize_option_datetime",
        deserialize_with = "deserialize_option_datetime",
        default
    )]
    locked_at: Option<DateTime<Utc>>,
    error_message: Option<String>
});

impl DeletionTask {
    pub fn new(namespace_id: Uuid, corpus_id: Uuid, corpus_pathname: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            namespace_id: namespace_id.to_string(),
            corpus_id: corpus_id.to_string(),
            corpus_pathname: corpus_pathname.to_owned(),
            state: DeletionState::Pending,
            attempts: 0,
            max_attempts: MAX_ATTEMPTS,
            lease_duration_secs: DEFAULT_LEASE_SECS,
            worker_id: None,
            locked_at: None,
            error_message: None,
        }
    }

    pub async fn create_and_add_to_db(
        namespace_id: Uuid,
        corpus_id: Uuid,
        corpus_pathname: &str,
        db: &SurrealDbClient,
    ) -> Result<Self, AppError> {
        let task = Self::new(namespace_id, corpus_id, corpus_pathname);
        db.store_item(task.clone()).await?;
        Ok(task)
    }

    /// Claim the next runnable task under a lease. Pending and retryable
    /// failed tasks are eligible, as are running tasks whose lease expired
    /// (their worker died mid-purge).
    pub async fn claim_next_ready(
        db: &SurrealDbClient,
        worker_id: &str,
        now: DateTime<Utc>,
        lease_duration: Duration,
    ) -> Result<Option<Self>, AppError> {
        const CLAIM_QUERY: &str = r#"
            UPDATE (
                SELECT * FROM type::table($table)
                WHERE (
                        state IN $fresh_states AND attempts < max_attempts
                        OR (
                            state = $running_state
                            AND locked_at != NONE
                            AND time::unix($now) - time::unix(locked_at) >= lease_duration_secs
                        )
                  )
                ORDER BY created_at ASC
                LIMIT 1
            )
            SET state = $running_state,
                attempts = attempts + 1,
                locked_at = $now,
                worker_id = $worker_id,
                lease_duration_secs = $lease_secs,
                updated_at = $now
            RETURN *;
        "#;

        let mut result = db
            .client
            .query(CLAIM_QUERY)
            .bind(("table", Self::table_name()))
            .bind((
                "fresh_states",
                vec![
                    DeletionState::Pending.as_str(),
                    DeletionState::Failed.as_str(),
                ],
            ))
            .bind(("running_state", DeletionState::Running.as_str()))
            .bind(("now", SurrealDatetime::from(now)))
            .bind(("worker_id", worker_id.to_owned()))
            .bind(("lease_secs", lease_duration.as_secs() as i64))
            .await?;

        let task: Option<Self> = result.take(0)?;
        Ok(task)
    }

    pub async fn mark_succeeded(&self, db: &SurrealDbClient) -> Result<(), AppError> {
        self.finish(db, DeletionState::Succeeded, None).await
    }

    pub async fn mark_failed(
        &self,
        error_message: String,
        db: &SurrealDbClient,
    ) -> Result<(), AppError> {
        self.finish(db, DeletionState::Failed, Some(error_message))
            .await
    }

    async fn finish(
        &self,
        db: &SurrealDbClient,
        state: DeletionState,
        error_message: Option<String>,
    ) -> Result<(), AppError> {
        const FINISH_QUERY: &str = r#"
            UPDATE type::thing($table, $id)
            SET state = $state,
                locked_at = NONE,
                worker_id = NONE,
                error_message = $error_message,
                updated_at = $now
            WHERE state = $running_state AND worker_id = $worker_id
            RETURN *;
        "#;

        let mut result = db
            .client
            .query(FINISH_QUERY)
            .bind(("table", Self::table_name()))
            .bind(("id", self.id.clone()))
            .bind(("state", state.as_str()))
            .bind(("running_state", DeletionState::Running.as_str()))
            .bind(("error_message", error_message))
            .bind(("now", SurrealDatetime::from(Utc::now())))
            .bind(("worker_id", self.worker_id.clone().unwrap_or_default()))
            .await?;

        let updated: Option<Self> = result.take(0)?;
        updated.map(|_| ()).ok_or_else(|| {
            AppError::Validation(format!(
                "deletion task {} is no longer held by worker {:?}",
                self.id, self.worker_id
            ))
        })
    }
}
