use std::{ops::Deref, sync::Arc};

use surrealdb::{
    engine::any::{connect, Any},
    opt::auth::Root,
    Error, Surreal,
};

use super::types::StoredRecord;

#[derive(Clone)]
pub struct SurrealDbClient {
    pub client: Surreal<Any>,
}

pub trait ProvidesDb {
    fn db(&self) -> &Arc<SurrealDbClient>;
}

impl SurrealDbClient {
    /// Connect, sign in, and select the configured namespace and database.
    pub async fn new(
        address: &str,
        username: &str,
        password: &str,
        namespace: &str,
        database: &str,
    ) -> Result<Self, Error> {
        let db = connect(address).await?;

        // Sign in to database
        db.signin(Root { username, password }).await?;

        // Set namespace
        db.use_ns(namespace).use_db(database).await?;

        Ok(SurrealDbClient { client: db })
    }

    /// Operation to store a record, requires the struct to implement `StoredRecord`.
    ///
    /// Creation is rejected by the database when a record with the same key
    /// already exists, which is what the registry relies on for its
    /// create-if-absent gate. Use [`is_record_exists_conflict`] to classify
    /// the resulting error.
    pub async fn store_item<T>(&self, item: T) -> Result<Option<T>, Error>
    where
        T: StoredRecord + Send + Sync + 'static,
    {
        self.client
            .create((T::table_name(), item.record_key()))
            .content(item)
            .await
    }

    /// Operation to retrieve a single record by its key.
    pub async fn get_item<T>(&self, key: &str) -> Result<Option<T>, Error>
    where
        T: for<'de> StoredRecord,
    {
        self.client.select((T::table_name(), key)).await
    }

    /// Operation to retrieve all records from a table.
    pub async fn get_all_items<T>(&self) -> Result<Vec<T>, Error>
    where
        T: for<'de> StoredRecord,
    {
        self.client.select(T::table_name()).await
    }

    /// Operation to delete a single record by its key.
    pub async fn delete_item<T>(&self, key: &str) -> Result<Option<T>, Error>
    where
        T: for<'de> StoredRecord,
    {
        self.client.delete((T::table_name(), key)).await
    }
}

impl Deref for SurrealDbClient {
    type Target = Surreal<Any>;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

/// Whether an error from [`SurrealDbClient::store_item`] means the record key
/// was already taken, as opposed to an infrastructure failure.
pub fn is_record_exists_conflict(err: &Error) -> bool {
    if let Error::Db(surrealdb::error::Db::RecordExists { .. }) = err {
        return true;
    }
    // Remote engines surface the same condition as an API-level query error.
    err.to_string().contains("already exists")
}

#[cfg(any(test, feature = "test-utils"))]
impl SurrealDbClient {
    /// Create an in-memory SurrealDB client for testing.
    pub async fn memory(namespace: &str, database: &str) -> Result<Self, Error> {
        let db = connect("mem://").await?;

        db.use_ns(namespace).use_db(database).await?;

        Ok(SurrealDbClient { client: db })
    }
}

#[cfg(test)]
mod tests {
    use crate::stored_record;

    use super::*;
    use uuid::Uuid;

    stored_record!(Dummy, "dummy", {
        name: String
    });

    #[tokio::test]
    async fn test_crud_roundtrip() {
        let namespace = "test_ns";
        let database = &Uuid::new_v4().to_string(); // ensures isolation per test run
        let db = SurrealDbClient::memory(namespace, database)
            .await
            .expect("Failed to start in-memory surrealdb");

        let dummy = Dummy {
            id: "abc".to_string(),
            name: "first".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        // Store
        let stored = db.store_item(dummy.clone()).await.expect("Failed to store");
        assert!(stored.is_some());

        // Read
        let fetched = db
            .get_item::<Dummy>(&dummy.id)
            .await
            .expect("Failed to fetch");
        assert_eq!(fetched, Some(dummy.clone()));

        // Read all
        let all = db
            .get_all_items::<Dummy>()
            .await
            .expect("Failed to fetch all");
        assert!(all.contains(&dummy));

        // Delete
        let deleted = db
            .delete_item::<Dummy>(&dummy.id)
            .await
            .expect("Failed to delete");
        assert_eq!(deleted, Some(dummy));

        // After delete, should not be present
        let fetch_post = db
            .get_item::<Dummy>("abc")
            .await
            .expect("Failed fetch post delete");
        assert!(fetch_post.is_none());
    }

    #[tokio::test]
    async fn test_create_conflict_is_classified() {
        let namespace = "test_ns";
        let database = &Uuid::new_v4().to_string();
        let db = SurrealDbClient::memory(namespace, database)
            .await
            .expect("Failed to start in-memory surrealdb");

        let dummy = Dummy {
            id: "taken".to_string(),
            name: "first".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        db.store_item(dummy.clone()).await.expect("first store");

        let err = db
            .store_item(dummy)
            .await
            .expect_err("second store of the same key must fail");
        assert!(is_record_exists_conflict(&err), "got {err:?}");
    }
}
