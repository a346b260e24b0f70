use anyhow::{Context, Result};
use serde_json::Value;
use tracing::info;

use crate::{error::AppError, storage::db::SurrealDbClient};

const FTS_ANALYZER_NAME: &str = "memory_fts_analyzer";
const CHUNK_FTS_INDEX: &str = "doc_chunk_text_fts_idx";
const VECTOR_HNSW_INDEX: &str = "vector_chunk_embedding_idx";
const CHUNK_TABLE: &str = "doc_chunk";
const VECTOR_TABLE: &str = "vector_chunk";
const HNSW_OPTIONS: &str = "DIST EUCLIDEAN TYPE F32 EFC 100 M 8";

/// Build the runtime Surreal indexes (FTS + HNSW). Idempotent; when the
/// embedding dimension changed since the last run the HNSW index is
/// re-defined with `OVERWRITE`.
pub async fn ensure_indexes(db: &SurrealDbClient, embedding_dimension: usize) -> Result<(), AppError> {
    ensure_indexes_inner(db, embedding_dimension)
        .await
        .map_err(|err| AppError::InternalError(err.to_string()))
}

async fn ensure_indexes_inner(db: &SurrealDbClient, embedding_dimension: usize) -> Result<()> {
    create_fts_analyzer(db).await?;

    let fts_definition = format!(
        "DEFINE INDEX IF NOT EXISTS {CHUNK_FTS_INDEX} ON TABLE {CHUNK_TABLE} \
         FIELDS text SEARCH ANALYZER {FTS_ANALYZER_NAME} BM25;"
    );
    run_definition(db, fts_definition, CHUNK_FTS_INDEX).await?;

    ensure_hnsw_index(db, embedding_dimension).await
}

async fn ensure_hnsw_index(db: &SurrealDbClient, dimension: usize) -> Result<()> {
    let definition = match hnsw_index_state(db, dimension).await? {
        HnswIndexState::Missing | HnswIndexState::Matches(_) => format!(
            "DEFINE INDEX IF NOT EXISTS {VECTOR_HNSW_INDEX} ON TABLE {VECTOR_TABLE} \
             FIELDS embedding HNSW DIMENSION {dimension} {HNSW_OPTIONS};"
        ),
        HnswIndexState::Different(existing) => {
            info!(
                index = VECTOR_HNSW_INDEX,
                existing_dimension = existing,
                target_dimension = dimension,
                "Overwriting HNSW index to match new embedding dimension"
            );
            format!(
                "DEFINE INDEX OVERWRITE {VECTOR_HNSW_INDEX} ON TABLE {VECTOR_TABLE} \
                 FIELDS embedding HNSW DIMENSION {dimension} {HNSW_OPTIONS};"
            )
        }
    };

    run_definition(db, definition, VECTOR_HNSW_INDEX).await
}

enum HnswIndexState {
    Missing,
    Matches(u64),
    Different(u64),
}

async fn hnsw_index_state(db: &SurrealDbClient, expected_dimension: usize) -> Result<HnswIndexState> {
    let info_query = format!("INFO FOR TABLE {VECTOR_TABLE};");
    let mut response = db
        .client
        .query(info_query)
        .await
        .with_context(|| format!("fetching table info for {VECTOR_TABLE}"))?;

    let info: surrealdb::Value = response
        .take(0)
        .context("failed to take table info response")?;

    let info_json: Value =
        serde_json::to_value(info).context("serializing table info to JSON for parsing")?;

    let Some(indexes) = info_json
        .get("Object")
        .and_then(|o| o.get("indexes"))
        .and_then(|i| i.get("Object"))
        .and_then(|i| i.as_object())
    else {
        return Ok(HnswIndexState::Missing);
    };

    let Some(definition) = indexes
        .get(VECTOR_HNSW_INDEX)
        .and_then(|details| details.get("Strand"))
        .and_then(|v| v.as_str())
    else {
        return Ok(HnswIndexState::Missing);
    };

    let Some(current_dimension) = extract_dimension(definition) else {
        return Ok(HnswIndexState::Missing);
    };

    if current_dimension == expected_dimension as u64 {
        Ok(HnswIndexState::Matches(current_dimension))
    } else {
        Ok(HnswIndexState::Different(current_dimension))
    }
}

fn extract_dimension(definition: &str) -> Option<u64> {
    definition
        .split("DIMENSION")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|token| token.trim_end_matches(';').parse::<u64>().ok())
}

async fn create_fts_analyzer(db: &SurrealDbClient) -> Result<()> {
    let analyzer_query = format!(
        "DEFINE ANALYZER IF NOT EXISTS {FTS_ANALYZER_NAME}
            TOKENIZERS class
            FILTERS lowercase, ascii, snowball(english);"
    );

    let res = db
        .client
        .query(analyzer_query)
        .await
        .context("creating FTS analyzer")?;

    res.check().context("failed to create FTS analyzer")?;
    Ok(())
}

async fn run_definition(db: &SurrealDbClient, definition: String, index_name: &str) -> Result<()> {
    let res = db
        .client
        .query(definition)
        .await
        .with_context(|| format!("creating index {index_name}"))?;
    res.check()
        .with_context(|| format!("index definition failed for {index_name}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn extract_dimension_parses_value() {
        let definition = "DEFINE INDEX vector_chunk_embedding_idx ON TABLE vector_chunk FIELDS embedding HNSW DIMENSION 384 DIST EUCLIDEAN TYPE F32 EFC 100 M 8;";
        assert_eq!(extract_dimension(definition), Some(384));
    }

    #[tokio::test]
    async fn ensure_indexes_is_idempotent() {
        let namespace = "indexes_ns";
        let database = &Uuid::new_v4().to_string();
        let db = SurrealDbClient::memory(namespace, database)
            .await
            .expect("in-memory db");

        // First run creates everything
        ensure_indexes(&db, 384)
            .await
            .expect("initial index creation");

        // Second run should be a no-op and still succeed
        ensure_indexes(&db, 384)
            .await
            .expect("second index creation");
    }

    #[tokio::test]
    async fn ensure_indexes_overwrites_on_dimension_change() {
        let namespace = "indexes_dim";
        let database = &Uuid::new_v4().to_string();
        let db = SurrealDbClient::memory(namespace, database)
            .await
            .expect("in-memory db");

        ensure_indexes(&db, 384)
            .await
            .expect("initial index creation");

        // Change dimension and ensure the overwrite path is exercised
        ensure_indexes(&db, 64)
            .await
            .expect("overwritten index creation");
    }
}
