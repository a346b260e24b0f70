use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use common::storage::types::{corpus_record::CorpusType, deletion_task::DeletionTask};

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct CreateNamespaceParams {
    pub namespace_pathname: String,
}

pub async fn create_namespace(
    State(state): State<ApiState>,
    Json(params): Json<CreateNamespaceParams>,
) -> Result<impl IntoResponse, ApiError> {
    info!(
        namespace_pathname = %params.namespace_pathname,
        "Create namespace"
    );

    state
        .registry
        .create_namespace(&params.namespace_pathname, None)
        .await?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct CreateCorpusParams {
    pub corpus_pathname: String,
    #[serde(default)]
    pub corpus_type: Option<String>,
}

pub async fn create_corpus(
    State(state): State<ApiState>,
    Json(params): Json<CreateCorpusParams>,
) -> Result<impl IntoResponse, ApiError> {
    let requested_type = params
        .corpus_type
        .as_deref()
        .unwrap_or(CorpusType::Conversation.as_str());
    let corpus_type = CorpusType::parse(requested_type).ok_or_else(|| {
        ApiError::ValidationError(format!("corpus type '{requested_type}' not supported"))
    })?;

    info!(
        corpus_pathname = %params.corpus_pathname,
        corpus_type = corpus_type.as_str(),
        "Create corpus"
    );

    match corpus_type {
        CorpusType::Conversation => {
            state
                .registry
                .create_conversation_corpus(&params.corpus_pathname, None)
                .await?
        }
        CorpusType::Knowledge => {
            state
                .registry
                .create_knowledge_corpus(&params.corpus_pathname, None)
                .await?
        }
    };
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct DeleteCorpusParams {
    pub corpus_pathname: String,
}

/// Synchronous phase of the staged delete: release the name, mark the row,
/// enqueue the deferred content purge.
pub async fn delete_corpus(
    State(state): State<ApiState>,
    Json(params): Json<DeleteCorpusParams>,
) -> Result<impl IntoResponse, ApiError> {
    info!(corpus_pathname = %params.corpus_pathname, "Delete corpus");

    let (namespace_id, corpus_id) = state
        .registry
        .get_corpus_ids_by_name(&params.corpus_pathname)
        .await?;
    state
        .registry
        .initiate_delete_corpus(namespace_id, corpus_id, &params.corpus_pathname)
        .await?;
    DeletionTask::create_and_add_to_db(
        namespace_id,
        corpus_id,
        &params.corpus_pathname,
        &state.db,
    )
    .await?;

    Ok(Json(json!({ "success": true })))
}
