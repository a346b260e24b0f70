use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use common::storage::types::document_record::Citation;
use corpus_pipeline::{group_by_corpus_type, multi_corpus_search, Corpus};

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CitationParams {
    pub source_uri: String,
    pub source_name: String,
    pub description: String,
    pub document_name: String,
}

impl From<CitationParams> for Citation {
    fn from(params: CitationParams) -> Self {
        Citation {
            source_uri: params.source_uri,
            source_name: params.source_name,
            description: params.description,
            document_name: params.document_name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MemorizeParams {
    pub corpus_pathname: String,
    pub document: String,
    #[serde(default)]
    pub citation: CitationParams,
}

pub async fn memorize(
    State(state): State<ApiState>,
    Json(params): Json<MemorizeParams>,
) -> Result<impl IntoResponse, ApiError> {
    let citation: Citation = params.citation.into();

    info!(
        corpus_pathname = %params.corpus_pathname,
        document_name = %citation.document_name,
        "Memorizing"
    );

    let info = state
        .registry
        .get_corpus_info(&params.corpus_pathname)
        .await?;
    let corpus = Corpus::new(info, state.stores.clone())
        .with_max_chunk_chars(state.config.max_chunk_chars);
    let success = corpus.store_and_index(&params.document, &citation).await?;

    info!(success, "Memorize finished");
    Ok(Json(json!({ "success": success })))
}

#[derive(Debug, Deserialize)]
pub struct RecallParams {
    pub namespace_pathname: String,
    pub clue: String,
}

pub async fn recall(
    State(state): State<ApiState>,
    Json(params): Json<RecallParams>,
) -> Result<impl IntoResponse, ApiError> {
    info!(namespace_pathname = %params.namespace_pathname, "Recalling");

    let corpora = state
        .registry
        .get_query_corpora(&params.namespace_pathname)
        .await?;
    debug!(corpora = corpora.len(), "Querying corpora");

    let groups = group_by_corpus_type(corpora);
    let results = multi_corpus_search(
        &state.stores,
        &groups,
        &params.clue,
        state.config.recall_limit,
        state.config.merge_policy,
    )
    .await?;

    let body: Vec<_> = results
        .into_iter()
        .map(|hit| json!({ "document": hit.text, "citation": hit.citation }))
        .collect();
    Ok(Json(body))
}
