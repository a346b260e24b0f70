use std::collections::BTreeMap;

use futures::future::try_join_all;
use tracing::{debug, error};
use uuid::Uuid;

use common::{
    error::AppError,
    storage::{
        citation_store::CitationStore, document_store::DocumentStore,
        types::corpus_record::CorpusType, vector_store::VectorStore,
    },
    utils::config::MergePolicy,
};
use namespace_registry::CorpusInfo;

use crate::{
    corpus::CorpusStores,
    fusion::{interleave_by_rank, merge_by_global_score, normalize_and_combine, ScoredHit},
};

/// Search one corpus-type group: a single document-store query and a single
/// vector-store query across the whole id set, fused into one ranking.
pub async fn corpora_search(
    stores: &CorpusStores,
    corpus_ids: &[Uuid],
    clue: &str,
) -> Result<Vec<ScoredHit>, AppError> {
    let (doc_hits, vec_hits) = tokio::try_join!(
        stores.documents.search(corpus_ids, clue),
        stores.vectors.search(corpus_ids, clue),
    )?;

    // A vector hit whose span disagrees with its stored text means the index
    // is corrupt; returning citations for it would be wrong, so abort.
    for hit in &vec_hits {
        let span = hit.end_offset.saturating_sub(hit.start_offset);
        let actual = hit.text.chars().count();
        if span != actual {
            error!(
                document_id = %hit.document_id,
                span,
                actual,
                "Vector hit span does not match its stored text"
            );
            return Err(AppError::ContentSpanMismatch {
                expected: span,
                actual,
            });
        }
    }

    // Citations are independent point reads; fetch them concurrently.
    let scored_docs = try_join_all(doc_hits.into_iter().map(|hit| async move {
        let citation = stores.citations.get(hit.corpus_id, hit.document_id).await?;
        Ok::<_, AppError>(ScoredHit {
            score: hit.score,
            text: hit.text,
            citation,
        })
    }))
    .await?;

    let scored_vecs = try_join_all(vec_hits.into_iter().map(|hit| async move {
        let citation = stores.citations.get(hit.corpus_id, hit.document_id).await?;
        Ok::<_, AppError>(ScoredHit {
            score: hit.distance,
            text: hit.text,
            citation,
        })
    }))
    .await?;

    Ok(normalize_and_combine(scored_docs, scored_vecs))
}

/// Search across many corpora grouped by corpus type and merge the group
/// rankings under a hard result budget. Groups are searched concurrently;
/// their rankings are merged per the configured policy.
pub async fn multi_corpus_search(
    stores: &CorpusStores,
    groups: &BTreeMap<CorpusType, Vec<CorpusInfo>>,
    clue: &str,
    result_limit: usize,
    merge_policy: MergePolicy,
) -> Result<Vec<ScoredHit>, AppError> {
    if groups.is_empty() || result_limit == 0 {
        return Ok(Vec::new());
    }

    debug!(groups = groups.len(), result_limit, "Multi corpus search");

    let searches = groups.values().map(|infos| {
        let corpus_ids: Vec<Uuid> = infos.iter().map(|info| info.corpus_id).collect();
        async move { corpora_search(stores, &corpus_ids, clue).await }
    });
    let group_results = try_join_all(searches).await?;

    Ok(match merge_policy {
        MergePolicy::Interleave => interleave_by_rank(group_results, result_limit),
        MergePolicy::GlobalScore => merge_by_global_score(group_results, result_limit),
    })
}

/// Group a namespace's query corpora by corpus type, in deterministic type
/// order.
pub fn group_by_corpus_type(corpora: Vec<CorpusInfo>) -> BTreeMap<CorpusType, Vec<CorpusInfo>> {
    let mut groups: BTreeMap<CorpusType, Vec<CorpusInfo>> = BTreeMap::new();
    for info in corpora {
        groups.entry(info.corpus_type).or_default().push(info);
    }
    groups
}
