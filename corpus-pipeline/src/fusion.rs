use std::cmp::Ordering;

use common::storage::types::document_record::Citation;

/// One ranked search result. Inside a corpus-type group the score is on a
/// shared additive scale; across groups scores are NOT comparable.
#[derive(Debug, Clone)]
pub struct ScoredHit {
    pub score: f32,
    pub text: String,
    pub citation: Citation,
}

fn sort_by_score_desc(hits: &mut [ScoredHit]) {
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
}

fn char_len(text: &str) -> f32 {
    text.chars().count() as f32
}

/// Fuse one group's lexical and vector rankings into a single list.
///
/// Lexical scores (higher better) are min-max normalized to [0, 1], with a
/// constant 1.0 when every score is equal. Vector scores are L2 distances
/// over unit vectors (lower better, bounded by 2), mapped onto the same
/// additive scale via `2 - distance`. A vector hit whose text is contained
/// in a lexical hit is folded into that hit: the containing document earns
/// the vector reward scaled by its length relative to the mean document
/// length, and the vector hit is dropped as a duplicate. Vector hits no
/// document contains are kept as standalone results.
///
/// When one side is empty the other side's own ordering is used as is.
pub fn normalize_and_combine(
    doc_hits: Vec<ScoredHit>,
    vec_hits: Vec<ScoredHit>,
) -> Vec<ScoredHit> {
    if vec_hits.is_empty() {
        let mut docs = doc_hits;
        sort_by_score_desc(&mut docs);
        return docs;
    }
    if doc_hits.is_empty() {
        // Ascending distance, re-expressed so higher stays better.
        let mut vecs: Vec<ScoredHit> = vec_hits
            .into_iter()
            .map(|hit| ScoredHit {
                score: 2.0 - hit.score,
                ..hit
            })
            .collect();
        sort_by_score_desc(&mut vecs);
        return vecs;
    }

    let doc_min = doc_hits
        .iter()
        .map(|hit| hit.score)
        .fold(f32::INFINITY, f32::min);
    let doc_max = doc_hits
        .iter()
        .map(|hit| hit.score)
        .fold(f32::NEG_INFINITY, f32::max);

    let mut docs: Vec<ScoredHit> = doc_hits
        .into_iter()
        .map(|mut hit| {
            // Equal scores normalize to a constant instead of dividing by zero.
            hit.score = if (doc_max - doc_min).abs() < f32::EPSILON {
                1.0
            } else {
                (hit.score - doc_min) / (doc_max - doc_min)
            };
            hit
        })
        .collect();

    let vecs: Vec<ScoredHit> = vec_hits
        .into_iter()
        .map(|mut hit| {
            hit.score = 2.0 - hit.score;
            hit
        })
        .collect();

    let avg_doc_len = if docs.is_empty() {
        1.0
    } else {
        docs.iter().map(|hit| char_len(&hit.text)).sum::<f32>() / docs.len() as f32
    };

    let mut duplicate = vec![false; vecs.len()];
    for doc in &mut docs {
        let doc_len = char_len(&doc.text);
        for (index, vec_hit) in vecs.iter().enumerate() {
            if doc.text.contains(&vec_hit.text) {
                duplicate[index] = true;
                // Longer documents absorb more sentences, so their reward for
                // containing a match scales with their relative length.
                doc.score += (doc_len / avg_doc_len) * vec_hit.score;
            }
        }
    }

    docs.extend(
        vecs.into_iter()
            .zip(duplicate)
            .filter(|(_, is_duplicate)| !is_duplicate)
            .map(|(hit, _)| hit),
    );

    sort_by_score_desc(&mut docs);
    docs
}

/// Merge per-group rankings by taking rank 1 from each group, then rank 2,
/// and so on. Cross-group scores are not on a shared scale, so position is
/// the only fair comparison. The result budget is a hard cap, honored even
/// mid-round; exhausted groups are skipped without stalling the rest.
pub fn interleave_by_rank(groups: Vec<Vec<ScoredHit>>, result_limit: usize) -> Vec<ScoredHit> {
    let mut results = Vec::new();
    if result_limit == 0 {
        return results;
    }

    let mut rank = 0;
    loop {
        let mut any_left = false;
        for group in &groups {
            if let Some(hit) = group.get(rank) {
                any_left = true;
                results.push(hit.clone());
                if results.len() >= result_limit {
                    return results;
                }
            }
        }
        if !any_left {
            return results;
        }
        rank += 1;
    }
}

/// Alternative merge that pretends group scores share one scale. Kept behind
/// a config flag; see `MergePolicy`.
pub fn merge_by_global_score(groups: Vec<Vec<ScoredHit>>, result_limit: usize) -> Vec<ScoredHit> {
    let mut results: Vec<ScoredHit> = groups.into_iter().flatten().collect();
    sort_by_score_desc(&mut results);
    results.truncate(result_limit);
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(score: f32, text: &str) -> ScoredHit {
        ScoredHit {
            score,
            text: text.to_owned(),
            citation: Citation {
                source_uri: String::new(),
                source_name: text.to_owned(),
                description: String::new(),
                document_name: String::new(),
            },
        }
    }

    fn texts(hits: &[ScoredHit]) -> Vec<&str> {
        hits.iter().map(|hit| hit.text.as_str()).collect()
    }

    #[test]
    fn doc_only_results_sort_by_descending_score() {
        let fused = normalize_and_combine(
            vec![hit(1.0, "low"), hit(5.0, "high"), hit(3.0, "mid")],
            Vec::new(),
        );
        assert_eq!(texts(&fused), vec!["high", "mid", "low"]);
    }

    #[test]
    fn vector_only_results_sort_by_ascending_distance() {
        let fused = normalize_and_combine(
            Vec::new(),
            vec![hit(1.4, "far"), hit(0.2, "near"), hit(0.9, "middle")],
        );
        assert_eq!(texts(&fused), vec!["near", "middle", "far"]);
        assert!((fused[0].score - 1.8).abs() < 1e-6);
    }

    #[test]
    fn equal_doc_scores_normalize_to_one() {
        let fused = normalize_and_combine(
            vec![hit(2.5, "first first first"), hit(2.5, "second second")],
            vec![hit(1.9, "no containment")],
        );
        // Both docs at 1.0, the unique vector hit at 2 - 1.9 = 0.1.
        let doc_scores: Vec<f32> = fused
            .iter()
            .filter(|hit| hit.text.starts_with("first") || hit.text.starts_with("second"))
            .map(|hit| hit.score)
            .collect();
        assert!(doc_scores.iter().all(|score| (score - 1.0).abs() < 1e-6));
        assert!(fused.iter().any(|hit| (hit.score - 0.1).abs() < 1e-6));
    }

    #[test]
    fn contained_vector_hits_reward_their_document_and_disappear() {
        let fused = normalize_and_combine(
            vec![hit(3.0, "alpha beta gamma"), hit(1.0, "delta")],
            vec![hit(0.5, "beta"), hit(1.5, "unrelated")],
        );

        // "beta" is folded into its containing document: doc lengths are 16
        // and 5 chars, so avg is 10.5 and the reward is (16/10.5) * 1.5 on
        // top of the normalized score 1.0.
        assert_eq!(texts(&fused), vec!["alpha beta gamma", "unrelated", "delta"]);
        let expected = 1.0 + (16.0 / 10.5) * 1.5;
        assert!((fused[0].score - expected).abs() < 1e-5, "got {}", fused[0].score);
        assert!((fused[1].score - 0.5).abs() < 1e-6);
        assert!(fused[2].score.abs() < 1e-6);
        assert!(!fused.iter().any(|hit| hit.text == "beta"));
    }

    #[test]
    fn longer_documents_earn_larger_containment_rewards() {
        // Same vector hit contained in both docs; the longer one must come
        // out ahead even though both normalize to the same base score.
        let long_text = "shared phrase plus a lot of additional surrounding context";
        let short_text = "shared phrase";
        let fused = normalize_and_combine(
            vec![hit(2.0, long_text), hit(2.0, short_text)],
            vec![hit(0.4, "shared phrase")],
        );

        assert_eq!(fused[0].text, long_text);
        assert!(fused[0].score > fused[1].score);
        // The short doc equals the vector text, so it also contains it and
        // the vector hit never shows up standalone.
        assert_eq!(fused.len(), 2);
    }

    #[test]
    fn interleave_takes_one_rank_from_each_group_per_round() {
        let groups = vec![
            vec![hit(0.9, "a1")],
            vec![hit(0.8, "b1"), hit(0.7, "b2")],
            vec![hit(0.6, "c1"), hit(0.5, "c2"), hit(0.4, "c3")],
        ];
        let merged = interleave_by_rank(groups, 10);
        assert_eq!(texts(&merged), vec!["a1", "b1", "c1", "b2", "c2", "c3"]);
    }

    #[test]
    fn interleave_stops_mid_round_at_the_limit() {
        let groups = vec![
            vec![hit(0.9, "a1"), hit(0.8, "a2")],
            vec![hit(0.7, "b1"), hit(0.6, "b2")],
        ];
        let merged = interleave_by_rank(groups, 3);
        assert_eq!(texts(&merged), vec!["a1", "b1", "a2"]);
    }

    #[test]
    fn interleave_handles_empty_groups() {
        assert!(interleave_by_rank(Vec::new(), 5).is_empty());

        let groups = vec![Vec::new(), vec![hit(0.7, "b1"), hit(0.6, "b2")]];
        let merged = interleave_by_rank(groups, 5);
        assert_eq!(texts(&merged), vec!["b1", "b2"]);

        assert!(interleave_by_rank(vec![vec![hit(0.5, "x")]], 0).is_empty());
    }

    #[test]
    fn global_score_merge_ignores_group_boundaries() {
        let groups = vec![
            vec![hit(0.9, "a1"), hit(0.2, "a2")],
            vec![hit(0.8, "b1")],
        ];
        let merged = merge_by_global_score(groups, 2);
        assert_eq!(texts(&merged), vec!["a1", "b1"]);
    }
}
