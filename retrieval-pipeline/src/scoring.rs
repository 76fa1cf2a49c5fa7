use std::collections::HashMap;

/// Rank constant for reciprocal rank fusion. Dampens the gap between
/// top ranks so one ranker cannot dominate the fused ordering.
pub const RRF_K: f32 = 60.0;

/// Fuses the vector and lexical rankings into one ordered id list.
///
/// `score(doc) = Σ 1/(rank + 60)` over the lists that contain the doc,
/// with 0-based ranks; a document missing from a list simply contributes
/// nothing for it. Ties are broken by the document's vector-search rank
/// (itself deterministic), documents absent from the vector list ranking
/// last, with the id as a final stable fallback.
pub fn reciprocal_rank_fusion(
    vector_ranked: &[String],
    lexical_ranked: &[String],
    take: usize,
) -> Vec<String> {
    let mut fused: HashMap<&str, f32> = HashMap::new();
    let mut vector_rank: HashMap<&str, usize> = HashMap::new();

    for (rank, id) in vector_ranked.iter().enumerate() {
        *fused.entry(id.as_str()).or_insert(0.0) += 1.0 / (rank as f32 + RRF_K);
        vector_rank.entry(id.as_str()).or_insert(rank);
    }
    for (rank, id) in lexical_ranked.iter().enumerate() {
        *fused.entry(id.as_str()).or_insert(0.0) += 1.0 / (rank as f32 + RRF_K);
    }

    let mut ranked: Vec<(&str, f32)> = fused.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                let rank_a = vector_rank.get(a.0).copied().unwrap_or(usize::MAX);
                let rank_b = vector_rank.get(b.0).copied().unwrap_or(usize::MAX);
                rank_a.cmp(&rank_b)
            })
            .then_with(|| a.0.cmp(b.0))
    });
    ranked.truncate(take);

    ranked.into_iter().map(|(id, _)| id.to_owned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_owned()).collect()
    }

    #[test]
    fn top_of_both_lists_wins() {
        let vector = ids(&["a", "b", "c"]);
        let lexical = ids(&["a", "c", "d"]);

        let fused = reciprocal_rank_fusion(&vector, &lexical, 4);
        assert_eq!(fused.first().map(String::as_str), Some("a"));
    }

    #[test]
    fn presence_in_both_lists_beats_a_single_high_rank() {
        // "b" is second in both lists; "a" only leads the vector list.
        // 1/61 + 1/61 > 1/60, so agreement wins.
        let vector = ids(&["a", "b"]);
        let lexical = ids(&["c", "b"]);

        let fused = reciprocal_rank_fusion(&vector, &lexical, 3);
        assert_eq!(fused.first().map(String::as_str), Some("b"));
    }

    #[test]
    fn missing_from_one_list_contributes_nothing() {
        // "d" only appears in the lexical list at rank 2; it must not be
        // treated as rank 0 of the vector list.
        let vector = ids(&["a"]);
        let lexical = ids(&["b", "c", "d"]);

        let fused = reciprocal_rank_fusion(&vector, &lexical, 4);
        assert_eq!(fused.last().map(String::as_str), Some("d"));
    }

    #[test]
    fn equal_scores_fall_back_to_vector_rank() {
        // "a" and "b" hold the same rank in exactly one list each, so
        // their fused scores are identical; the vector-ranked document
        // must come first.
        let vector = ids(&["a"]);
        let lexical = ids(&["b"]);

        let fused = reciprocal_rank_fusion(&vector, &lexical, 2);
        assert_eq!(fused, ids(&["a", "b"]));
    }

    #[test]
    fn result_is_truncated_to_take() {
        let vector = ids(&["a", "b", "c", "d"]);
        let lexical = ids(&[]);
        let fused = reciprocal_rank_fusion(&vector, &lexical, 2);
        assert_eq!(fused.len(), 2);
    }
}
