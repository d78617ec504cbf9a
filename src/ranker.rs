//! Similarity ranking: cosine over the shared topic basis, stable top-N.
//!
//! Pure functions — no store access, no state. Callers align their vectors
//! over the same dimension basis before ranking.

use std::cmp::Ordering;

/// Cosine similarity between two equal-length vectors.
///
/// Defined as 0.0 when either vector has zero magnitude, so a blank profile
/// or an untagged space never divides by zero.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "vectors must share a basis");

    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Select the top `n` candidates by cosine similarity to `query`,
/// descending. The sort is stable: candidates with equal scores keep their
/// input order, which for creation-ordered input means earliest-created
/// first. An empty candidate list yields an empty result.
pub fn rank_top_n<I: Clone>(
    query: &[f64],
    candidates: &[(I, Vec<f64>)],
    n: usize,
) -> Vec<(I, f64)> {
    let mut scored: Vec<(usize, f64)> = candidates
        .iter()
        .enumerate()
        .map(|(i, (_, vector))| (i, cosine_similarity(query, vector)))
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored.truncate(n);

    scored
        .into_iter()
        .map(|(i, score)| (candidates[i].0.clone(), score))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_self_similarity_is_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_vector_similarity_is_zero() {
        let zero = vec![0.0, 0.0, 0.0];
        let v = vec![1.0, 2.0, 3.0];
        assert_eq!(cosine_similarity(&zero, &v), 0.0);
        assert_eq!(cosine_similarity(&v, &zero), 0.0);
        assert_eq!(cosine_similarity(&zero, &zero), 0.0);
    }

    #[test]
    fn test_orthogonal_vectors() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn test_rank_orders_by_similarity() {
        let query = vec![1.0, 0.0];
        let candidates = vec![
            ("far", vec![0.0, 1.0]),
            ("near", vec![1.0, 0.1]),
            ("exact", vec![2.0, 0.0]),
        ];
        let ranked = rank_top_n(&query, &candidates, 3);
        let ids: Vec<&str> = ranked.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec!["exact", "near", "far"]);
    }

    #[test]
    fn test_rank_ties_keep_input_order() {
        let query = vec![1.0, 1.0];
        let candidates = vec![
            ("first", vec![1.0, 0.0]),
            ("second", vec![0.0, 1.0]),
            ("third", vec![1.0, 0.0]),
        ];
        let ranked = rank_top_n(&query, &candidates, 3);
        let ids: Vec<&str> = ranked.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_rank_truncates_and_handles_empty() {
        let query = vec![1.0];
        let candidates = vec![("a", vec![1.0]), ("b", vec![2.0])];
        assert_eq!(rank_top_n(&query, &candidates, 1).len(), 1);

        let none: Vec<(&str, Vec<f64>)> = Vec::new();
        assert!(rank_top_n(&query, &none, 5).is_empty());
    }

    proptest! {
        #[test]
        fn prop_cosine_bounded(
            (a, b) in (1usize..12).prop_flat_map(|len| (
                prop::collection::vec(0.0f64..100.0, len),
                prop::collection::vec(0.0f64..100.0, len),
            ))
        ) {
            let sim = cosine_similarity(&a, &b);
            prop_assert!((-1.0 - 1e-9..=1.0 + 1e-9).contains(&sim));
        }

        #[test]
        fn prop_self_similarity(
            v in prop::collection::vec(0.0f64..100.0, 1..12)
        ) {
            let sim = cosine_similarity(&v, &v);
            let norm: f64 = v.iter().map(|x| x * x).sum::<f64>().sqrt();
            if norm == 0.0 {
                prop_assert_eq!(sim, 0.0);
            } else {
                prop_assert!((sim - 1.0).abs() < 1e-9);
            }
        }

        #[test]
        fn prop_rank_never_exceeds_n(
            n in 0usize..8,
            vectors in prop::collection::vec(
                prop::collection::vec(0.0f64..10.0, 3),
                0..10,
            )
        ) {
            let query = [1.0, 2.0, 3.0];
            let candidates: Vec<(usize, Vec<f64>)> =
                vectors.into_iter().enumerate().collect();
            let ranked = rank_top_n(&query, &candidates, n);
            prop_assert!(ranked.len() <= n);
            prop_assert!(ranked.len() <= candidates.len());
        }
    }
}
