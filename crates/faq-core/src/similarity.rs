//! Batched cosine similarity.
//!
//! Candidates are stacked into one matrix and scored against the query with
//! a single matrix-vector product. Scores are clipped to `[0, 1]`.

use faq_db::FaqVectorEntry;
use nalgebra::{DMatrix, DVector};

fn usable_norm(norm: f32) -> bool {
    norm.is_finite() && norm > 0.0
}

fn clip(score: f32) -> f32 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// Score each candidate against the query.
///
/// Returns one score per candidate, in input order. A candidate scores 0
/// when either norm is zero or non-finite, or when its dimension differs
/// from the query's.
pub fn score_batch<'a, I>(query: &[f32], query_norm: f32, candidates: I) -> Vec<f32>
where
    I: IntoIterator<Item = &'a FaqVectorEntry>,
{
    let entries: Vec<&FaqVectorEntry> = candidates.into_iter().collect();
    let mut scores = vec![0.0f32; entries.len()];

    let dim = query.len();
    if dim == 0 || !usable_norm(query_norm) {
        return scores;
    }

    let rows: Vec<usize> = entries
        .iter()
        .enumerate()
        .filter(|(_, e)| e.dimension() == dim && usable_norm(e.norm))
        .map(|(i, _)| i)
        .collect();
    if rows.is_empty() {
        return scores;
    }

    let matrix = DMatrix::from_row_iterator(
        rows.len(),
        dim,
        rows.iter().flat_map(|&i| entries[i].vector.iter().copied()),
    );
    let q = DVector::from_column_slice(query);
    let dots = &matrix * &q;

    for (row, &i) in rows.iter().enumerate() {
        scores[i] = clip(dots[row] / (query_norm * entries[i].norm));
    }
    scores
}

/// Cosine similarity of two vectors with known norms, clipped to `[0, 1]`.
#[cfg(test)]
fn cosine(a: &[f32], a_norm: f32, b: &[f32], b_norm: f32) -> f32 {
    if a.len() != b.len() || !usable_norm(a_norm) || !usable_norm(b_norm) {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    clip(dot / (a_norm * b_norm))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorizer::l2_norm;
    use faq_db::FaqId;

    fn entry(id: u64, vector: Vec<f32>) -> FaqVectorEntry {
        let norm = l2_norm(&vector);
        FaqVectorEntry {
            faq_id: FaqId(id),
            model_id: "m".to_string(),
            vector,
            norm,
        }
    }

    #[test]
    fn test_self_similarity_is_one() {
        let v = vec![1.0, 2.0, 0.0, 3.0];
        let scores = score_batch(&v, l2_norm(&v), [&entry(1, v.clone())]);
        assert!((scores[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_vectors_score_zero() {
        let v = vec![1.0, 2.0];
        let zero = entry(2, vec![0.0, 0.0]);
        assert_eq!(score_batch(&v, l2_norm(&v), [&zero]), vec![0.0]);
        assert_eq!(
            score_batch(&[0.0, 0.0], 0.0, [&entry(1, v.clone())]),
            vec![0.0]
        );
    }

    #[test]
    fn test_batch_matches_pairwise_cosine() {
        let query = vec![1.0, 0.0, 1.0];
        let qn = l2_norm(&query);
        let candidates = vec![
            entry(1, vec![1.0, 0.0, 0.0]),
            entry(2, vec![0.0, 1.0, 0.0]),
            entry(3, vec![2.0, 0.0, 2.0]),
        ];

        let scores = score_batch(&query, qn, &candidates);
        assert_eq!(scores.len(), 3);
        for (score, c) in scores.iter().zip(&candidates) {
            let expected = cosine(&query, qn, &c.vector, c.norm);
            assert!((score - expected).abs() < 1e-6);
        }
        assert!((scores[0] - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
        assert_eq!(scores[1], 0.0);
        assert!((scores[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_scores_clipped_to_unit_interval() {
        let query = vec![1.0, 0.0];
        let negative = entry(1, vec![-1.0, 0.0]);
        // Norm understated on purpose: the raw ratio exceeds 1
        let mut inflated = entry(2, vec![3.0, 0.0]);
        inflated.norm = 1.0;

        let scores = score_batch(&query, 1.0, [&negative, &inflated]);
        assert_eq!(scores, vec![0.0, 1.0]);
    }

    #[test]
    fn test_dimension_mismatch_scores_zero() {
        let query = vec![1.0, 1.0];
        let qn = l2_norm(&query);
        let scores = score_batch(
            &query,
            qn,
            [&entry(1, vec![1.0, 1.0, 1.0]), &entry(2, vec![1.0, 1.0])],
        );
        assert_eq!(scores[0], 0.0);
        assert!((scores[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_non_finite_norm_scores_zero() {
        let query = vec![1.0];
        let mut e = entry(1, vec![1.0]);
        e.norm = f32::NAN;
        assert_eq!(score_batch(&query, 1.0, [&e]), vec![0.0]);
        assert_eq!(score_batch(&query, f32::INFINITY, [&entry(2, vec![1.0])]), vec![0.0]);
    }

    #[test]
    fn test_empty_batch() {
        let empty: Vec<FaqVectorEntry> = Vec::new();
        assert!(score_batch(&[1.0], 1.0, &empty).is_empty());
    }
}
