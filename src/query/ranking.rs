/// Indices of the `k` highest scores, best first.
///
/// The sort is stable, so equal scores keep their original order. NaN
/// scores are never selected.
pub fn top_k(scores: &[f32], k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len())
        .filter(|&i| !scores[i].is_nan())
        .collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    order.truncate(k);
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descending_order() {
        assert_eq!(top_k(&[0.1, 0.9, 0.5], 3), vec![1, 2, 0]);
    }

    #[test]
    fn test_ties_keep_original_order() {
        assert_eq!(top_k(&[0.5, 0.7, 0.5, 0.7], 4), vec![1, 3, 0, 2]);
    }

    #[test]
    fn test_nan_scores_are_skipped() {
        assert_eq!(top_k(&[0.2, f32::NAN, 0.9, f32::NAN], 4), vec![2, 0]);
        assert!(top_k(&[f32::NAN], 1).is_empty());
    }

    #[test]
    fn test_truncates_and_handles_small_inputs() {
        assert_eq!(top_k(&[0.3, 0.2, 0.1], 2), vec![0, 1]);
        assert_eq!(top_k(&[0.3], 5), vec![0]);
        assert!(top_k(&[], 3).is_empty());
        assert!(top_k(&[1.0], 0).is_empty());
    }
}
