use std::cmp::Ordering;

use crate::{labels::LabelTable, types::Prediction};

/// Number of predictions kept per frame. The match check only looks at the
/// first two; the rest feed the debug overlay.
pub const TOP_K: usize = 10;

/// Reduce a raw score vector to the `k` highest-confidence predictions.
///
/// Pure function: same vector in, same list out. Scores are sorted
/// descending; equal scores keep their original index order, so ties are
/// broken deterministically by first occurrence.
pub fn top_k(scores: &[f32], labels: &LabelTable, k: usize) -> Vec<Prediction> {
    let mut indexed: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
    // Stable sort keeps ascending-index order among equal scores.
    indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    indexed.truncate(k);

    indexed
        .into_iter()
        .map(|(index, score)| Prediction {
            label: labels
                .get(index)
                .unwrap_or_else(|| panic!("score index {index} outside label table"))
                .to_string(),
            score,
        })
        .collect()
}
