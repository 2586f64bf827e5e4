pub mod validation;

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Binary cross-entropy against a soft label in `[0, 1]`.
pub fn binary_cross_entropy(prediction: f32, label: f32) -> f32 {
    let p = prediction.clamp(1e-7, 1.0 - 1e-7);
    -(label * p.ln() + (1.0 - label) * (1.0 - p).ln())
}

/// Indices of the `k` highest scores, best first. Equal scores keep their
/// original order.
pub fn top_k_indices(scores: &[f32], k: usize) -> Vec<usize> {
    let mut indexed_scores: Vec<(usize, f32)> = scores
        .iter()
        .enumerate()
        .map(|(i, &score)| (i, score))
        .collect();

    indexed_scores.sort_by(|a, b| b.1.total_cmp(&a.1));

    indexed_scores
        .into_iter()
        .take(k)
        .map(|(i, _)| i)
        .collect()
}
