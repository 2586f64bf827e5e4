use super::indexing::IdIndex;
use crate::utils::top_k_indices;

/// Orders products by descending score and keeps the first `top_k` ids.
///
/// `scores[i]` belongs to product index `i`. Ties keep index order, which is
/// catalog order for every catalog product.
pub fn rank_products(scores: &[f32], products: &IdIndex, top_k: usize) -> Vec<String> {
    top_k_indices(scores, top_k)
        .into_iter()
        .filter_map(|index| products.id(index).map(str::to_string))
        .collect()
}
