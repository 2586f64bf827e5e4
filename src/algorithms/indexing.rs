use crate::models::{Interaction, Product};
use std::collections::BTreeMap;

/// Bidirectional mapping between opaque ids and dense indices.
#[derive(Debug, Clone, Default)]
pub struct IdIndex {
    forward: BTreeMap<String, usize>,
    reverse: Vec<String>,
}

impl IdIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index for `id`, assigning the next free one if unseen.
    pub fn insert(&mut self, id: &str) -> usize {
        if let Some(&index) = self.forward.get(id) {
            return index;
        }
        let index = self.reverse.len();
        self.forward.insert(id.to_string(), index);
        self.reverse.push(id.to_string());
        index
    }

    pub fn get(&self, id: &str) -> Option<usize> {
        self.forward.get(id).copied()
    }

    pub fn id(&self, index: usize) -> Option<&str> {
        self.reverse.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.reverse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reverse.is_empty()
    }

    /// `max(index) + 1`, the row count an embedding table must cover.
    pub fn index_space(&self) -> usize {
        self.reverse.len()
    }

    pub fn ids(&self) -> &[String] {
        &self.reverse
    }
}

#[derive(Debug, Clone, Default)]
pub struct IndexMaps {
    pub users: IdIndex,
    pub products: IdIndex,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingTriple {
    pub user_index: usize,
    pub product_index: usize,
    pub weight: f32,
}

/// Indexes the whole catalog (plus any interacted product missing from it)
/// and turns the user's interactions into weighted training triples.
pub fn build_training_set(
    user_id: &str,
    catalog: &[Product],
    interactions: &[Interaction],
) -> (IndexMaps, Vec<TrainingTriple>) {
    let mut maps = IndexMaps::default();

    for product in catalog {
        maps.products.insert(&product.id);
    }

    let user_index = maps.users.insert(user_id);

    let triples = interactions
        .iter()
        .map(|interaction| TrainingTriple {
            user_index,
            product_index: maps.products.insert(&interaction.product_id),
            weight: interaction.action_type.weight(),
        })
        .collect();

    (maps, triples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActionType;

    fn catalog(n: usize) -> Vec<Product> {
        (1..=n).map(|i| Product::new(format!("P{}", i))).collect()
    }

    #[test]
    fn test_id_index_is_bijective() {
        let mut index = IdIndex::new();
        assert_eq!(index.insert("a"), 0);
        assert_eq!(index.insert("b"), 1);
        assert_eq!(index.insert("a"), 0);
        assert_eq!(index.len(), 2);
        assert_eq!(index.get("b"), Some(1));
        assert_eq!(index.id(1), Some("b"));
        assert_eq!(index.id(2), None);
        assert_eq!(index.index_space(), 2);
    }

    #[test]
    fn test_catalog_indexed_in_snapshot_order() {
        let products = vec![Product::new("z"), Product::new("a"), Product::new("m")];
        let (maps, triples) = build_training_set("u1", &products, &[]);

        assert_eq!(maps.products.ids(), &["z", "a", "m"]);
        assert_eq!(maps.users.len(), 1);
        assert_eq!(maps.users.get("u1"), Some(0));
        assert!(triples.is_empty());
    }

    #[test]
    fn test_interactions_become_weighted_triples() {
        let interactions = vec![
            Interaction::new("P2", ActionType::Purchase),
            Interaction::new("P3", ActionType::AddToCart),
            Interaction::new("P1", ActionType::AddToWishlist),
            Interaction::new("P1", ActionType::View),
            Interaction::new("P4", ActionType::from("share")),
        ];
        let (maps, triples) = build_training_set("u1", &catalog(5), &interactions);

        assert_eq!(maps.products.len(), 5);
        let weights: Vec<f32> = triples.iter().map(|t| t.weight).collect();
        assert_eq!(weights, vec![1.0, 0.7, 0.5, 0.1, 0.0]);
        let products: Vec<usize> = triples.iter().map(|t| t.product_index).collect();
        assert_eq!(products, vec![1, 2, 0, 0, 3]);
        assert!(triples.iter().all(|t| t.user_index == 0));
    }

    #[test]
    fn test_unknown_products_are_appended() {
        let interactions = vec![
            Interaction::new("gone", ActionType::View),
            Interaction::new("P1", ActionType::View),
            Interaction::new("gone", ActionType::Purchase),
        ];
        let (maps, triples) = build_training_set("u1", &catalog(3), &interactions);

        assert_eq!(maps.products.len(), 4);
        assert_eq!(maps.products.get("gone"), Some(3));
        assert_eq!(triples[0].product_index, 3);
        assert_eq!(triples[2].product_index, 3);
    }
}
