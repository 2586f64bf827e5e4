use crate::config::RecommendationConfig;
use crate::models::Product;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Too little signal: serve the tail of the catalog.
    Fallback,
    /// Cached ids are fresh: serve them.
    Cached,
    /// Enough signal but no fresh cache: train a new model.
    Retrain,
}

#[derive(Debug, Clone)]
pub struct FreshnessPolicy {
    min_actions: usize,
    freshness_window: Duration,
    fallback_size: usize,
}

impl FreshnessPolicy {
    pub fn new(min_actions: usize, freshness_window: Duration, fallback_size: usize) -> Self {
        Self {
            min_actions,
            freshness_window,
            fallback_size,
        }
    }

    pub fn from_config(config: &RecommendationConfig) -> Self {
        Self::new(config.min_actions, config.freshness_window(), config.fallback_size)
    }

    pub fn decide(
        &self,
        action_count: usize,
        recommendations: &[String],
        last_trained: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Decision {
        if action_count < self.min_actions {
            return Decision::Fallback;
        }

        let fresh = last_trained
            .map(|trained| now.signed_duration_since(trained) < self.freshness_window)
            .unwrap_or(false);

        if fresh && !recommendations.is_empty() {
            Decision::Cached
        } else {
            Decision::Retrain
        }
    }

    /// The last `fallback_size` catalog products, in catalog order.
    pub fn fallback_products(&self, catalog: &[Product]) -> Vec<Product> {
        let start = catalog.len().saturating_sub(self.fallback_size);
        catalog[start..].to_vec()
    }
}

/// Catalog products whose id is in `ids`, in catalog order. Ids missing from
/// the catalog are dropped.
pub fn select_products(catalog: &[Product], ids: &[String]) -> Vec<Product> {
    let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
    catalog
        .iter()
        .filter(|product| wanted.contains(product.id.as_str()))
        .cloned()
        .collect()
}
