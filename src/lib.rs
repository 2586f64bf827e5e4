pub mod algorithms;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use crate::config::Config;
pub use crate::error::{RecommendationError, StoreError, TrainingError};
pub use models::*;

use services::activity::{ActivityStore, InMemoryActivityStore};
use services::catalog::{Catalog, InMemoryCatalog};
use services::recommendation::RecommendationService;
use services::snapshot::Snapshot;
use std::sync::Arc;
use utils::validation::validate_user_id;

/// In-process wiring of the engine over snapshot-backed collaborators.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<InMemoryCatalog>,
    pub activity_store: Arc<InMemoryActivityStore>,
    pub recommendation_service: Arc<RecommendationService>,
}

impl AppState {
    pub fn new(config: Config, snapshot: Snapshot) -> Self {
        let config = Arc::new(config);
        let (catalog, activity_store) = snapshot.into_stores();
        let catalog = Arc::new(catalog);
        let activity_store = Arc::new(activity_store);

        let recommendation_service = Arc::new(RecommendationService::new(
            catalog.clone() as Arc<dyn Catalog>,
            activity_store.clone() as Arc<dyn ActivityStore>,
            config.clone(),
        ));

        Self {
            config,
            catalog,
            activity_store,
            recommendation_service,
        }
    }

    /// Applies a storefront event to the user's action log. Returns whether
    /// the log changed.
    pub fn record_event(&self, user_id: &str, product_id: &str, action: &str) -> Result<bool, RecommendationError> {
        validate_user_id(user_id).map_err(|e| RecommendationError::InvalidUser(e.to_string()))?;
        Ok(self
            .activity_store
            .record_event(user_id, product_id, action, chrono::Utc::now()))
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from_stores(&self.catalog, &self.activity_store)
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over `default_level`.
pub fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
