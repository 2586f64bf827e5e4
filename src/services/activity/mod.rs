use crate::error::StoreError;
use crate::models::{Interaction, UserAnalyticsRecord};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Per-user interaction history and cached recommendation metadata.
#[async_trait::async_trait]
pub trait ActivityStore: Send + Sync {
    /// Recorded actions for `user_id`; empty when the user has no record.
    async fn fetch_user_actions(&self, user_id: &str) -> Result<Vec<Interaction>, StoreError>;

    async fn fetch_analytics(&self, user_id: &str) -> Result<Option<UserAnalyticsRecord>, StoreError>;

    /// Replaces `recommendations` and `lastTrained` together.
    async fn update_cache(
        &self,
        user_id: &str,
        recommendations: &[String],
        trained_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

/// Reads a user's interaction log from the activity store.
#[derive(Clone)]
pub struct ActionLog {
    store: Arc<dyn ActivityStore>,
}

impl ActionLog {
    pub fn new(store: Arc<dyn ActivityStore>) -> Self {
        Self { store }
    }

    pub async fn fetch_actions(&self, user_id: &str) -> Result<Vec<Interaction>, StoreError> {
        let actions = self.store.fetch_user_actions(user_id).await?;
        debug!("Fetched {} actions for user {}", actions.len(), user_id);
        Ok(actions)
    }
}

/// Writes freshly trained recommendation ids back to the activity store.
#[derive(Clone)]
pub struct CacheWriter {
    store: Arc<dyn ActivityStore>,
}

impl CacheWriter {
    pub fn new(store: Arc<dyn ActivityStore>) -> Self {
        Self { store }
    }

    pub async fn persist(
        &self,
        user_id: &str,
        product_ids: &[String],
        trained_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        match self.store.update_cache(user_id, product_ids, trained_at).await {
            Ok(()) => {
                debug!("Cached {} recommendations for user {}", product_ids.len(), user_id);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to cache recommendations for user {}: {}", user_id, e);
                Err(e)
            }
        }
    }
}

/// Activity store held in process memory, keyed by user id.
#[derive(Debug, Default)]
pub struct InMemoryActivityStore {
    records: DashMap<String, UserAnalyticsRecord>,
}

impl InMemoryActivityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = UserAnalyticsRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store.insert(record);
        }
        store
    }

    pub fn insert(&self, record: UserAnalyticsRecord) {
        self.records.insert(record.user_id.clone(), record);
    }

    pub fn get(&self, user_id: &str) -> Option<UserAnalyticsRecord> {
        self.records.get(user_id).map(|record| record.clone())
    }

    /// Applies a tracked storefront event, creating the record if needed.
    pub fn record_event(&self, user_id: &str, product_id: &str, action: &str, at: DateTime<Utc>) -> bool {
        self.records
            .entry(user_id.to_string())
            .or_insert_with(|| UserAnalyticsRecord::new(user_id))
            .record_event(product_id, action, at)
    }

    /// All records, ordered by user id.
    pub fn records(&self) -> Vec<UserAnalyticsRecord> {
        let mut records: Vec<UserAnalyticsRecord> =
            self.records.iter().map(|entry| entry.value().clone()).collect();
        records.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        records
    }
}

#[async_trait::async_trait]
impl ActivityStore for InMemoryActivityStore {
    async fn fetch_user_actions(&self, user_id: &str) -> Result<Vec<Interaction>, StoreError> {
        Ok(self
            .records
            .get(user_id)
            .map(|record| record.actions.clone())
            .unwrap_or_default())
    }

    async fn fetch_analytics(&self, user_id: &str) -> Result<Option<UserAnalyticsRecord>, StoreError> {
        Ok(self.get(user_id))
    }

    async fn update_cache(
        &self,
        user_id: &str,
        recommendations: &[String],
        trained_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut record = self
            .records
            .entry(user_id.to_string())
            .or_insert_with(|| UserAnalyticsRecord::new(user_id));
        record.recommendations = recommendations.to_vec();
        record.last_trained = Some(trained_at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActionType;

    #[tokio::test]
    async fn test_missing_user_has_no_actions() {
        let store: Arc<dyn ActivityStore> = Arc::new(InMemoryActivityStore::new());
        let log = ActionLog::new(store.clone());

        assert!(log.fetch_actions("nobody").await.unwrap().is_empty());
        assert!(store.fetch_analytics("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fetch_actions_returns_log() {
        let store = InMemoryActivityStore::from_records(vec![UserAnalyticsRecord::new("u1")
            .with_actions(vec![
                Interaction::new("p1", ActionType::View),
                Interaction::new("p2", ActionType::Purchase),
            ])]);
        let log = ActionLog::new(Arc::new(store));

        let actions = log.fetch_actions("u1").await.unwrap();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[1].product_id, "p2");
    }

    #[tokio::test]
    async fn test_cache_writer_updates_both_fields() {
        let store = Arc::new(InMemoryActivityStore::new());
        store.insert(UserAnalyticsRecord::new("u1").with_actions(vec![Interaction::new("p1", ActionType::View)]));
        let writer = CacheWriter::new(store.clone());
        let trained_at = Utc::now();

        writer
            .persist("u1", &["p3".to_string(), "p1".to_string()], trained_at)
            .await
            .unwrap();

        let record = store.get("u1").unwrap();
        assert_eq!(record.recommendations, vec!["p3", "p1"]);
        assert_eq!(record.last_trained, Some(trained_at));
        assert_eq!(record.actions.len(), 1);
    }

    #[test]
    fn test_record_event_upserts() {
        let store = InMemoryActivityStore::new();
        assert!(store.record_event("u9", "p1", "add_to_cart", Utc::now()));
        assert_eq!(store.get("u9").unwrap().actions.len(), 1);
        assert_eq!(store.records().len(), 1);
    }
}
