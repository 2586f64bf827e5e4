pub mod policy;

use crate::algorithms::indexing::build_training_set;
use crate::algorithms::{AffinityTrainer, LatentFactorTrainer};
use crate::config::Config;
use crate::error::RecommendationError;
use crate::models::*;
use crate::services::activity::{ActionLog, ActivityStore, CacheWriter};
use crate::services::catalog::Catalog;
use crate::utils::validation::validate_user_id;
use chrono::Utc;
use policy::{select_products, Decision, FreshnessPolicy};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

pub struct RecommendationService {
    catalog: Arc<dyn Catalog>,
    store: Arc<dyn ActivityStore>,
    action_log: ActionLog,
    cache_writer: CacheWriter,
    trainer: Arc<dyn AffinityTrainer>,
    policy: FreshnessPolicy,
    config: Arc<Config>,
}

impl RecommendationService {
    pub fn new(catalog: Arc<dyn Catalog>, store: Arc<dyn ActivityStore>, config: Arc<Config>) -> Self {
        let trainer = Arc::new(LatentFactorTrainer::new(config.training.clone()));
        Self::with_trainer(catalog, store, trainer, config)
    }

    pub fn with_trainer(
        catalog: Arc<dyn Catalog>,
        store: Arc<dyn ActivityStore>,
        trainer: Arc<dyn AffinityTrainer>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            action_log: ActionLog::new(store.clone()),
            cache_writer: CacheWriter::new(store.clone()),
            policy: FreshnessPolicy::from_config(&config.recommendation),
            catalog,
            store,
            trainer,
            config,
        }
    }

    pub async fn get_recommendations(&self, user_id: &str) -> Result<RecommendationResult, RecommendationError> {
        validate_user_id(user_id).map_err(|e| RecommendationError::InvalidUser(e.to_string()))?;

        let request_id = Uuid::new_v4();
        let products = self.catalog.list_products().await?;
        let actions = self.action_log.fetch_actions(user_id).await?;
        let analytics = self.store.fetch_analytics(user_id).await?;

        let (recommendations, last_trained) = analytics
            .map(|record| (record.recommendations, record.last_trained))
            .unwrap_or_default();

        let decision = self
            .policy
            .decide(actions.len(), &recommendations, last_trained, Utc::now());
        info!(
            "Request {} for user {}: {} actions, decision {:?}",
            request_id,
            user_id,
            actions.len(),
            decision
        );

        match decision {
            Decision::Fallback => Ok(RecommendationResult::new(
                request_id,
                RecommendationSource::Fallback,
                self.policy.fallback_products(&products),
            )),
            Decision::Cached => Ok(RecommendationResult::new(
                request_id,
                RecommendationSource::Cached,
                select_products(&products, &recommendations),
            )),
            Decision::Retrain => self.retrain(request_id, user_id, products, actions).await,
        }
    }

    async fn retrain(
        &self,
        request_id: Uuid,
        user_id: &str,
        products: Vec<Product>,
        actions: Vec<Interaction>,
    ) -> Result<RecommendationResult, RecommendationError> {
        let (maps, triples) = build_training_set(user_id, &products, &actions);

        let ranked = if triples.is_empty() {
            Vec::new()
        } else {
            let trainer = self.trainer.clone();
            let owner = user_id.to_string();
            let top_k = self.config.recommendation.top_k;
            let deadline = Instant::now() + self.config.training.time_budget();

            let outcome = tokio::task::spawn_blocking(move || {
                trainer.train_and_rank(&owner, &maps, &triples, top_k, deadline)
            })
            .await
            .map_err(|e| {
                error!("Training task for user {} aborted: {}", user_id, e);
                RecommendationError::Internal(format!("training task failed: {}", e))
            })?;

            match outcome {
                Ok(ranked) => ranked,
                Err(e) => {
                    warn!("Training failed for user {}, serving fallback: {}", user_id, e);
                    return Ok(RecommendationResult::new(
                        request_id,
                        RecommendationSource::Fallback,
                        self.policy.fallback_products(&products),
                    )
                    .with_warning(format!("training failed: {}", e)));
                }
            }
        };

        let result = RecommendationResult::new(
            request_id,
            RecommendationSource::Trained,
            select_products(&products, &ranked),
        );

        match self.cache_writer.persist(user_id, &ranked, Utc::now()).await {
            Ok(()) => Ok(result),
            Err(e) => Ok(result.with_warning(format!("recommendations not cached: {}", e))),
        }
    }
}
