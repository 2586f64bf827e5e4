pub mod indexing;
pub mod initializer;
pub mod optimizer;
pub mod ranker;

use crate::config::TrainingConfig;
use crate::error::TrainingError;
use crate::utils::{binary_cross_entropy, sigmoid};
use indexing::{IndexMaps, TrainingTriple};
use initializer::{rng_from_seed, InitializationMethod};
use ndarray::{arr1, Array1, Array2};
use optimizer::{build_optimizer, Optimizer};
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Instant;
use tracing::{debug, info};

/// Fits a scoring model for one request and returns the ranked product ids.
///
/// Implementations own every piece of model state for the duration of the
/// call; nothing survives the return.
pub trait AffinityTrainer: Send + Sync {
    fn train_and_rank(
        &self,
        user_id: &str,
        maps: &IndexMaps,
        triples: &[TrainingTriple],
        top_k: usize,
        deadline: Instant,
    ) -> Result<Vec<String>, TrainingError>;
}

/// User and product embedding tables joined by a dot product, followed by a
/// one-unit dense layer with sigmoid activation.
///
/// Both tables carry one spare row past the index space so out-of-range
/// lookups land on a real (untrained) vector.
#[derive(Debug, Clone)]
pub struct LatentFactorModel {
    user_embeddings: Array2<f32>,
    product_embeddings: Array2<f32>,
    /// `[weight, bias]` of the output unit.
    head: Array1<f32>,
}

impl LatentFactorModel {
    pub fn new<R: Rng + ?Sized>(
        user_count: usize,
        product_count: usize,
        config: &TrainingConfig,
        rng: &mut R,
    ) -> Self {
        let embedding_init = InitializationMethod::Uniform {
            low: -config.init_scale,
            high: config.init_scale,
        };
        let dim = config.embedding_dim;
        let user_embeddings = embedding_init.initialize_matrix(rng, user_count + 1, dim);
        let product_embeddings = embedding_init.initialize_matrix(rng, product_count + 1, dim);
        let weight = InitializationMethod::XavierUniform.initialize_matrix(rng, 1, 1)[[0, 0]];

        Self {
            user_embeddings,
            product_embeddings,
            head: arr1(&[weight, 0.0]),
        }
    }

    fn user_row(&self, index: usize) -> usize {
        index.min(self.user_embeddings.nrows() - 1)
    }

    fn product_row(&self, index: usize) -> usize {
        index.min(self.product_embeddings.nrows() - 1)
    }

    fn affinity(&self, user_index: usize, product_index: usize) -> f32 {
        self.user_embeddings
            .row(self.user_row(user_index))
            .dot(&self.product_embeddings.row(self.product_row(product_index)))
    }

    pub fn predict(&self, user_index: usize, product_index: usize) -> f32 {
        sigmoid(self.head[0] * self.affinity(user_index, product_index) + self.head[1])
    }

    /// Scores products `0..product_count` for one user.
    pub fn score_products(&self, user_index: usize, product_count: usize) -> Vec<f32> {
        (0..product_count)
            .map(|product_index| self.predict(user_index, product_index))
            .collect()
    }

    /// Mean binary cross-entropy over `triples`.
    pub fn loss(&self, triples: &[TrainingTriple]) -> f32 {
        if triples.is_empty() {
            return 0.0;
        }
        let total: f32 = triples
            .iter()
            .map(|t| binary_cross_entropy(self.predict(t.user_index, t.product_index), t.weight))
            .sum();
        total / triples.len() as f32
    }

    /// Accumulates mean-reduced gradients of the batch loss into `grads` and
    /// returns the summed (not averaged) loss of the batch.
    fn accumulate_gradients(&self, batch: &[&TrainingTriple], grads: &mut Gradients) -> f32 {
        grads.clear();
        let scale = 1.0 / batch.len() as f32;
        let weight = self.head[0];
        let mut batch_loss = 0.0;

        for triple in batch {
            let u = self.user_row(triple.user_index);
            let p = self.product_row(triple.product_index);
            let affinity = self.affinity(u, p);
            let prediction = sigmoid(weight * affinity + self.head[1]);
            batch_loss += binary_cross_entropy(prediction, triple.weight);

            // d(bce)/d(logit) for a sigmoid output
            let delta = (prediction - triple.weight) * scale;
            grads.head[0] += delta * affinity;
            grads.head[1] += delta;
            grads
                .users
                .row_mut(u)
                .scaled_add(delta * weight, &self.product_embeddings.row(p));
            grads
                .products
                .row_mut(p)
                .scaled_add(delta * weight, &self.user_embeddings.row(u));
        }

        batch_loss
    }

    fn apply(&mut self, optimizer: &mut dyn Optimizer, grads: &Gradients) {
        optimizer.step();
        optimizer.update(
            "user_embeddings",
            self.user_embeddings.view_mut().into_dyn(),
            grads.users.view().into_dyn(),
        );
        optimizer.update(
            "product_embeddings",
            self.product_embeddings.view_mut().into_dyn(),
            grads.products.view().into_dyn(),
        );
        optimizer.update("head", self.head.view_mut().into_dyn(), grads.head.view().into_dyn());
    }
}

struct Gradients {
    users: Array2<f32>,
    products: Array2<f32>,
    head: Array1<f32>,
}

impl Gradients {
    fn zeros_like(model: &LatentFactorModel) -> Self {
        Self {
            users: Array2::zeros(model.user_embeddings.raw_dim()),
            products: Array2::zeros(model.product_embeddings.raw_dim()),
            head: Array1::zeros(model.head.raw_dim()),
        }
    }

    fn clear(&mut self) {
        self.users.fill(0.0);
        self.products.fill(0.0);
        self.head.fill(0.0);
    }
}

#[derive(Debug, Clone)]
pub struct LatentFactorTrainer {
    config: TrainingConfig,
}

impl LatentFactorTrainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    /// Trains a fresh model on `triples` with mini-batch gradient descent.
    pub fn fit(
        &self,
        maps: &IndexMaps,
        triples: &[TrainingTriple],
        deadline: Instant,
    ) -> Result<LatentFactorModel, TrainingError> {
        if self.config.embedding_dim == 0 || self.config.batch_size == 0 {
            return Err(TrainingError::InvalidConfig(
                "embedding_dim and batch_size must be positive".to_string(),
            ));
        }
        if triples.is_empty() {
            return Err(TrainingError::EmptyTripleSet);
        }

        let started = Instant::now();
        let mut rng = rng_from_seed(self.config.seed);
        let mut model = LatentFactorModel::new(
            maps.users.index_space(),
            maps.products.index_space(),
            &self.config,
            &mut rng,
        );
        let mut optimizer = build_optimizer(self.config.optimizer, self.config.learning_rate);
        let mut grads = Gradients::zeros_like(&model);
        let mut order: Vec<&TrainingTriple> = triples.iter().collect();

        for epoch in 0..self.config.epochs {
            order.shuffle(&mut rng);
            let mut total = 0.0;

            for batch in order.chunks(self.config.batch_size) {
                if Instant::now() >= deadline {
                    return Err(TrainingError::BudgetExceeded(started.elapsed()));
                }
                total += model.accumulate_gradients(batch, &mut grads);
                model.apply(optimizer.as_mut(), &grads);
            }

            let epoch_loss = total / triples.len() as f32;
            if !epoch_loss.is_finite() {
                return Err(TrainingError::NonFiniteLoss { epoch });
            }
            debug!("Epoch {} finished with loss {:.5}", epoch + 1, epoch_loss);
        }

        info!(
            "Trained latent factor model on {} triples over {} products in {:?} (loss {:.5})",
            triples.len(),
            maps.products.len(),
            started.elapsed(),
            model.loss(triples)
        );
        Ok(model)
    }
}

impl AffinityTrainer for LatentFactorTrainer {
    fn train_and_rank(
        &self,
        user_id: &str,
        maps: &IndexMaps,
        triples: &[TrainingTriple],
        top_k: usize,
        deadline: Instant,
    ) -> Result<Vec<String>, TrainingError> {
        let model = self.fit(maps, triples, deadline)?;
        let user_index = maps.users.get(user_id).unwrap_or(0);
        let scores = model.score_products(user_index, maps.products.index_space());
        Ok(ranker::rank_products(&scores, &maps.products, top_k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OptimizerKind;
    use crate::models::{ActionType, Interaction, Product};
    use std::time::Duration;

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(60)
    }

    fn small_config() -> TrainingConfig {
        TrainingConfig {
            embedding_dim: 8,
            epochs: 300,
            batch_size: 4,
            learning_rate: 0.05,
            optimizer: OptimizerKind::Adam,
            init_scale: 0.5,
            seed: Some(11),
            time_budget_ms: 60_000,
        }
    }

    fn training_set() -> (IndexMaps, Vec<TrainingTriple>) {
        let catalog: Vec<Product> = (0..4).map(|i| Product::new(format!("P{}", i))).collect();
        let mut interactions = Vec::new();
        for _ in 0..4 {
            interactions.push(Interaction::new("P0", ActionType::Purchase));
            interactions.push(Interaction::new("P1", ActionType::View));
            interactions.push(Interaction::new("P2", ActionType::AddToCart));
            interactions.push(Interaction::new("P3", ActionType::AddToWishlist));
        }
        indexing::build_training_set("u1", &catalog, &interactions)
    }

    #[test]
    fn test_tables_have_spare_row() {
        let (maps, _) = training_set();
        let config = TrainingConfig::default().with_seed(1);
        let model = LatentFactorModel::new(1, maps.products.len(), &config, &mut rng_from_seed(Some(1)));

        assert_eq!(model.user_embeddings.dim(), (2, 50));
        assert_eq!(model.product_embeddings.dim(), (5, 50));

        let p = model.predict(0, 1_000);
        assert!(p > 0.0 && p < 1.0);
    }

    #[test]
    fn test_fit_learns_action_weights() {
        let (maps, triples) = training_set();
        let trainer = LatentFactorTrainer::new(small_config());

        let model = trainer.fit(&maps, &triples, far_deadline()).unwrap();
        let purchased = model.predict(0, 0);
        let viewed = model.predict(0, 1);

        assert!(purchased > 0.8, "purchase score {}", purchased);
        assert!(viewed < 0.3, "view score {}", viewed);
        // an untrained model sits near ln(2) for every label
        assert!(model.loss(&triples) < 0.5);
    }

    #[test]
    fn test_fit_is_deterministic_with_seed() {
        let (maps, triples) = training_set();
        let mut config = small_config();
        config.epochs = 3;
        let trainer = LatentFactorTrainer::new(config);

        let a = trainer.fit(&maps, &triples, far_deadline()).unwrap();
        let b = trainer.fit(&maps, &triples, far_deadline()).unwrap();
        assert_eq!(a.score_products(0, 4), b.score_products(0, 4));
    }

    #[test]
    fn test_fit_rejects_empty_triples() {
        let (maps, _) = training_set();
        let trainer = LatentFactorTrainer::new(small_config());
        let err = trainer.fit(&maps, &[], far_deadline()).unwrap_err();
        assert_eq!(err, TrainingError::EmptyTripleSet);
    }

    #[test]
    fn test_fit_respects_deadline() {
        let (maps, triples) = training_set();
        let trainer = LatentFactorTrainer::new(small_config());
        let err = trainer.fit(&maps, &triples, Instant::now()).unwrap_err();
        assert!(matches!(err, TrainingError::BudgetExceeded(_)));
    }

    #[test]
    fn test_fit_detects_divergence() {
        let (maps, triples) = training_set();
        let mut config = small_config();
        config.learning_rate = f64::INFINITY;
        let trainer = LatentFactorTrainer::new(config);

        let err = trainer.fit(&maps, &triples, far_deadline()).unwrap_err();
        assert!(matches!(err, TrainingError::NonFiniteLoss { .. }));
    }

    #[test]
    fn test_train_and_rank_returns_top_k() {
        let (maps, triples) = training_set();
        let trainer = LatentFactorTrainer::new(small_config());

        let ranked = trainer
            .train_and_rank("u1", &maps, &triples, 3, far_deadline())
            .unwrap();
        assert_eq!(ranked, vec!["P0", "P2", "P3"]);

        let all = trainer
            .train_and_rank("u1", &maps, &triples, 10, far_deadline())
            .unwrap();
        assert_eq!(all.len(), 4);
    }
}
