use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub recommendation: RecommendationConfig,
    pub training: TrainingConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationConfig {
    /// Below this many recorded actions the fallback list is served.
    pub min_actions: usize,
    pub freshness_window_hours: i64,
    pub fallback_size: usize,
    pub top_k: usize,
}

impl RecommendationConfig {
    pub fn freshness_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.freshness_window_hours)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    Adam,
    AdaGrad,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub embedding_dim: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub optimizer: OptimizerKind,
    /// Half-width of the uniform range embeddings start from.
    pub init_scale: f32,
    pub seed: Option<u64>,
    pub time_budget_ms: u64,
}

impl TrainingConfig {
    pub fn time_budget(&self) -> Duration {
        Duration::from_millis(self.time_budget_ms)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub snapshot_path: PathBuf,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            min_actions: 50,
            freshness_window_hours: 3,
            fallback_size: 10,
            top_k: 10,
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            embedding_dim: 50,
            epochs: 5,
            batch_size: 32,
            learning_rate: 0.001,
            optimizer: OptimizerKind::Adam,
            init_scale: 0.05,
            seed: None,
            time_budget_ms: 30_000,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("data/snapshot.json"),
        }
    }
}

impl Config {
    /// Loads the defaults, then the file at `path` (if any), then
    /// `SHOPREC__*` environment overrides.
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        let defaults = config::Config::try_from(&Config::default())?;
        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("SHOPREC").separator("__"))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        crate::utils::validation::validate_config(&config)?;
        Ok(config)
    }
}
