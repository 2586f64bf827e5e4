use crate::models::{Product, UserAnalyticsRecord};
use crate::services::activity::InMemoryActivityStore;
use crate::services::catalog::InMemoryCatalog;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// On-disk image of the catalog and every user's analytics record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default, alias = "userAnalytics")]
    pub analytics: Vec<UserAnalyticsRecord>,
}

impl Snapshot {
    /// Reads a snapshot, or returns an empty one when `path` does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("Snapshot {} not found, starting empty", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading snapshot {}", path.display()))?;
        let snapshot: Snapshot = serde_json::from_str(&raw)
            .with_context(|| format!("parsing snapshot {}", path.display()))?;

        info!(
            "Loaded snapshot with {} products and {} users",
            snapshot.products.len(),
            snapshot.analytics.len()
        );
        Ok(snapshot)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw).with_context(|| format!("writing snapshot {}", path.display()))?;
        Ok(())
    }

    pub fn into_stores(self) -> (InMemoryCatalog, InMemoryActivityStore) {
        (
            InMemoryCatalog::new(self.products),
            InMemoryActivityStore::from_records(self.analytics),
        )
    }

    pub fn from_stores(catalog: &InMemoryCatalog, store: &InMemoryActivityStore) -> Self {
        Self {
            products: catalog.snapshot(),
            analytics: store.records(),
        }
    }
}
