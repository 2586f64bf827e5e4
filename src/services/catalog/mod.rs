use crate::error::StoreError;
use crate::models::Product;
use parking_lot::RwLock;

/// Source of the candidate product set.
#[async_trait::async_trait]
pub trait Catalog: Send + Sync {
    /// A snapshot of every product, in catalog order.
    async fn list_products(&self) -> Result<Vec<Product>, StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: RwLock<Vec<Product>>,
}

impl InMemoryCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self {
            products: RwLock::new(products),
        }
    }

    pub fn len(&self) -> usize {
        self.products.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.read().is_empty()
    }

    pub fn snapshot(&self) -> Vec<Product> {
        self.products.read().clone()
    }
}

#[async_trait::async_trait]
impl Catalog for InMemoryCatalog {
    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_snapshot_keeps_order() {
        let catalog = InMemoryCatalog::new(vec![
            Product::new("b").with_attribute("title", json!("Lamp")),
            Product::new("a"),
            Product::new("c"),
        ]);

        let products = catalog.list_products().await.unwrap();
        let ids: Vec<&str> = products.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert_eq!(products[0].attributes["title"], json!("Lamp"));
        assert_eq!(catalog.len(), 3);
    }
}
