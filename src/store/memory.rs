//! In-process store for local runs and tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ProductStore, StoreError, parse_id};
use crate::id::ObjectId;
use crate::product::{NewProduct, Product, ProductPatch};

/// Products kept in an ordered map behind an async lock. Each operation
/// holds the lock for its whole read-modify-write, so it is atomic.
#[derive(Default)]
pub struct MemoryStore {
    products: RwLock<BTreeMap<ObjectId, Product>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn create(&self, product: NewProduct) -> Result<Product, StoreError> {
        let product = Product::create(ObjectId::new(), product);
        self.products.write().await.insert(product.id, product.clone());
        Ok(product)
    }

    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self.products.read().await.values().cloned().collect())
    }

    async fn get(&self, id: &str) -> Result<Product, StoreError> {
        let id = parse_id(id)?;
        self.products.read().await.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn update(&self, id: &str, patch: ProductPatch) -> Result<Product, StoreError> {
        let id = parse_id(id)?;
        let mut products = self.products.write().await;
        let product = products.get_mut(&id).ok_or(StoreError::NotFound)?;
        product.apply(patch);
        Ok(product.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let id = parse_id(id)?;
        self.products.write().await.remove(&id).map(drop).ok_or(StoreError::NotFound)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
