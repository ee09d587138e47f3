//! Product persistence.
//!
//! [`ProductStore`] is the seam between the HTTP layer and a backend. Every
//! method is a single atomic operation on one record; nothing spans records.
//!
//! Ids arrive as the raw path segment. A string that is not a well-formed
//! [`ObjectId`] can never name a stored product, so backends report it as
//! [`StoreError::NotFound`], exactly like a well-formed id that is absent.

mod memory;
mod redis;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::StoreUrl;
use crate::id::ObjectId;
use crate::product::{NewProduct, Product, ProductPatch};

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("product not found")]
    NotFound,

    #[error("backend unavailable: {0}")]
    Backend(#[from] ::redis::RedisError),

    #[error("stored product `{key}` is unreadable: {detail}")]
    Corrupt { key: String, detail: String },
}

/// The store handle shared by every request handler.
pub type SharedStore = Arc<dyn ProductStore>;

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Persists a validated product under a new id.
    async fn create(&self, product: NewProduct) -> Result<Product, StoreError>;

    /// Every stored product, in id order (creation order within a process).
    async fn list(&self) -> Result<Vec<Product>, StoreError>;

    async fn get(&self, id: &str) -> Result<Product, StoreError>;

    /// Merges `patch` into the record and returns the result.
    async fn update(&self, id: &str, patch: ProductPatch) -> Result<Product, StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Succeeds when the backend can serve requests.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Connects to the backend `url` names.
pub async fn connect(url: &StoreUrl) -> Result<SharedStore, StoreError> {
    let store: SharedStore = match url {
        StoreUrl::Memory => Arc::new(MemoryStore::new()),
        StoreUrl::Redis(url) => Arc::new(RedisStore::connect(url).await?),
    };
    tracing::info!(backend = ?url, "product store connected");
    Ok(store)
}

/// Parses a path id, folding malformed ids into `NotFound`.
fn parse_id(id: &str) -> Result<ObjectId, StoreError> {
    id.parse().map_err(|_| StoreError::NotFound)
}
