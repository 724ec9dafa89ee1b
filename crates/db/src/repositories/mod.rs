use async_trait::async_trait;
use thiserror::Error;

use storefront_core::domain::catalog::{CatalogItem, ItemId};
use storefront_core::domain::order::{Order, OrderItem};

pub mod catalog;
pub mod memory;
pub mod order;

pub use catalog::SqlCatalogRepository;
pub use memory::{InMemoryCatalogRepository, InMemoryOrderRepository};
pub use order::SqlOrderRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Active items, newest first, the order the storefront listing uses.
    async fn list_active_items(&self) -> Result<Vec<CatalogItem>, RepositoryError>;
    async fn list_all_items(&self) -> Result<Vec<CatalogItem>, RepositoryError>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<CatalogItem>, RepositoryError>;
    /// Records for `ids` in no particular order; unknown ids are skipped.
    async fn find_by_ids(&self, ids: &[ItemId]) -> Result<Vec<CatalogItem>, RepositoryError>;
    async fn save(&self, item: CatalogItem) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn list_order_items(&self) -> Result<Vec<OrderItem>, RepositoryError>;
    async fn save_order(&self, order: Order) -> Result<(), RepositoryError>;
    async fn save_order_item(&self, order_item: OrderItem) -> Result<(), RepositoryError>;
}
