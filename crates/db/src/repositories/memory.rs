use std::collections::{BTreeMap, HashSet};

use tokio::sync::RwLock;

use storefront_core::domain::catalog::{CatalogItem, ItemId};
use storefront_core::domain::order::{Order, OrderId, OrderItem, OrderItemId};

use super::{CatalogRepository, OrderRepository, RepositoryError};

#[derive(Default)]
pub struct InMemoryCatalogRepository {
    items: RwLock<BTreeMap<ItemId, CatalogItem>>,
}

impl InMemoryCatalogRepository {
    pub fn with_items(items: impl IntoIterator<Item = CatalogItem>) -> Self {
        Self { items: RwLock::new(items.into_iter().map(|item| (item.id, item)).collect()) }
    }
}

#[async_trait::async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn list_active_items(&self) -> Result<Vec<CatalogItem>, RepositoryError> {
        let items = self.items.read().await;
        Ok(items.values().rev().filter(|item| item.active).cloned().collect())
    }

    async fn list_all_items(&self) -> Result<Vec<CatalogItem>, RepositoryError> {
        let items = self.items.read().await;
        Ok(items.values().cloned().collect())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<CatalogItem>, RepositoryError> {
        let items = self.items.read().await;
        Ok(items.values().find(|item| item.slug == slug).cloned())
    }

    async fn find_by_ids(&self, ids: &[ItemId]) -> Result<Vec<CatalogItem>, RepositoryError> {
        let wanted = ids.iter().collect::<HashSet<_>>();
        let items = self.items.read().await;
        Ok(items.values().filter(|item| wanted.contains(&item.id)).cloned().collect())
    }

    async fn save(&self, item: CatalogItem) -> Result<(), RepositoryError> {
        let mut items = self.items.write().await;
        items.insert(item.id, item);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<BTreeMap<OrderId, Order>>,
    order_items: RwLock<BTreeMap<OrderItemId, OrderItem>>,
}

#[async_trait::async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn list_order_items(&self) -> Result<Vec<OrderItem>, RepositoryError> {
        let order_items = self.order_items.read().await;
        Ok(order_items.values().cloned().collect())
    }

    async fn save_order(&self, order: Order) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        orders.insert(order.id, order);
        Ok(())
    }

    async fn save_order_item(&self, order_item: OrderItem) -> Result<(), RepositoryError> {
        if !self.orders.read().await.contains_key(&order_item.order_id) {
            return Err(RepositoryError::Decode(format!(
                "order_item {} references unknown order {}",
                order_item.id.0, order_item.order_id.0
            )));
        }
        let mut order_items = self.order_items.write().await;
        order_items.insert(order_item.id, order_item);
        Ok(())
    }
}
