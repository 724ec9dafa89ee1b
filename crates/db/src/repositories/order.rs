use sqlx::Row;

use storefront_core::domain::catalog::ItemId;
use storefront_core::domain::order::{Order, OrderId, OrderItem, OrderItemId};

use super::{OrderRepository, RepositoryError};
use crate::DbPool;

pub struct SqlOrderRepository {
    pool: DbPool,
}

impl SqlOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_order_item(row: &sqlx::sqlite::SqliteRow) -> Result<OrderItem, RepositoryError> {
    let decode = |error: sqlx::Error| RepositoryError::Decode(error.to_string());
    let quantity_raw: i64 = row.try_get("quantity").map_err(decode)?;
    let quantity = u32::try_from(quantity_raw).map_err(|_| {
        RepositoryError::Decode(format!("order_item.quantity out of range: {quantity_raw}"))
    })?;

    Ok(OrderItem {
        id: OrderItemId(row.try_get("id").map_err(decode)?),
        order_id: OrderId(row.try_get("order_id").map_err(decode)?),
        item_id: ItemId(row.try_get("item_id").map_err(decode)?),
        ordered: row.try_get("ordered").map_err(decode)?,
        quantity,
    })
}

#[async_trait::async_trait]
impl OrderRepository for SqlOrderRepository {
    async fn list_order_items(&self) -> Result<Vec<OrderItem>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, order_id, item_id, ordered, quantity FROM order_item ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_order_item).collect()
    }

    async fn save_order(&self, order: Order) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO customer_order (id, ref_code, ordered) VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET ref_code = excluded.ref_code, ordered = excluded.ordered",
        )
        .bind(order.id.0)
        .bind(&order.ref_code)
        .bind(order.ordered)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save_order_item(&self, order_item: OrderItem) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO order_item (id, order_id, item_id, ordered, quantity) VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                order_id = excluded.order_id,
                item_id = excluded.item_id,
                ordered = excluded.ordered,
                quantity = excluded.quantity",
        )
        .bind(order_item.id.0)
        .bind(order_item.order_id.0)
        .bind(order_item.item_id.0)
        .bind(order_item.ordered)
        .bind(i64::from(order_item.quantity))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
