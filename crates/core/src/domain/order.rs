use serde::{Deserialize, Serialize};

use crate::domain::catalog::ItemId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderItemId(pub i64);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub ref_code: Option<String>,
    pub ordered: bool,
}

/// One line of an order. `ordered` flips to true once checkout completes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub item_id: ItemId,
    pub ordered: bool,
    pub quantity: u32,
}

impl OrderItem {
    pub fn checked_out(id: i64, order_id: i64, item_id: i64, quantity: u32) -> Self {
        Self {
            id: OrderItemId(id),
            order_id: OrderId(order_id),
            item_id: ItemId(item_id),
            ordered: true,
            quantity,
        }
    }

    pub fn in_cart(id: i64, order_id: i64, item_id: i64, quantity: u32) -> Self {
        Self { ordered: false, ..Self::checked_out(id, order_id, item_id, quantity) }
    }
}
