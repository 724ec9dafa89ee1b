use rust_decimal::Decimal;

use storefront_core::domain::catalog::CatalogItem;
use storefront_core::domain::order::{Order, OrderId, OrderItem};

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

#[derive(Debug, Clone, Copy)]
struct ItemSeed {
    id: i64,
    name: &'static str,
    description: &'static str,
    price_cents: i64,
    discount_cents: Option<i64>,
    active: bool,
}

const ITEM_SEEDS: &[ItemSeed] = &[
    ItemSeed {
        id: 1,
        name: "Classic White Tee",
        description: "<p>Soft cotton crew neck t-shirt in classic white.</p>",
        price_cents: 1_900,
        discount_cents: None,
        active: true,
    },
    ItemSeed {
        id: 2,
        name: "Graphic Cotton Tee",
        description: "<p>Printed cotton t-shirt with a relaxed fit.</p>",
        price_cents: 2_400,
        discount_cents: Some(1_900),
        active: true,
    },
    ItemSeed {
        id: 3,
        name: "Slim Denim Jacket",
        description: "<p>Stonewashed denim jacket with a slim fit &amp; metal buttons.</p>",
        price_cents: 8_900,
        discount_cents: None,
        active: true,
    },
    ItemSeed {
        id: 4,
        name: "Relaxed Denim Jeans",
        description: "<p>Relaxed fit denim jeans in a dark wash.</p>",
        price_cents: 6_500,
        discount_cents: Some(5_500),
        active: true,
    },
    ItemSeed {
        id: 5,
        name: "Leather Chelsea Boots",
        description: "<p>Brown leather boots with elastic side panels.</p>",
        price_cents: 12_900,
        discount_cents: None,
        active: true,
    },
    ItemSeed {
        id: 6,
        name: "Leather Sneakers",
        description: "<p>Minimal white leather sneakers with rubber soles.</p>",
        price_cents: 9_900,
        discount_cents: None,
        active: true,
    },
    ItemSeed {
        id: 7,
        name: "Wool Overcoat",
        description: "<p>Long wool coat with a tailored fit.</p>",
        price_cents: 18_900,
        discount_cents: Some(15_900),
        active: true,
    },
    ItemSeed {
        id: 8,
        name: "Merino Wool Sweater",
        description: "<p>Fine merino wool crew neck sweater.</p>",
        price_cents: 7_900,
        discount_cents: None,
        active: true,
    },
    ItemSeed {
        id: 9,
        name: "Canvas Tote Bag",
        description: "<p>Sturdy canvas tote bag for everyday errands.</p>",
        price_cents: 2_900,
        discount_cents: None,
        active: true,
    },
    ItemSeed {
        id: 10,
        name: "Silk Scarf",
        description: "<p>Printed silk scarf with a floral pattern.</p>",
        price_cents: 4_500,
        discount_cents: None,
        active: true,
    },
    ItemSeed {
        id: 11,
        name: "Knit Beanie",
        description: "<p>Ribbed wool knit beanie hat.</p>",
        price_cents: 2_200,
        discount_cents: None,
        active: true,
    },
    ItemSeed {
        id: 12,
        name: "Vintage Denim Vest",
        description: "<p>Vintage denim vest, retired from the catalog.</p>",
        price_cents: 5_900,
        discount_cents: None,
        active: false,
    },
];

/// (order id, checked out)
const ORDER_SEEDS: &[(i64, bool)] =
    &[(1, true), (2, true), (3, true), (4, true), (5, true), (6, true), (7, false)];

/// (order item id, order id, item id, quantity)
const ORDER_ITEM_SEEDS: &[(i64, i64, i64, u32)] = &[
    (1, 1, 3, 1),
    (2, 1, 12, 1),
    (3, 2, 3, 2),
    (4, 2, 7, 1),
    (5, 2, 12, 1),
    (6, 3, 3, 1),
    (7, 3, 3, 1),
    (8, 3, 12, 1),
    (9, 4, 3, 1),
    (10, 4, 12, 3),
    (11, 5, 7, 1),
    (12, 5, 12, 1),
    (13, 6, 1, 5),
    (14, 7, 5, 1),
];

/// Deterministic demo storefront: twelve catalog items (one retired) and a
/// small checkout history.
///
/// Popularity over the seed is Slim Denim Jacket (4 orders), Wool Overcoat
/// (2), Classic White Tee (1). The retired vest appears in five orders and the
/// open cart holds the boots; neither may surface in a ranking.
pub struct DemoCatalog;

impl DemoCatalog {
    /// Item ids the popular strip shows for the seeded data.
    pub const EXPECTED_POPULAR: [i64; 8] = [3, 7, 1, 2, 4, 5, 6, 8];

    pub fn items() -> Vec<CatalogItem> {
        ITEM_SEEDS
            .iter()
            .map(|seed| {
                let mut item =
                    CatalogItem::new(seed.id, seed.name, Decimal::new(seed.price_cents, 2))
                        .with_description(seed.description);
                item.discount_price = seed.discount_cents.map(|cents| Decimal::new(cents, 2));
                item.active = seed.active;
                item
            })
            .collect()
    }

    pub fn orders() -> Vec<Order> {
        ORDER_SEEDS
            .iter()
            .map(|(id, ordered)| Order {
                id: OrderId(*id),
                ref_code: ordered.then(|| format!("DEMO-{id:04}")),
                ordered: *ordered,
            })
            .collect()
    }

    pub fn order_items() -> Vec<OrderItem> {
        ORDER_ITEM_SEEDS
            .iter()
            .map(|(id, order_id, item_id, quantity)| {
                let checked_out = ORDER_SEEDS
                    .iter()
                    .any(|(seed_order, ordered)| seed_order == order_id && *ordered);
                if checked_out {
                    OrderItem::checked_out(*id, *order_id, *item_id, *quantity)
                } else {
                    OrderItem::in_cart(*id, *order_id, *item_id, *quantity)
                }
            })
            .collect()
    }

    /// Insert the demo rows; rows that already exist are left untouched and not counted.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let items = Self::items();
        let orders = Self::orders();
        let order_items = Self::order_items();

        let mut tx = pool.begin().await?;
        let mut seeded = SeedResult::default();

        for item in &items {
            let result = sqlx::query(
                "INSERT INTO item (id, name, slug, description, price_text, discount_price_text, is_active)
                 VALUES (?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO NOTHING",
            )
            .bind(item.id.0)
            .bind(&item.name)
            .bind(&item.slug)
            .bind(&item.description)
            .bind(item.price.to_string())
            .bind(item.discount_price.map(|price| price.to_string()))
            .bind(item.active)
            .execute(&mut *tx)
            .await?;
            seeded.items_seeded += result.rows_affected();
        }

        for order in &orders {
            let result = sqlx::query(
                "INSERT INTO customer_order (id, ref_code, ordered) VALUES (?, ?, ?)
                 ON CONFLICT(id) DO NOTHING",
            )
            .bind(order.id.0)
            .bind(&order.ref_code)
            .bind(order.ordered)
            .execute(&mut *tx)
            .await?;
            seeded.orders_seeded += result.rows_affected();
        }

        for line in &order_items {
            let result = sqlx::query(
                "INSERT INTO order_item (id, order_id, item_id, ordered, quantity)
                 VALUES (?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO NOTHING",
            )
            .bind(line.id.0)
            .bind(line.order_id.0)
            .bind(line.item_id.0)
            .bind(line.ordered)
            .bind(i64::from(line.quantity))
            .execute(&mut *tx)
            .await?;
            seeded.order_items_seeded += result.rows_affected();
        }

        tx.commit().await?;

        Ok(seeded)
    }

    /// Verify that the demo rows exist and match the seed contract.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let item_ids = sql_array_from_ids(ITEM_SEEDS.iter().map(|seed| seed.id));
        let item_count: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(1) FROM item WHERE id IN {item_ids}"))
                .fetch_one(pool)
                .await?;
        checks.push(("demo-items", item_count == ITEM_SEEDS.len() as i64));

        let active_count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM item WHERE id IN {item_ids} AND is_active = 1"
        ))
        .fetch_one(pool)
        .await?;
        let expected_active = ITEM_SEEDS.iter().filter(|seed| seed.active).count() as i64;
        checks.push(("demo-active-items", active_count == expected_active));

        let order_ids = sql_array_from_ids(ORDER_SEEDS.iter().map(|(id, _)| *id));
        let order_count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM customer_order WHERE id IN {order_ids}"
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("demo-orders", order_count == ORDER_SEEDS.len() as i64));

        let line_ids = sql_array_from_ids(ORDER_ITEM_SEEDS.iter().map(|(id, ..)| *id));
        let checked_out_lines: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM order_item WHERE id IN {line_ids} AND ordered = 1"
        ))
        .fetch_one(pool)
        .await?;
        let expected_checked_out =
            Self::order_items().iter().filter(|line| line.ordered).count() as i64;
        checks.push(("demo-checked-out-lines", checked_out_lines == expected_checked_out));

        let cart_lines: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM order_item WHERE id IN {line_ids} AND ordered = 0"
        ))
        .fetch_one(pool)
        .await?;
        checks.push((
            "demo-cart-lines",
            cart_lines == ORDER_ITEM_SEEDS.len() as i64 - expected_checked_out,
        ));

        let all_present = checks.iter().all(|(_, passed)| *passed);
        Ok(VerificationResult { all_present, checks })
    }
}

fn sql_array_from_ids(ids: impl Iterator<Item = i64>) -> String {
    let joined = ids.map(|id| id.to_string()).collect::<Vec<_>>().join(",");
    format!("({joined})")
}

/// Rows inserted by one `DemoCatalog::load` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedResult {
    pub items_seeded: u64,
    pub orders_seeded: u64,
    pub order_items_seeded: u64,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

#[cfg(test)]
mod tests {
    use storefront_core::domain::catalog::ItemId;
    use storefront_core::ranking::{rank_popular, recommend_similar, DEFAULT_POPULAR_LIMIT};

    use super::*;
    use crate::repositories::{
        CatalogRepository, OrderRepository, SqlCatalogRepository, SqlOrderRepository,
    };
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn verify_seed_contract_and_idempotency() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");
        migrations::run_pending(&pool).await.expect("run migrations");

        let first = DemoCatalog::load(&pool).await.expect("load seed fixtures");
        let first_verification = DemoCatalog::verify(&pool).await.expect("verify seed fixtures");
        assert!(first_verification.all_present, "{:?}", first_verification.checks);
        assert_eq!(
            first,
            SeedResult { items_seeded: 12, orders_seeded: 7, order_items_seeded: 14 }
        );

        let second = DemoCatalog::load(&pool).await.expect("reload seed fixtures");
        let second_verification =
            DemoCatalog::verify(&pool).await.expect("re-verify seed fixtures");
        assert!(second_verification.all_present);
        assert_eq!(second, SeedResult::default(), "existing rows are not reinserted");
        assert_eq!(first_verification.checks, second_verification.checks);

        pool.close().await;
    }

    #[tokio::test]
    async fn seeded_history_ranks_to_documented_popular_strip() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");
        migrations::run_pending(&pool).await.expect("run migrations");
        DemoCatalog::load(&pool).await.expect("load seed fixtures");

        let catalog = SqlCatalogRepository::new(pool.clone());
        let orders = SqlOrderRepository::new(pool.clone());
        let ranked = rank_popular(
            &orders.list_order_items().await.expect("order items"),
            &catalog.list_all_items().await.expect("items"),
            DEFAULT_POPULAR_LIMIT,
        );

        assert_eq!(ranked, DemoCatalog::EXPECTED_POPULAR.map(ItemId).to_vec());

        let related = recommend_similar(
            "Slim Denim Jacket",
            &catalog.list_active_items().await.expect("active items"),
        )
        .expect("jacket is active");
        assert_eq!(related[0], ItemId(4), "denim jeans share the most vocabulary");
        assert!(!related.contains(&ItemId(12)));

        pool.close().await;
    }

    #[tokio::test]
    async fn missing_lines_fail_verification_and_reload_restores_only_them() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");
        migrations::run_pending(&pool).await.expect("run migrations");
        DemoCatalog::load(&pool).await.expect("load seed fixtures");

        sqlx::query("DELETE FROM order_item").execute(&pool).await.expect("drop order lines");

        let verification = DemoCatalog::verify(&pool).await.expect("verify after delete");
        assert!(!verification.all_present);
        assert!(verification.checks.contains(&("demo-checked-out-lines", false)));
        assert!(verification.checks.contains(&("demo-items", true)));

        let reload = DemoCatalog::load(&pool).await.expect("reload seed fixtures");
        assert_eq!(
            reload,
            SeedResult { items_seeded: 0, orders_seeded: 0, order_items_seeded: 14 }
        );
        assert!(DemoCatalog::verify(&pool).await.expect("verify after reload").all_present);

        pool.close().await;
    }
}
