use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::{QueryBuilder, Row, Sqlite};

use storefront_core::domain::catalog::{CatalogItem, ItemId};

use super::{CatalogRepository, RepositoryError};
use crate::DbPool;

const ITEM_COLUMNS: &str =
    "SELECT id, name, slug, description, price_text, discount_price_text, is_active FROM item";

pub struct SqlCatalogRepository {
    pool: DbPool,
}

impl SqlCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode<T>(result: Result<T, sqlx::Error>) -> Result<T, RepositoryError> {
    result.map_err(|error| RepositoryError::Decode(error.to_string()))
}

fn parse_decimal(column: &str, raw: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(raw.trim()).map_err(|error| {
        RepositoryError::Decode(format!("invalid decimal in `{column}`: `{raw}` ({error})"))
    })
}

fn row_to_item(row: &sqlx::sqlite::SqliteRow) -> Result<CatalogItem, RepositoryError> {
    let price_text: String = decode(row.try_get("price_text"))?;
    let discount_price_text: Option<String> = decode(row.try_get("discount_price_text"))?;

    Ok(CatalogItem {
        id: ItemId(decode(row.try_get("id"))?),
        name: decode(row.try_get("name"))?,
        slug: decode(row.try_get("slug"))?,
        description: decode(row.try_get("description"))?,
        price: parse_decimal("price_text", &price_text)?,
        discount_price: discount_price_text
            .map(|raw| parse_decimal("discount_price_text", &raw))
            .transpose()?,
        active: decode(row.try_get("is_active"))?,
    })
}

#[async_trait::async_trait]
impl CatalogRepository for SqlCatalogRepository {
    async fn list_active_items(&self) -> Result<Vec<CatalogItem>, RepositoryError> {
        let rows = sqlx::query(&format!("{ITEM_COLUMNS} WHERE is_active = 1 ORDER BY id DESC"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_item).collect()
    }

    async fn list_all_items(&self) -> Result<Vec<CatalogItem>, RepositoryError> {
        let rows =
            sqlx::query(&format!("{ITEM_COLUMNS} ORDER BY id ASC")).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_item).collect()
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<CatalogItem>, RepositoryError> {
        let row = sqlx::query(&format!("{ITEM_COLUMNS} WHERE slug = ?"))
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_item).transpose()
    }

    async fn find_by_ids(&self, ids: &[ItemId]) -> Result<Vec<CatalogItem>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new(ITEM_COLUMNS);
        query.push(" WHERE id IN (");
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(id.0);
        }
        separated.push_unseparated(")");

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_item).collect()
    }

    async fn save(&self, item: CatalogItem) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO item (id, name, slug, description, price_text, discount_price_text, is_active)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                slug = excluded.slug,
                description = excluded.description,
                price_text = excluded.price_text,
                discount_price_text = excluded.discount_price_text,
                is_active = excluded.is_active",
        )
        .bind(item.id.0)
        .bind(&item.name)
        .bind(&item.slug)
        .bind(&item.description)
        .bind(item.price.to_string())
        .bind(item.discount_price.map(|price| price.to_string()))
        .bind(item.active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
