//! Product-discovery routes.
//!
//! - `GET /api/items/popular?limit=N`: popular strip, full records in rank order
//! - `GET /api/items/{slug}`: item detail with `related_products`
//!
//! Rankings run on the blocking pool; every request recomputes from the
//! current catalog and order history.

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use storefront_core::domain::catalog::{CatalogItem, ItemId};
use storefront_core::errors::{ApplicationError, InterfaceError, RankingError};
use storefront_core::ranking::{materialize_in_rank_order, PopularityRanker, SimilarityEngine};
use storefront_db::repositories::{CatalogRepository, OrderRepository, RepositoryError};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct CatalogState {
    catalog: Arc<dyn CatalogRepository>,
    orders: Arc<dyn OrderRepository>,
    similarity: SimilarityEngine,
    popularity: PopularityRanker,
}

impl CatalogState {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        orders: Arc<dyn OrderRepository>,
        similarity: SimilarityEngine,
        popularity: PopularityRanker,
    ) -> Self {
        Self { catalog, orders, similarity, popularity }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PopularQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PopularItemsResponse {
    pub items: Vec<CatalogItem>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ItemDetailResponse {
    pub item: CatalogItem,
    pub related_products: Vec<CatalogItem>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    pub correlation_id: String,
}

/// JSON error response built from the interface error taxonomy.
#[derive(Debug)]
pub struct ApiError(InterfaceError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = match &self.0 {
            InterfaceError::BadRequest { message, .. } | InterfaceError::NotFound { message, .. } => {
                message.clone()
            }
            other => other.user_message().to_owned(),
        };
        let body = ErrorBody {
            error: self.0.error_class().to_owned(),
            message,
            correlation_id: self.0.correlation_id().to_owned(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(state: CatalogState) -> Router {
    Router::new()
        .route("/api/items/popular", get(popular_items))
        .route("/api/items/{slug}", get(item_detail))
        .with_state(state)
}

fn persistence(error: RepositoryError) -> ApplicationError {
    ApplicationError::Persistence(error.to_string())
}

fn blocking_failure(error: tokio::task::JoinError, correlation_id: &str) -> ApiError {
    ApiError(InterfaceError::Internal {
        message: format!("ranking task failed: {error}"),
        correlation_id: correlation_id.to_owned(),
    })
}

async fn popular_items(
    State(state): State<CatalogState>,
    query: Result<Query<PopularQuery>, QueryRejection>,
) -> Result<Json<PopularItemsResponse>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    let fail = |error: ApplicationError| ApiError(error.into_interface(correlation_id.clone()));

    let Query(query) = query.map_err(|rejection| {
        fail(RankingError::InvalidInput(format!("limit: {}", rejection.body_text())).into())
    })?;
    let ranker = match query.limit {
        Some(limit) => PopularityRanker::with_limit(limit).map_err(|error| fail(error.into()))?,
        None => state.popularity,
    };

    let order_items = state.orders.list_order_items().await.map_err(|e| fail(persistence(e)))?;
    let all_items = state.catalog.list_all_items().await.map_err(|e| fail(persistence(e)))?;

    let ranked = tokio::task::spawn_blocking(move || ranker.rank(&order_items, &all_items))
        .await
        .map_err(|error| blocking_failure(error, &correlation_id))?;

    let records = state.catalog.find_by_ids(&ranked).await.map_err(|e| fail(persistence(e)))?;
    let items = materialize_in_rank_order(&ranked, records);

    info!(
        event_name = "catalog.popular.served",
        correlation_id = %correlation_id,
        limit = ranker.limit(),
        result_size = items.len(),
        "popular items served"
    );

    Ok(Json(PopularItemsResponse { items }))
}

async fn item_detail(
    State(state): State<CatalogState>,
    Path(slug): Path<String>,
) -> Result<Json<ItemDetailResponse>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    let fail = |error: ApplicationError| ApiError(error.into_interface(correlation_id.clone()));

    let item = state
        .catalog
        .find_by_slug(&slug)
        .await
        .map_err(|e| fail(persistence(e)))?
        .ok_or_else(|| fail(ApplicationError::NotFound { resource: "item", key: slug.clone() }))?;

    let active_items = state.catalog.list_active_items().await.map_err(|e| fail(persistence(e)))?;
    let engine = state.similarity;
    let reference = item.id;
    let ranked = tokio::task::spawn_blocking(move || engine.recommend(reference, &active_items))
        .await
        .map_err(|error| blocking_failure(error, &correlation_id))?;

    let related_ids = match ranked {
        Ok(ids) => ids,
        Err(RankingError::NotFound { reference }) => {
            warn!(
                event_name = "catalog.related.degraded",
                correlation_id = %correlation_id,
                reference_item_id = %reference,
                "reference item not in active corpus; serving no related items"
            );
            Vec::<ItemId>::new()
        }
        Err(error) => return Err(fail(error.into())),
    };

    let records = state.catalog.find_by_ids(&related_ids).await.map_err(|e| fail(persistence(e)))?;
    let related_products = materialize_in_rank_order(&related_ids, records);

    info!(
        event_name = "catalog.item.served",
        correlation_id = %correlation_id,
        item_id = %item.id,
        related_count = related_products.len(),
        "item detail served"
    );

    Ok(Json(ItemDetailResponse { item, related_products }))
}
