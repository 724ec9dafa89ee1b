use storefront_core::domain::catalog::CatalogItem;
use storefront_core::errors::RankingError;
use storefront_core::ranking::{materialize_in_rank_order, SimilarityEngine};
use storefront_db::repositories::{CatalogRepository, SqlCatalogRepository};

use crate::commands::{open_database, prepare, CommandFailure, CommandResult};

/// Related items for the item with `slug`, most similar first.
pub fn run(slug: &str) -> CommandResult {
    let (config, runtime) = match prepare("related") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let engine = match SimilarityEngine::with_limit(config.ranking.similar_limit) {
        Ok(engine) => engine,
        Err(error) => return CommandResult::failure("related", "invalid_input", error.to_string(), 2),
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let catalog = SqlCatalogRepository::new(pool.clone());
        let query_failure = |error: storefront_db::repositories::RepositoryError| {
            ("query", error.to_string(), 3u8)
        };

        let item = catalog
            .find_by_slug(slug)
            .await
            .map_err(query_failure)?
            .ok_or_else(|| ("not_found", format!("no item with slug `{slug}`"), 6u8))?;
        let active_items = catalog.list_active_items().await.map_err(query_failure)?;

        let related_ids = match engine.recommend(item.id, &active_items) {
            Ok(ids) => ids,
            Err(RankingError::NotFound { .. }) => Vec::new(),
            Err(error) => return Err(("ranking", error.to_string(), 3u8)),
        };
        let records = catalog.find_by_ids(&related_ids).await.map_err(query_failure)?;

        pool.close().await;
        Ok::<(CatalogItem, Vec<CatalogItem>), CommandFailure>((
            item,
            materialize_in_rank_order(&related_ids, records),
        ))
    });

    match result {
        Ok((item, related)) => CommandResult::success_with_items(
            "related",
            format!("{} items related to `{}`", related.len(), item.slug),
            &related,
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("related", error_class, message, exit_code)
        }
    }
}
