use storefront_core::domain::catalog::CatalogItem;
use storefront_core::ranking::{materialize_in_rank_order, PopularityRanker};
use storefront_db::repositories::{
    CatalogRepository, OrderRepository, SqlCatalogRepository, SqlOrderRepository,
};

use crate::commands::{open_database, prepare, CommandFailure, CommandResult};

/// Popular strip as the storefront would render it right now.
pub fn run(limit: Option<usize>) -> CommandResult {
    let (config, runtime) = match prepare("popular") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let ranker = match PopularityRanker::with_limit(limit.unwrap_or(config.ranking.popular_limit))
    {
        Ok(ranker) => ranker,
        Err(error) => return CommandResult::failure("popular", "invalid_input", error.to_string(), 2),
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let catalog = SqlCatalogRepository::new(pool.clone());
        let orders = SqlOrderRepository::new(pool.clone());

        let order_items =
            orders.list_order_items().await.map_err(|error| ("query", error.to_string(), 3u8))?;
        let all_items =
            catalog.list_all_items().await.map_err(|error| ("query", error.to_string(), 3u8))?;
        let ranked = ranker.rank(&order_items, &all_items);
        let records =
            catalog.find_by_ids(&ranked).await.map_err(|error| ("query", error.to_string(), 3u8))?;

        pool.close().await;
        Ok::<Vec<CatalogItem>, CommandFailure>(materialize_in_rank_order(&ranked, records))
    });

    match result {
        Ok(items) => CommandResult::success_with_items(
            "popular",
            format!("{} popular items (limit {})", items.len(), ranker.limit()),
            &items,
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("popular", error_class, message, exit_code)
        }
    }
}
