//! Order-frequency popularity ranking with deterministic padding

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use super::{validate_limit, RankingResult, DEFAULT_POPULAR_LIMIT};
use crate::domain::catalog::{CatalogItem, ItemId};
use crate::domain::order::{OrderId, OrderItem};

/// Ranks items by the number of distinct checked-out orders that contain them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PopularityRanker {
    limit: usize,
}

impl Default for PopularityRanker {
    fn default() -> Self {
        Self { limit: DEFAULT_POPULAR_LIMIT }
    }
}

impl PopularityRanker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> RankingResult<Self> {
        Ok(Self { limit: validate_limit(limit)? })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Popular items first, then filler in ascending identifier order.
    ///
    /// Only active items in `all_items` are eligible; order lines pointing at
    /// anything else are ignored.
    pub fn rank(&self, order_items: &[OrderItem], all_items: &[CatalogItem]) -> Vec<ItemId> {
        let eligible =
            all_items.iter().filter(|item| item.active).map(|item| item.id).collect::<BTreeSet<_>>();

        let mut ranked = popularity_counts(order_items)
            .into_iter()
            .map(|(id, _)| id)
            .filter(|id| eligible.contains(id))
            .take(self.limit)
            .collect::<Vec<_>>();
        let popular = ranked.len();

        if ranked.len() < self.limit {
            let chosen = ranked.iter().copied().collect::<BTreeSet<_>>();
            let filler = eligible.iter().copied().filter(|id| !chosen.contains(id));
            ranked.extend(filler.take(self.limit - popular));
        }

        debug!(
            event_name = "ranking.popular.completed",
            eligible_items = eligible.len(),
            popular_items = popular,
            padding_items = ranked.len() - popular,
            limit = self.limit,
            "popularity ranking computed"
        );

        ranked
    }
}

/// Distinct checked-out order count per item, highest first, ties by ascending id.
pub fn popularity_counts(order_items: &[OrderItem]) -> Vec<(ItemId, usize)> {
    let mut orders_by_item = BTreeMap::<ItemId, BTreeSet<OrderId>>::new();
    for line in order_items.iter().filter(|line| line.ordered) {
        orders_by_item.entry(line.item_id).or_default().insert(line.order_id);
    }

    let mut counts =
        orders_by_item.into_iter().map(|(id, orders)| (id, orders.len())).collect::<Vec<_>>();
    // Stable sort over an id-ascending sequence keeps the tie-break.
    counts.sort_by(|left, right| right.1.cmp(&left.1));
    counts
}

/// Exactly `min(limit, active catalog size)` item ids; never fails.
pub fn rank_popular(
    order_items: &[OrderItem],
    all_items: &[CatalogItem],
    limit: usize,
) -> Vec<ItemId> {
    PopularityRanker { limit }.rank(order_items, all_items)
}

/// Reorder fetched records to follow `ranked_ids`; ids without a record are dropped.
pub fn materialize_in_rank_order(
    ranked_ids: &[ItemId],
    records: Vec<CatalogItem>,
) -> Vec<CatalogItem> {
    let mut by_id = records.into_iter().map(|item| (item.id, item)).collect::<HashMap<_, _>>();
    ranked_ids.iter().filter_map(|id| by_id.remove(id)).collect()
}
