pub mod config;
pub mod domain;
pub mod errors;
pub mod ranking;

pub use domain::catalog::{CatalogItem, ItemId};
pub use domain::order::{Order, OrderId, OrderItem, OrderItemId};
pub use errors::{ApplicationError, DomainError, InterfaceError, RankingError};
pub use ranking::{
    materialize_in_rank_order, popularity_counts, rank_popular, recommend_similar,
    recommend_similar_to, PopularityRanker, SimilarityEngine,
};
