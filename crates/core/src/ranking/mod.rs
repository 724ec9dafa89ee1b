//! Item recommendation and popularity ranking
//!
//! Two independent, read-only pipelines feed the product-discovery surfaces:
//! a description-similarity engine (TF-IDF + linear kernel) and an
//! order-frequency popularity ranker with deterministic padding. Both
//! recompute from scratch on every call; nothing is cached between calls.

mod popularity;
mod similarity;
mod stopwords;
mod tfidf;

pub use popularity::{materialize_in_rank_order, popularity_counts, rank_popular, PopularityRanker};
pub use similarity::{recommend_similar, recommend_similar_to, SimilarityEngine, SimilarityMatrix};
pub use stopwords::{is_english_stop_word, ENGLISH_STOP_WORDS};
pub use tfidf::{tokenize, strip_markup, SparseVector, TfidfVectorizer};

use crate::errors::RankingError;

/// Result type for ranking operations
pub type RankingResult<T> = Result<T, RankingError>;

/// Related items returned for an item detail view
pub const DEFAULT_SIMILAR_LIMIT: usize = 10;

/// Items shown in the popular strip
pub const DEFAULT_POPULAR_LIMIT: usize = 8;

/// Upper bound accepted for any caller-supplied limit
pub const MAX_RANKING_LIMIT: usize = 100;

/// Validate a caller-supplied result limit.
pub fn validate_limit(limit: usize) -> RankingResult<usize> {
    if limit == 0 || limit > MAX_RANKING_LIMIT {
        return Err(RankingError::InvalidInput(format!(
            "limit must be in range 1..={MAX_RANKING_LIMIT}, got {limit}"
        )));
    }
    Ok(limit)
}
