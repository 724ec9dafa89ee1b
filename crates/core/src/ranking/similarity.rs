//! Description-similarity recommendations
//!
//! Every call vectorizes the full active-item corpus and builds a dense
//! pairwise kernel, O(n²) in time and memory. That is fine for catalogs of
//! a few thousand items; beyond that the matrix must give way to an
//! approximate nearest-neighbor index.

use std::collections::HashMap;

use tracing::debug;

use super::tfidf::{SparseVector, TfidfVectorizer};
use super::{validate_limit, RankingResult, DEFAULT_SIMILAR_LIMIT};
use crate::domain::catalog::{CatalogItem, ItemId};
use crate::errors::RankingError;

/// Dense square matrix of cosine similarities, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct SimilarityMatrix {
    size: usize,
    scores: Vec<f64>,
}

impl SimilarityMatrix {
    /// Linear kernel over L2-normalized vectors, which equals cosine similarity.
    pub fn linear_kernel(vectors: &[SparseVector]) -> Self {
        let size = vectors.len();
        let mut scores = vec![0.0; size * size];

        for row in 0..size {
            for column in row..size {
                let score = vectors[row].dot(&vectors[column]);
                scores[row * size + column] = score;
                scores[column * size + row] = score;
            }
        }

        Self { size, scores }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.scores[row * self.size..(row + 1) * self.size]
    }

    pub fn get(&self, row: usize, column: usize) -> f64 {
        self.scores[row * self.size + column]
    }
}

/// Ranks active items by how closely their descriptions match a reference item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimilarityEngine {
    limit: usize,
}

impl Default for SimilarityEngine {
    fn default() -> Self {
        Self { limit: DEFAULT_SIMILAR_LIMIT }
    }
}

impl SimilarityEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> RankingResult<Self> {
        Ok(Self { limit: validate_limit(limit)? })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Resolve `reference_name` to the first active item carrying that name,
    /// then rank by identifier.
    pub fn recommend_by_name(
        &self,
        reference_name: &str,
        items: &[CatalogItem],
    ) -> RankingResult<Vec<ItemId>> {
        let corpus = Corpus::build(items);
        if corpus.is_degenerate() {
            return Ok(Vec::new());
        }

        let reference = corpus
            .items
            .iter()
            .find(|item| item.name == reference_name)
            .map(|item| item.id)
            .ok_or_else(|| RankingError::NotFound { reference: reference_name.to_owned() })?;

        self.rank(&corpus, reference)
    }

    pub fn recommend(
        &self,
        reference: ItemId,
        items: &[CatalogItem],
    ) -> RankingResult<Vec<ItemId>> {
        let corpus = Corpus::build(items);
        if corpus.is_degenerate() {
            return Ok(Vec::new());
        }
        self.rank(&corpus, reference)
    }

    fn rank(&self, corpus: &Corpus<'_>, reference: ItemId) -> RankingResult<Vec<ItemId>> {
        let reference_row = corpus
            .row_of(reference)
            .ok_or_else(|| RankingError::NotFound { reference: reference.to_string() })?;

        let documents = corpus.items.iter().map(|item| item.corpus_text()).collect::<Vec<_>>();
        let (vectorizer, vectors) = TfidfVectorizer::fit_transform(&documents);
        let matrix = SimilarityMatrix::linear_kernel(&vectors);

        let scores = matrix.row(reference_row);
        let mut candidates = (0..matrix.size()).filter(|row| *row != reference_row).collect::<Vec<_>>();
        // Stable sort: equal scores keep corpus order.
        candidates.sort_by(|left, right| scores[*right].total_cmp(&scores[*left]));

        let ranked = candidates
            .into_iter()
            .take(self.limit)
            .map(|row| corpus.items[row].id)
            .collect::<Vec<_>>();

        debug!(
            event_name = "ranking.similar.completed",
            reference_item_id = %reference,
            corpus_size = matrix.size(),
            vocabulary_size = vectorizer.vocabulary_len(),
            result_size = ranked.len(),
            "similarity ranking computed"
        );

        Ok(ranked)
    }
}

/// Active items in input order, one row per distinct identifier.
struct Corpus<'a> {
    items: Vec<&'a CatalogItem>,
    rows: HashMap<ItemId, usize>,
}

impl<'a> Corpus<'a> {
    fn build(items: &'a [CatalogItem]) -> Self {
        let mut corpus = Self { items: Vec::with_capacity(items.len()), rows: HashMap::new() };
        for item in items.iter().filter(|item| item.active) {
            if corpus.rows.contains_key(&item.id) {
                continue;
            }
            corpus.rows.insert(item.id, corpus.items.len());
            corpus.items.push(item);
        }
        corpus
    }

    fn is_degenerate(&self) -> bool {
        self.items.len() < 2
    }

    fn row_of(&self, id: ItemId) -> Option<usize> {
        self.rows.get(&id).copied()
    }
}

/// Up to 10 active items most similar to the item named `reference_item_name`.
pub fn recommend_similar(
    reference_item_name: &str,
    active_items: &[CatalogItem],
) -> RankingResult<Vec<ItemId>> {
    SimilarityEngine::default().recommend_by_name(reference_item_name, active_items)
}

/// Identifier-keyed variant of [`recommend_similar`].
pub fn recommend_similar_to(
    reference: ItemId,
    active_items: &[CatalogItem],
) -> RankingResult<Vec<ItemId>> {
    SimilarityEngine::default().recommend(reference, active_items)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{recommend_similar, recommend_similar_to, SimilarityEngine, SimilarityMatrix};
    use crate::domain::catalog::{CatalogItem, ItemId};
    use crate::errors::RankingError;
    use crate::ranking::TfidfVectorizer;

    fn item(id: i64, name: &str, description: &str) -> CatalogItem {
        CatalogItem::new(id, name, Decimal::new(1_999, 2)).with_description(description)
    }

    fn apparel_catalog(size: i64) -> Vec<CatalogItem> {
        const WORDS: &[&str] =
            &["cotton", "leather", "denim", "wool", "linen", "silk", "canvas", "suede"];
        (1..=size)
            .map(|id| {
                let first = WORDS[(id as usize) % WORDS.len()];
                let second = WORDS[(id as usize * 3) % WORDS.len()];
                item(id, &format!("Item {id}"), &format!("{first} {second} jacket"))
            })
            .collect()
    }

    #[test]
    fn closer_description_ranks_first() {
        let catalog = vec![
            item(1, "A", "red shoes"),
            item(2, "B", "red sneakers"),
            item(3, "C", "blue hat"),
        ];

        let related = recommend_similar("A", &catalog).expect("A is in the catalog");

        assert_eq!(related, vec![ItemId(2), ItemId(3)]);
    }

    #[test]
    fn large_catalog_returns_ten_without_reference() {
        let catalog = apparel_catalog(25);

        let related = recommend_similar("Item 4", &catalog).expect("Item 4 exists");

        assert_eq!(related.len(), 10);
        assert!(!related.contains(&ItemId(4)));
        let mut unique = related.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 10);
    }

    #[test]
    fn single_or_empty_catalog_yields_empty_result() {
        let single = vec![item(1, "Solo", "only item")];
        assert_eq!(recommend_similar("Solo", &single), Ok(Vec::new()));
        assert_eq!(recommend_similar("Anything", &[]), Ok(Vec::new()));
    }

    #[test]
    fn unknown_reference_is_not_found() {
        let catalog = apparel_catalog(3);

        assert_eq!(
            recommend_similar("Missing", &catalog),
            Err(RankingError::NotFound { reference: "Missing".to_owned() })
        );
        assert!(matches!(
            recommend_similar_to(ItemId(99), &catalog),
            Err(RankingError::NotFound { .. })
        ));
    }

    #[test]
    fn inactive_items_never_appear() {
        let mut catalog = apparel_catalog(12);
        catalog[1] = catalog[1].clone().inactive();
        let inactive_id = catalog[1].id;

        let related = recommend_similar_to(ItemId(1), &catalog).expect("item 1 is active");

        assert!(!related.contains(&inactive_id));
        assert_eq!(related.len(), 10);
        assert!(matches!(
            recommend_similar_to(inactive_id, &catalog),
            Err(RankingError::NotFound { .. })
        ));
    }

    #[test]
    fn duplicate_names_resolve_to_first_occurrence() {
        let catalog = vec![
            item(1, "Twin", "red shoes"),
            item(2, "Twin", "blue hat"),
            item(3, "Other", "red sneakers"),
            item(4, "Cap", "blue cap hat"),
        ];

        let related = recommend_similar("Twin", &catalog).expect("Twin exists");

        assert_eq!(related[0], ItemId(3));
        assert!(!related.contains(&ItemId(1)));
        assert!(related.contains(&ItemId(2)));
    }

    #[test]
    fn missing_descriptions_tie_in_corpus_order() {
        let catalog = vec![
            item(1, "Boots", "leather boots"),
            CatalogItem::new(5, "Blank", Decimal::ONE),
            CatalogItem::new(3, "Also Blank", Decimal::ONE),
            item(4, "Boot Laces", "leather laces"),
        ];

        let related = recommend_similar("Boots", &catalog).expect("Boots exists");

        assert_eq!(related, vec![ItemId(4), ItemId(5), ItemId(3)]);
    }

    #[test]
    fn repeated_calls_are_identical() {
        let catalog = apparel_catalog(30);
        let first = recommend_similar("Item 7", &catalog);
        let second = recommend_similar("Item 7", &catalog);
        assert_eq!(first, second);
    }

    #[test]
    fn custom_limit_is_validated_and_applied() {
        assert!(matches!(SimilarityEngine::with_limit(0), Err(RankingError::InvalidInput(_))));

        let engine = SimilarityEngine::with_limit(3).expect("3 is a valid limit");
        let related = engine.recommend(ItemId(1), &apparel_catalog(20)).expect("item 1 exists");
        assert_eq!(related.len(), 3);
    }

    #[test]
    fn kernel_is_symmetric_with_unit_diagonal() {
        let (_, vectors) =
            TfidfVectorizer::fit_transform(&["red shoes", "red sneakers", "blue hat"]);
        let matrix = SimilarityMatrix::linear_kernel(&vectors);

        assert_eq!(matrix.size(), 3);
        for row in 0..3 {
            assert!((matrix.get(row, row) - 1.0).abs() < 1e-12);
            for column in 0..3 {
                assert_eq!(matrix.get(row, column), matrix.get(column, row));
            }
        }
        assert!(matrix.get(0, 1) > matrix.get(0, 2));
        assert_eq!(matrix.get(0, 2), 0.0);
    }
}
