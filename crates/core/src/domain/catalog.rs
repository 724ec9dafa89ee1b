use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub i64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ItemId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub active: bool,
}

impl CatalogItem {
    pub fn new(id: i64, name: impl Into<String>, price: Decimal) -> Self {
        let name = name.into();
        Self {
            id: ItemId(id),
            slug: slugify(&name),
            name,
            description: None,
            price,
            discount_price: None,
            active: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_discount_price(mut self, discount_price: Decimal) -> Self {
        self.discount_price = Some(discount_price);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Description text fed to the similarity corpus; absent descriptions become "".
    pub fn corpus_text(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }
}

/// URL slug derived from an item name: lowercase ASCII alphanumerics joined by single hyphens.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch.to_ascii_lowercase());
        } else if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_hyphen = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{slugify, CatalogItem, ItemId};

    #[test]
    fn missing_description_is_empty_corpus_text() {
        let item = CatalogItem::new(7, "Wool Scarf", Decimal::ONE);
        assert_eq!(item.corpus_text(), "");
        assert_eq!(item.id, ItemId(7));
    }

    #[test]
    fn slugify_collapses_separators_and_drops_punctuation() {
        assert_eq!(slugify("Men's  Leather Boots"), "mens-leather-boots");
        assert_eq!(slugify("  Kids - Rain Jacket "), "kids-rain-jacket");
        assert_eq!(slugify("T_Shirt (XL)"), "t-shirt-xl");
    }

    #[test]
    fn item_ids_order_ascending() {
        let mut ids = vec![ItemId(9), ItemId(2), ItemId(5)];
        ids.sort();
        assert_eq!(ids, vec![ItemId(2), ItemId(5), ItemId(9)]);
    }
}
