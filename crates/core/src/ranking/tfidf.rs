//! TF-IDF vectorization of item descriptions

use std::collections::BTreeMap;

use super::stopwords::is_english_stop_word;

const HTML_ENTITIES: &[(&str, &str)] = &[
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&apos;", "'"),
    ("&amp;", "&"),
];

/// Remove rich-text tags and decode the common HTML entities.
///
/// Tags are replaced with a single space so that words on either side of a
/// block boundary (`<p>red</p><p>shoes</p>`) do not fuse into one token.
/// A `<` only opens a tag when followed by a letter, `/` or `!`; otherwise it
/// is plain text (`waist < 32`).
pub fn strip_markup(input: &str) -> String {
    let mut text = String::with_capacity(input.len());
    let mut in_tag = false;
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '<' if !in_tag && chars.peek().is_some_and(|next| opens_tag(*next)) => {
                in_tag = true;
                text.push(' ');
            }
            '>' if in_tag => in_tag = false,
            _ if in_tag => {}
            _ => text.push(ch),
        }
    }

    // `&amp;` is decoded last so `&amp;lt;` stays a literal `&lt;`.
    HTML_ENTITIES.iter().fold(text, |acc, (entity, decoded)| acc.replace(entity, decoded))
}

fn opens_tag(next: char) -> bool {
    next.is_ascii_alphabetic() || next == '/' || next == '!'
}

/// Lowercased runs of two or more word characters, with stop words removed.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    lowered
        .split(|ch: char| !(ch.is_alphanumeric() || ch == '_'))
        .filter(|token| token.chars().count() >= 2)
        .filter(|token| !is_english_stop_word(token))
        .map(str::to_owned)
        .collect()
}

/// L2-normalized sparse document vector, entries sorted by term index.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(usize, f64)>,
}

impl SparseVector {
    fn from_weights(weights: BTreeMap<usize, f64>) -> Self {
        let norm = weights.values().map(|weight| weight * weight).sum::<f64>().sqrt();
        if norm == 0.0 {
            return Self::default();
        }
        Self { entries: weights.into_iter().map(|(term, weight)| (term, weight / norm)).collect() }
    }

    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    pub fn is_zero(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sparse dot product via a merge over the sorted term indices.
    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut left, mut right) = (0, 0);
        let mut total = 0.0;

        while left < self.entries.len() && right < other.entries.len() {
            let (left_term, left_weight) = self.entries[left];
            let (right_term, right_weight) = other.entries[right];
            match left_term.cmp(&right_term) {
                std::cmp::Ordering::Less => left += 1,
                std::cmp::Ordering::Greater => right += 1,
                std::cmp::Ordering::Equal => {
                    total += left_weight * right_weight;
                    left += 1;
                    right += 1;
                }
            }
        }

        total
    }
}

/// Vocabulary and smoothed IDF weights fitted on one corpus.
#[derive(Clone, Debug, Default)]
pub struct TfidfVectorizer {
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    /// Fit on `documents`; term indices follow alphabetical vocabulary order.
    pub fn fit<S: AsRef<str>>(documents: &[S]) -> Self {
        let tokenized = documents.iter().map(|doc| document_tokens(doc.as_ref())).collect::<Vec<_>>();
        Self::fit_tokenized(&tokenized)
    }

    /// Fit on `documents` and return the vectorizer plus one vector per document.
    pub fn fit_transform<S: AsRef<str>>(documents: &[S]) -> (Self, Vec<SparseVector>) {
        let tokenized = documents.iter().map(|doc| document_tokens(doc.as_ref())).collect::<Vec<_>>();
        let vectorizer = Self::fit_tokenized(&tokenized);
        let vectors = tokenized.iter().map(|tokens| vectorizer.vectorize(tokens)).collect();
        (vectorizer, vectors)
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.vocabulary.get(term).map(|index| self.idf[*index])
    }

    fn fit_tokenized(tokenized: &[Vec<String>]) -> Self {
        let mut document_frequency = BTreeMap::<&str, usize>::new();
        for tokens in tokenized {
            let mut seen = tokens.iter().map(String::as_str).collect::<Vec<_>>();
            seen.sort_unstable();
            seen.dedup();
            for term in seen {
                *document_frequency.entry(term).or_default() += 1;
            }
        }

        // idf(t) = ln((1 + n) / (1 + df(t))) + 1
        let documents = tokenized.len() as f64;
        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(document_frequency.len());
        for (index, (term, frequency)) in document_frequency.into_iter().enumerate() {
            vocabulary.insert(term.to_owned(), index);
            idf.push(((1.0 + documents) / (1.0 + frequency as f64)).ln() + 1.0);
        }

        Self { vocabulary, idf }
    }

    fn vectorize(&self, tokens: &[String]) -> SparseVector {
        let mut weights = BTreeMap::<usize, f64>::new();
        for token in tokens {
            if let Some(index) = self.vocabulary.get(token) {
                *weights.entry(*index).or_default() += 1.0;
            }
        }
        for (index, weight) in weights.iter_mut() {
            *weight *= self.idf[*index];
        }
        SparseVector::from_weights(weights)
    }
}

fn document_tokens(document: &str) -> Vec<String> {
    tokenize(&strip_markup(document))
}

#[cfg(test)]
mod tests {
    use super::{strip_markup, tokenize, TfidfVectorizer};

    #[test]
    fn markup_is_stripped_and_entities_decoded() {
        assert_eq!(
            strip_markup("<p>Red&nbsp;shoes &amp; laces</p>").split_whitespace().collect::<Vec<_>>(),
            vec!["Red", "shoes", "&", "laces"]
        );
        assert_eq!(strip_markup("<p>red</p><p>shoes</p>").split_whitespace().count(), 2);
    }

    #[test]
    fn bare_angle_brackets_in_plain_text_keep_following_words() {
        let tokens = tokenize(&strip_markup(
            "Fits waist < 32 inches, stretch denim with leather patch",
        ));
        assert_eq!(
            tokens,
            vec!["fits", "waist", "32", "inches", "stretch", "denim", "leather", "patch"]
        );

        let mixed = strip_markup("<b>Sizes</b> 2 < 4 <!-- note --> &lt;tag&gt; kept");
        assert_eq!(
            mixed.split_whitespace().collect::<Vec<_>>(),
            vec!["Sizes", "2", "<", "4", "<tag>", "kept"]
        );
    }

    #[test]
    fn tokenizer_drops_short_tokens_and_stop_words() {
        assert_eq!(
            tokenize("The Red shoes, a 2-pack for running_club!"),
            vec!["red", "shoes", "pack", "running_club"]
        );
        assert!(tokenize("a I of the").is_empty());
    }

    #[test]
    fn idf_is_smoothed_and_rarer_terms_weigh_more() {
        let vectorizer = TfidfVectorizer::fit(&["red shoes", "red sneakers", "blue hat"]);

        let red = vectorizer.idf("red").expect("red is in the vocabulary");
        let hat = vectorizer.idf("hat").expect("hat is in the vocabulary");
        assert!((red - ((4.0_f64 / 3.0).ln() + 1.0)).abs() < 1e-12);
        assert!((hat - (2.0_f64.ln() + 1.0)).abs() < 1e-12);
        assert!(hat > red);
        assert_eq!(vectorizer.vocabulary_len(), 5);
    }

    #[test]
    fn vectors_are_unit_length_and_self_similarity_is_one() {
        let (_, vectors) = TfidfVectorizer::fit_transform(&["red shoes", "leather red boots", ""]);

        for vector in &vectors[..2] {
            assert!((vector.dot(vector) - 1.0).abs() < 1e-12);
        }
        assert!(vectors[2].is_zero());
        assert_eq!(vectors[2].dot(&vectors[0]), 0.0);
    }
}
