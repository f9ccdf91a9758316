//! Vocabulary construction and term-frequency vectorization

use crate::error::{AssistError, Result};
use crate::text::tokenize;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Token index with stable, frequency-ordered positions.
///
/// Position in `tokens` is the token's index; the lookup map is derived from
/// it, so only the ordered token list is serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Vocabulary {
    tokens: Vec<String>,
    index: AHashMap<String, usize>,
}

impl PartialEq for Vocabulary {
    fn eq(&self, other: &Self) -> bool {
        self.tokens == other.tokens
    }
}

impl From<Vec<String>> for Vocabulary {
    fn from(tokens: Vec<String>) -> Self {
        let index = tokens
            .iter()
            .enumerate()
            .map(|(i, token)| (token.clone(), i))
            .collect();
        Self { tokens, index }
    }
}

impl From<Vocabulary> for Vec<String> {
    fn from(vocab: Vocabulary) -> Self {
        vocab.tokens
    }
}

impl Vocabulary {
    /// Build a vocabulary from tokenized chunks.
    ///
    /// Tokens seen fewer than `min_frequency` times overall are dropped. The
    /// rest are ordered by frequency descending, then lexicographically.
    pub fn build(tokenized: &[Vec<String>], min_frequency: usize) -> Result<Self> {
        let mut counts: AHashMap<&str, usize> = AHashMap::new();
        for token in tokenized.iter().flatten() {
            *counts.entry(token.as_str()).or_insert(0) += 1;
        }

        let mut kept: Vec<(&str, usize)> = counts
            .into_iter()
            .filter(|(_, count)| *count >= min_frequency)
            .collect();
        if kept.is_empty() {
            return Err(AssistError::EmptyVocabulary { min_frequency });
        }
        kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        let tokens: Vec<String> = kept.into_iter().map(|(token, _)| token.to_string()).collect();
        Ok(Self::from(tokens))
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn index_of(&self, token: &str) -> Option<usize> {
        self.index.get(token).copied()
    }

    /// Tokens in index order
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// L1-normalized term-frequency vector over this vocabulary.
    ///
    /// Unknown tokens are ignored; the result is all zero when none is known.
    pub fn vectorize<I, S>(&self, tokens: I) -> Vec<f32>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut vector = vec![0.0f32; self.len()];
        let mut total = 0usize;
        for token in tokens {
            if let Some(idx) = self.index_of(token.as_ref()) {
                vector[idx] += 1.0;
                total += 1;
            }
        }
        if total > 0 {
            let total = total as f32;
            for value in vector.iter_mut() {
                *value /= total;
            }
        }
        vector
    }

    /// Tokenize and vectorize raw text
    pub fn vectorize_text(&self, text: &str) -> Vec<f32> {
        self.vectorize(tokenize(text))
    }
}

/// True when a vector has no vocabulary support
pub fn is_zero(vector: &[f32]) -> bool {
    vector.iter().all(|v| *v == 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenized(texts: &[&str]) -> Vec<Vec<String>> {
        texts.iter().map(|t| tokenize(t).collect()).collect()
    }

    #[test]
    fn test_frequency_then_lexicographic_order() {
        let corpus = tokenized(&[
            "install via cluster apply",
            "cluster validation checks deployments",
        ]);
        let vocab = Vocabulary::build(&corpus, 1).unwrap();

        assert_eq!(
            vocab.tokens(),
            &["cluster", "apply", "checks", "deployments", "install", "validation", "via"]
        );
        assert_eq!(vocab.index_of("cluster"), Some(0));
        assert_eq!(vocab.index_of("missing"), None);
    }

    #[test]
    fn test_indices_are_contiguous_bijection() {
        let corpus = tokenized(&["a b c a b a", "d e f d"]);
        let vocab = Vocabulary::build(&corpus, 1).unwrap();
        for (i, token) in vocab.tokens().iter().enumerate() {
            assert_eq!(vocab.index_of(token), Some(i));
        }
    }

    #[test]
    fn test_min_frequency_is_monotonic() {
        let corpus = tokenized(&["a a a b b c", "a b d e e", "c f"]);
        let mut previous = usize::MAX;
        for min_frequency in 1..=4 {
            let size = Vocabulary::build(&corpus, min_frequency)
                .map(|v| v.len())
                .unwrap_or(0);
            assert!(size <= previous);
            previous = size;
        }
    }

    #[test]
    fn test_empty_vocabulary_error() {
        let corpus = tokenized(&["one two", "three"]);
        let err = Vocabulary::build(&corpus, 2).unwrap_err();
        assert!(matches!(err, AssistError::EmptyVocabulary { min_frequency: 2 }));
    }

    #[test]
    fn test_vectorize_normalizes_counts() {
        let vocab = Vocabulary::from(vec!["cluster".to_string(), "apply".to_string()]);
        let vector = vocab.vectorize_text("cluster cluster apply unknown");

        assert!((vector[0] - 2.0 / 3.0).abs() < 1e-6);
        assert!((vector[1] - 1.0 / 3.0).abs() < 1e-6);
        let sum: f32 = vector.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(vector.iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn test_vectorize_unknown_only_is_zero() {
        let vocab = Vocabulary::from(vec!["cluster".to_string()]);
        let vector = vocab.vectorize_text("xyzzy plugh");
        assert!(is_zero(&vector));
        assert_eq!(vector.len(), 1);
    }

    #[test]
    fn test_serializes_as_ordered_tokens() {
        let vocab = Vocabulary::from(vec!["b".to_string(), "a".to_string()]);
        let json = serde_json::to_string(&vocab).unwrap();
        assert_eq!(json, r#"["b","a"]"#);

        let restored: Vocabulary = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, vocab);
        assert_eq!(restored.index_of("a"), Some(1));
    }
}
