//! Local embedding backend using character trigram hashing.

use crate::embeddings::provider::EmbeddingProvider;
use lake_core::AppResult;
use std::collections::BTreeMap;

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them",
];

/// Deterministic hashing backend for offline use and tests.
///
/// Vectors depend only on the text and the configured dimensions: the same
/// input always yields the same vector. Word frequencies are accumulated in
/// an ordered map so floating-point summation order is fixed as well.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    model: String,
    dimensions: usize,
}

impl LocalBackend {
    pub fn new(model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            model: model.into(),
            dimensions,
        }
    }

    /// Derive the vector for one text.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        if self.dimensions == 0 {
            return embedding;
        }

        let lower = text.to_lowercase();
        let mut word_freq: BTreeMap<&str, u32> = BTreeMap::new();
        for word in tokenize(&lower) {
            *word_freq.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in &word_freq {
            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                let idx = (fold_hash(&trigram, 37) % self.dimensions as u64) as usize;
                embedding[idx] += (*freq as f32).sqrt();
            }

            let idx = (fold_hash(word, 31) % self.dimensions as u64) as usize;
            embedding[idx] += *freq as f32;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 2 && !STOP_WORDS.contains(w))
}

fn fold_hash(s: &str, multiplier: u64) -> u64 {
    s.bytes()
        .fold(0u64, |acc, b| acc.wrapping_mul(multiplier).wrapping_add(b as u64))
}

#[async_trait::async_trait]
impl EmbeddingProvider for LocalBackend {
    fn provider_name(&self) -> &str {
        "local"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_local_backend_is_deterministic() {
        let backend = LocalBackend::new("trigram-v1", 384);
        let first = backend.embed_batch(&["x".to_string()]).await.unwrap();
        let second = backend.embed_batch(&["x".to_string()]).await.unwrap();
        assert_eq!(first, second);

        let text = "Vector stores keep embeddings of documents, embeddings of queries.";
        let a = LocalBackend::new("trigram-v1", 384).embed_text(text);
        let b = LocalBackend::new("trigram-v1", 384).embed_text(text);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_local_backend_embed_single() {
        let backend = LocalBackend::new("trigram-v1", 384);
        let embedding = backend.embed("hello world").await.unwrap();

        assert_eq!(embedding.len(), 384);

        // Unit length
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_local_backend_batch_order() {
        let backend = LocalBackend::new("trigram-v1", 128);
        let texts = vec![
            "rust ownership".to_string(),
            "garden tomatoes".to_string(),
            "rust borrowing".to_string(),
        ];

        let embeddings = backend.embed_batch(&texts).await.unwrap();
        assert_eq!(embeddings.len(), 3);
        for (text, embedding) in texts.iter().zip(&embeddings) {
            assert_eq!(embedding, &backend.embed_text(text));
        }
    }

    #[test]
    fn test_related_texts_score_higher() {
        let backend = LocalBackend::new("trigram-v1", 384);
        let query = backend.embed_text("rust programming language");
        let related = backend.embed_text("programming in rust");
        let unrelated = backend.embed_text("baking sourdough bread");

        assert!(cosine(&query, &related) > cosine(&query, &unrelated));
    }

    #[test]
    fn test_stop_words_only_yield_zero_vector() {
        let backend = LocalBackend::new("trigram-v1", 64);
        let embedding = backend.embed_text("the and of a");
        assert_eq!(embedding.len(), 64);
        assert!(embedding.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_non_ascii_text() {
        let backend = LocalBackend::new("trigram-v1", 384);
        let embedding = backend.embed_text("Gamedex é um aplicativo 🎮 brasileiro para gerenciar jogos!");
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_tokenize_splits_on_punctuation() {
        let words: Vec<&str> = tokenize("hello,world! x rust-lang").collect();
        assert_eq!(words, vec!["hello", "world", "rust", "lang"]);
    }
}
