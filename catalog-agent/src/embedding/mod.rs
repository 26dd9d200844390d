//! Text embedding backends used by the lookup tool and catalog loading.
//!
//! - `Embedder`: `embed(text)`, `dimension()`
//! - `MockEmbedder`: deterministic bag-of-words vectors with a call counter, for tests
//! - `OpenAIEmbedder`: OpenAI-compatible `/embeddings` (feature `openai`)

#[cfg(feature = "openai")]
mod openai;

#[cfg(feature = "openai")]
pub use openai::OpenAIEmbedder;

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use thiserror::Error;

/// Embedding failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("embedder error: {0}")]
pub struct EmbedderError(pub String);

/// Turns text into a fixed-length vector.
///
/// Used by `HybridLookupTool` for the query and by `index_items` for catalog entries.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Vector length produced by `embed`.
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError>;
}

/// Deterministic embedder: each lowercase word is hashed into one of `dimension` buckets, so
/// texts sharing words have positive cosine similarity and disjoint texts score zero.
#[derive(Debug)]
pub struct MockEmbedder {
    dimension: usize,
    calls: AtomicUsize,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `embed` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn bucket(&self, word: &str) -> usize {
        let mut h = DefaultHasher::new();
        word.hash(&mut h);
        (h.finish() % self.dimension as u64) as usize
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut v = vec![0f32; self.dimension];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            v[self.bucket(&word.to_lowercase())] += 1.0;
        }
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::cosine_similarity;

    /// **Scenario**: Same text yields the same vector; shared words make texts similar.
    #[tokio::test]
    async fn mock_embedder_is_deterministic_and_word_based() {
        let e = MockEmbedder::new(32);
        let a = e.embed("Oak Table").await.unwrap();
        let b = e.embed("oak table").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        let c = e.embed("solid oak dining table").await.unwrap();
        assert!(cosine_similarity(&a, &c) > 0.5);
        assert_eq!(e.call_count(), 3);
    }

    #[tokio::test]
    async fn empty_text_embeds_to_zero_vector() {
        let e = MockEmbedder::default();
        let v = e.embed("  ").await.unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }
}
