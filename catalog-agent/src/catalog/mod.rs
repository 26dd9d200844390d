//! Item catalog searched by the lookup tool.
//!
//! A [`CatalogStore`] answers three questions: how many items exist, which embedded items are
//! nearest to a vector, and which items contain a literal text in one of the searchable fields.
//! Implementations: [`InMemoryCatalog`] (feature `in-memory-vector`) and [`SqliteCatalog`]
//! (feature `sqlite`).

#[cfg(feature = "in-memory-vector")]
mod in_memory;
#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "in-memory-vector")]
pub use in_memory::InMemoryCatalog;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteCatalog;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::embedding::{Embedder, EmbedderError};

/// One catalog entry.
///
/// `embedding` is read from catalog files and stored, but never serialized back out, so it
/// does not end up in tool results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    /// Source text the embedding was computed from.
    #[serde(default)]
    pub embedding_text: String,
    #[serde(default, skip_serializing)]
    pub embedding: Option<Vec<f32>>,
}

impl CatalogItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            categories: Vec::new(),
            price: None,
            quantity: None,
            embedding_text: String::new(),
            embedding: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_quantity(mut self, quantity: i64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn with_embedding_text(mut self, text: impl Into<String>) -> Self {
        self.embedding_text = text.into();
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Text to embed: `embedding_text` when set, else name, description and categories.
    pub fn text_for_embedding(&self) -> String {
        if !self.embedding_text.trim().is_empty() {
            return self.embedding_text.clone();
        }
        let mut parts = vec![self.name.as_str(), self.description.as_str()];
        parts.extend(self.categories.iter().map(String::as_str));
        parts
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Values of `field` for keyword matching.
    pub fn field_values(&self, field: TextField) -> Vec<&str> {
        match field {
            TextField::Name => vec![self.name.as_str()],
            TextField::Description => vec![self.description.as_str()],
            TextField::Categories => self.categories.iter().map(String::as_str).collect(),
            TextField::EmbeddingText => vec![self.embedding_text.as_str()],
        }
    }
}

/// Text fields the keyword search can match against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextField {
    Name,
    Description,
    Categories,
    EmbeddingText,
}

/// Fields the lookup tool's keyword fallback searches.
pub const KEYWORD_FIELDS: [TextField; 4] = [
    TextField::Name,
    TextField::Description,
    TextField::Categories,
    TextField::EmbeddingText,
];

/// One search hit. `score` is the cosine similarity for vector hits and `None` for keyword hits.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogHit {
    pub item: CatalogItem,
    pub score: Option<f32>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error(transparent)]
    Embedding(#[from] EmbedderError),
}

/// Queryable item catalog.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Number of items (cheap existence check).
    async fn count(&self) -> Result<usize, CatalogError>;

    /// Up to `limit` embedded items, most similar to `vector` first.
    async fn vector_search(
        &self,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<CatalogHit>, CatalogError>;

    /// Up to `limit` items where any of `fields` contains `query`, case-insensitively.
    /// `query` is literal text; no wildcard or pattern syntax is interpreted.
    async fn keyword_search(
        &self,
        query: &str,
        fields: &[TextField],
        limit: usize,
    ) -> Result<Vec<CatalogHit>, CatalogError>;

    /// Inserts items or replaces items with the same id.
    async fn upsert(&self, items: Vec<CatalogItem>) -> Result<(), CatalogError>;
}

/// Computes cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}

/// Case-insensitive literal containment, shared by the in-memory store and tests.
pub(crate) fn contains_ignore_case(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// Embeds every item that has no vector yet, filling `embedding_text` when it was empty.
pub async fn index_items(
    embedder: &dyn Embedder,
    items: Vec<CatalogItem>,
) -> Result<Vec<CatalogItem>, CatalogError> {
    let mut out = Vec::with_capacity(items.len());
    let mut embedded = 0usize;
    for mut item in items {
        if item.embedding.is_none() {
            let text = item.text_for_embedding();
            item.embedding = Some(embedder.embed(&text).await?);
            if item.embedding_text.is_empty() {
                item.embedding_text = text;
            }
            embedded += 1;
        }
        out.push(item);
    }
    debug!(items = out.len(), embedded, "Indexed catalog items");
    Ok(out)
}
