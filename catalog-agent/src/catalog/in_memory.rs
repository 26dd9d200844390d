use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use super::{
    contains_ignore_case, cosine_similarity, CatalogError, CatalogHit, CatalogItem, CatalogStore,
    TextField,
};

/// Pure in-memory catalog with vector and keyword search.
///
/// **Interaction**: Used as `Arc<dyn CatalogStore>` by `HybridLookupTool`; tests and the CLI's
/// `--catalog-json` without a catalog database use it.
///
/// **In-Memory**: All data stored in memory, lost when the catalog is dropped.
#[derive(Default)]
pub struct InMemoryCatalog {
    data: DashMap<String, Entry>,
    next_seq: AtomicU64,
}

/// Insertion sequence keeps result order stable between equal scores.
#[derive(Clone)]
struct Entry {
    seq: u64,
    item: CatalogItem,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog pre-filled with `items`, in order.
    pub fn with_items(items: Vec<CatalogItem>) -> Self {
        let catalog = Self::new();
        for item in items {
            catalog.insert(item);
        }
        catalog
    }

    fn insert(&self, item: CatalogItem) {
        let seq = match self.data.get(&item.id) {
            Some(existing) => existing.seq,
            None => self.next_seq.fetch_add(1, Ordering::SeqCst),
        };
        self.data.insert(item.id.clone(), Entry { seq, item });
    }

    fn entries_in_order(&self) -> Vec<Entry> {
        let mut entries: Vec<Entry> = self.data.iter().map(|e| e.value().clone()).collect();
        entries.sort_by_key(|e| e.seq);
        entries
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn count(&self) -> Result<usize, CatalogError> {
        Ok(self.data.len())
    }

    async fn vector_search(
        &self,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<CatalogHit>, CatalogError> {
        let mut scored: Vec<(u64, f32, CatalogItem)> = Vec::new();
        for entry in self.entries_in_order() {
            let Some(embedding) = entry.item.embedding.as_deref() else {
                continue;
            };
            if embedding.len() != vector.len() {
                return Err(CatalogError::DimensionMismatch {
                    expected: embedding.len(),
                    actual: vector.len(),
                });
            }
            let score = cosine_similarity(vector, embedding);
            scored.push((entry.seq, score, entry.item));
        }
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, score, item)| CatalogHit {
                item,
                score: Some(score),
            })
            .collect())
    }

    async fn keyword_search(
        &self,
        query: &str,
        fields: &[TextField],
        limit: usize,
    ) -> Result<Vec<CatalogHit>, CatalogError> {
        let needle = query.to_lowercase();
        Ok(self
            .entries_in_order()
            .into_iter()
            .filter(|e| {
                fields.iter().any(|f| {
                    e.item
                        .field_values(*f)
                        .into_iter()
                        .any(|v| contains_ignore_case(v, &needle))
                })
            })
            .take(limit)
            .map(|e| CatalogHit {
                item: e.item,
                score: None,
            })
            .collect())
    }

    async fn upsert(&self, items: Vec<CatalogItem>) -> Result<(), CatalogError> {
        for item in items {
            self.insert(item);
        }
        Ok(())
    }
}
