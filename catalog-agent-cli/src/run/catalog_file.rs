//! Loads a JSON catalog file into a catalog store, embedding items that carry no vector.

use std::path::Path;

use catalog_agent::{index_items, CatalogItem, CatalogStore, Embedder};

use super::Error;

/// Reads a JSON array of catalog items from `path`, embeds the ones without an `embedding`,
/// and upserts them all. Returns the number of items loaded.
pub async fn load_catalog_file(
    path: &Path,
    embedder: &dyn Embedder,
    catalog: &dyn CatalogStore,
) -> Result<usize, Error> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| format!("cannot read catalog file {}: {}", path.display(), e))?;
    let items: Vec<CatalogItem> = serde_json::from_str(&text)
        .map_err(|e| format!("invalid catalog file {}: {}", path.display(), e))?;
    let items = index_items(embedder, items).await?;
    let count = items.len();
    catalog.upsert(items).await?;
    Ok(count)
}
