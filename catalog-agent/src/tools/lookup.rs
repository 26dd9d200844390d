//! Hybrid catalog lookup: semantic search first, keyword search when semantic finds nothing.
//!
//! Every outcome, including backend failures, is returned as a [`LookupResult`] envelope
//! serialized to JSON text, so the model sees errors as ordinary tool output.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{Tool, ToolCallContent, ToolError, ToolSpec};
use crate::catalog::{CatalogError, CatalogHit, CatalogItem, CatalogStore, KEYWORD_FIELDS};
use crate::embedding::Embedder;

/// Tool name: search the item catalog.
pub const TOOL_LOOKUP_INVENTORY: &str = "lookup_inventory";
/// Results returned when the caller gives no limit.
pub const DEFAULT_LOOKUP_LIMIT: usize = 10;
/// Upper bound for `limit`; larger values are clamped.
pub const MAX_LOOKUP_LIMIT: usize = 50;

const EMPTY_CATALOG_ERROR: &str = "No items found in inventory";
const SEARCH_FAILED_ERROR: &str = "Failed to search inventory";
const INVALID_ARGUMENTS_ERROR: &str = "Invalid arguments";

/// Which search path produced the results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Semantic,
    Keyword,
}

/// A catalog item as it appears in tool output; `score` only for semantic hits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    #[serde(flatten)]
    pub item: CatalogItem,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl From<CatalogHit> for ItemRecord {
    fn from(hit: CatalogHit) -> Self {
        Self {
            item: hit.item,
            score: hit.score,
        }
    }
}

/// Successful lookup. `count` always equals `results.len()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupSuccess {
    pub results: Vec<ItemRecord>,
    pub search_type: SearchType,
    pub query: String,
    pub count: usize,
}

impl LookupSuccess {
    fn new(query: &str, search_type: SearchType, hits: Vec<CatalogHit>) -> Self {
        let results: Vec<ItemRecord> = hits.into_iter().map(ItemRecord::from).collect();
        Self {
            count: results.len(),
            results,
            search_type,
            query: query.to_string(),
        }
    }
}

/// Failed lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupFailure {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

/// Lookup envelope written into the conversation as tool-result text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LookupResult {
    Found(LookupSuccess),
    Failed(LookupFailure),
}

impl LookupResult {
    /// Number of results; 0 for failures.
    pub fn count(&self) -> usize {
        match self {
            Self::Found(s) => s.count,
            Self::Failed(f) => f.count.unwrap_or(0),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// JSON text carried by the tool-result message.
    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            json!({ "error": "Failed to encode lookup result", "details": e.to_string() })
                .to_string()
        })
    }

    /// Parses tool-result text back into an envelope.
    pub fn from_text(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Arguments accepted by the tool.
#[derive(Debug, Deserialize)]
struct LookupArgs {
    query: String,
    #[serde(default)]
    limit: Option<i64>,
}

/// Catalog search tool: embeds the query for a vector search and falls back to a literal
/// keyword search over name, description, categories and embedding text when the vector
/// search returns nothing.
///
/// **Interaction**: Registered in a `ToolRegistry`; called by the tool-execution step.
pub struct HybridLookupTool {
    catalog: Arc<dyn CatalogStore>,
    embedder: Arc<dyn Embedder>,
    default_limit: usize,
}

impl HybridLookupTool {
    pub fn new(catalog: Arc<dyn CatalogStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            catalog,
            embedder,
            default_limit: DEFAULT_LOOKUP_LIMIT,
        }
    }

    /// Limit used when a call gives none (clamped like call limits).
    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = clamp_limit(i64::try_from(limit).unwrap_or(i64::MAX));
        self
    }

    /// Runs one lookup. Never fails; errors become a failure envelope.
    pub async fn lookup(&self, query: &str, limit: Option<i64>) -> LookupResult {
        let limit = limit.map(clamp_limit).unwrap_or(self.default_limit);
        match self.search(query, limit).await {
            Ok(result) => result,
            Err(e) => {
                warn!(query, error = %e, "Inventory lookup failed");
                LookupResult::Failed(LookupFailure {
                    error: SEARCH_FAILED_ERROR.to_string(),
                    details: Some(e.to_string()),
                    query: Some(query.to_string()),
                    count: None,
                })
            }
        }
    }

    async fn search(&self, query: &str, limit: usize) -> Result<LookupResult, CatalogError> {
        if self.catalog.count().await? == 0 {
            info!(query, "Catalog is empty; skipping search");
            return Ok(LookupResult::Failed(LookupFailure {
                error: EMPTY_CATALOG_ERROR.to_string(),
                details: None,
                query: Some(query.to_string()),
                count: Some(0),
            }));
        }

        let vector = self.embedder.embed(query).await?;
        let hits = self.catalog.vector_search(&vector, limit).await?;
        if !hits.is_empty() {
            debug!(query, count = hits.len(), "Semantic search hit");
            return Ok(LookupResult::Found(LookupSuccess::new(
                query,
                SearchType::Semantic,
                hits,
            )));
        }

        info!(query, "Semantic search found nothing; falling back to keyword search");
        let hits = self
            .catalog
            .keyword_search(query, &KEYWORD_FIELDS, limit)
            .await?;
        debug!(query, count = hits.len(), "Keyword search done");
        Ok(LookupResult::Found(LookupSuccess::new(
            query,
            SearchType::Keyword,
            hits,
        )))
    }
}

/// Clamps a requested limit into `1..=MAX_LOOKUP_LIMIT`.
fn clamp_limit(limit: i64) -> usize {
    limit.clamp(1, MAX_LOOKUP_LIMIT as i64) as usize
}

#[async_trait]
impl Tool for HybridLookupTool {
    fn name(&self) -> &str {
        TOOL_LOOKUP_INVENTORY
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_LOOKUP_INVENTORY.to_string(),
            description: Some(
                "Search the store's item catalog. Call for any question about products, \
                 availability, prices or categories. Returns matching items as JSON."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "What to look for, in plain words" },
                    "limit": {
                        "type": "integer",
                        "description": "Max results (default 10, at most 50)",
                        "minimum": 1,
                        "maximum": MAX_LOOKUP_LIMIT
                    }
                },
                "required": ["query"]
            }),
        }
    }

    /// Bad arguments are answered with a failure envelope so the model can retry the call.
    async fn call(&self, arguments: Value) -> Result<ToolCallContent, ToolError> {
        let result = match serde_json::from_value::<LookupArgs>(arguments.clone()) {
            Ok(args) => self.lookup(&args.query, args.limit).await,
            Err(e) => {
                warn!(error = %e, "Lookup called with invalid arguments");
                LookupResult::Failed(LookupFailure {
                    error: INVALID_ARGUMENTS_ERROR.to_string(),
                    details: Some(e.to_string()),
                    query: arguments
                        .get("query")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    count: None,
                })
            }
        };
        Ok(ToolCallContent {
            text: result.to_text(),
        })
    }
}
