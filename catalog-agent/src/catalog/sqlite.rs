//! SQLite-backed catalog (SqliteCatalog). Persistent across process restarts.
//!
//! Items live in one table; vectors are stored as JSON text and scored in Rust, keyword search
//! is a `LIKE` match with wildcards escaped so the query is literal.
//!
//! SQLite's `LOWER` only folds ASCII, so every searchable column has a `_lc` twin lowercased in
//! Rust on write; keyword search matches the lowercased query against those.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rusqlite::{params, Connection};

use super::{cosine_similarity, CatalogError, CatalogHit, CatalogItem, CatalogStore, TextField};

/// SQLite-backed catalog. Key: item id. Uses spawn_blocking for async.
///
/// **Interaction**: Used as `Arc<dyn CatalogStore>` by `HybridLookupTool` when the CLI is
/// given a catalog database.
pub struct SqliteCatalog {
    db_path: PathBuf,
}

fn storage(e: impl std::fmt::Display) -> CatalogError {
    CatalogError::Storage(e.to_string())
}

/// Lowercased column searched for `field`.
fn column(field: TextField) -> &'static str {
    match field {
        TextField::Name => "name_lc",
        TextField::Description => "description_lc",
        TextField::Categories => "categories_lc",
        TextField::EmbeddingText => "embedding_text_lc",
    }
}

const LOWERCASE_COLUMNS: [&str; 4] = ["name_lc", "description_lc", "categories_lc", "embedding_text_lc"];

/// Adds the `_lc` columns to tables created before they existed and fills them.
fn migrate_lowercase_columns(conn: &Connection) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare("PRAGMA table_info(catalog_items)")?;
    let existing = stmt
        .query_map([], |r| r.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    if existing.iter().any(|c| c == "name_lc") {
        return Ok(());
    }
    for col in LOWERCASE_COLUMNS {
        conn.execute(
            &format!("ALTER TABLE catalog_items ADD COLUMN {} TEXT NOT NULL DEFAULT ''", col),
            [],
        )?;
    }
    let mut stmt =
        conn.prepare("SELECT id, name, description, categories_text, embedding_text FROM catalog_items")?;
    let rows = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, String>(4)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    for (id, name, description, categories_text, embedding_text) in rows {
        conn.execute(
            "UPDATE catalog_items SET name_lc = ?2, description_lc = ?3, categories_lc = ?4, embedding_text_lc = ?5 WHERE id = ?1",
            params![
                id,
                name.to_lowercase(),
                description.to_lowercase(),
                categories_text.to_lowercase(),
                embedding_text.to_lowercase(),
            ],
        )?;
    }
    Ok(())
}

/// Escapes `\`, `%` and `_` for use with `LIKE ... ESCAPE '\'`.
fn escape_like(query: &str) -> String {
    let mut out = String::with_capacity(query.len() + 2);
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

const SELECT_ITEM: &str = "SELECT id, name, description, categories, price, quantity, embedding_text, embedding FROM catalog_items";

fn row_to_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<(CatalogItem, Option<String>, String)> {
    let item = CatalogItem {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        categories: Vec::new(),
        price: row.get(4)?,
        quantity: row.get(5)?,
        embedding_text: row.get(6)?,
        embedding: None,
    };
    let categories: String = row.get(3)?;
    let embedding: Option<String> = row.get(7)?;
    Ok((item, embedding, categories))
}

fn decode(
    (mut item, embedding, categories): (CatalogItem, Option<String>, String),
) -> Result<CatalogItem, CatalogError> {
    item.categories = serde_json::from_str(&categories)
        .map_err(|e| CatalogError::Serialization(e.to_string()))?;
    item.embedding = embedding
        .map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(|e| CatalogError::Serialization(e.to_string()))?;
    Ok(item)
}

impl SqliteCatalog {
    /// Opens (or creates) the catalog database and ensures the table exists.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let db_path = path.as_ref().to_path_buf();
        let conn = Connection::open(&db_path).map_err(storage)?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS catalog_items (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                categories TEXT NOT NULL,
                categories_text TEXT NOT NULL,
                price REAL,
                quantity INTEGER,
                embedding_text TEXT NOT NULL,
                embedding TEXT,
                name_lc TEXT NOT NULL DEFAULT '',
                description_lc TEXT NOT NULL DEFAULT '',
                categories_lc TEXT NOT NULL DEFAULT '',
                embedding_text_lc TEXT NOT NULL DEFAULT ''
            )
            "#,
            [],
        )
        .map_err(storage)?;
        migrate_lowercase_columns(&conn).map_err(storage)?;
        Ok(Self { db_path })
    }

    async fn load_items(&self, sql: String, args: Vec<String>) -> Result<Vec<CatalogItem>, CatalogError> {
        let db_path = self.db_path.clone();
        let rows = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path).map_err(storage)?;
            let mut stmt = conn.prepare(&sql).map_err(storage)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(args.iter()), row_to_item)
                .map_err(storage)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(storage)
        })
        .await
        .map_err(storage)??;
        rows.into_iter().map(decode).collect()
    }
}

#[async_trait]
impl CatalogStore for SqliteCatalog {
    async fn count(&self) -> Result<usize, CatalogError> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path).map_err(storage)?;
            let n: i64 = conn
                .query_row("SELECT COUNT(*) FROM catalog_items", [], |r| r.get(0))
                .map_err(storage)?;
            Ok::<usize, CatalogError>(n.max(0) as usize)
        })
        .await
        .map_err(storage)?
    }

    async fn vector_search(
        &self,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<CatalogHit>, CatalogError> {
        let items = self
            .load_items(
                format!("{} WHERE embedding IS NOT NULL ORDER BY seq", SELECT_ITEM),
                Vec::new(),
            )
            .await?;
        let mut scored = Vec::with_capacity(items.len());
        for item in items {
            let score = match item.embedding.as_deref() {
                Some(e) if e.len() != vector.len() => {
                    return Err(CatalogError::DimensionMismatch {
                        expected: e.len(),
                        actual: vector.len(),
                    })
                }
                Some(e) => cosine_similarity(vector, e),
                None => continue,
            };
            scored.push((score, item));
        }
        // stable sort keeps insertion order between equal scores
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(score, item)| CatalogHit {
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
        if fields.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let pattern = format!("%{}%", escape_like(&query.to_lowercase()));
        let conditions: Vec<String> = fields
            .iter()
            .map(|f| format!("{} LIKE ?1 ESCAPE '\\'", column(*f)))
            .collect();
        let sql = format!(
            "{} WHERE {} ORDER BY seq LIMIT {}",
            SELECT_ITEM,
            conditions.join(" OR "),
            limit
        );
        let items = self.load_items(sql, vec![pattern]).await?;
        Ok(items
            .into_iter()
            .map(|item| CatalogHit { item, score: None })
            .collect())
    }

    async fn upsert(&self, items: Vec<CatalogItem>) -> Result<(), CatalogError> {
        let mut rows = Vec::with_capacity(items.len());
        for item in items {
            let categories = serde_json::to_string(&item.categories)
                .map_err(|e| CatalogError::Serialization(e.to_string()))?;
            let embedding = item
                .embedding
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .map_err(|e| CatalogError::Serialization(e.to_string()))?;
            let categories_text = item.categories.join("\n");
            rows.push((item, categories, categories_text, embedding));
        }
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = Connection::open(&db_path).map_err(storage)?;
            let tx = conn.transaction().map_err(storage)?;
            for (item, categories, categories_text, embedding) in &rows {
                tx.execute(
                    r#"
                    INSERT INTO catalog_items
                        (id, name, description, categories, categories_text, price, quantity, embedding_text, embedding,
                         name_lc, description_lc, categories_lc, embedding_text_lc)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                    ON CONFLICT(id) DO UPDATE SET
                        name = excluded.name,
                        description = excluded.description,
                        categories = excluded.categories,
                        categories_text = excluded.categories_text,
                        price = excluded.price,
                        quantity = excluded.quantity,
                        embedding_text = excluded.embedding_text,
                        embedding = excluded.embedding,
                        name_lc = excluded.name_lc,
                        description_lc = excluded.description_lc,
                        categories_lc = excluded.categories_lc,
                        embedding_text_lc = excluded.embedding_text_lc
                    "#,
                    params![
                        item.id,
                        item.name,
                        item.description,
                        categories,
                        categories_text,
                        item.price,
                        item.quantity,
                        item.embedding_text,
                        embedding,
                        item.name.to_lowercase(),
                        item.description.to_lowercase(),
                        categories_text.to_lowercase(),
                        item.embedding_text.to_lowercase(),
                    ],
                )
                .map_err(storage)?;
            }
            tx.commit().map_err(storage)?;
            Ok::<(), CatalogError>(())
        })
        .await
        .map_err(storage)?
    }
}
