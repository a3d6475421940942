use std::collections::BTreeMap;

use async_trait::async_trait;
use rusqlite::{params, params_from_iter};
use serde_json::Value;

use super::connection::Database;
use crate::errors::{PopulateError, Result};
use crate::store::ReferenceStore;
use crate::types::ResolvedMedia;

// ---------------------------------------------------------------------------
// Helper: map rusqlite rows to domain types
// ---------------------------------------------------------------------------

const MEDIA_COLUMNS: &str = "document_id, name, url, thumbnail_url, formats, alternative_text,
                             caption, width, height, mime, size, updated_at";

/// Maps a row from the `media_files` table to a `ResolvedMedia`.
fn row_to_media(row: &rusqlite::Row) -> rusqlite::Result<ResolvedMedia> {
    let formats_json: String = row.get("formats")?;
    let formats: BTreeMap<String, String> =
        serde_json::from_str(&formats_json).unwrap_or_default();

    Ok(ResolvedMedia {
        document_id: row.get("document_id")?,
        url: row.get("url")?,
        thumbnail_url: row.get("thumbnail_url")?,
        formats,
        name: row.get("name")?,
        alternative_text: row.get("alternative_text")?,
        caption: row.get("caption")?,
        width: row.get("width")?,
        height: row.get("height")?,
        mime_type: row.get("mime")?,
        size: row.get("size")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Raw columns of an `entries` row before the JSON payload is decoded.
struct EntryRow {
    document_id: String,
    locale: Option<String>,
    published_at: Option<String>,
    updated_at: Option<String>,
    data: String,
}

fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<EntryRow> {
    Ok(EntryRow {
        document_id: row.get("document_id")?,
        locale: row.get("locale")?,
        published_at: row.get("published_at")?,
        updated_at: row.get("updated_at")?,
        data: row.get("data")?,
    })
}

impl EntryRow {
    /// Decodes the stored record, backfilling the indexed columns so callers
    /// always see `documentId`, `locale`, `publishedAt` and `updatedAt`.
    fn into_record(self) -> Result<Value> {
        let mut record: Value = serde_json::from_str(&self.data)?;
        let Some(object) = record.as_object_mut() else {
            return Err(PopulateError::Database {
                message: format!("entry '{}' is not a JSON object", self.document_id),
                operation: "find_entries".to_string(),
            });
        };
        object.insert("documentId".to_string(), Value::String(self.document_id));
        for (key, column) in [
            ("locale", self.locale),
            ("publishedAt", self.published_at),
            ("updatedAt", self.updated_at),
        ] {
            object
                .entry(key.to_string())
                .or_insert_with(|| column.map(Value::String).unwrap_or(Value::Null));
        }
        Ok(record)
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn str_field(record: &Value, key: &str) -> Option<String> {
    record.get(key).and_then(Value::as_str).map(str::to_string)
}

// ---------------------------------------------------------------------------
// Media operations
// ---------------------------------------------------------------------------

impl Database {
    /// Inserts or replaces a media record.
    pub fn upsert_media(&self, media: &ResolvedMedia) -> Result<()> {
        let formats = serde_json::to_string(&media.formats)?;
        self.conn("upsert_media")?
            .execute(
                "INSERT OR REPLACE INTO media_files
                    (document_id, name, url, thumbnail_url, formats, alternative_text,
                     caption, width, height, mime, size, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    media.document_id,
                    media.name,
                    media.url,
                    media.thumbnail_url,
                    formats,
                    media.alternative_text,
                    media.caption,
                    media.width,
                    media.height,
                    media.mime_type,
                    media.size,
                    media.updated_at,
                ],
            )
            .map_err(|e| PopulateError::Database {
                message: format!("failed to upsert media: {e}"),
                operation: "upsert_media".to_string(),
            })?;
        Ok(())
    }

    /// Returns the media records whose document id is in `document_ids`,
    /// using a single `IN (...)` query.
    pub fn get_media_by_ids(&self, document_ids: &[String]) -> Result<Vec<ResolvedMedia>> {
        if document_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {MEDIA_COLUMNS} FROM media_files WHERE document_id IN ({})",
            placeholders(document_ids.len())
        );
        let conn = self.conn("get_media_by_ids")?;
        let mut stmt = conn.prepare(&sql).map_err(|e| PopulateError::Database {
            message: format!("failed to prepare query: {e}"),
            operation: "get_media_by_ids".to_string(),
        })?;

        let rows = stmt
            .query_map(params_from_iter(document_ids.iter()), row_to_media)
            .map_err(|e| PopulateError::Database {
                message: format!("failed to query media: {e}"),
                operation: "get_media_by_ids".to_string(),
            })?;

        let mut media = Vec::new();
        for row in rows {
            media.push(row.map_err(|e| PopulateError::Database {
                message: format!("failed to read media row: {e}"),
                operation: "get_media_by_ids".to_string(),
            })?);
        }
        Ok(media)
    }
}

// ---------------------------------------------------------------------------
// Entry operations
// ---------------------------------------------------------------------------

impl Database {
    /// Inserts or replaces a raw entry record of `content_type`.
    ///
    /// The record must be a JSON object with a string `documentId`.
    pub fn upsert_entry(&self, content_type: &str, record: &Value) -> Result<()> {
        let document_id = str_field(record, "documentId").ok_or_else(|| PopulateError::Store {
            message: "entry record has no string documentId".to_string(),
            content_type: content_type.to_string(),
        })?;
        if !record.is_object() {
            return Err(PopulateError::Store {
                message: "entry record is not a JSON object".to_string(),
                content_type: content_type.to_string(),
            });
        }

        // serde_json refuses to parse beyond its nesting limit, so a record
        // that cannot be read back is rejected here instead of stored.
        let data = record.to_string();
        if let Err(e) = serde_json::from_str::<Value>(&data) {
            return Err(PopulateError::Store {
                message: format!("entry '{document_id}' cannot be read back: {e}"),
                content_type: content_type.to_string(),
            });
        }

        self.conn("upsert_entry")?
            .execute(
                "INSERT OR REPLACE INTO entries
                    (content_type, document_id, locale, published_at, updated_at, data)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    content_type,
                    document_id,
                    str_field(record, "locale"),
                    str_field(record, "publishedAt"),
                    str_field(record, "updatedAt"),
                    data,
                ],
            )
            .map_err(|e| PopulateError::Database {
                message: format!("failed to upsert entry: {e}"),
                operation: "upsert_entry".to_string(),
            })?;
        Ok(())
    }

    /// Returns the records of `content_type` whose document id is in
    /// `document_ids`, using a single `IN (...)` query.
    pub fn get_entries_by_ids(
        &self,
        content_type: &str,
        document_ids: &[String],
    ) -> Result<Vec<Value>> {
        if document_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT document_id, locale, published_at, updated_at, data
             FROM entries WHERE content_type = ? AND document_id IN ({})",
            placeholders(document_ids.len())
        );
        let rows: Vec<EntryRow> = {
            let conn = self.conn("get_entries_by_ids")?;
            let mut stmt = conn.prepare(&sql).map_err(|e| PopulateError::Database {
                message: format!("failed to prepare query: {e}"),
                operation: "get_entries_by_ids".to_string(),
            })?;

            let params = std::iter::once(content_type).chain(document_ids.iter().map(String::as_str));
            let mapped = stmt
                .query_map(params_from_iter(params), row_to_entry)
                .map_err(|e| PopulateError::Database {
                    message: format!("failed to query entries: {e}"),
                    operation: "get_entries_by_ids".to_string(),
                })?;

            let mut rows = Vec::new();
            for row in mapped {
                rows.push(row.map_err(|e| PopulateError::Database {
                    message: format!("failed to read entry row: {e}"),
                    operation: "get_entries_by_ids".to_string(),
                })?);
            }
            rows
        };

        // A record that no longer decodes is dropped from the batch rather
        // than failing every other record of the content type.
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let document_id = row.document_id.clone();
                match row.into_record() {
                    Ok(record) => Some(record),
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            content_type,
                            document_id = %document_id,
                            "skipping undecodable entry record"
                        );
                        None
                    }
                }
            })
            .collect())
    }

    /// Number of stored media records and entry records.
    pub fn counts(&self) -> Result<(u64, u64)> {
        let conn = self.conn("counts")?;
        let count = |table: &str| -> Result<u64> {
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|n| n as u64)
            .map_err(|e| PopulateError::Database {
                message: format!("failed to count {table}: {e}"),
                operation: "counts".to_string(),
            })
        };
        Ok((count("media_files")?, count("entries")?))
    }
}

// ---------------------------------------------------------------------------
// ReferenceStore
// ---------------------------------------------------------------------------

/// Runs a blocking query on the blocking thread pool so a slow or locked
/// database never stalls a runtime worker.
async fn run_blocking<T, F>(db: &Database, operation: &'static str, query: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&Database) -> Result<T> + Send + 'static,
{
    let db = db.clone();
    tokio::task::spawn_blocking(move || query(&db))
        .await
        .map_err(|e| PopulateError::Database {
            message: format!("blocking query task failed: {e}"),
            operation: operation.to_string(),
        })?
}

#[async_trait]
impl ReferenceStore for Database {
    async fn find_media(&self, document_ids: &[String]) -> Result<Vec<ResolvedMedia>> {
        if document_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = document_ids.to_vec();
        run_blocking(self, "find_media", move |db| db.get_media_by_ids(&ids)).await
    }

    async fn find_entries(
        &self,
        content_type: &str,
        document_ids: &[String],
    ) -> Result<Vec<Value>> {
        if document_ids.is_empty() {
            return Ok(Vec::new());
        }
        let content_type = content_type.to_string();
        let ids = document_ids.to_vec();
        run_blocking(self, "find_entries", move |db| {
            db.get_entries_by_ids(&content_type, &ids)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn test_store_queries_run_off_the_runtime() {
        let db = Database::in_memory().unwrap();
        db.upsert_media(&ResolvedMedia::new("m1", "/m1.png")).unwrap();

        // Hold the connection from another thread so the query has to wait.
        let holder_db = db.clone();
        let (locked_tx, locked_rx) = std::sync::mpsc::channel();
        let holder = std::thread::spawn(move || {
            let _conn = holder_db.conn("test").unwrap();
            locked_tx.send(()).unwrap();
            std::thread::sleep(Duration::from_millis(200));
        });
        locked_rx.recv().unwrap();

        let ticker = tokio::spawn(async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Instant::now()
        });
        let media = db.find_media(&["m1".to_string()]).await.unwrap();
        let finished = Instant::now();

        assert_eq!(media.len(), 1);
        assert!(ticker.await.unwrap() < finished);
        holder.join().unwrap();
    }

    #[test]
    fn test_undecodable_entry_row_is_skipped() {
        let db = Database::in_memory().unwrap();
        db.upsert_entry("api::post.post", &json!({"documentId": "p2", "title": "Two"}))
            .unwrap();
        db.conn("test")
            .unwrap()
            .execute(
                "INSERT INTO entries (content_type, document_id, data) VALUES (?1, ?2, ?3)",
                params!["api::post.post", "p1", "{not json"],
            )
            .unwrap();

        let found = db
            .get_entries_by_ids("api::post.post", &["p1".to_string(), "p2".to_string()])
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["documentId"], "p2");
    }
}
