//! Chunk store adapter: metadata sanitization, batched upserts, and the
//! bundled SQLite-backed index.
//!
//! Rich in-memory metadata is flattened at this boundary only: every value a
//! store row carries is a scalar (string, number, boolean, null). Writes go
//! through [`upsert_batch`], which keys on `chunk_id` so re-running a sync
//! overwrites rather than duplicates.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;

use crate::config::Config;
use crate::error::IngestError;
use crate::models::{ChunkMeta, MusicChunk};

/// Chunks written per store call.
const UPSERT_BATCH: usize = 100;

pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let db_path = &config.store.path;

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// One ranked result out of [`VectorIndex::query`].
#[derive(Debug, Clone)]
pub struct IndexHit {
    pub chunk_id: String,
    pub source: String,
    pub title: String,
    pub document: String,
    pub metadata: Map<String, Value>,
    pub score: f64,
}

/// Seam to the retrieval index. The bundled [`SqliteIndex`] ranks with FTS5;
/// an embedding-backed index can implement the same trait.
#[async_trait]
pub trait VectorIndex {
    async fn add(
        &self,
        ids: &[String],
        documents: &[String],
        metadatas: &[Map<String, Value>],
    ) -> Result<(), IngestError>;

    async fn query(&self, text: &str, k: usize) -> Result<Vec<IndexHit>, IngestError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UpsertReport {
    pub written: usize,
    pub failed_batches: usize,
}

/// Write chunks in fixed-size batches. A failing batch is logged and skipped;
/// later batches still run. Duplicate ids overwrite (the store keys on
/// `chunk_id`), so at-least-once delivery is safe.
pub async fn upsert_batch(index: &dyn VectorIndex, chunks: &[MusicChunk]) -> UpsertReport {
    let mut report = UpsertReport::default();
    for batch in chunks.chunks(UPSERT_BATCH) {
        let ids: Vec<String> = batch.iter().map(|c| c.chunk_id.clone()).collect();
        let documents: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
        let metadatas: Vec<Map<String, Value>> =
            batch.iter().map(|c| sanitize_meta(&c.metadata)).collect();
        match index.add(&ids, &documents, &metadatas).await {
            Ok(()) => report.written += batch.len(),
            Err(e) => {
                tracing::warn!("batch of {} chunks not written: {e}", batch.len());
                report.failed_batches += 1;
            }
        }
    }
    report
}

/// Flatten chunk metadata to store-safe scalars. Total: any metadata shape
/// comes back as a map of scalar values.
pub fn sanitize_meta(meta: &ChunkMeta) -> Map<String, Value> {
    match serde_json::to_value(meta) {
        Ok(Value::Object(map)) => sanitize(&map),
        Ok(other) => {
            let mut map = Map::new();
            map.insert("value".to_string(), sanitize_value(&other));
            map
        }
        Err(_) => Map::new(),
    }
}

/// Sanitize every value of a metadata map.
pub fn sanitize(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .map(|(k, v)| (k.clone(), sanitize_value(v)))
        .collect()
}

/// Scalars pass through; all-scalar arrays join into one comma-separated
/// string; any other composite serializes to its JSON string.
fn sanitize_value(value: &Value) -> Value {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => value.clone(),
        Value::Array(items) if items.iter().all(is_scalar) => Value::String(
            items
                .iter()
                .map(scalar_to_string)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        other => Value::String(other.to_string()),
    }
}

fn is_scalar(value: &Value) -> bool {
    matches!(
        value,
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_)
    )
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The bundled index: one `chunks` table keyed by `chunk_id` plus an FTS5
/// shadow table for ranked lookup.
pub struct SqliteIndex {
    pool: SqlitePool,
}

impl SqliteIndex {
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = connect(config).await?;
        Ok(SqliteIndex { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    async fn add(
        &self,
        ids: &[String],
        documents: &[String],
        metadatas: &[Map<String, Value>],
    ) -> Result<(), IngestError> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;
        let now = chrono::Utc::now().timestamp();
        for ((id, document), metadata) in ids.iter().zip(documents).zip(metadatas) {
            let source = metadata.get("source").and_then(Value::as_str).unwrap_or("");
            let title = metadata.get("title").and_then(Value::as_str).unwrap_or("");
            let metadata_json = Value::Object(metadata.clone()).to_string();
            sqlx::query(
                r#"
                INSERT INTO chunks (chunk_id, source, title, document, metadata_json, ingested_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(chunk_id) DO UPDATE SET
                    source = excluded.source,
                    title = excluded.title,
                    document = excluded.document,
                    metadata_json = excluded.metadata_json,
                    ingested_at = excluded.ingested_at
                "#,
            )
            .bind(id)
            .bind(source)
            .bind(title)
            .bind(document)
            .bind(&metadata_json)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;

            // FTS5 has no upsert; replace the shadow row
            sqlx::query("DELETE FROM chunks_fts WHERE chunk_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(store_err)?;
            sqlx::query("INSERT INTO chunks_fts (chunk_id, document) VALUES (?, ?)")
                .bind(id)
                .bind(document)
                .execute(&mut *tx)
                .await
                .map_err(store_err)?;
        }
        tx.commit().await.map_err(store_err)?;
        Ok(())
    }

    async fn query(&self, text: &str, k: usize) -> Result<Vec<IndexHit>, IngestError> {
        let rows = sqlx::query(
            r#"
            SELECT chunk_id, rank
            FROM chunks_fts
            WHERE chunks_fts MATCH ?
            ORDER BY rank, chunk_id
            LIMIT ?
            "#,
        )
        .bind(text)
        .bind(k as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        let mut hits = Vec::with_capacity(rows.len());
        for row in rows {
            let chunk_id: String = row.get("chunk_id");
            let rank: f64 = row.get("rank");
            let chunk = sqlx::query(
                "SELECT source, title, document, metadata_json FROM chunks WHERE chunk_id = ?",
            )
            .bind(&chunk_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
            if let Some(chunk) = chunk {
                let metadata_json: String = chunk.get("metadata_json");
                let metadata = serde_json::from_str::<Value>(&metadata_json)
                    .ok()
                    .and_then(|v| v.as_object().cloned())
                    .unwrap_or_default();
                hits.push(IndexHit {
                    chunk_id,
                    source: chunk.get("source"),
                    title: chunk.get("title"),
                    document: chunk.get("document"),
                    metadata,
                    score: -rank, // negate so higher = better
                });
            }
        }
        Ok(hits)
    }
}

fn store_err(e: sqlx::Error) -> IngestError {
    IngestError::StoreWrite(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Difficulty, NoteEventMeta, ProseMeta, Topic};

    #[test]
    fn scalars_pass_through_unchanged() {
        let raw = serde_json::json!({
            "s": "text", "n": 3, "f": 0.5, "b": true, "z": null,
        });
        let flat = sanitize(raw.as_object().unwrap());
        assert_eq!(flat["s"], "text");
        assert_eq!(flat["n"], 3);
        assert_eq!(flat["f"], 0.5);
        assert_eq!(flat["b"], true);
        assert!(flat["z"].is_null());
    }

    #[test]
    fn scalar_arrays_join_and_maps_serialize() {
        let raw = serde_json::json!({
            "notes": [1, 2, 3],
            "nested": {"a": 1},
        });
        let flat = sanitize(raw.as_object().unwrap());
        assert_eq!(flat["notes"], "1, 2, 3");
        assert_eq!(flat["nested"], "{\"a\":1}");
    }

    #[test]
    fn string_arrays_join_without_quoting() {
        let raw = serde_json::json!({"notes": ["E2", "A2"]});
        let flat = sanitize(raw.as_object().unwrap());
        assert_eq!(flat["notes"], "E2, A2");
    }

    #[test]
    fn mixed_arrays_serialize_to_json() {
        let raw = serde_json::json!({"mixed": [1, "a", {"b": 2}]});
        let flat = sanitize(raw.as_object().unwrap());
        assert_eq!(flat["mixed"], "[1,\"a\",{\"b\":2}]");
    }

    #[test]
    fn sanitize_is_total_over_deep_nesting() {
        let raw = serde_json::json!({
            "deep": {"a": {"b": {"c": [1, [2, 3]]}}},
            "list_of_lists": [[1], [2]],
        });
        let flat = sanitize(raw.as_object().unwrap());
        for value in flat.values() {
            assert!(is_scalar(value), "non-scalar survived: {value:?}");
        }
    }

    #[test]
    fn note_event_meta_sanitizes_to_scalars() {
        let meta = ChunkMeta::NoteEvent(NoteEventMeta {
            source: "TuxGuitar".to_string(),
            title: "Etude".to_string(),
            track: 0,
            measure: 2,
            beat: 1,
            notes: vec!["E2".to_string(), "B2".to_string()],
            chord: None,
            tempo: Some(120),
            duration: None,
        });
        let flat = sanitize_meta(&meta);
        assert_eq!(flat["notes"], "E2, B2");
        assert!(flat["chord"].is_null());
        assert_eq!(flat["measure"], 2);
        for value in flat.values() {
            assert!(is_scalar(value));
        }
    }

    #[test]
    fn prose_meta_keeps_the_type_key() {
        let meta = ChunkMeta::Prose(ProseMeta {
            source: "example.com".to_string(),
            url: "https://example.com/a".to_string(),
            title: "T".to_string(),
            content_type: "lesson".to_string(),
            format: None,
            topic: Topic::Chords,
            difficulty: Difficulty::Beginner,
            instrument: "guitar".to_string(),
        });
        let flat = sanitize_meta(&meta);
        assert_eq!(flat["type"], "lesson");
        assert_eq!(flat["topic"], "chords");
        assert_eq!(flat["difficulty"], "beginner");
        assert!(!flat.contains_key("format"));
    }

    struct FakeIndex {
        fail_batch: usize,
        calls: std::sync::Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl VectorIndex for FakeIndex {
        async fn add(
            &self,
            ids: &[String],
            _documents: &[String],
            _metadatas: &[Map<String, Value>],
        ) -> Result<(), IngestError> {
            let mut calls = self.calls.lock().unwrap();
            calls.push(ids.len());
            if calls.len() == self.fail_batch {
                return Err(IngestError::StoreWrite("disk full".to_string()));
            }
            Ok(())
        }

        async fn query(&self, _text: &str, _k: usize) -> Result<Vec<IndexHit>, IngestError> {
            Ok(Vec::new())
        }
    }

    fn test_chunk(i: usize) -> MusicChunk {
        MusicChunk {
            source: "example.com".to_string(),
            title: "Page".to_string(),
            content: format!("chunk body {i}"),
            metadata: ChunkMeta::Prose(ProseMeta {
                source: "example.com".to_string(),
                url: "https://example.com/page".to_string(),
                title: "Page".to_string(),
                content_type: "main_page".to_string(),
                format: None,
                topic: Topic::General,
                difficulty: Difficulty::Intermediate,
                instrument: "general".to_string(),
            }),
            chunk_id: format!("{i:064x}"),
            token_count: 3,
        }
    }

    #[tokio::test]
    async fn upsert_splits_into_batches_and_survives_failures() {
        let chunks: Vec<MusicChunk> = (0..250).map(test_chunk).collect();
        let index = FakeIndex {
            fail_batch: 2,
            calls: std::sync::Mutex::new(Vec::new()),
        };
        let report = upsert_batch(&index, &chunks).await;
        assert_eq!(*index.calls.lock().unwrap(), vec![100, 100, 50]);
        assert_eq!(report.written, 150);
        assert_eq!(report.failed_batches, 1);
    }

    #[tokio::test]
    async fn empty_input_writes_nothing() {
        let index = FakeIndex {
            fail_batch: 0,
            calls: std::sync::Mutex::new(Vec::new()),
        };
        let report = upsert_batch(&index, &[]).await;
        assert_eq!(report.written, 0);
        assert_eq!(report.failed_batches, 0);
        assert!(index.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn sqlite_index_upserts_and_ranks() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.store.path = dir.path().join("riff.db");
        crate::migrate::run_migrations(&config).await.unwrap();

        let index = SqliteIndex::open(&config).await.unwrap();
        let chunks = vec![test_chunk(1), test_chunk(2)];
        let report = upsert_batch(&index, &chunks).await;
        assert_eq!(report.written, 2);
        assert_eq!(report.failed_batches, 0);

        let hits = index.query("body", 5).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].source, "example.com");
        assert_eq!(hits[0].metadata["type"], "main_page");

        // Same ids again: overwrite, not duplicate
        let report = upsert_batch(&index, &chunks).await;
        assert_eq!(report.written, 2);
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(index.pool())
            .await
            .unwrap();
        assert_eq!(total, 2);

        index.close().await;
    }
}
