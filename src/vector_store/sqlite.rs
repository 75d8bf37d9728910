//! SQLite-based highlight store implementation.
//!
//! Uses SQLite for persistence with similarity computed in Rust. The store
//! holds a single video's worth of highlights at a time, so a full scan per
//! query is cheap.

use super::{
    check_dimensions, rank_candidates, validate_configured_dimensions, HighlightStore,
    ModalityFilter,
};
use crate::config::DistanceMetric;
use crate::error::{GlimtError, Result};
use crate::models::{
    Highlight, HighlightId, NewHighlight, RankedResult, Video, VideoHighlight, VideoId,
    VideoSummary,
};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS videos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    filename TEXT NOT NULL,
    duration REAL NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS highlights (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    video_id INTEGER NOT NULL REFERENCES videos(id),
    timestamp REAL NOT NULL,
    end_timestamp REAL,
    description TEXT NOT NULL,
    embedding BLOB NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_highlights_video_id ON highlights(video_id);
CREATE INDEX IF NOT EXISTS idx_highlights_timestamp ON highlights(video_id, timestamp);

CREATE TABLE IF NOT EXISTS video_summaries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    video_id INTEGER NOT NULL REFERENCES videos(id),
    summary TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_video_summaries_video_id ON video_summaries(video_id);
"#;

const HIGHLIGHT_COLUMNS: &str =
    "h.id, h.video_id, h.timestamp, h.end_timestamp, h.description, h.embedding, v.filename";

/// SQLite-based highlight store.
pub struct SqliteHighlightStore {
    conn: Mutex<Connection>,
    dimensions: usize,
    metric: DistanceMetric,
}

impl SqliteHighlightStore {
    /// Open (or create) a store at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path, dimensions: usize, metric: DistanceMetric) -> Result<Self> {
        validate_configured_dimensions(dimensions)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let store = Self::with_connection(conn, dimensions, metric)?;
        info!("Initialized SQLite highlight store at {:?}", path);
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory(dimensions: usize, metric: DistanceMetric) -> Result<Self> {
        validate_configured_dimensions(dimensions)?;
        Self::with_connection(Connection::open_in_memory()?, dimensions, metric)
    }

    fn with_connection(conn: Connection, dimensions: usize, metric: DistanceMetric) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
            dimensions,
            metric,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| GlimtError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    /// Fixed-width so that text ordering matches time ordering.
    fn format_time(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn parse_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn row_to_video_highlight(row: &Row<'_>) -> rusqlite::Result<VideoHighlight> {
        let embedding_bytes: Vec<u8> = row.get(5)?;
        Ok(VideoHighlight {
            highlight: Highlight {
                id: row.get(0)?,
                video_id: row.get(1)?,
                timestamp: row.get(2)?,
                end_timestamp: row.get(3)?,
                description: row.get(4)?,
                embedding: Self::bytes_to_embedding(&embedding_bytes),
            },
            filename: row.get(6)?,
        })
    }

    fn row_to_video(row: &Row<'_>) -> rusqlite::Result<Video> {
        let created_at: String = row.get(3)?;
        Ok(Video {
            id: row.get(0)?,
            filename: row.get(1)?,
            duration: row.get(2)?,
            created_at: Self::parse_time(&created_at),
        })
    }

    fn insert_row(conn: &Connection, highlight: &NewHighlight) -> Result<HighlightId> {
        conn.execute(
            r#"
            INSERT INTO highlights (video_id, timestamp, end_timestamp, description, embedding, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                highlight.video_id,
                highlight.timestamp,
                highlight.end_timestamp,
                highlight.description,
                Self::embedding_to_bytes(&highlight.embedding),
                Self::format_time(&Utc::now()),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }
}

#[async_trait]
impl HighlightStore for SqliteHighlightStore {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self))]
    async fn insert_video(&self, filename: &str, duration: f64) -> Result<Video> {
        let conn = self.lock()?;
        let created_at = Utc::now();

        conn.execute(
            "INSERT INTO videos (filename, duration, created_at) VALUES (?1, ?2, ?3)",
            params![filename, duration, Self::format_time(&created_at)],
        )?;

        let video = Video {
            id: conn.last_insert_rowid(),
            filename: filename.to_string(),
            duration,
            created_at,
        };
        debug!("Inserted video {}", video.id);
        Ok(video)
    }

    #[instrument(skip(self, highlight), fields(video_id = highlight.video_id))]
    async fn insert_highlight(&self, highlight: &NewHighlight) -> Result<HighlightId> {
        check_dimensions(self.dimensions, &highlight.embedding)?;
        let conn = self.lock()?;
        Self::insert_row(&conn, highlight)
    }

    #[instrument(skip(self, highlights), fields(count = highlights.len()))]
    async fn insert_highlights(&self, highlights: &[NewHighlight]) -> Result<usize> {
        for highlight in highlights {
            check_dimensions(self.dimensions, &highlight.embedding)?;
        }

        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        for highlight in highlights {
            Self::insert_row(&tx, highlight)?;
        }
        tx.commit()?;

        info!("Batch inserted {} highlights", highlights.len());
        Ok(highlights.len())
    }

    #[instrument(skip(self, summary))]
    async fn insert_summary(&self, video_id: VideoId, summary: &str) -> Result<VideoSummary> {
        let conn = self.lock()?;
        let created_at = Utc::now();

        conn.execute(
            "INSERT INTO video_summaries (video_id, summary, created_at) VALUES (?1, ?2, ?3)",
            params![video_id, summary, Self::format_time(&created_at)],
        )?;

        info!("Stored summary for video {}", video_id);
        Ok(VideoSummary {
            id: conn.last_insert_rowid(),
            video_id,
            summary: summary.to_string(),
            created_at,
        })
    }

    #[instrument(skip(self))]
    async fn latest_summary(&self, video_id: VideoId) -> Result<Option<VideoSummary>> {
        let conn = self.lock()?;

        let summary = conn
            .query_row(
                r#"
                SELECT id, video_id, summary, created_at
                FROM video_summaries
                WHERE video_id = ?1
                ORDER BY created_at DESC, id DESC
                LIMIT 1
                "#,
                params![video_id],
                |row| {
                    let created_at: String = row.get(3)?;
                    Ok(VideoSummary {
                        id: row.get(0)?,
                        video_id: row.get(1)?,
                        summary: row.get(2)?,
                        created_at: Self::parse_time(&created_at),
                    })
                },
            )
            .optional()?;

        Ok(summary)
    }

    #[instrument(skip(self, embedding))]
    async fn nearest_neighbors(
        &self,
        embedding: &[f32],
        filter: ModalityFilter,
        limit: Option<usize>,
    ) -> Result<Vec<RankedResult>> {
        check_dimensions(self.dimensions, embedding)?;
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {HIGHLIGHT_COLUMNS}
            FROM highlights h
            JOIN videos v ON h.video_id = v.id
            WHERE {}
            "#,
            filter.sql_predicate()
        ))?;

        let candidates = stmt
            .query_map([], Self::row_to_video_highlight)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let results = rank_candidates(embedding, self.metric, candidates, limit);
        debug!("Ranked {} {:?} highlights", results.len(), filter);
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn highlights_in_range(
        &self,
        video_id: VideoId,
        start: f64,
        end: f64,
        filter: ModalityFilter,
        limit: usize,
    ) -> Result<Vec<VideoHighlight>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {HIGHLIGHT_COLUMNS}
            FROM highlights h
            JOIN videos v ON h.video_id = v.id
            WHERE h.video_id = ?1
              AND h.timestamp BETWEEN ?2 AND ?3
              AND {}
            ORDER BY h.timestamp, h.id
            LIMIT ?4
            "#,
            filter.sql_predicate()
        ))?;

        let rows = stmt
            .query_map(
                params![video_id, start, end, limit as i64],
                Self::row_to_video_highlight,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }

    #[instrument(skip(self))]
    async fn clear_all(&self) -> Result<()> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        // Dependents first.
        tx.execute("DELETE FROM video_summaries", [])?;
        tx.execute("DELETE FROM highlights", [])?;
        tx.execute("DELETE FROM videos", [])?;
        tx.commit()?;

        info!("Cleared all videos, highlights and summaries");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_video(&self, video_id: VideoId) -> Result<bool> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        let summaries = tx.execute(
            "DELETE FROM video_summaries WHERE video_id = ?1",
            params![video_id],
        )?;
        let highlights = tx.execute("DELETE FROM highlights WHERE video_id = ?1", params![video_id])?;
        let videos = tx.execute("DELETE FROM videos WHERE id = ?1", params![video_id])?;
        tx.commit()?;

        info!(
            "Deleted video {} ({} highlights, {} summaries)",
            video_id, highlights, summaries
        );
        Ok(videos > 0)
    }

    #[instrument(skip(self))]
    async fn list_videos(&self) -> Result<Vec<Video>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT id, filename, duration, created_at FROM videos ORDER BY created_at DESC, id DESC",
        )?;

        let videos = stmt
            .query_map([], Self::row_to_video)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(videos)
    }

    #[instrument(skip(self))]
    async fn get_video(&self, video_id: VideoId) -> Result<Option<Video>> {
        let conn = self.lock()?;

        let video = conn
            .query_row(
                "SELECT id, filename, duration, created_at FROM videos WHERE id = ?1",
                params![video_id],
                Self::row_to_video,
            )
            .optional()?;
        Ok(video)
    }

    #[instrument(skip(self))]
    async fn highlights_for_video(&self, video_id: VideoId) -> Result<Vec<Highlight>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {HIGHLIGHT_COLUMNS}
            FROM highlights h
            JOIN videos v ON h.video_id = v.id
            WHERE h.video_id = ?1
            ORDER BY h.timestamp, h.id
            "#
        ))?;

        let highlights = stmt
            .query_map(params![video_id], Self::row_to_video_highlight)?
            .map(|row| row.map(|r| r.highlight))
            .collect::<rusqlite::Result<Vec<_>>>()?;

        debug!("Found {} highlights for video {}", highlights.len(), video_id);
        Ok(highlights)
    }

    async fn highlight_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM highlights", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{embedding, exercise_cascade, exercise_store, visual};
    use super::*;

    #[tokio::test]
    async fn test_sqlite_store_contract() {
        let store = SqliteHighlightStore::in_memory(4, DistanceMetric::Cosine).unwrap();
        exercise_store(&store).await;
    }

    #[tokio::test]
    async fn test_sqlite_cascade_delete() {
        let store = SqliteHighlightStore::in_memory(4, DistanceMetric::Cosine).unwrap();
        exercise_cascade(&store).await;
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        let result = SqliteHighlightStore::in_memory(0, DistanceMetric::Cosine);
        assert!(matches!(result, Err(GlimtError::Config(_))));
    }

    #[tokio::test]
    async fn test_foreign_key_enforced() {
        let store = SqliteHighlightStore::in_memory(4, DistanceMetric::Cosine).unwrap();
        let orphan = store
            .insert_highlight(&visual(42, 1.0, "no such video", embedding(4, 0, 0.0)))
            .await;
        assert!(matches!(orphan, Err(GlimtError::Database(_))));
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("highlights.db");

        {
            let store = SqliteHighlightStore::new(&path, 4, DistanceMetric::L2).unwrap();
            let video = store.insert_video("clip.mp4", 12.0).await.unwrap();
            store
                .insert_highlight(&visual(video.id, 3.0, "a dog", embedding(4, 1, 0.0)))
                .await
                .unwrap();
        }

        let store = SqliteHighlightStore::new(&path, 4, DistanceMetric::L2).unwrap();
        let hits = store
            .nearest_neighbors(&embedding(4, 1, 0.0), ModalityFilter::VisualOnly, Some(5))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].highlight.embedding, embedding(4, 1, 0.0));
        assert!((hits[0].similarity - 1.0).abs() < 1e-6);
    }
}
