//! SQLite-backed pattern store.
//!
//! One table, keyed by issue id — only the latest version's pattern is
//! retained per issue. WAL journaling gives single-writer/multiple-reader
//! safety across concurrent invocations; every upsert and delete is a single
//! atomic statement, so the engine needs no locking of its own.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::error::MatchError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PatternRecord {
    pub issue_id: String,
    pub issue_version: i64,
    /// Serialized pattern document, normalized to head-only level lists.
    pub pattern_object: String,
}

pub struct PatternStore {
    pool: SqlitePool,
}

impl PatternStore {
    /// Opens (creating if missing) the store at `path` and ensures the
    /// schema exists.
    pub async fn open(path: &Path) -> Result<Self, MatchError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| MatchError::Storage(e.to_string()))?;
            }
        }

        // filename() takes the path as-is; a connection-string round trip
        // would misparse `?` and `#` as URI query/fragment markers.
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS patterns (
                issue_id TEXT UNIQUE,
                issue_version INTEGER,
                pattern_object TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    /// Replaces any existing record for `issue_id`.
    pub async fn upsert(
        &self,
        issue_id: &str,
        issue_version: i64,
        pattern_object: &str,
    ) -> Result<(), MatchError> {
        sqlx::query(
            r#"
            INSERT INTO patterns (issue_id, issue_version, pattern_object)
            VALUES (?, ?, ?)
            ON CONFLICT(issue_id) DO UPDATE SET
                issue_version = excluded.issue_version,
                pattern_object = excluded.pattern_object
            "#,
        )
        .bind(issue_id)
        .bind(issue_version)
        .bind(pattern_object)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Removes the record for `issue_id`; a no-op when absent.
    pub async fn delete(&self, issue_id: &str) -> Result<(), MatchError> {
        sqlx::query("DELETE FROM patterns WHERE issue_id = ?")
            .bind(issue_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Enumerates every stored record. Ordering is not significant.
    pub async fn all(&self) -> Result<Vec<PatternRecord>, MatchError> {
        let records = sqlx::query_as::<_, PatternRecord>(
            "SELECT issue_id, issue_version, pattern_object FROM patterns",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn open_store(tmp: &TempDir) -> PatternStore {
        PatternStore::open(&tmp.path().join("patterns.db"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn upsert_replaces_by_issue_id() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp).await;

        store.upsert("X", 1, r#"{"builds":[{"compiler":"gcc.*"}]}"#).await.unwrap();
        store.upsert("X", 2, r#"{"builds":[{"compiler":"clang.*"}]}"#).await.unwrap();

        let records = store.all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].issue_id, "X");
        assert_eq!(records[0].issue_version, 2);
        assert!(records[0].pattern_object.contains("clang"));
        store.close().await;
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp).await;

        for _ in 0..2 {
            store.upsert("X", 1, "{}").await.unwrap();
        }
        assert_eq!(store.all().await.unwrap().len(), 1);
        store.close().await;
    }

    #[tokio::test]
    async fn delete_of_absent_record_is_a_noop() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp).await;

        store.delete("never-stored").await.unwrap();
        store.upsert("X", 1, "{}").await.unwrap();
        store.delete("X").await.unwrap();
        assert!(store.all().await.unwrap().is_empty());
        store.close().await;
    }

    #[tokio::test]
    async fn path_with_uri_metacharacters_is_usable() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("odd name?#").join("patterns.db");

        let store = PatternStore::open(&path).await.unwrap();
        store.upsert("X", 1, "{}").await.unwrap();
        assert_eq!(store.all().await.unwrap().len(), 1);
        store.close().await;
    }

    #[tokio::test]
    async fn store_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("patterns.db");

        let store = PatternStore::open(&path).await.unwrap();
        store.upsert("X", 1, "{}").await.unwrap();
        store.close().await;

        let store = PatternStore::open(&path).await.unwrap();
        assert_eq!(store.all().await.unwrap().len(), 1);
        store.close().await;
    }
}
