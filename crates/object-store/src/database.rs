//! SQLite database for file metadata.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use common::metadata::{Expiry, Metadata};
use sqlx::{
    sqlite::{
        SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
        SqliteRow,
    },
    ConnectOptions, Row,
};
use tokio::sync::Mutex;

use crate::error::{Result, StoreError};

/// SQLite database connection pool.
#[derive(Debug, Clone)]
pub(crate) struct Database {
    pool: SqlitePool,
    /// Pins an in-memory database. Shared-cache memory databases live only
    ///  while some connection is open, and the pool may close all of its own.
    _anchor: Option<Arc<Mutex<SqliteConnection>>>,
}

impl Database {
    /// Create a new database connection from a file path.
    pub async fn new(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let db = Self {
            pool,
            _anchor: None,
        };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Create an in-memory database.
    ///
    /// Each call gets its own named shared-cache database, so every pool
    ///  connection sees the same tables no matter how often the pool
    ///  recycles them.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let anchor = options.clone().connect().await?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self {
            pool,
            _anchor: Some(Arc::new(Mutex::new(anchor))),
        };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Insert a file record, replacing any previous record of the same name.
    pub async fn upsert_file(&self, metadata: &Metadata) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO files (name, mimetype, size, sha256sum, expiry, max_downloads, access_key, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                mimetype = excluded.mimetype,
                size = excluded.size,
                sha256sum = excluded.sha256sum,
                expiry = excluded.expiry,
                max_downloads = excluded.max_downloads,
                access_key = excluded.access_key
            "#,
        )
        .bind(&metadata.name)
        .bind(&metadata.mimetype)
        .bind(size_to_sql(metadata.size)?)
        .bind(&metadata.content_hash)
        .bind(metadata.expiry.to_unix())
        .bind(metadata.max_downloads)
        .bind(metadata.access_key.as_deref())
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Get file metadata by name.
    pub async fn get_file(&self, name: &str) -> Result<Option<Metadata>> {
        let row = sqlx::query(
            r#"
            SELECT name, mimetype, size, sha256sum, expiry, max_downloads, access_key
            FROM files
            WHERE name = ?
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| decode_row(name, &r)).transpose()
    }

    /// Overwrite the mutable fields of an existing record.
    ///
    /// Returns `false` if no such record exists; nothing is inserted.
    pub async fn update_file(&self, name: &str, metadata: &Metadata) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE files
            SET mimetype = ?, size = ?, sha256sum = ?, expiry = ?, max_downloads = ?, access_key = ?
            WHERE name = ?
            "#,
        )
        .bind(&metadata.mimetype)
        .bind(size_to_sql(metadata.size)?)
        .bind(&metadata.content_hash)
        .bind(metadata.expiry.to_unix())
        .bind(metadata.max_downloads)
        .bind(metadata.access_key.as_deref())
        .bind(name)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a file record.
    pub async fn delete_file(&self, name: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM files WHERE name = ?
            "#,
        )
        .bind(name)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Round trip to the database.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
impl Database {
    /// Count files.
    pub async fn count_files(&self) -> Result<i64> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) as count FROM files
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("count"))
    }

    /// Run raw SQL, for planting rows the public API refuses to write.
    pub async fn execute_raw(&self, sql: &str) -> Result<()> {
        sqlx::query(sql).execute(&self.pool).await?;
        Ok(())
    }
}

fn size_to_sql(size: u64) -> Result<i64> {
    i64::try_from(size).map_err(|_| StoreError::InvalidConfig(format!("size {size} too large")))
}

fn decode_row(name: &str, row: &SqliteRow) -> Result<Metadata> {
    let corrupt = |reason: String| StoreError::Corrupt {
        name: name.to_string(),
        reason,
    };
    let column = |e: sqlx::Error| corrupt(e.to_string());

    let size: i64 = row.try_get("size").map_err(column)?;
    let size = u64::try_from(size).map_err(|_| corrupt(format!("negative size {size}")))?;

    let expiry_secs: i64 = row.try_get("expiry").map_err(column)?;
    let expiry = Expiry::from_unix(expiry_secs)
        .ok_or_else(|| corrupt(format!("expiry {expiry_secs} out of range")))?;

    Ok(Metadata {
        name: row.try_get("name").map_err(column)?,
        mimetype: row.try_get("mimetype").map_err(column)?,
        size,
        content_hash: row.try_get("sha256sum").map_err(column)?,
        expiry,
        max_downloads: row.try_get("max_downloads").map_err(column)?,
        access_key: row.try_get("access_key").map_err(column)?,
    })
}
