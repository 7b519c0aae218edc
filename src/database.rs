use async_trait::async_trait;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to create storage directory: {0}")]
    StorageCreation(#[from] std::io::Error),
    #[error("SQLite error: {0}")]
    Sqlite(String),
    #[error("Failed to (de)serialize record: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<tokio_rusqlite::Error> for DatabaseError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        DatabaseError::Sqlite(err.to_string())
    }
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        DatabaseError::Sqlite(err.to_string())
    }
}

/// Whole-record key/value persistence. Every write replaces the stored
/// value for its key.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<String>, DatabaseError>;
    /// Records whose key starts with `prefix`, ordered by key.
    async fn read_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, DatabaseError>;
    async fn write(&self, key: &str, value: &str) -> Result<(), DatabaseError>;
}

pub struct Database {
    connection: tokio_rusqlite::Connection,
}

impl Database {
    pub async fn new(path: &str) -> Result<Self, DatabaseError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let connection = tokio_rusqlite::Connection::open(path).await?;
        let db = Database { connection };
        db._init_database().await?;
        Ok(db)
    }

    #[cfg(test)]
    pub async fn in_memory() -> Result<Self, DatabaseError> {
        let connection = tokio_rusqlite::Connection::open_in_memory().await?;
        let db = Database { connection };
        db._init_database().await?;
        Ok(db)
    }

    async fn _init_database(&self) -> Result<(), DatabaseError> {
        let init = "
            CREATE TABLE IF NOT EXISTS records (
                key TEXT NOT NULL PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME NOT NULL
            )";
        self.connection
            .call(move |conn| {
                conn.execute(init, [])
                    .map_err(tokio_rusqlite::Error::Rusqlite)
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for Database {
    async fn read(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let query = "SELECT value FROM records WHERE key = ?";
        let key = key.to_string();

        let value = self
            .connection
            .call(move |conn| {
                let mut stmt = conn
                    .prepare_cached(query)
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                let mut rows = stmt
                    .query_map([key.as_str()], |row| row.get::<_, String>("value"))
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                let value = rows
                    .next()
                    .transpose()
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(value)
            })
            .await?;
        Ok(value)
    }

    async fn read_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, DatabaseError> {
        const QUERY: &str = r#"
            SELECT
                key,
                value
            FROM records
            WHERE substr(key, 1, length(?1)) = ?1
            ORDER BY key
        "#;
        let prefix = prefix.to_string();

        let records = self
            .connection
            .call(move |conn| {
                let mut stmt = conn
                    .prepare_cached(QUERY)
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;

                let rows = stmt
                    .query_map([prefix.as_str()], |row| {
                        Ok((row.get::<_, String>("key")?, row.get::<_, String>("value")?))
                    })
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;

                rows.collect::<Result<Vec<_>, _>>()
                    .map_err(tokio_rusqlite::Error::Rusqlite)
            })
            .await?;
        Ok(records)
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        let query = "
            INSERT INTO records (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
        ";
        let key = key.to_string();
        let value = value.to_string();
        let timestamp = chrono::Utc::now().to_rfc3339();

        self.connection
            .call(move |conn| {
                conn.execute(query, (key.as_str(), value.as_str(), timestamp.as_str()))
                    .map_err(tokio_rusqlite::Error::Rusqlite)
            })
            .await?;
        Ok(())
    }
}
