use async_trait::async_trait;
use sqlx::Row;

use super::SqliteStore;
use super::mapping::ser;
use crate::repository::{CacheField, SessionCache, StorageError};

#[async_trait]
impl SessionCache for SqliteStore {
    async fn load(&self, field: CacheField) -> Result<Option<String>, StorageError> {
        let row = sqlx::query("SELECT value FROM session_cache WHERE field = ?1")
            .bind(field.as_key())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.map(|r| r.try_get("value").map_err(ser)).transpose()
    }

    async fn store(&self, field: CacheField, value: &str) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO session_cache (field, value)
                VALUES (?1, ?2)
                ON CONFLICT(field) DO UPDATE SET value = excluded.value
            ",
        )
        .bind(field.as_key())
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM session_cache")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }
}
