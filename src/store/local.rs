use serde_json::Value;
use sqlx::SqlitePool;

use crate::error::StoreError;
use crate::section::SectionKey;
use crate::store::{SectionStore, StoredSection};

/// 基于 SQLite `sections` 表的存储
#[derive(Clone)]
pub struct SqliteSectionStore {
    db: SqlitePool,
}

impl SqliteSectionStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    async fn current_version(&self, key: SectionKey) -> Result<Option<u64>, StoreError> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT version FROM sections WHERE key = ?")
                .bind(key.as_str())
                .fetch_optional(&self.db)
                .await?;
        Ok(version.map(|v| v as u64))
    }

    /// 忽略版本直接覆盖（仅用于 seed --force）
    pub async fn overwrite(&self, key: SectionKey, data: &Value) -> Result<StoredSection, StoreError> {
        let now = chrono::Utc::now().to_rfc3339();
        let body = serde_json::to_string(data)?;

        let (version,): (i64,) = sqlx::query_as(
            "INSERT INTO sections (key, data, version, updated_at) VALUES (?, ?, 1, ?) \
             ON CONFLICT(key) DO UPDATE SET data = excluded.data, version = sections.version + 1, \
             updated_at = excluded.updated_at \
             RETURNING version",
        )
        .bind(key.as_str())
        .bind(&body)
        .bind(&now)
        .fetch_one(&self.db)
        .await?;

        Ok(StoredSection {
            key,
            data: data.clone(),
            version: version as u64,
            updated_at: now,
        })
    }

    /// 所有已保存分区的 (key, version, updated_at)
    pub async fn list_versions(&self) -> Result<Vec<(String, u64, String)>, StoreError> {
        let rows: Vec<(String, i64, String)> =
            sqlx::query_as("SELECT key, version, updated_at FROM sections ORDER BY key")
                .fetch_all(&self.db)
                .await?;
        Ok(rows
            .into_iter()
            .map(|(key, version, updated_at)| (key, version as u64, updated_at))
            .collect())
    }
}

impl SectionStore for SqliteSectionStore {
    async fn fetch_section(&self, key: SectionKey) -> Result<Option<StoredSection>, StoreError> {
        let row: Option<(String, i64, String)> =
            sqlx::query_as("SELECT data, version, updated_at FROM sections WHERE key = ?")
                .bind(key.as_str())
                .fetch_optional(&self.db)
                .await?;

        row.map(|(data, version, updated_at)| {
            Ok(StoredSection {
                key,
                data: serde_json::from_str(&data)?,
                version: version as u64,
                updated_at,
            })
        })
        .transpose()
    }

    async fn save_section(
        &self,
        key: SectionKey,
        data: &Value,
        expected_version: Option<u64>,
    ) -> Result<StoredSection, StoreError> {
        let now = chrono::Utc::now().to_rfc3339();
        let body = serde_json::to_string(data)?;

        let result = match expected_version {
            Some(expected) => {
                sqlx::query(
                    "UPDATE sections SET data = ?, version = version + 1, updated_at = ? \
                     WHERE key = ? AND version = ?",
                )
                .bind(&body)
                .bind(&now)
                .bind(key.as_str())
                .bind(expected as i64)
                .execute(&self.db)
                .await?
            }
            None => {
                sqlx::query(
                    "INSERT INTO sections (key, data, version, updated_at) VALUES (?, ?, 1, ?) \
                     ON CONFLICT(key) DO NOTHING",
                )
                .bind(key.as_str())
                .bind(&body)
                .bind(&now)
                .execute(&self.db)
                .await?
            }
        };

        if result.rows_affected() == 0 {
            let actual = self.current_version(key).await?;
            return Err(StoreError::Conflict {
                key,
                expected: expected_version,
                actual,
            });
        }

        Ok(StoredSection {
            key,
            data: data.clone(),
            version: expected_version.map_or(1, |v| v + 1),
            updated_at: now,
        })
    }
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    // 内存库每个连接相互独立，只能用单连接
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}
