use sqlx::SqlitePool;

#[derive(Clone)]
pub struct MediaRepository {
    db: SqlitePool,
}

#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct MediaItem {
    pub id: String,
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    /// 上传时的 `type` 字段（image / video / document 或调用方指定）
    pub category: String,
    pub size_bytes: i64,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub url: String,
    pub thumb_url: Option<String>,
    pub uploaded_at: String,
}

/// 媒体插入参数
pub struct MediaInsertParams<'a> {
    pub id: &'a str,
    pub filename: &'a str,
    pub original_name: &'a str,
    pub mime_type: &'a str,
    pub category: &'a str,
    pub size_bytes: i64,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub url: &'a str,
    pub thumb_url: Option<&'a str>,
}

const COLUMNS: &str = "id, filename, original_name, mime_type, category, size_bytes, \
                       width, height, url, thumb_url, uploaded_at";

impl MediaRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// 按上传时间倒序分页；`category` 为空时不过滤
    pub async fn list(
        &self,
        category: Option<&str>,
        per_page: u32,
        offset: u32,
    ) -> Result<Vec<MediaItem>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM media \
             WHERE (?1 IS NULL OR category = ?1) \
             ORDER BY uploaded_at DESC, id DESC LIMIT ?2 OFFSET ?3"
        );
        sqlx::query_as::<_, MediaItem>(&sql)
            .bind(category.filter(|c| !c.is_empty()))
            .bind(per_page)
            .bind(offset)
            .fetch_all(&self.db)
            .await
    }

    pub async fn count(&self) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM media")
            .fetch_one(&self.db)
            .await
            .unwrap_or(0)
    }

    pub async fn insert(&self, p: &MediaInsertParams<'_>) -> Result<(), sqlx::Error> {
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO media (id, filename, original_name, mime_type, category, size_bytes, \
             width, height, url, thumb_url, uploaded_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(p.id)
        .bind(p.filename)
        .bind(p.original_name)
        .bind(p.mime_type)
        .bind(p.category)
        .bind(p.size_bytes)
        .bind(p.width)
        .bind(p.height)
        .bind(p.url)
        .bind(p.thumb_url)
        .bind(&now)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<MediaItem>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM media WHERE id = ?");
        sqlx::query_as::<_, MediaItem>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
    }

    /// 返回是否真的删除了记录
    pub async fn delete(&self, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM media WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::local::test_pool;

    fn params<'a>(id: &'a str, category: &'a str) -> MediaInsertParams<'a> {
        MediaInsertParams {
            id,
            filename: "a.webp",
            original_name: "a.png",
            mime_type: "image/webp",
            category,
            size_bytes: 10,
            width: Some(4),
            height: Some(4),
            url: "/media/2026/10/a.webp",
            thumb_url: None,
        }
    }

    #[tokio::test]
    async fn insert_list_filter_delete() {
        let repo = MediaRepository::new(test_pool().await);
        repo.insert(&params("01A", "image")).await.unwrap();
        repo.insert(&params("01B", "document")).await.unwrap();

        assert_eq!(repo.count().await, 2);
        assert_eq!(repo.list(None, 10, 0).await.unwrap().len(), 2);
        let docs = repo.list(Some("document"), 10, 0).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "01B");
        assert_eq!(repo.list(Some(""), 10, 0).await.unwrap().len(), 2);

        assert_eq!(repo.get("01A").await.unwrap().unwrap().width, Some(4));
        assert!(repo.delete("01A").await.unwrap());
        assert!(!repo.delete("01A").await.unwrap());
        assert!(repo.get("01A").await.unwrap().is_none());
    }
}
