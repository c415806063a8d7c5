use anyhow::Result;
use minijinja::Environment;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::SiteConfig;
use crate::media::MediaUploader;
use crate::section::registry::EditorRegistry;
use crate::store::ContentStore;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<SiteConfig>,
    /// 分区持久化（本地 SQLite 或远程内容 API）
    pub store: ContentStore,
    /// 各分区的编辑草稿，只存在内存中
    pub registry: EditorRegistry,
    /// 预览与公开页面共用的模板环境
    pub env: Arc<Environment<'static>>,
    pub uploader: MediaUploader,
}

impl AppState {
    pub async fn new(project_root: PathBuf, config: SiteConfig) -> Result<Self> {
        let pool = open_database(&project_root, &config).await?;

        let store = ContentStore::from_config(&config.store, pool.clone())?;
        let uploader = MediaUploader::from_config(&config, &project_root, pool.clone())?;
        tracing::info!(
            "分区存储：{}，媒体上传：{}",
            store.backend_name(),
            uploader.backend_name()
        );

        Self::assemble(pool, config, store, uploader)
    }

    fn assemble(
        db: SqlitePool,
        config: SiteConfig,
        store: ContentStore,
        uploader: MediaUploader,
    ) -> Result<Self> {
        let env = crate::public::build_site_env()?;
        Ok(Self {
            db,
            config: Arc::new(config),
            store,
            registry: EditorRegistry::new(),
            env: Arc::new(env),
            uploader,
        })
    }

    /// 内存存储 + 临时目录中的本地媒体库
    #[cfg(test)]
    pub async fn for_tests(media_root: &Path) -> Self {
        let pool = crate::store::local::test_pool().await;
        let config = SiteConfig::parse("[site]\ntitle = \"Hope Fund\"\ntagline = \"Every life counts\"\n")
            .unwrap();
        let uploader = MediaUploader::Local(crate::media::LocalUploader::new(
            media_root.to_path_buf(),
            config.media.clone(),
            pool.clone(),
        ));
        Self::assemble(pool, config, ContentStore::memory(), uploader).unwrap()
    }
}

/// 打开（必要时创建）SQLite 数据库并执行迁移
pub async fn open_database(project_root: &Path, config: &SiteConfig) -> Result<SqlitePool> {
    let db_path = project_root.join(&config.store.database);
    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let pool = SqlitePool::connect(&db_url).await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("数据库迁移失败：{}", e))?;

    Ok(pool)
}
