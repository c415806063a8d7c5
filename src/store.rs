use serde::Serialize;
use serde_json::Value;
use sqlx::SqlitePool;
use std::future::Future;
use tokio::sync::broadcast;

use crate::config::{Backend, StoreConfig};
use crate::error::StoreError;
use crate::section::SectionKey;

pub mod local;
#[cfg(test)]
pub mod memory;
pub mod remote;

pub use local::SqliteSectionStore;
pub use remote::HttpSectionStore;

/// 存储中的一个分区
#[derive(Debug, Clone, Serialize)]
pub struct StoredSection {
    pub key: SectionKey,
    pub data: Value,
    /// 乐观并发版本号；0 表示上游不提供版本
    pub version: u64,
    pub updated_at: String,
}

/// 分区变更通知（通过 WebSocket 推送到后台）
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SectionEvent {
    Saved {
        key: SectionKey,
        version: u64,
        updated_at: String,
    },
    Reset {
        key: SectionKey,
    },
}

/// 持久化适配器：只负责整体读取和整体写入
pub trait SectionStore: Send + Sync {
    fn fetch_section(
        &self,
        key: SectionKey,
    ) -> impl Future<Output = Result<Option<StoredSection>, StoreError>> + Send;

    /// `expected_version` 为编辑器上次看到的版本，不一致时返回 `StoreError::Conflict`
    fn save_section(
        &self,
        key: SectionKey,
        data: &Value,
        expected_version: Option<u64>,
    ) -> impl Future<Output = Result<StoredSection, StoreError>> + Send;
}

#[derive(Clone)]
enum StoreBackend {
    Local(SqliteSectionStore),
    Remote(HttpSectionStore),
    #[cfg(test)]
    Memory(memory::MemoryStore),
}

/// 按配置选择的存储，并负责广播保存事件
#[derive(Clone)]
pub struct ContentStore {
    backend: StoreBackend,
    events: broadcast::Sender<SectionEvent>,
}

impl ContentStore {
    fn with_backend(backend: StoreBackend) -> Self {
        let (events, _) = broadcast::channel(64);
        Self { backend, events }
    }

    pub fn from_config(config: &StoreConfig, db: SqlitePool) -> Result<Self, StoreError> {
        let backend = match config.backend {
            Backend::Local => StoreBackend::Local(SqliteSectionStore::new(db)),
            Backend::Remote => StoreBackend::Remote(HttpSectionStore::new(&config.remote)?),
        };
        Ok(Self::with_backend(backend))
    }

    #[cfg(test)]
    pub fn memory() -> Self {
        Self::with_backend(StoreBackend::Memory(memory::MemoryStore::default()))
    }

    #[cfg(test)]
    pub fn memory_failing() -> Self {
        Self::with_backend(StoreBackend::Memory(memory::MemoryStore::failing()))
    }

    pub fn backend_name(&self) -> &'static str {
        match &self.backend {
            StoreBackend::Local(_) => "local",
            StoreBackend::Remote(_) => "remote",
            #[cfg(test)]
            StoreBackend::Memory(_) => "memory",
        }
    }

    /// 本地存储句柄（seed --force 需要绕过版本检查）
    pub fn as_local(&self) -> Option<&SqliteSectionStore> {
        match &self.backend {
            StoreBackend::Local(store) => Some(store),
            _ => None,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SectionEvent> {
        self.events.subscribe()
    }

    /// 当前订阅事件的连接数
    pub fn listeners(&self) -> usize {
        self.events.receiver_count()
    }

    pub fn notify(&self, event: SectionEvent) {
        // 没有订阅者时 send 返回 Err，忽略即可
        let _ = self.events.send(event);
    }
}

impl SectionStore for ContentStore {
    async fn fetch_section(&self, key: SectionKey) -> Result<Option<StoredSection>, StoreError> {
        match &self.backend {
            StoreBackend::Local(store) => store.fetch_section(key).await,
            StoreBackend::Remote(store) => store.fetch_section(key).await,
            #[cfg(test)]
            StoreBackend::Memory(store) => store.fetch_section(key).await,
        }
    }

    async fn save_section(
        &self,
        key: SectionKey,
        data: &Value,
        expected_version: Option<u64>,
    ) -> Result<StoredSection, StoreError> {
        let stored = match &self.backend {
            StoreBackend::Local(store) => store.save_section(key, data, expected_version).await,
            StoreBackend::Remote(store) => store.save_section(key, data, expected_version).await,
            #[cfg(test)]
            StoreBackend::Memory(store) => store.save_section(key, data, expected_version).await,
        }?;
        self.notify(SectionEvent::Saved {
            key,
            version: stored.version,
            updated_at: stored.updated_at.clone(),
        });
        Ok(stored)
    }
}

/// 读取已发布（已保存）的分区内容，读取失败或数据损坏时回退默认值
pub async fn load_published<S, St>(store: &St) -> (S, Option<String>)
where
    S: crate::section::Section,
    St: SectionStore,
{
    match store.fetch_section(S::KEY).await {
        Ok(Some(stored)) => match serde_json::from_value::<S>(stored.data) {
            Ok(section) => (section, None),
            Err(e) => {
                tracing::warn!("分区 {} 数据无法解析，使用默认内容：{e}", S::KEY);
                (S::default(), Some(e.to_string()))
            }
        },
        Ok(None) => (S::default(), None),
        Err(e) => {
            tracing::warn!("读取分区 {} 失败，使用默认内容：{e}", S::KEY);
            (S::default(), Some(e.to_string()))
        }
    }
}
