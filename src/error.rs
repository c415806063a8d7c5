use thiserror::Error;

use crate::section::SectionKey;

/// 持久化适配器（本地 SQLite / 远程内容 API）的错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("数据库错误：{0}")]
    Database(#[from] sqlx::Error),

    #[error("请求内容 API 失败：{0}")]
    Http(#[from] reqwest::Error),

    #[error("内容 API 返回 {status}：{body}")]
    Status { status: u16, body: String },

    #[error("分区 {key} 版本冲突：本地版本 {expected:?}，存储版本 {actual:?}")]
    Conflict {
        key: SectionKey,
        expected: Option<u64>,
        actual: Option<u64>,
    },

    #[error("解析分区数据失败：{0}")]
    Decode(#[from] serde_json::Error),
}

/// 分区编辑相关错误
#[derive(Debug, Error)]
pub enum SectionError {
    #[error("未知分区：{0}")]
    UnknownSection(String),

    #[error("无效的更新指令：{0}")]
    InvalidUpdate(#[source] serde_json::Error),

    #[error("字段 {path} 无效：{reason}")]
    InvalidField { path: String, reason: String },

    #[error("分区 {0} 正在保存，请稍后再试")]
    SaveInProgress(SectionKey),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("渲染预览失败：{0}")]
    Render(#[from] minijinja::Error),

    #[error("后台任务中断：{0}")]
    Task(#[from] tokio::task::JoinError),
}

impl SectionError {
    /// 供 API 响应使用的错误类别
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownSection(_) => "unknown_section",
            Self::InvalidUpdate(_) => "invalid_update",
            Self::InvalidField { .. } => "invalid_field",
            Self::SaveInProgress(_) => "save_in_progress",
            Self::Store(StoreError::Conflict { .. }) => "conflict",
            Self::Store(StoreError::Database(_)) => "database",
            Self::Store(_) => "upstream",
            Self::Render(_) => "render",
            Self::Task(_) => "internal",
        }
    }
}

/// 媒体上传（本地处理 / 远程上传接口）的错误
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{0}")]
    Rejected(String),

    #[error("写入文件失败：{0}")]
    Io(#[from] std::io::Error),

    #[error("数据库错误：{0}")]
    Database(#[from] sqlx::Error),

    #[error("请求上传接口失败：{0}")]
    Http(#[from] reqwest::Error),

    #[error("上传接口返回错误：{0}")]
    Upstream(String),

    #[error("后台任务中断：{0}")]
    Task(#[from] tokio::task::JoinError),
}

impl MediaError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Rejected(_) => "rejected",
            Self::Http(_) | Self::Upstream(_) => "upstream",
            Self::Database(_) => "database",
            Self::Io(_) | Self::Task(_) => "internal",
        }
    }
}
