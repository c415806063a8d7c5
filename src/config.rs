use anyhow::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

pub const CONFIG_FILE: &str = "causeway.toml";

/// 远程 API 地址的环境变量，优先级高于配置文件
pub const ENV_API_URL: &str = "CAUSEWAY_API_URL";
/// 远程 API Bearer token 的环境变量
pub const ENV_API_TOKEN: &str = "CAUSEWAY_API_TOKEN";

#[derive(Debug, Deserialize)]
pub struct SiteConfig {
    pub site: SiteInfo,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub media: MediaConfig,
}

#[derive(Debug, Deserialize)]
pub struct SiteInfo {
    pub title: String,
    #[serde(default)]
    pub tagline: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// 本地 SQLite
    Local,
    /// 外部内容 API
    Remote,
}

#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: Backend,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default)]
    pub remote: RemoteConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    #[serde(default)]
    pub api_url: String,
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// 分区 key -> 远程端点名，覆盖内置映射
    #[serde(default)]
    pub endpoints: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "default_backend")]
    pub backend: Backend,
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: String,
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
    #[serde(default = "default_true")]
    pub auto_webp: bool,
    #[serde(default = "default_true")]
    pub generate_thumb: bool,
    #[serde(default = "default_thumb_width")]
    pub thumb_width: u32,
}

impl SiteConfig {
    pub fn load(project_root: &Path) -> Result<Self> {
        let config_path = project_root.join(CONFIG_FILE);
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("读取 {CONFIG_FILE} 失败：{}", e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: SiteConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("解析 {CONFIG_FILE} 失败：{}", e))?;
        Ok(config)
    }
}

impl RemoteConfig {
    /// 环境变量 > 配置文件 > 本地开发默认地址
    pub fn resolved_api_url(&self) -> String {
        let url = std::env::var(ENV_API_URL)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| self.api_url.clone());
        let url = if url.trim().is_empty() {
            default_api_url()
        } else {
            url
        };
        url.trim().trim_end_matches('/').to_string()
    }

    pub fn resolved_token(&self) -> Option<String> {
        std::env::var(ENV_API_TOKEN)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| Some(self.token.clone()).filter(|s| !s.trim().is_empty()))
    }
}

// 默认值函数
fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 3000 }
fn default_log_level() -> String { "info".into() }
fn default_backend() -> Backend { Backend::Local }
fn default_database() -> String { "causeway.db".into() }
fn default_api_url() -> String { "http://localhost:5000".into() }
fn default_timeout_secs() -> u64 { 10 }
fn default_true() -> bool { true }
fn default_upload_dir() -> String { "media".into() }
fn default_max_file_size() -> String { "20MB".into() }
fn default_allowed_types() -> Vec<String> {
    vec![
        "image/jpeg".into(),
        "image/png".into(),
        "image/gif".into(),
        "image/webp".into(),
        "video/mp4".into(),
        "video/webm".into(),
        "application/pdf".into(),
    ]
}
fn default_thumb_width() -> u32 { 400 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            database: default_database(),
            remote: RemoteConfig::default(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            token: String::new(),
            timeout_secs: default_timeout_secs(),
            endpoints: HashMap::new(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            upload_dir: default_upload_dir(),
            max_file_size: default_max_file_size(),
            allowed_types: default_allowed_types(),
            auto_webp: true,
            generate_thumb: true,
            thumb_width: default_thumb_width(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let config = SiteConfig::parse("[site]\ntitle = \"Hope Fund\"\n").unwrap();
        assert_eq!(config.site.title, "Hope Fund");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.store.backend, Backend::Local);
        assert_eq!(config.store.database, "causeway.db");
        assert_eq!(config.store.remote.timeout_secs, 10);
        assert!(config.media.allowed_types.iter().any(|t| t == "application/pdf"));
    }

    #[test]
    fn remote_section_parses_endpoint_overrides() {
        let config = SiteConfig::parse(
            r#"
[site]
title = "Hope Fund"

[store]
backend = "remote"

[store.remote]
api_url = "https://cms.example.org/"
timeout_secs = 3

[store.remote.endpoints]
causes = "featured-causes"
"#,
        )
        .unwrap();
        assert_eq!(config.store.backend, Backend::Remote);
        assert_eq!(config.store.remote.timeout_secs, 3);
        assert_eq!(
            config.store.remote.endpoints.get("causes").map(String::as_str),
            Some("featured-causes")
        );
    }

    #[test]
    fn missing_site_table_is_an_error() {
        assert!(SiteConfig::parse("[server]\nport = 8080\n").is_err());
    }

    #[test]
    fn api_url_falls_back_to_local_default() {
        // 仅在未设置环境变量时验证默认值，避免与外部环境冲突
        if std::env::var(ENV_API_URL).is_ok() {
            return;
        }
        let remote = RemoteConfig::default();
        assert_eq!(remote.resolved_api_url(), "http://localhost:5000");

        let remote = RemoteConfig {
            api_url: "https://cms.example.org/".into(),
            ..RemoteConfig::default()
        };
        assert_eq!(remote.resolved_api_url(), "https://cms.example.org");
    }
}
