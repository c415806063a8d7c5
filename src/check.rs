use anyhow::Result;
use std::path::Path;

use crate::config::{Backend, CONFIG_FILE, SiteConfig};
use crate::media::upload::parse_max_size;
use crate::section::SectionKey;
use crate::store::{HttpSectionStore, SectionStore, SqliteSectionStore};

pub struct CheckResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// 依次检查配置、媒体设置和内容存储是否可用
pub async fn run(project_root: &Path) -> Result<CheckResult> {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if let Some(config) = check_config(project_root, &mut errors) {
        check_media(project_root, &config, &mut errors, &mut warnings);
        check_store(project_root, &config, &mut errors, &mut warnings).await;
    }

    Ok(CheckResult { errors, warnings })
}

fn check_config(root: &Path, errors: &mut Vec<String>) -> Option<SiteConfig> {
    if !root.join(CONFIG_FILE).exists() {
        errors.push(format!("缺少 {CONFIG_FILE} 配置文件"));
        return None;
    }
    match SiteConfig::load(root) {
        Ok(config) => Some(config),
        Err(e) => {
            errors.push(e.to_string());
            None
        }
    }
}

fn check_media(root: &Path, config: &SiteConfig, errors: &mut Vec<String>, warnings: &mut Vec<String>) {
    let media = &config.media;
    if parse_max_size(&media.max_file_size) == 0 {
        errors.push(format!("media.max_file_size 无效：{}", media.max_file_size));
    }
    if media.allowed_types.is_empty() {
        errors.push("media.allowed_types 为空，所有上传都会被拒绝".to_string());
    }
    if media.backend == Backend::Local && !root.join(&media.upload_dir).is_dir() {
        warnings.push(format!("媒体目录 {}/ 不存在，首次上传时创建", media.upload_dir));
    }
}

async fn check_store(
    root: &Path,
    config: &SiteConfig,
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
) {
    match config.store.backend {
        Backend::Local => {
            let pool = match crate::state::open_database(root, config).await {
                Ok(pool) => pool,
                Err(e) => {
                    errors.push(format!("无法打开数据库 {}：{e}", config.store.database));
                    return;
                }
            };
            match SqliteSectionStore::new(pool).list_versions().await {
                Ok(saved) => {
                    for key in SectionKey::ALL {
                        if !saved.iter().any(|(k, _, _)| k == key.as_str()) {
                            warnings.push(format!(
                                "分区 {key} 尚未保存，将使用默认内容（可运行 causeway seed）"
                            ));
                        }
                    }
                }
                Err(e) => errors.push(format!("读取分区失败：{e}")),
            }
        }
        Backend::Remote => {
            let remote = &config.store.remote;
            let store = match HttpSectionStore::new(remote) {
                Ok(store) => store,
                Err(e) => {
                    errors.push(format!("无法创建 HTTP 客户端：{e}"));
                    return;
                }
            };
            if remote.resolved_token().is_none() {
                warnings.push("未配置远程 API token，保存请求可能被拒绝".to_string());
            }
            let url = store.section_url(SectionKey::Hero);
            match store.fetch_section(SectionKey::Hero).await {
                Ok(Some(_)) => tracing::debug!("远程内容 API 可访问：{url}"),
                Ok(None) => warnings.push(format!("远程内容 API 没有 hero 分区（{url} 返回 404）")),
                Err(e) => errors.push(format!("无法访问远程内容 API {url}：{e}")),
            }
        }
    }
    if config.media.backend == Backend::Remote && config.store.backend == Backend::Local {
        warnings.push("媒体上传使用远程 API，而分区保存在本地".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = run(dir.path()).await.unwrap();
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains(CONFIG_FILE));
    }

    #[tokio::test]
    async fn fresh_local_project_only_warns() {
        let dir = tempfile::tempdir().unwrap();
        crate::init::ensure_initialized(dir.path()).unwrap();
        let result = run(dir.path()).await.unwrap();
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(result.warnings.len(), SectionKey::ALL.len());
    }

    #[tokio::test]
    async fn invalid_media_limits_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("media")).unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "[site]\ntitle = \"Hope Fund\"\n\n[media]\nmax_file_size = \"lots\"\nallowed_types = []\n",
        )
        .unwrap();
        let result = run(dir.path()).await.unwrap();
        assert_eq!(result.errors.len(), 2);
    }

    #[tokio::test]
    async fn unreachable_remote_is_an_error() {
        if std::env::var(crate::config::ENV_API_URL).is_ok() {
            return;
        }
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            format!(
                "[site]\ntitle = \"Hope Fund\"\n\n[store]\nbackend = \"remote\"\n\n[store.remote]\napi_url = \"http://{addr}\"\ntimeout_secs = 2\n\n[media]\nbackend = \"remote\"\n"
            ),
        )
        .unwrap();
        let result = run(dir.path()).await.unwrap();
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("/api/hero-section"));
    }
}
