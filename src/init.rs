use anyhow::Result;
use std::fs;
use std::path::Path;

use crate::config::CONFIG_FILE;

// 嵌入默认 causeway.toml
const DEFAULT_CONFIG: &str = r#"[site]
title = "Hope Fund"
tagline = "Every life counts"
url = "http://localhost:3000"

[server]
host = "127.0.0.1"
port = 3000
log_level = "info"

[store]
# local：本地 SQLite；remote：外部内容 API
backend = "local"
database = "causeway.db"

[store.remote]
# 也可通过 CAUSEWAY_API_URL / CAUSEWAY_API_TOKEN 环境变量设置
api_url = ""
token = ""
timeout_secs = 10

[media]
backend = "local"
upload_dir = "media"
max_file_size = "20MB"
auto_webp = true
generate_thumb = true
thumb_width = 400
"#;

/// 检测项目是否已初始化，未初始化则写入默认配置并创建媒体目录。
/// 返回 `true` 表示执行了初始化，`false` 表示已存在。
pub fn ensure_initialized(root: &Path) -> Result<bool> {
    if root.join(CONFIG_FILE).exists() {
        return Ok(false);
    }

    fs::create_dir_all(root.join("media"))?;
    fs::write(root.join(CONFIG_FILE), DEFAULT_CONFIG)?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Backend, SiteConfig};

    #[test]
    fn writes_default_config_once() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ensure_initialized(dir.path()).unwrap());
        assert!(dir.path().join("media").is_dir());

        let config = SiteConfig::load(dir.path()).unwrap();
        assert_eq!(config.site.title, "Hope Fund");
        assert_eq!(config.store.backend, Backend::Local);
        assert_eq!(config.media.thumb_width, 400);

        fs::write(dir.path().join(CONFIG_FILE), "[site]\ntitle = \"Custom\"\n").unwrap();
        assert!(!ensure_initialized(dir.path()).unwrap());
        assert_eq!(SiteConfig::load(dir.path()).unwrap().site.title, "Custom");
    }
}
