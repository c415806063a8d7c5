use anyhow::{Result, bail};
use std::path::Path;

use crate::config::MediaConfig;

/// "20MB" / "512KB" / "1GB" / 纯数字字节数
pub fn parse_max_size(size_str: &str) -> usize {
    let s = size_str.trim().to_uppercase();

    let (num_part, multiplier) = if let Some(n) = s.strip_suffix("GB") {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = s.strip_suffix("MB") {
        (n, 1024 * 1024)
    } else if let Some(n) = s.strip_suffix("KB") {
        (n, 1024)
    } else if let Some(n) = s.strip_suffix('B') {
        (n, 1)
    } else {
        (s.as_str(), 1)
    };

    num_part.trim().parse::<usize>().unwrap_or(0) * multiplier
}

pub fn validate_upload(data: &[u8], mime_type: &str, config: &MediaConfig) -> Result<()> {
    if data.is_empty() {
        bail!("文件为空");
    }

    let max_size = parse_max_size(&config.max_file_size);
    if data.len() > max_size {
        bail!(
            "文件大小 {} 超出限制 {}",
            format_size(data.len()),
            config.max_file_size
        );
    }

    if !config.allowed_types.iter().any(|t| t == mime_type) {
        bail!("不支持的文件类型：{}", mime_type);
    }

    Ok(())
}

/// 上传表单 `type` 字段的默认值
pub fn media_kind(mime_type: &str) -> &'static str {
    if mime_type.starts_with("image/") {
        "image"
    } else if mime_type.starts_with("video/") {
        "video"
    } else {
        "document"
    }
}

/// 扩展名只保留小写字母数字，避免把路径片段带进存储路径
fn sanitized_extension(original_name: &str) -> String {
    let ext: String = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(8)
        .collect::<String>()
        .to_ascii_lowercase();
    if ext.is_empty() { "bin".to_string() } else { ext }
}

/// 生成存储的相对路径和 URL：(相对于 upload_dir 的路径, 公开 URL)
pub fn generate_storage_path(original_name: &str) -> (String, String) {
    let now = chrono::Utc::now();
    let year = now.format("%Y");
    let month = now.format("%m");
    let id = ulid::Ulid::new();
    let ext = sanitized_extension(original_name);

    let relative = format!("{year}/{month}/{id}.{ext}");
    let url = format!("/media/{relative}");

    (relative, url)
}

/// 缩略图与原图同目录，文件名加 `_thumb`
pub fn thumb_relative_path(relative: &str) -> String {
    match relative.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}_thumb.{ext}"),
        None => format!("{relative}_thumb"),
    }
}

/// 转码为 WebP 后同步修改文件名
pub fn webp_name(original_name: &str) -> String {
    if original_name.to_ascii_lowercase().ends_with(".webp") {
        return original_name.to_string();
    }
    let stem = Path::new(original_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("upload");
    format!("{stem}.webp")
}

pub fn format_size(bytes: usize) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1}MB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1}KB", bytes as f64 / 1024.0)
    } else {
        format!("{}B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_size_units() {
        assert_eq!(parse_max_size("20MB"), 20 * 1024 * 1024);
        assert_eq!(parse_max_size(" 512kb "), 512 * 1024);
        assert_eq!(parse_max_size("100"), 100);
        assert_eq!(parse_max_size("lots"), 0);
    }

    #[test]
    fn validation_checks_size_and_type() {
        let config = MediaConfig {
            max_file_size: "1KB".into(),
            ..MediaConfig::default()
        };
        assert!(validate_upload(&[0; 10], "image/png", &config).is_ok());
        assert!(validate_upload(&[0; 2048], "image/png", &config).is_err());
        assert!(validate_upload(&[0; 10], "application/x-msdownload", &config).is_err());
        assert!(validate_upload(&[], "image/png", &config).is_err());
    }

    #[test]
    fn storage_path_keeps_a_clean_extension() {
        let (relative, url) = generate_storage_path("Field Trip.JPG");
        assert!(relative.ends_with(".jpg"));
        assert_eq!(url, format!("/media/{relative}"));
        assert_eq!(relative.split('/').count(), 3);

        let (relative, _) = generate_storage_path("report.p/../df");
        assert!(!relative.contains(".."));
        let (relative, _) = generate_storage_path("noext");
        assert!(relative.ends_with(".bin"));
    }

    #[test]
    fn thumb_and_webp_names() {
        assert_eq!(thumb_relative_path("2026/10/abc.webp"), "2026/10/abc_thumb.webp");
        assert_eq!(webp_name("team.png"), "team.webp");
        assert_eq!(webp_name("cover.WEBP"), "cover.WEBP");
    }

    #[test]
    fn kinds_and_sizes() {
        assert_eq!(media_kind("image/webp"), "image");
        assert_eq!(media_kind("video/mp4"), "video");
        assert_eq!(media_kind("application/pdf"), "document");
        assert_eq!(format_size(512), "512B");
        assert_eq!(format_size(1536), "1.5KB");
    }
}
