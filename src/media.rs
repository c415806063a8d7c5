//! 媒体上传适配器：本地（处理图片后写入磁盘 + media 表）或远程上传接口
//!
//! 编辑器只拿到上传结果的 URL。

use axum::extract::Multipart;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Backend, MediaConfig, SiteConfig};
use crate::error::{MediaError, StoreError};
use crate::repository::MediaRepository;
use crate::repository::media::MediaInsertParams;
use crate::store::HttpSectionStore;

pub mod process;
pub mod upload;

/// 一个待上传的文件
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
    /// 表单 `type` 字段，缺省按 MIME 推断
    pub kind: Option<String>,
}

impl MediaFile {
    pub fn kind(&self) -> String {
        self.kind
            .clone()
            .filter(|k| !k.trim().is_empty())
            .unwrap_or_else(|| upload::media_kind(&self.content_type).to_string())
    }

    /// 读取 multipart 中的 `file` 和 `type` 字段；没有文件时返回 None
    pub async fn from_multipart(multipart: &mut Multipart) -> Result<Option<Self>, MediaError> {
        let mut file = None;
        let mut kind = None;

        loop {
            let field = match multipart.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break,
                Err(e) => return Err(MediaError::Rejected(format!("读取上传内容失败：{e}"))),
            };
            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                "file" => {
                    let file_name = field.file_name().unwrap_or("upload").to_string();
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| MediaError::Rejected(format!("读取文件失败：{e}")))?;
                    file = Some((file_name, content_type, data.to_vec()));
                }
                "type" => {
                    kind = field.text().await.ok();
                }
                _ => {}
            }
        }

        Ok(file.map(|(file_name, content_type, data)| MediaFile {
            file_name,
            content_type,
            data,
            kind,
        }))
    }
}

/// 上传结果
#[derive(Debug, Clone, Serialize)]
pub struct UploadedMedia {
    /// 仅本地媒体库有 id
    pub id: Option<String>,
    pub url: String,
    pub thumb_url: Option<String>,
    pub mime_type: String,
    pub size_bytes: usize,
}

#[derive(Clone)]
pub enum MediaUploader {
    Local(LocalUploader),
    Remote(RemoteUploader),
}

impl MediaUploader {
    pub fn from_config(
        config: &SiteConfig,
        project_root: &Path,
        db: SqlitePool,
    ) -> Result<Self, StoreError> {
        Ok(match config.media.backend {
            Backend::Local => Self::Local(LocalUploader::new(
                project_root.join(&config.media.upload_dir),
                config.media.clone(),
                db,
            )),
            Backend::Remote => {
                let remote = &config.store.remote;
                let http = HttpSectionStore::with_base_url(
                    &remote.resolved_api_url(),
                    remote.resolved_token(),
                    Duration::from_secs(remote.timeout_secs.max(1)),
                )?;
                Self::Remote(RemoteUploader::new(http, config.media.clone()))
            }
        })
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Local(_) => "local",
            Self::Remote(_) => "remote",
        }
    }

    /// 本地媒体库；远程上传时没有
    pub fn library(&self) -> Option<&MediaRepository> {
        match self {
            Self::Local(local) => Some(&local.repo),
            Self::Remote(_) => None,
        }
    }

    pub async fn upload(&self, file: MediaFile) -> Result<UploadedMedia, MediaError> {
        let config = match self {
            Self::Local(local) => &local.config,
            Self::Remote(remote) => &remote.config,
        };
        upload::validate_upload(&file.data, &file.content_type, config)
            .map_err(|e| MediaError::Rejected(e.to_string()))?;

        let uploaded = match self {
            Self::Local(local) => local.store(file).await?,
            Self::Remote(remote) => remote.send(file).await?,
        };
        tracing::info!("已上传媒体 {}（{}）", uploaded.url, upload::format_size(uploaded.size_bytes));
        Ok(uploaded)
    }

    /// 删除本地媒体（记录和文件）；返回记录是否存在
    pub async fn delete(&self, id: &str) -> Result<bool, MediaError> {
        match self {
            Self::Local(local) => local.delete(id).await,
            Self::Remote(_) => Err(MediaError::Rejected("远程媒体不支持在此删除".into())),
        }
    }
}

#[derive(Clone)]
pub struct LocalUploader {
    root: PathBuf,
    config: Arc<MediaConfig>,
    repo: MediaRepository,
}

impl LocalUploader {
    pub fn new(root: PathBuf, config: MediaConfig, db: SqlitePool) -> Self {
        Self {
            root,
            config: Arc::new(config),
            repo: MediaRepository::new(db),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn write(&self, relative: &str, data: &[u8]) -> Result<(), MediaError> {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await?;
        Ok(())
    }

    async fn store(&self, file: MediaFile) -> Result<UploadedMedia, MediaError> {
        let kind = file.kind();
        let is_raster = file.content_type.starts_with("image/") && file.content_type != "image/svg+xml";

        let (data, thumbnail, mime_type, dimensions, stored_name) = if is_raster {
            let config = self.config.clone();
            let input = file.data;
            let processed = tokio::task::spawn_blocking(move || process::process_image(&input, &config))
                .await?
                .map_err(|e| MediaError::Rejected(format!("图片处理失败：{e}")))?;
            let name = if processed.mime_type == "image/webp" {
                upload::webp_name(&file.file_name)
            } else {
                file.file_name.clone()
            };
            (
                processed.data,
                processed.thumbnail,
                processed.mime_type,
                Some((processed.width, processed.height)),
                name,
            )
        } else {
            (file.data, None, file.content_type.clone(), None, file.file_name.clone())
        };

        let (relative, url) = upload::generate_storage_path(&stored_name);
        self.write(&relative, &data).await?;

        let thumb_url = match thumbnail {
            Some(thumb) => {
                let thumb_relative = upload::thumb_relative_path(&relative);
                self.write(&thumb_relative, &thumb).await?;
                Some(format!("/media/{thumb_relative}"))
            }
            None => None,
        };

        let id = ulid::Ulid::new().to_string();
        let filename = relative.rsplit('/').next().unwrap_or(&relative).to_string();
        self.repo
            .insert(&MediaInsertParams {
                id: &id,
                filename: &filename,
                original_name: &file.file_name,
                mime_type: &mime_type,
                category: &kind,
                size_bytes: data.len() as i64,
                width: dimensions.map(|(w, _)| w as i64),
                height: dimensions.map(|(_, h)| h as i64),
                url: &url,
                thumb_url: thumb_url.as_deref(),
            })
            .await?;

        Ok(UploadedMedia {
            id: Some(id),
            url,
            thumb_url,
            mime_type,
            size_bytes: data.len(),
        })
    }

    async fn delete(&self, id: &str) -> Result<bool, MediaError> {
        let Some(item) = self.repo.get(id).await? else {
            return Ok(false);
        };
        self.repo.delete(id).await?;

        for url in std::iter::once(item.url.as_str()).chain(item.thumb_url.as_deref()) {
            let Some(relative) = url.strip_prefix("/media/") else {
                continue;
            };
            if relative.split('/').any(|seg| seg == "..") {
                continue;
            }
            if let Err(e) = tokio::fs::remove_file(self.root.join(relative)).await {
                tracing::warn!("删除媒体文件 {relative} 失败：{e}");
            }
        }
        tracing::info!("已删除媒体 {id}");
        Ok(true)
    }
}

/// 远程上传接口：`POST {api_url}/api/upload`，multipart `file` + `type`
#[derive(Clone)]
pub struct RemoteUploader {
    http: HttpSectionStore,
    config: Arc<MediaConfig>,
}

#[derive(Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: bool,
    url: Option<String>,
    #[serde(alias = "error")]
    message: Option<String>,
}

impl RemoteUploader {
    pub fn new(http: HttpSectionStore, config: MediaConfig) -> Self {
        Self {
            http,
            config: Arc::new(config),
        }
    }

    async fn send(&self, file: MediaFile) -> Result<UploadedMedia, MediaError> {
        let kind = file.kind();
        let size_bytes = file.data.len();
        let mime_type = file.content_type.clone();

        let part = reqwest::multipart::Part::bytes(file.data)
            .file_name(file.file_name)
            .mime_str(&file.content_type)?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("type", kind);

        let url = self.http.api_url("upload");
        tracing::debug!("POST {url}");
        let mut request = self.http.client().post(&url).multipart(form);
        if let Some(token) = self.http.token() {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        let body: UploadResponse = serde_json::from_str(&text)
            .map_err(|_| MediaError::Upstream(format!("{status}：{text}")))?;
        match body {
            UploadResponse {
                success: true,
                url: Some(url),
                ..
            } if status.is_success() => Ok(UploadedMedia {
                id: None,
                url,
                thumb_url: None,
                mime_type,
                size_bytes,
            }),
            UploadResponse { message, .. } => Err(MediaError::Upstream(
                message.unwrap_or_else(|| status.to_string()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::local::test_pool;
    use axum::Router;
    use axum::http::HeaderMap;
    use axum::routing::post;
    use serde_json::json;

    fn png_file(name: &str) -> MediaFile {
        MediaFile {
            file_name: name.into(),
            content_type: "image/png".into(),
            data: process::sample_png(600, 300),
            kind: None,
        }
    }

    async fn local(dir: &Path) -> MediaUploader {
        MediaUploader::Local(LocalUploader::new(
            dir.to_path_buf(),
            MediaConfig::default(),
            test_pool().await,
        ))
    }

    #[tokio::test]
    async fn local_upload_writes_files_and_records_row() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = local(dir.path()).await;

        let uploaded = uploader.upload(png_file("volunteers.png")).await.unwrap();
        assert!(uploaded.url.starts_with("/media/"));
        assert!(uploaded.url.ends_with(".webp"));
        assert_eq!(uploaded.mime_type, "image/webp");

        let relative = uploaded.url.trim_start_matches("/media/");
        assert!(dir.path().join(relative).exists());
        let thumb = uploaded.thumb_url.clone().unwrap();
        assert!(dir.path().join(thumb.trim_start_matches("/media/")).exists());

        let repo = uploader.library().unwrap();
        let items = repo.list(Some("image"), 10, 0).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].original_name, "volunteers.png");
        assert_eq!(items[0].width, Some(600));
    }

    #[tokio::test]
    async fn documents_are_stored_unprocessed() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = local(dir.path()).await;
        let uploaded = uploader
            .upload(MediaFile {
                file_name: "annual-report.pdf".into(),
                content_type: "application/pdf".into(),
                data: b"%PDF-1.4 fake".to_vec(),
                kind: Some("ebook".into()),
            })
            .await
            .unwrap();
        assert!(uploaded.url.ends_with(".pdf"));
        assert!(uploaded.thumb_url.is_none());
        let repo = uploader.library().unwrap();
        assert_eq!(repo.list(Some("ebook"), 10, 0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn disallowed_type_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = local(dir.path()).await;
        let err = uploader
            .upload(MediaFile {
                file_name: "run.exe".into(),
                content_type: "application/x-msdownload".into(),
                data: vec![1, 2, 3],
                kind: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "rejected");
    }

    #[tokio::test]
    async fn delete_removes_row_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = local(dir.path()).await;
        let uploaded = uploader.upload(png_file("a.png")).await.unwrap();
        let id = uploaded.id.clone().unwrap();

        assert!(uploader.delete(&id).await.unwrap());
        assert!(!dir.path().join(uploaded.url.trim_start_matches("/media/")).exists());
        assert!(!uploader.delete(&id).await.unwrap());
    }

    async fn spawn_upstream(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn remote(base: &str) -> MediaUploader {
        let http = HttpSectionStore::with_base_url(base, Some("t0k".into()), Duration::from_secs(5))
            .unwrap();
        MediaUploader::Remote(RemoteUploader::new(http, MediaConfig::default()))
    }

    #[tokio::test]
    async fn remote_upload_posts_multipart() {
        let router = Router::new().route(
            "/api/upload",
            post(|headers: HeaderMap, mut multipart: Multipart| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                let mut kind = String::new();
                let mut name = String::new();
                while let Some(field) = multipart.next_field().await.unwrap() {
                    let field_name = field.name().unwrap_or_default().to_string();
                    match field_name.as_str() {
                        "type" => kind = field.text().await.unwrap(),
                        "file" => name = field.file_name().unwrap_or_default().to_string(),
                        _ => {}
                    }
                }
                axum::Json(json!({
                    "success": auth == "Bearer t0k",
                    "url": format!("https://cdn.example.org/{kind}/{name}"),
                }))
            }),
        );
        let base = spawn_upstream(router).await;

        let uploaded = remote(&base).upload(png_file("hero.png")).await.unwrap();
        assert_eq!(uploaded.url, "https://cdn.example.org/image/hero.png");
        assert!(uploaded.id.is_none());
    }

    #[tokio::test]
    async fn remote_failure_surfaces_message() {
        let router = Router::new().route(
            "/api/upload",
            post(|| async { axum::Json(json!({ "success": false, "message": "quota exceeded" })) }),
        );
        let base = spawn_upstream(router).await;

        let err = remote(&base).upload(png_file("hero.png")).await.unwrap_err();
        assert_eq!(err.kind(), "upstream");
        assert!(err.to_string().contains("quota exceeded"));
    }
}
