use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Redirect, Response};
use serde::Deserialize;
use serde_json::json;

use crate::admin::ApiError;
use crate::admin::layout::{admin_page, format_datetime, html_escape};
use crate::media::{MediaFile, upload};
use crate::state::AppState;

const PER_PAGE: u32 = 24;

const EXTRA_STYLE: &str = r#"
    .page-header { display:flex; justify-content:space-between; align-items:center; margin-bottom:16px; }
    .filters a { margin-right:8px; }
    .filters a.active { font-weight:bold; text-decoration:underline; }
    .media-grid { display:grid; grid-template-columns:repeat(auto-fill, minmax(180px, 1fr)); gap:16px; }
    .media-card { background:#fff; border-radius:8px; box-shadow:0 1px 3px rgba(0,0,0,0.1); overflow:hidden; }
    .media-card img { width:100%; height:140px; object-fit:cover; display:block; }
    .media-card .file-icon { height:140px; display:flex; align-items:center; justify-content:center; font-size:48px; background:#fafafa; }
    .media-card .info { padding:8px 10px; }
    .media-card .filename { white-space:nowrap; overflow:hidden; text-overflow:ellipsis; font-size:13px; }
    .media-card .meta { color:#999; font-size:12px; margin:4px 0 8px; }
    .pagination { margin-top:16px; display:flex; gap:8px; }
"#;

const CATEGORIES: &[(&str, &str)] = &[("", "全部"), ("image", "图片"), ("video", "视频"), ("document", "文档")];

#[derive(Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub category: Option<String>,
}

pub async fn list_media(State(state): State<AppState>, Query(params): Query<ListQuery>) -> Html<String> {
    let Some(repo) = state.uploader.library() else {
        let body = format!(
            r#"<div class="container">
                <div class="page-header"><h1>媒体库</h1><a href="/admin/media/upload" class="btn btn-primary">上传文件</a></div>
                <div class="notice">媒体文件上传到远程内容 API（{api}），本地不保存媒体库。</div>
            </div>"#,
            api = html_escape(&state.config.store.remote.resolved_api_url()),
        );
        return Html(admin_page("媒体库", EXTRA_STYLE, &body));
    };

    let page = params.page.unwrap_or(1).max(1);
    let category = params.category.as_deref().filter(|c| !c.is_empty());
    let offset = (page - 1) * PER_PAGE;

    let rows = match repo.list(category, PER_PAGE, offset).await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!("读取媒体库失败：{e}");
            Vec::new()
        }
    };

    let mut filters = String::new();
    for (value, label) in CATEGORIES {
        let active = if category.unwrap_or("") == *value { " class=\"active\"" } else { "" };
        filters.push_str(&format!(r#"<a href="/admin/media?category={value}"{active}>{label}</a>"#));
    }

    let mut cards = String::new();
    for item in &rows {
        let preview = if item.mime_type.starts_with("image/") {
            let src = item.thumb_url.as_deref().unwrap_or(&item.url);
            format!(
                r#"<img src="{}" alt="{}" loading="lazy">"#,
                html_escape(src),
                html_escape(&item.original_name)
            )
        } else if item.category == "video" {
            r#"<div class="file-icon">&#127916;</div>"#.to_string()
        } else {
            r#"<div class="file-icon">&#128196;</div>"#.to_string()
        };

        let dimensions = match (item.width, item.height) {
            (Some(w), Some(h)) => format!(" &middot; {w}×{h}"),
            _ => String::new(),
        };

        cards.push_str(&format!(
            r#"<div class="media-card">
                {preview}
                <div class="info">
                    <div class="filename" title="{original_name}">{original_name}</div>
                    <div class="meta">{size}{dimensions} &middot; {date}</div>
                    <div class="actions">
                        <a href="{url}" target="_blank" class="btn btn-secondary btn-sm">查看</a>
                        <button type="button" class="btn btn-secondary btn-sm" onclick="navigator.clipboard.writeText('{url}')">复制链接</button>
                        <form method="POST" action="/admin/media/{id}/delete" onsubmit="return confirm('确定要删除此文件吗？');">
                            <button type="submit" class="btn btn-danger btn-sm">删除</button>
                        </form>
                    </div>
                </div>
            </div>"#,
            original_name = html_escape(&item.original_name),
            size = upload::format_size(item.size_bytes.max(0) as usize),
            date = format_datetime(&item.uploaded_at),
            url = html_escape(&item.url),
            id = html_escape(&item.id),
        ));
    }
    if rows.is_empty() {
        cards.push_str(r#"<p style="color:#999;">暂无文件</p>"#);
    }

    let category_param = category.map(|c| format!("&category={c}")).unwrap_or_default();
    let mut pagination = String::new();
    if page > 1 {
        pagination.push_str(&format!(
            r#"<a href="/admin/media?page={}{category_param}" class="btn btn-secondary btn-sm">上一页</a>"#,
            page - 1
        ));
    }
    if rows.len() as u32 == PER_PAGE {
        pagination.push_str(&format!(
            r#"<a href="/admin/media?page={}{category_param}" class="btn btn-secondary btn-sm">下一页</a>"#,
            page + 1
        ));
    }

    let body = format!(
        r#"<div class="container">
            <div class="page-header">
                <h1>媒体库 <span style="color:#999;font-size:16px;">（{total}）</span></h1>
                <a href="/admin/media/upload" class="btn btn-primary">上传文件</a>
            </div>
            <div class="filters card">{filters}</div>
            <div class="media-grid">{cards}</div>
            <div class="pagination">{pagination}</div>
        </div>"#,
        total = repo.count().await,
    );

    Html(admin_page("媒体库", EXTRA_STYLE, &body))
}

pub async fn upload_page(State(state): State<AppState>) -> Html<String> {
    let accept = state.config.media.allowed_types.join(",");
    let body = format!(
        r#"<div class="container">
            <h1>上传文件</h1>
            <div class="card">
                <form method="POST" action="/admin/media/upload" enctype="multipart/form-data">
                    <div class="form-row">
                        <label>选择文件（最大 {max}）</label>
                        <input type="file" name="file" required accept="{accept}">
                    </div>
                    <div class="form-row">
                        <label>分类</label>
                        <select name="type">
                            <option value="">按文件类型自动判断</option>
                            <option value="image">图片</option>
                            <option value="video">视频</option>
                            <option value="document">文档</option>
                        </select>
                    </div>
                    <button type="submit" class="btn btn-primary">上传</button>
                    <a href="/admin/media" class="btn btn-secondary">返回媒体库</a>
                </form>
            </div>
        </div>"#,
        max = html_escape(&state.config.media.max_file_size),
        accept = html_escape(&accept),
    );

    Html(admin_page("上传文件", "", &body))
}

fn upload_error_page(message: &str) -> Response {
    let body = format!(
        r#"<div class="container">
            <h1>上传失败</h1>
            <div class="error">{}</div>
            <a href="/admin/media/upload" class="btn btn-primary">重新上传</a>
        </div>"#,
        html_escape(message)
    );
    (StatusCode::BAD_REQUEST, Html(admin_page("上传失败", "", &body))).into_response()
}

pub async fn upload_media(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let file = match MediaFile::from_multipart(&mut multipart).await {
        Ok(Some(file)) => file,
        Ok(None) => return upload_error_page("未找到上传文件"),
        Err(e) => return upload_error_page(&e.to_string()),
    };

    match state.uploader.upload(file).await {
        Ok(_) => Redirect::to("/admin/media").into_response(),
        Err(e) => {
            tracing::warn!("媒体上传失败：{e}");
            upload_error_page(&e.to_string())
        }
    }
}

pub async fn delete_media(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.uploader.delete(&id).await {
        Ok(true) => tracing::info!("已删除媒体 {id}"),
        Ok(false) => tracing::debug!("媒体 {id} 不存在"),
        Err(e) => return ApiError::from(e).into_response(),
    }
    Redirect::to("/admin/media").into_response()
}

/// JSON 上传接口：`{ "success": true, "url": ... }`，与远程内容 API 的上传响应同形
pub async fn api_upload_media(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let file = MediaFile::from_multipart(&mut multipart)
        .await?
        .ok_or_else(|| ApiError::BadRequest("未找到上传文件".into()))?;
    let media = state.uploader.upload(file).await?;
    Ok(Json(json!({
        "success": true,
        "url": media.url,
        "id": media.id,
        "thumb_url": media.thumb_url,
        "mime_type": media.mime_type,
        "size_bytes": media.size_bytes,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn multipart(file_name: &str, content_type: &str, data: &[u8], kind: Option<&str>) -> (String, Vec<u8>) {
        let boundary = "media-test-boundary";
        let mut body = Vec::new();
        if let Some(kind) = kind {
            body.extend_from_slice(
                format!("--{boundary}\r\nContent-Disposition: form-data; name=\"type\"\r\n\r\n{kind}\r\n").as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        (format!("multipart/form-data; boundary={boundary}"), body)
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn api_upload_returns_url_and_lists_file() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::for_tests(dir.path()).await;
        let app = crate::admin::router(state.clone());

        let png = crate::media::process::sample_png(20, 20);
        let (content_type, body) = multipart("logo.png", "image/png", &png, None);
        let response = app
            .clone()
            .oneshot(
                Request::post("/admin/api/media")
                    .header("content-type", content_type)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["success"], true);
        let url = json["url"].as_str().unwrap().to_string();

        let response = app
            .oneshot(Request::get("/admin/media?category=image").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let html = body_string(response).await;
        assert!(html.contains(&url));
        assert!(html.contains("logo.png"));
    }

    #[tokio::test]
    async fn form_upload_redirects_and_delete_removes() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::for_tests(dir.path()).await;
        let app = crate::admin::router(state.clone());

        let (content_type, body) = multipart("report.pdf", "application/pdf", b"%PDF-1.4 report", Some("document"));
        let response = app
            .clone()
            .oneshot(
                Request::post("/admin/media/upload")
                    .header("content-type", content_type)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let repo = state.uploader.library().unwrap();
        let items = repo.list(Some("document"), 10, 0).await.unwrap();
        assert_eq!(items.len(), 1);

        let response = app
            .oneshot(
                Request::post(format!("/admin/media/{}/delete", items[0].id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(repo.count().await, 0);
    }

    #[tokio::test]
    async fn form_upload_of_disallowed_type_shows_error() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::for_tests(dir.path()).await;
        let (content_type, body) = multipart("run.sh", "application/x-sh", b"#!/bin/sh", None);
        let response = crate::admin::router(state)
            .oneshot(
                Request::post("/admin/media/upload")
                    .header("content-type", content_type)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("上传失败"));
    }
}
