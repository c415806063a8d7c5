use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde_json::json;

use crate::error::{MediaError, SectionError, StoreError};
use crate::media::upload::parse_max_size;
use crate::state::AppState;

pub mod dashboard;
pub mod events;
pub mod health;
pub mod layout;
pub mod media;
pub mod sections;

/// 后台 + 公开页面 + 媒体文件
pub fn router(state: AppState) -> Router {
    // multipart 额外留 1MB 给表单字段和边界
    let upload_limit = parse_max_size(&state.config.media.max_file_size) + 1024 * 1024;

    let admin_routes = Router::new()
        .route("/admin", get(dashboard::dashboard))
        // 分区编辑
        .route("/admin/sections/{key}", get(sections::editor_page))
        .route("/admin/api/sections/{key}", get(sections::api_view))
        .route("/admin/api/sections/{key}/updates", post(sections::api_apply))
        .route("/admin/api/sections/{key}/fields", axum::routing::patch(sections::api_set_field))
        .route("/admin/api/sections/{key}/save", post(sections::api_save))
        .route("/admin/api/sections/{key}/reset", post(sections::api_reset))
        .route("/admin/api/sections/{key}/reload", post(sections::api_reload))
        .route("/admin/api/sections/{key}/preview", get(sections::api_preview))
        .route("/admin/api/sections/{key}/upload", post(sections::api_upload))
        // 媒体管理
        .route("/admin/media", get(media::list_media))
        .route("/admin/media/upload", get(media::upload_page).post(media::upload_media))
        .route("/admin/media/{id}/delete", post(media::delete_media))
        .route("/admin/api/media", post(media::api_upload_media))
        // 保存事件推送
        .route("/admin/ws/events", get(events::section_events))
        .layer(DefaultBodyLimit::max(upload_limit));

    let mut app = Router::new()
        .merge(admin_routes)
        .merge(crate::public::router())
        .route("/health", get(health::health_check));

    // 静态文件服务（本地上传的媒体）
    if let crate::media::MediaUploader::Local(local) = &state.uploader {
        app = app.nest_service("/media", tower_http::services::ServeDir::new(local.root()));
    }

    app.with_state(state)
}

/// 后台 JSON 接口的错误响应：`{ "error": "...", "kind": "..." }`
#[derive(Debug)]
pub enum ApiError {
    Section(SectionError),
    Media(MediaError),
    BadRequest(String),
}

impl From<SectionError> for ApiError {
    fn from(e: SectionError) -> Self {
        ApiError::Section(e)
    }
}

impl From<MediaError> for ApiError {
    fn from(e: MediaError) -> Self {
        ApiError::Media(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Section(e) => match e {
                SectionError::UnknownSection(_) => StatusCode::NOT_FOUND,
                SectionError::InvalidUpdate(_) | SectionError::InvalidField { .. } => {
                    StatusCode::BAD_REQUEST
                }
                SectionError::SaveInProgress(_) | SectionError::Store(StoreError::Conflict { .. }) => {
                    StatusCode::CONFLICT
                }
                SectionError::Store(StoreError::Database(_))
                | SectionError::Render(_)
                | SectionError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
                SectionError::Store(_) => StatusCode::BAD_GATEWAY,
            },
            ApiError::Media(e) => match e {
                MediaError::Rejected(_) => StatusCode::BAD_REQUEST,
                MediaError::Http(_) | MediaError::Upstream(_) => StatusCode::BAD_GATEWAY,
                MediaError::Io(_) | MediaError::Database(_) | MediaError::Task(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Section(e) => e.kind(),
            ApiError::Media(e) => e.kind(),
            ApiError::BadRequest(_) => "bad_request",
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Section(e) => write!(f, "{e}"),
            ApiError::Media(e) => write!(f, "{e}"),
            ApiError::BadRequest(msg) => f.write_str(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("后台接口错误：{self}");
        } else {
            tracing::debug!("后台接口请求被拒绝：{self}");
        }
        (
            status,
            Json(json!({ "error": self.to_string(), "kind": self.kind() })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::SectionKey;

    #[test]
    fn errors_map_to_status_codes() {
        let conflict = ApiError::from(SectionError::Store(StoreError::Conflict {
            key: SectionKey::Hero,
            expected: Some(1),
            actual: Some(2),
        }));
        assert_eq!(conflict.status(), StatusCode::CONFLICT);
        assert_eq!(conflict.kind(), "conflict");

        let upstream = ApiError::from(SectionError::Store(StoreError::Status {
            status: 503,
            body: "down".into(),
        }));
        assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(upstream.kind(), "upstream");

        let unknown = ApiError::from(SectionError::UnknownSection("donate".into()));
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

        let rejected = ApiError::from(MediaError::Rejected("too big".into()));
        assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
    }
}
