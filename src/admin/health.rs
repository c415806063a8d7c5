use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde_json::{Value, json};

use crate::section::SectionKey;
use crate::state::AppState;

/// 数据库不可用时返回 503；远程存储不在这里探测，避免每次探活都打到上游
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let db_ok = sqlx::query("SELECT 1").execute(&state.db).await.is_ok();

    let saved_sections = match state.store.as_local() {
        Some(local) => local.list_versions().await.ok().map(|rows| rows.len()),
        None => None,
    };

    let (code, status) = if db_ok {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        code,
        Json(json!({
            "status": status,
            "version": env!("CARGO_PKG_VERSION"),
            "database": if db_ok { "connected" } else { "error" },
            "store": state.store.backend_name(),
            "media": state.uploader.backend_name(),
            "sections": {
                "total": SectionKey::ALL.len(),
                "saved": saved_sections,
            },
            "event_listeners": state.store.listeners(),
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn reports_backends() {
        let dir = tempfile::tempdir().unwrap();
        let state = crate::state::AppState::for_tests(dir.path()).await;
        let response = crate::admin::router(state)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["store"], "memory");
        assert_eq!(body["media"], "local");
        assert_eq!(body["sections"]["total"], 9);
        assert!(body["sections"]["saved"].is_null());
        assert_eq!(body["event_listeners"], 0);
    }
}
