use axum::extract::State;
use axum::response::Html;
use std::collections::HashMap;

use crate::admin::layout::{admin_page, format_datetime, html_escape};
use crate::section::SectionKey;
use crate::section::editor::EditorStatus;
use crate::state::AppState;

const EXTRA_STYLE: &str = r#"
    .stat-grid { display:grid; grid-template-columns:repeat(4,1fr); gap:16px; margin-bottom:24px; }
    .stat-card { background:#fff; padding:20px; border-radius:8px; box-shadow:0 1px 3px rgba(0,0,0,0.1); text-align:center; }
    .stat-card .number { font-size:32px; font-weight:bold; color:#4a6cf7; }
    .stat-card .label { font-size:14px; color:#666; margin-top:4px; }
"#;

fn status_badge(status: Option<EditorStatus>) -> (&'static str, &'static str) {
    match status {
        Some(EditorStatus::Clean) => ("status-clean", "已保存"),
        Some(EditorStatus::Dirty) => ("status-dirty", "有未保存修改"),
        Some(EditorStatus::Saving) => ("status-saving", "保存中"),
        None => ("status-unloaded", "未打开"),
    }
}

pub async fn dashboard(State(state): State<AppState>) -> Html<String> {
    let views = state.registry.loaded_views().await;

    // 未打开的分区从本地存储取版本信息；远程存储不逐个请求
    let stored: HashMap<String, (u64, String)> = match state.store.as_local() {
        Some(local) => local
            .list_versions()
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|(key, version, updated_at)| (key, (version, updated_at)))
            .collect(),
        None => HashMap::new(),
    };

    let dirty_count = views.values().filter(|v| v.dirty).count();
    let total_media = match state.uploader.library() {
        Some(repo) => repo.count().await.to_string(),
        None => "-".to_string(),
    };

    let mut rows = String::new();
    for key in SectionKey::ALL {
        let view = views.get(&key);
        let (badge_class, badge_label) = status_badge(view.map(|v| v.status));

        let (version, updated_at) = match view {
            Some(v) => (v.version, v.updated_at.clone()),
            None => match stored.get(key.as_str()) {
                Some((version, updated_at)) => (Some(*version), Some(updated_at.clone())),
                None => (None, None),
            },
        };
        let version = version.map(|v| v.to_string()).unwrap_or_else(|| "-".into());
        let updated_at = updated_at
            .map(|t| format_datetime(&t))
            .unwrap_or_else(|| "从未保存".into());
        let notice = view
            .and_then(|v| v.notice.as_deref())
            .map(|n| format!(r#"<div style="color:#b26a00;font-size:12px;">{}</div>"#, html_escape(n)))
            .unwrap_or_default();

        rows.push_str(&format!(
            r#"<tr>
                <td><a href="/admin/sections/{key}">{label}</a>{notice}</td>
                <td><code>{key}</code></td>
                <td><span class="status-badge {badge_class}">{badge_label}</span></td>
                <td>{version}</td>
                <td>{updated_at}</td>
            </tr>"#,
            label = key.label(),
            updated_at = html_escape(&updated_at),
        ));
    }

    let body = format!(
        r#"<div class="container">
            <h1>仪表盘</h1>
            <div class="stat-grid">
                <div class="stat-card">
                    <div class="number">{sections}</div>
                    <div class="label">分区</div>
                </div>
                <div class="stat-card">
                    <div class="number">{dirty_count}</div>
                    <div class="label">未保存的分区</div>
                </div>
                <div class="stat-card">
                    <div class="number">{total_media}</div>
                    <div class="label">媒体文件</div>
                </div>
                <div class="stat-card">
                    <div class="number" style="font-size:20px;">{backend}</div>
                    <div class="label">内容存储</div>
                </div>
            </div>
            <div class="card">
                <h2 style="margin-top:0;">分区</h2>
                <table>
                    <thead><tr><th>名称</th><th>Key</th><th>状态</th><th>版本</th><th>更新时间</th></tr></thead>
                    <tbody>{rows}</tbody>
                </table>
            </div>
        </div>"#,
        sections = SectionKey::ALL.len(),
        backend = state.store.backend_name(),
    );

    Html(admin_page("仪表盘", EXTRA_STYLE, &body))
}
