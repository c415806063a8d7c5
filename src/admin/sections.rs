//! 分区编辑器：后台页面 + JSON 接口
//!
//! 草稿只保存在服务端内存里（`EditorRegistry`），页面刷新不会丢失修改。

use axum::extract::{Multipart, Path, Query, State};
use axum::response::{Html, IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::admin::ApiError;
use crate::admin::layout::{admin_page_with_script, format_datetime, html_escape};
use crate::media::{MediaFile, UploadedMedia};
use crate::section::field::{FieldKind, FieldSpec, ListSpec};
use crate::section::preview::render_section;
use crate::section::registry::{EditorView, check_update};
use crate::section::{Outcome, SectionKey};
use crate::sections::volunteers::{VolunteerSection, VolunteerStatus};
use crate::state::AppState;

fn parse_key(raw: &str) -> Result<SectionKey, ApiError> {
    Ok(raw.parse::<SectionKey>()?)
}

/// 编辑器接口的统一响应：编辑器状态 + 当前草稿的预览
#[derive(Serialize)]
pub struct EditorResponse {
    #[serde(flatten)]
    pub view: EditorView,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    pub preview: String,
}

impl EditorResponse {
    fn new(state: &AppState, view: EditorView, outcome: Option<Outcome>) -> Self {
        let preview = preview_html(state, &view);
        Self {
            view,
            outcome,
            preview,
        }
    }
}

fn preview_html(state: &AppState, view: &EditorView) -> String {
    render_section(&state.env, view.key, &view.data).unwrap_or_else(|e| {
        tracing::warn!("分区 {} 预览渲染失败：{e}", view.key);
        format!(
            r#"<p class="error">预览渲染失败：{}</p>"#,
            html_escape(&e.to_string())
        )
    })
}

// ── JSON 接口 ──

pub async fn api_view(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<EditorResponse>, ApiError> {
    let key = parse_key(&key)?;
    let view = state.registry.view(key, &state.store).await?;
    Ok(Json(EditorResponse::new(&state, view, None)))
}

pub async fn api_apply(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(update): Json<Value>,
) -> Result<Json<EditorResponse>, ApiError> {
    let key = parse_key(&key)?;
    let (outcome, view) = state.registry.apply(key, &state.store, update).await?;
    if let Outcome::Refused(reason) = &outcome {
        tracing::debug!("分区 {key} 的更新被拒绝：{reason}");
    }
    Ok(Json(EditorResponse::new(&state, view, Some(outcome))))
}

#[derive(Deserialize)]
pub struct SetFieldRequest {
    pub path: String,
    pub value: Value,
}

pub async fn api_set_field(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<SetFieldRequest>,
) -> Result<Json<EditorResponse>, ApiError> {
    let key = parse_key(&key)?;
    let (outcome, view) = state
        .registry
        .set_field(key, &state.store, &req.path, req.value)
        .await?;
    Ok(Json(EditorResponse::new(&state, view, Some(outcome))))
}

pub async fn api_save(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<EditorResponse>, ApiError> {
    let key = parse_key(&key)?;
    let view = state.registry.save(key, &state.store).await?;
    Ok(Json(EditorResponse::new(&state, view, None)))
}

pub async fn api_reset(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<EditorResponse>, ApiError> {
    let key = parse_key(&key)?;
    let view = state.registry.reset(key, &state.store).await?;
    Ok(Json(EditorResponse::new(&state, view, None)))
}

/// 丢弃草稿，从存储取回最新内容和版本
pub async fn api_reload(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<EditorResponse>, ApiError> {
    let key = parse_key(&key)?;
    let view = state.registry.reload(key, &state.store).await?;
    Ok(Json(EditorResponse::new(&state, view, None)))
}

pub async fn api_preview(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Html<String>, ApiError> {
    let key = parse_key(&key)?;
    let view = state.registry.view(key, &state.store).await?;
    Ok(Html(render_section(&state.env, key, &view.data)?))
}

/// 上传后写入哪个字段：只有 `op` 时为标量字段，带 `id` + `field` 时为列表项字段
#[derive(Debug, Deserialize)]
pub struct UploadTarget {
    pub op: String,
    pub id: Option<String>,
    pub field: Option<String>,
}

impl UploadTarget {
    fn update(&self, url: &str) -> Value {
        match (&self.id, &self.field) {
            (Some(id), Some(field)) => json!({
                "op": self.op,
                "args": {
                    "action": "patch",
                    "id": id,
                    "patch": { "field": field, "value": url },
                },
            }),
            _ => json!({ "op": self.op, "args": url }),
        }
    }
}

#[derive(Serialize)]
pub struct UploadIntoFieldResponse {
    pub success: bool,
    pub url: String,
    pub media: UploadedMedia,
    #[serde(flatten)]
    pub editor: EditorResponse,
}

pub async fn api_upload(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(target): Query<UploadTarget>,
    mut multipart: Multipart,
) -> Result<Json<UploadIntoFieldResponse>, ApiError> {
    let key = parse_key(&key)?;
    // 写入目标不合法时不保存文件
    check_update(key, target.update(""))?;
    let file = MediaFile::from_multipart(&mut multipart)
        .await?
        .ok_or_else(|| ApiError::BadRequest("未找到上传文件".into()))?;

    let media = state.uploader.upload(file).await?;
    let (outcome, view) = match state
        .registry
        .apply(key, &state.store, target.update(&media.url))
        .await
    {
        Ok((outcome, view)) if outcome.is_applied() => (outcome, view),
        Ok((outcome, _)) => {
            discard_upload(&state, &media).await;
            let reason = match outcome {
                Outcome::Refused(reason) => reason,
                _ => "上传目标不存在",
            };
            return Err(ApiError::BadRequest(format!("无法写入上传目标：{reason}")));
        }
        Err(e) => {
            discard_upload(&state, &media).await;
            return Err(e.into());
        }
    };

    Ok(Json(UploadIntoFieldResponse {
        success: true,
        url: media.url.clone(),
        media,
        editor: EditorResponse::new(&state, view, Some(outcome)),
    }))
}

async fn discard_upload(state: &AppState, media: &UploadedMedia) {
    let Some(id) = &media.id else {
        return;
    };
    match state.uploader.delete(id).await {
        Ok(_) => tracing::info!("上传目标无效，已删除媒体 {id}"),
        Err(e) => tracing::warn!("删除无主媒体 {id} 失败：{e}"),
    }
}

// ── 编辑器页面 ──

/// 按点分路径读取当前值
fn value_at<'a>(data: &'a Value, path: &str) -> &'a Value {
    path.split('.').fold(data, |current, segment| match current {
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get(i))
            .unwrap_or(&Value::Null),
        other => other.get(segment).unwrap_or(&Value::Null),
    })
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// 渲染一个表单控件；`attrs` 为标识该控件对应哪条更新指令的 data-* 属性
fn render_control(kind: FieldKind, value: &Value, attrs: &str) -> String {
    let text = html_escape(&display(value));
    match kind {
        FieldKind::Text => format!(r#"<input type="text" value="{text}" {attrs} data-kind="text">"#),
        FieldKind::TextArea => format!(r#"<textarea {attrs} data-kind="text">{text}</textarea>"#),
        FieldKind::Number { min, max } => format!(
            r#"<input type="number" min="{min}" max="{max}" value="{text}" {attrs} data-kind="text">"#
        ),
        FieldKind::Range { min, max } => format!(
            r#"<input type="range" min="{min}" max="{max}" value="{text}" {attrs} data-kind="text"> <output>{text}</output>"#
        ),
        FieldKind::Color => format!(r#"<input type="color" value="{text}" {attrs} data-kind="text">"#),
        FieldKind::Date => format!(r#"<input type="date" value="{text}" {attrs} data-kind="text">"#),
        FieldKind::Select(options) => {
            let current = display(value);
            let mut html = format!(r#"<select {attrs} data-kind="text">"#);
            for (option, label) in options {
                let selected = if *option == current { " selected" } else { "" };
                html.push_str(&format!(r#"<option value="{option}"{selected}>{label}</option>"#));
            }
            html.push_str("</select>");
            html
        }
        FieldKind::Toggle => {
            let checked = if value.as_bool().unwrap_or(false) { " checked" } else { "" };
            format!(r#"<input type="checkbox"{checked} {attrs} data-kind="toggle">"#)
        }
        FieldKind::Image => {
            let thumb = if text.is_empty() {
                String::new()
            } else {
                format!(r#"<img src="{text}" alt="" style="max-height:60px;display:block;margin-bottom:6px;">"#)
            };
            format!(
                r#"{thumb}<input type="text" value="{text}" {attrs} data-kind="text">
                <input type="file" accept="image/*" {attrs} data-kind="upload">"#
            )
        }
        FieldKind::Tags => {
            let mut chips = String::new();
            for tag in value.as_array().into_iter().flatten() {
                let tag = html_escape(&display(tag));
                chips.push_str(&format!(
                    r#"<span class="tag">{tag} <button type="button" class="btn btn-sm btn-secondary" {attrs} data-kind="tag-remove" data-value="{tag}">×</button></span> "#
                ));
            }
            format!(
                r#"<div class="tags">{chips}</div><input type="text" placeholder="输入后回车添加" {attrs} data-kind="tag-add">"#
            )
        }
    }
}

fn render_field(spec: &FieldSpec, data: &Value) -> String {
    let attrs = format!(r#"data-op="{}""#, spec.op);
    format!(
        r#"<div class="form-row"><label>{label}</label>{control}</div>"#,
        label = html_escape(spec.label),
        control = render_control(spec.kind, value_at(data, spec.path), &attrs),
    )
}

/// 列表项 JSON 中存在的布尔标记 -> 切换按钮
const FLAGS: &[(&str, &str, &str)] = &[
    ("featured", "featured", "推荐"),
    ("is_visible", "visible", "显示"),
    ("available", "available", "可用"),
];

fn render_list(spec: &ListSpec, data: &Value) -> String {
    let items = data.get(spec.op).and_then(Value::as_array).cloned().unwrap_or_default();
    let at_floor = items.len() <= spec.min_items;

    let mut cards = String::new();
    for (index, item) in items.iter().enumerate() {
        let id = html_escape(&display(item.get("id").unwrap_or(&Value::Null)));
        let base = format!(r#"data-list="{op}" data-id="{id}""#, op = spec.op);

        let mut fields = String::new();
        for field in spec.fields {
            let attrs = format!(r#"{base} data-field="{}""#, field.name);
            fields.push_str(&format!(
                r#"<div class="form-row"><label>{label}</label>{control}</div>"#,
                label = html_escape(field.label),
                control = render_control(field.kind, item.get(field.name).unwrap_or(&Value::Null), &attrs),
            ));
        }

        let mut toggles = String::new();
        for (json_key, flag, label) in FLAGS {
            if let Some(on) = item.get(*json_key).and_then(Value::as_bool) {
                let class = if on { "btn-success" } else { "btn-secondary" };
                toggles.push_str(&format!(
                    r#"<button type="button" class="btn btn-sm {class}" {base} data-action="toggle" data-flag="{flag}">{label}</button> "#
                ));
            }
        }

        let remove_disabled = if at_floor { " disabled" } else { "" };
        cards.push_str(&format!(
            r#"<div class="card list-item">
                <div class="actions" style="margin-bottom:8px;">
                    <strong>#{n}</strong>
                    <button type="button" class="btn btn-sm btn-secondary" {base} data-action="move" data-direction="up">上移</button>
                    <button type="button" class="btn btn-sm btn-secondary" {base} data-action="move" data-direction="down">下移</button>
                    {toggles}
                    <button type="button" class="btn btn-sm btn-danger" {base} data-action="remove"{remove_disabled}>删除</button>
                </div>
                {fields}
            </div>"#,
            n = index + 1,
        ));
    }

    let floor_note = if spec.min_items > 0 {
        format!(r#"<span style="color:#999;font-size:12px;">至少保留 {} 项</span>"#, spec.min_items)
    } else {
        String::new()
    };

    format!(
        r#"<div class="list-editor">
            <h2>{label} <span style="color:#999;font-size:14px;">（{count}）</span></h2>
            {cards}
            <button type="button" class="btn btn-primary" data-list="{op}" data-action="add">添加</button> {floor_note}
        </div>"#,
        label = html_escape(spec.label),
        count = items.len(),
        op = spec.op,
    )
}

/// 志愿者分区在表单上方显示人数统计
fn section_summary(key: SectionKey, data: &Value) -> String {
    if key != SectionKey::Volunteers {
        return String::new();
    }
    let Ok(section) = serde_json::from_value::<VolunteerSection>(data.clone()) else {
        return String::new();
    };
    let counts = section
        .status_counts()
        .into_iter()
        .zip(VolunteerStatus::OPTIONS)
        .map(|((_, count), (_, label))| format!("{label} {count}"))
        .collect::<Vec<_>>()
        .join(" · ");
    format!(
        r#"<div class="card">共 {total} 名志愿者 · 累计服务 {hours} 小时<br><span style="color:#666;">{counts}</span></div>"#,
        total = section.signups.len(),
        hours = section.total_hours(),
    )
}

const EDITOR_STYLE: &str = r#"
    .editor-grid { display:grid; grid-template-columns:minmax(360px, 1fr) 1fr; gap:24px; align-items:start; }
    .preview-pane { position:sticky; top:16px; background:#fff; border-radius:8px; box-shadow:0 1px 3px rgba(0,0,0,0.1); padding:16px; max-height:90vh; overflow:auto; }
    .save-bar { position:sticky; top:0; z-index:5; background:#fff; padding:10px 16px; border-radius:8px; box-shadow:0 1px 3px rgba(0,0,0,0.1); margin-bottom:16px; display:flex; gap:12px; align-items:center; }
    .tag { display:inline-block; background:#eef; padding:2px 6px; border-radius:10px; margin:0 4px 6px 0; font-size:13px; }
"#;

const EDITOR_SCRIPT: &str = r#"
const ROOT = document.querySelector('[data-editor]');
const KEY = ROOT.dataset.editor;
const API = '/admin/api/sections/' + KEY;
let version = ROOT.dataset.version;

function showError(msg) {
  const box = document.getElementById('editor-error');
  box.textContent = msg || '';
  box.style.display = msg ? 'block' : 'none';
}

function applyView(res) {
  document.getElementById('preview').innerHTML = res.preview;
  const badge = document.getElementById('status');
  badge.className = 'status-badge status-' + res.status;
  badge.textContent = { clean: '已保存', dirty: '有未保存修改', saving: '保存中' }[res.status] || res.status;
  document.getElementById('version').textContent = res.version == null ? '-' : res.version;
  version = res.version;
  document.getElementById('save').disabled = !res.dirty;
  document.getElementById('reset').disabled = !res.dirty;
  if (res.outcome === 'refused') showError(res.reason); else showError('');
}

async function call(method, url, body, reload) {
  const opts = { method, headers: {} };
  if (body instanceof FormData) { opts.body = body; }
  else if (body !== undefined) { opts.headers['Content-Type'] = 'application/json'; opts.body = JSON.stringify(body); }
  const resp = await fetch(url, opts);
  const res = await resp.json().catch(() => ({ error: resp.statusText }));
  if (!resp.ok) { showError(res.error || ('请求失败：' + resp.status)); return null; }
  applyView(res);
  if (reload && res.outcome !== 'refused') location.reload();
  return res;
}

function update(el, args, reload) {
  const d = el.dataset;
  let body;
  if (d.list) {
    body = { op: d.list, args: { action: 'patch', id: d.id, patch: { field: d.field, value: args } } };
  } else if (d.kind === 'toggle') {
    body = { op: d.op };
  } else {
    body = { op: d.op, args };
  }
  return call('POST', API + '/updates', body, reload);
}

document.addEventListener('change', (e) => {
  const el = e.target;
  const kind = el.dataset.kind;
  if (kind === 'text') update(el, el.value, false);
  else if (kind === 'toggle') update(el, null, false);
  else if (kind === 'upload' && el.files.length) {
    const form = new FormData();
    form.append('file', el.files[0]);
    const d = el.dataset;
    const q = new URLSearchParams(d.list ? { op: d.list, id: d.id, field: d.field } : { op: d.op });
    call('POST', API + '/upload?' + q, form, true);
  }
});

document.addEventListener('input', (e) => {
  if (e.target.type === 'range' && e.target.nextElementSibling) e.target.nextElementSibling.value = e.target.value;
});

document.addEventListener('keydown', (e) => {
  const el = e.target;
  if (el.dataset.kind === 'tag-add' && e.key === 'Enter') {
    e.preventDefault();
    if (el.value.trim()) update(el, { action: 'add', value: el.value.trim() }, true);
  }
});

document.addEventListener('click', (e) => {
  const el = e.target.closest('button');
  if (!el || el.disabled) return;
  const d = el.dataset;
  if (d.kind === 'tag-remove') { update(el, { action: 'remove', value: d.value }, true); return; }
  if (!d.action) return;
  const args = { action: d.action };
  if (d.id) args.id = d.id;
  if (d.direction) args.direction = d.direction;
  if (d.flag) args.flag = d.flag;
  call('POST', API + '/updates', { op: d.list, args }, true);
});

document.getElementById('save').addEventListener('click', () => call('POST', API + '/save'));
document.getElementById('reset').addEventListener('click', () => call('POST', API + '/reset', undefined, true));
document.getElementById('reload').addEventListener('click', () => {
  if (!document.getElementById('save').disabled && !confirm('重新加载会丢弃未保存的修改，继续？')) return;
  call('POST', API + '/reload', undefined, true);
});

const ws = new WebSocket((location.protocol === 'https:' ? 'wss://' : 'ws://') + location.host + '/admin/ws/events');
ws.onmessage = (msg) => {
  const event = JSON.parse(msg.data);
  if (event.key !== KEY) return;
  if (event.type === 'saved' && String(event.version) !== String(version)) {
    showError('该分区已在其他窗口保存（版本 ' + event.version + '），请先重新加载，否则保存会产生冲突');
  }
};
"#;

pub async fn editor_page(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    let key = match parse_key(&key) {
        Ok(key) => key,
        Err(e) => return e.into_response(),
    };
    let (view, fields, lists) = match state.registry.form(key, &state.store).await {
        Ok(parts) => parts,
        Err(e) => return ApiError::from(e).into_response(),
    };

    let mut form = String::new();
    for spec in fields {
        form.push_str(&render_field(spec, &view.data));
    }
    let mut list_html = String::new();
    for spec in lists {
        list_html.push_str(&render_list(spec, &view.data));
    }

    let notice = view
        .notice
        .as_deref()
        .map(|n| format!(r#"<div class="notice">{}</div>"#, html_escape(n)))
        .unwrap_or_default();
    let status = serde_json::to_value(view.status)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    let status_label = match status.as_str() {
        "dirty" => "有未保存修改",
        "saving" => "保存中",
        _ => "已保存",
    };
    let version = view.version.map(|v| v.to_string()).unwrap_or_else(|| "-".into());
    let updated_at = view
        .updated_at
        .as_deref()
        .map(format_datetime)
        .unwrap_or_else(|| "从未保存".into());
    let disabled = if view.dirty { "" } else { " disabled" };

    let body = format!(
        r#"<div class="container" data-editor="{key}" data-version="{version}">
            <h1>{label}</h1>
            {notice}
            {summary}
            <div class="save-bar">
                <span class="status-badge status-{status}" id="status">{status_label}</span>
                <span>版本 <strong id="version">{version}</strong> · 上次保存 {updated_at}</span>
                <button type="button" class="btn btn-success" id="save"{disabled}>保存</button>
                <button type="button" class="btn btn-secondary" id="reset"{disabled}>放弃修改</button>
                <button type="button" class="btn btn-secondary" id="reload" title="丢弃草稿并取回最新保存的内容">重新加载</button>
            </div>
            <div class="error" id="editor-error" style="display:none;"></div>
            <div class="editor-grid">
                <div class="editor-form">
                    <div class="card">{form}</div>
                    {list_html}
                </div>
                <div class="preview-pane"><div id="preview">{preview}</div></div>
            </div>
        </div>"#,
        label = key.label(),
        summary = section_summary(key, &view.data),
        updated_at = html_escape(&updated_at),
        preview = preview_html(&state, &view),
    );

    Html(admin_page_with_script(
        &format!("编辑 · {}", key.label()),
        EDITOR_STYLE,
        &body,
        EDITOR_SCRIPT,
    ))
    .into_response()
}
