use crate::section::SectionKey;

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// RFC 3339 -> "YYYY-MM-DD HH:MM"（UTC），解析失败时原样返回
pub fn format_datetime(value: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&chrono::Utc).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| value.to_string())
}

pub fn admin_nav() -> String {
    let mut sections = String::new();
    for key in SectionKey::ALL {
        sections.push_str(&format!(
            r#"<a href="/admin/sections/{key}">{label}</a>"#,
            label = key.label(),
        ));
    }
    format!(
        r#"<nav class="admin-nav">
        <a href="/admin" class="brand">仪表盘</a>
        <details><summary>分区</summary><div class="menu">{sections}</div></details>
        <a href="/admin/media">媒体</a>
        <a href="/" target="_blank" style="margin-left:auto;">查看站点</a>
    </nav>"#
    )
}

pub fn base_style() -> &'static str {
    r#"<style>
        * { margin:0; padding:0; box-sizing:border-box; }
        body { font-family:system-ui,-apple-system,sans-serif; background:#f5f5f5; color:#333; }
        .admin-nav { background:#1a1a2e; padding:12px 24px; display:flex; gap:24px; align-items:center; }
        .admin-nav a, .admin-nav summary { color:#e0e0e0; text-decoration:none; font-weight:bold; cursor:pointer; }
        .admin-nav details { position:relative; }
        .admin-nav .menu { position:absolute; top:28px; left:0; background:#1a1a2e; padding:8px 0; min-width:140px; z-index:10; }
        .admin-nav .menu a { display:block; padding:6px 16px; font-weight:normal; }
        .container { max-width:1200px; margin:24px auto; padding:0 16px; }
        h1 { margin-bottom:16px; }
        h2 { margin-top:24px; margin-bottom:12px; }
        table { width:100%; border-collapse:collapse; background:#fff; border-radius:4px; overflow:hidden; box-shadow:0 1px 3px rgba(0,0,0,0.1); }
        th,td { padding:10px 14px; text-align:left; border-bottom:1px solid #eee; }
        th { background:#f8f8f8; font-weight:600; }
        a { color:#4a6cf7; text-decoration:none; }
        a:hover { text-decoration:underline; }
        .card { background:#fff; padding:16px; border-radius:8px; box-shadow:0 1px 3px rgba(0,0,0,0.1); margin-bottom:16px; }
        .btn { display:inline-block; padding:6px 14px; border-radius:4px; border:none; cursor:pointer; font-size:14px; text-decoration:none; }
        .btn-sm { padding:3px 8px; font-size:12px; }
        .btn-primary { background:#4a6cf7; color:#fff; }
        .btn-danger { background:#e74c3c; color:#fff; }
        .btn-secondary { background:#6c757d; color:#fff; }
        .btn-success { background:#27ae60; color:#fff; }
        .btn:disabled { opacity:.5; cursor:not-allowed; }
        label { display:block; margin-bottom:4px; font-weight:500; }
        input[type=text], input[type=number], input[type=url], input[type=date], textarea, select {
            width:100%; padding:8px 10px; border:1px solid #ccc; border-radius:4px; font-size:14px; margin-bottom:12px;
        }
        input[type=color] { width:60px; height:34px; margin-bottom:12px; }
        textarea { min-height:90px; }
        .form-row { margin-bottom:8px; }
        .status-badge { padding:2px 8px; border-radius:10px; font-size:12px; }
        .status-clean { background:#a8e6cf; color:#1b5e20; }
        .status-dirty { background:#ffeaa7; color:#6c5b00; }
        .status-saving { background:#cfe0ff; color:#1c3d8f; }
        .status-unloaded { background:#ddd; color:#555; }
        .notice { background:#fff3cd; color:#6c5b00; padding:10px 14px; border-radius:4px; margin-bottom:16px; }
        .error { background:#ffcdd2; color:#b71c1c; padding:10px 14px; border-radius:4px; margin-bottom:16px; }
        .actions form { display:inline; }
    </style>"#
}

fn page_shell(title: &str, extra_style: &str, body: &str, script: Option<&str>) -> String {
    let extra_style_wrapped = if extra_style.is_empty() {
        String::new()
    } else {
        format!("<style>{extra_style}</style>")
    };
    let script = script
        .map(|s| format!("<script>{s}</script>"))
        .unwrap_or_default();
    format!(
        r#"<!DOCTYPE html><html><head><meta charset="utf-8"><title>{title}</title>{base_style}{extra_style_wrapped}</head>
        <body>{nav}{body}{script}</body></html>"#,
        title = html_escape(title),
        base_style = base_style(),
        nav = admin_nav(),
    )
}

pub fn admin_page(title: &str, extra_style: &str, body: &str) -> String {
    page_shell(title, extra_style, body, None)
}

pub fn admin_page_with_script(title: &str, extra_style: &str, body: &str, script: &str) -> String {
    page_shell(title, extra_style, body, Some(script))
}
