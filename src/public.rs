//! 公开页面：用已保存的分区内容渲染首页、图片墙、招聘页和资源门户
//!
//! 草稿不会出现在这里，读取失败时回退到默认内容。

use axum::Router;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use minijinja::{Environment, Value, context};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::SectionError;
use crate::section::{Section, preview};
use crate::sections::careers::CareersSection;
use crate::sections::causes::CausesSection;
use crate::sections::cta::CtaSection;
use crate::sections::gallery::GallerySection;
use crate::sections::hero::HeroSection;
use crate::sections::impact::ImpactSection;
use crate::sections::resources::{ResourcesSection, SortOrder, Tab, search};
use crate::sections::story::StorySection;
use crate::state::AppState;
use crate::store::load_published;

const PAGE_TEMPLATES: &[(&str, &str)] = &[
    ("public/layout.html", include_str!("../templates/public/layout.html")),
    ("public/home.html", include_str!("../templates/public/home.html")),
    ("public/gallery.html", include_str!("../templates/public/gallery.html")),
    ("public/careers.html", include_str!("../templates/public/careers.html")),
    ("public/resources.html", include_str!("../templates/public/resources.html")),
];

/// 分区模板 + 公开页面模板
pub fn build_site_env() -> Result<Environment<'static>, SectionError> {
    let mut env = preview::build_env()?;
    for &(name, source) in PAGE_TEMPLATES {
        env.add_template(name, source)?;
    }
    Ok(env)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/gallery", get(gallery))
        .route("/careers", get(careers))
        .route("/resources", get(resources))
}

fn site_context(state: &AppState, page: &str) -> Value {
    let site = &state.config.site;
    context! {
        site => context! {
            title => &site.title,
            tagline => &site.tagline,
            url => &site.url,
        },
        page => page,
        year => chrono::Utc::now().format("%Y").to_string(),
    }
}

fn render(state: &AppState, headers: &HeaderMap, name: &str, ctx: Value) -> Response {
    let rendered = state
        .env
        .get_template(name)
        .and_then(|tmpl| tmpl.render(ctx));
    match rendered {
        Ok(html) => cached_html(headers, html),
        Err(e) => {
            tracing::error!("渲染页面 {name} 失败：{e:#}");
            (StatusCode::INTERNAL_SERVER_ERROR, Html("页面渲染失败".to_string())).into_response()
        }
    }
}

/// 以内容哈希作为 ETag，命中 If-None-Match 时返回 304
fn cached_html(headers: &HeaderMap, html: String) -> Response {
    let digest = format!("{:x}", Sha256::digest(html.as_bytes()));
    let etag = format!("\"{}\"", &digest[..16]);

    let matched = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.split(',').any(|tag| tag.trim() == etag || tag.trim() == "*"));

    let mut response = if matched {
        StatusCode::NOT_MODIFIED.into_response()
    } else {
        Html(html).into_response()
    };
    if let Ok(value) = HeaderValue::from_str(&etag) {
        response.headers_mut().insert(header::ETAG, value);
    }
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}

#[derive(Serialize)]
struct HomeEntry {
    template: String,
    data: serde_json::Value,
}

fn home_entry<S: Section>(section: &S) -> Option<HomeEntry> {
    let data = serde_json::to_value(section).ok()?;
    if data.get("is_visible") == Some(&serde_json::Value::Bool(false)) {
        return None;
    }
    Some(HomeEntry {
        template: preview::template_name(S::KEY),
        data,
    })
}

async fn home(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let store = &state.store;
    let ((hero, _), (impact, _), (causes, _), (story, _), (cta, _)) = tokio::join!(
        load_published::<HeroSection, _>(store),
        load_published::<ImpactSection, _>(store),
        load_published::<CausesSection, _>(store),
        load_published::<StorySection, _>(store),
        load_published::<CtaSection, _>(store),
    );

    let sections: Vec<HomeEntry> = [
        home_entry(&hero),
        home_entry(&impact),
        home_entry(&causes),
        home_entry(&story),
        home_entry(&cta),
    ]
    .into_iter()
    .flatten()
    .collect();

    let ctx = context! {
        sections => Value::from_serialize(&sections),
        ..site_context(&state, "home")
    };
    render(&state, &headers, "public/home.html", ctx)
}

#[derive(Deserialize)]
pub struct GalleryQuery {
    pub category: Option<String>,
}

async fn gallery(
    State(state): State<AppState>,
    Query(query): Query<GalleryQuery>,
    headers: HeaderMap,
) -> Response {
    let (section, _) = load_published::<GallerySection, _>(&state.store).await;
    let active = query
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());
    let items = section.visible_items(active);

    let ctx = context! {
        section => Value::from_serialize(&section),
        items => Value::from_serialize(&items),
        active_category => active,
        ..site_context(&state, "gallery")
    };
    render(&state, &headers, "public/gallery.html", ctx)
}

async fn careers(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (section, _) = load_published::<CareersSection, _>(&state.store).await;
    let jobs = section.open_jobs();

    let ctx = context! {
        section => Value::from_serialize(&section),
        jobs => Value::from_serialize(&jobs),
        ..site_context(&state, "careers")
    };
    render(&state, &headers, "public/careers.html", ctx)
}

#[derive(Deserialize)]
pub struct ResourcesQuery {
    pub tab: Option<String>,
    pub q: Option<String>,
    pub sort: Option<String>,
}

#[derive(Serialize)]
struct TabLink {
    key: &'static str,
    label: &'static str,
    count: usize,
}

async fn resources(
    State(state): State<AppState>,
    Query(query): Query<ResourcesQuery>,
    headers: HeaderMap,
) -> Response {
    let (section, _) = load_published::<ResourcesSection, _>(&state.store).await;
    let tab = query.tab.as_deref().and_then(Tab::from_name).unwrap_or_default();
    let sort = query.sort.as_deref().and_then(SortOrder::from_name).unwrap_or_default();
    let q = query.q.as_deref().unwrap_or("").trim();

    let results = match tab {
        Tab::Ebooks => Value::from_serialize(search(&section.ebooks, q, sort)),
        Tab::Videos => Value::from_serialize(search(&section.videos, q, sort)),
        Tab::Forums => Value::from_serialize(search(&section.forums, q, sort)),
        Tab::Workshops => Value::from_serialize(search(&section.workshops, q, sort)),
        Tab::Mentorship => Value::from_serialize(search(&section.mentors, q, sort)),
    };

    let tabs: Vec<TabLink> = Tab::ALL
        .into_iter()
        .map(|t| TabLink {
            key: t.as_str(),
            label: t.label(),
            count: match t {
                Tab::Ebooks => section.ebooks.len(),
                Tab::Videos => section.videos.len(),
                Tab::Forums => section.forums.len(),
                Tab::Workshops => section.workshops.len(),
                Tab::Mentorship => section.mentors.len(),
            },
        })
        .collect();

    let sort_name = match sort {
        SortOrder::Title => "title",
        SortOrder::Newest => "newest",
        SortOrder::Popular => "popular",
    };

    let ctx = context! {
        section => Value::from_serialize(&section),
        tab => tab.as_str(),
        tab_label => tab.label(),
        tabs => Value::from_serialize(&tabs),
        query => q,
        sort => sort_name,
        results => results,
        ..site_context(&state, "resources")
    };
    render(&state, &headers, "public/resources.html", ctx)
}
