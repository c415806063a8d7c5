//! 实时预览：分区 JSON -> HTML，模板与公开页面共用

use minijinja::{Environment, Value, context};
use pulldown_cmark::{Event, Options, Parser, html};

use crate::error::SectionError;
use crate::section::SectionKey;
use crate::section::field::percent;
use crate::sections::common::{Alignment, ThemeColor};

/// 内嵌的分区模板（名称, 源码）
const SECTION_TEMPLATES: &[(&str, &str)] = &[
    ("preview/hero.html", include_str!("../../templates/preview/hero.html")),
    ("preview/cta.html", include_str!("../../templates/preview/cta.html")),
    ("preview/impact.html", include_str!("../../templates/preview/impact.html")),
    ("preview/causes.html", include_str!("../../templates/preview/causes.html")),
    ("preview/story.html", include_str!("../../templates/preview/story.html")),
    ("preview/gallery.html", include_str!("../../templates/preview/gallery.html")),
    ("preview/resources.html", include_str!("../../templates/preview/resources.html")),
    ("preview/careers.html", include_str!("../../templates/preview/careers.html")),
    ("preview/volunteers.html", include_str!("../../templates/preview/volunteers.html")),
];

/// 构建预览/公开页面共用的 MiniJinja 环境：注册分区模板和样式映射过滤器
pub fn build_env() -> Result<Environment<'static>, SectionError> {
    let mut env = Environment::new();
    register_filters(&mut env);
    for &(name, source) in SECTION_TEMPLATES {
        env.add_template(name, source)?;
    }
    Ok(env)
}

pub fn register_filters(env: &mut Environment) {
    env.add_filter("color_class", filter_color_class);
    env.add_filter("align_class", filter_align_class);
    env.add_filter("progress", filter_progress);
    env.add_filter("markdown", filter_markdown);
}

pub fn template_name(key: SectionKey) -> String {
    format!("preview/{}.html", key.as_str())
}

/// 渲染单个分区的预览
pub fn render_section(
    env: &Environment,
    key: SectionKey,
    data: &serde_json::Value,
) -> Result<String, SectionError> {
    let tmpl = env.get_template(&template_name(key))?;
    let html = tmpl.render(context! {
        section => Value::from_serialize(data),
        preview => true,
    })?;
    Ok(html)
}

fn filter_color_class(name: String) -> &'static str {
    ThemeColor::from_name(&name).css_class()
}

fn filter_align_class(name: String) -> &'static str {
    Alignment::from_name(&name).css_class()
}

/// `{{ raised | progress(goal) }}`，结果保留一位小数
fn filter_progress(current: f64, total: f64) -> f64 {
    (percent(current, total) * 10.0).round() / 10.0
}

fn filter_markdown(source: String) -> Value {
    Value::from_safe_string(render_markdown(&source))
}

/// Markdown 转 HTML；原始 HTML 按文本转义输出
pub fn render_markdown(source: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);

    let parser = Parser::new_ext(source, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut output = String::new();
    html::push_html(&mut output, parser);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::Section;
    use crate::sections::causes::CausesSection;
    use crate::sections::hero::HeroSection;
    use crate::sections::impact::ImpactSection;
    use crate::sections::story::StorySection;

    fn render<S: Section>(section: &S) -> String {
        let env = build_env().unwrap();
        let data = serde_json::to_value(section).unwrap();
        render_section(&env, S::KEY, &data).unwrap()
    }

    #[test]
    fn every_section_has_a_template() {
        let env = build_env().unwrap();
        for key in SectionKey::ALL {
            assert!(env.get_template(&template_name(key)).is_ok(), "{key}");
        }
    }

    #[test]
    fn every_default_section_renders() {
        let env = build_env().unwrap();
        let defaults = [
            (SectionKey::Hero, serde_json::to_value(HeroSection::default()).unwrap()),
            (SectionKey::Cta, serde_json::to_value(crate::sections::cta::CtaSection::default()).unwrap()),
            (SectionKey::Impact, serde_json::to_value(ImpactSection::default()).unwrap()),
            (SectionKey::Causes, serde_json::to_value(CausesSection::default()).unwrap()),
            (SectionKey::Story, serde_json::to_value(StorySection::default()).unwrap()),
            (SectionKey::Gallery, serde_json::to_value(crate::sections::gallery::GallerySection::default()).unwrap()),
            (SectionKey::Resources, serde_json::to_value(crate::sections::resources::ResourcesSection::default()).unwrap()),
            (SectionKey::Careers, serde_json::to_value(crate::sections::careers::CareersSection::default()).unwrap()),
            (SectionKey::Volunteers, serde_json::to_value(crate::sections::volunteers::VolunteerSection::default()).unwrap()),
        ];
        for (key, data) in defaults {
            let html = render_section(&env, key, &data).unwrap();
            assert!(html.contains(&format!("data-section=\"{key}\"")), "{key}");
        }
    }

    #[test]
    fn impact_preview_shows_default_title() {
        let html = render(&ImpactSection::default());
        assert!(html.contains("Our Global Impact"));
        assert!(html.contains("bg-light"));
    }

    #[test]
    fn overfunded_progress_bar_is_capped() {
        let html = render(&CausesSection::default());
        assert!(html.contains("width: 100.0%"));
        assert!(!html.contains("width: 102.5%"));
    }

    #[test]
    fn titles_are_escaped() {
        let mut hero = HeroSection::default();
        hero.title = "<script>alert(1)</script>".into();
        let html = render(&hero);
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn story_paragraphs_render_markdown_without_raw_html() {
        let mut story = StorySection::default();
        story.paragraphs[0].text = "**bold** <img src=x onerror=alert(1)>".into();
        let html = render(&story);
        assert!(html.contains("<strong>bold</strong>"));
        assert!(!html.contains("<img src=x"));
    }

    #[test]
    fn progress_filter_rounds_and_clamps() {
        assert_eq!(filter_progress(1.0, 3.0), 33.3);
        assert_eq!(filter_progress(5.0, 0.0), 0.0);
        assert_eq!(filter_progress(9.0, 4.0), 100.0);
    }

    #[test]
    fn unknown_names_map_to_defaults() {
        assert_eq!(filter_color_class("nope".into()), "bg-primary");
        assert_eq!(filter_align_class("left".into()), "text-left items-start");
    }
}
