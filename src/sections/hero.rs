use serde::{Deserialize, Serialize};

use crate::section::field::{FieldKind, FieldSpec, HexColor, ListSpec, NumberInput, field, item};
use crate::section::list::{ListEditor, ListItem, ListOp};
use crate::section::{Outcome, Section, SectionKey};
use crate::sections::common::{Alignment, Animation, ButtonStyle, CtaButton, ThemeColor, clamp_seconds};
use crate::sections::{assign, flip};

/// 首页横幅
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeroSection {
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub background_image: String,
    /// 遮罩不透明度，0-100
    pub overlay_opacity: u32,
    pub text_color: HexColor,
    pub alignment: Alignment,
    pub animation: Animation,
    pub buttons: Vec<CtaButton>,
    /// 开启后背景在 gallery 图片间轮播
    pub rotating_gallery: bool,
    pub gallery: Vec<HeroImage>,
    pub is_visible: bool,
}

impl Default for HeroSection {
    fn default() -> Self {
        Self {
            title: "Together We Can Change Lives".into(),
            subtitle: "Join our mission to bring hope and opportunity".into(),
            description: "Every contribution helps families access clean water, education and healthcare.".into(),
            background_image: "/media/hero-default.jpg".into(),
            overlay_opacity: 40,
            text_color: HexColor::literal("#ffffff"),
            alignment: Alignment::Center,
            animation: Animation::default(),
            buttons: vec![
                CtaButton::new("donate", "Donate Now", "/donate", ButtonStyle::Solid),
                CtaButton::new("learn-more", "Learn More", "/about", ButtonStyle::Outline),
            ],
            rotating_gallery: false,
            gallery: Vec::new(),
            is_visible: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeroImage {
    pub id: String,
    pub url: String,
    pub alt: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum HeroImagePatch {
    Url(String),
    Alt(String),
}

impl ListItem for HeroImage {
    type Patch = HeroImagePatch;

    item_id!();

    fn placeholder() -> Self {
        Self {
            id: String::new(),
            url: String::new(),
            alt: "Gallery image".into(),
        }
    }

    fn patch(&mut self, patch: HeroImagePatch) {
        match patch {
            HeroImagePatch::Url(url) => self.url = url,
            HeroImagePatch::Alt(alt) => self.alt = alt,
        }
    }
}

#[derive(Deserialize)]
#[serde(tag = "op", content = "args", rename_all = "snake_case")]
pub enum HeroUpdate {
    SetTitle(String),
    SetSubtitle(String),
    SetDescription(String),
    SetBackgroundImage(String),
    SetOverlayOpacity(NumberInput),
    SetTextColor(HexColor),
    SetAlignment(Alignment),
    ToggleAnimation,
    SetAnimationDuration(NumberInput),
    SetAnimationDelay(NumberInput),
    ToggleRotatingGallery,
    ToggleVisible,
    Buttons(ListOp<CtaButton>),
    Gallery(ListOp<HeroImage>),
}

const FIELDS: &[FieldSpec] = &[
    field("set_title", "title", "标题", FieldKind::Text),
    field("set_subtitle", "subtitle", "副标题", FieldKind::Text),
    field("set_description", "description", "描述", FieldKind::TextArea),
    field("set_background_image", "background_image", "背景图", FieldKind::Image),
    field("set_overlay_opacity", "overlay_opacity", "遮罩不透明度", FieldKind::Range { min: 0, max: 100 }),
    field("set_text_color", "text_color", "文字颜色", FieldKind::Color),
    field("set_alignment", "alignment", "对齐方式", FieldKind::Select(Alignment::OPTIONS)),
    field("toggle_animation", "animation.enabled", "启用动画", FieldKind::Toggle),
    field("set_animation_duration", "animation.duration", "动画时长（秒）", FieldKind::Number { min: 0, max: 10 }),
    field("set_animation_delay", "animation.delay", "动画延迟（秒）", FieldKind::Number { min: 0, max: 10 }),
    field("toggle_rotating_gallery", "rotating_gallery", "背景轮播", FieldKind::Toggle),
    field("toggle_visible", "is_visible", "显示该分区", FieldKind::Toggle),
];

pub(crate) const BUTTON_FIELDS: &[crate::section::field::ItemField] = &[
    item("label", "按钮文字", FieldKind::Text),
    item("url", "链接", FieldKind::Text),
    item("style", "样式", FieldKind::Select(ButtonStyle::OPTIONS)),
    item("color", "颜色", FieldKind::Select(ThemeColor::OPTIONS)),
];

const LISTS: &[ListSpec] = &[
    ListSpec {
        op: "buttons",
        label: "按钮",
        min_items: 1,
        fields: BUTTON_FIELDS,
    },
    ListSpec {
        op: "gallery",
        label: "轮播图片",
        min_items: 0,
        fields: &[
            item("url", "图片", FieldKind::Image),
            item("alt", "替代文本", FieldKind::Text),
        ],
    },
];

impl Section for HeroSection {
    const KEY: SectionKey = SectionKey::Hero;
    type Update = HeroUpdate;

    fn apply(&mut self, update: HeroUpdate) -> Outcome {
        match update {
            HeroUpdate::SetTitle(v) => assign(&mut self.title, v),
            HeroUpdate::SetSubtitle(v) => assign(&mut self.subtitle, v),
            HeroUpdate::SetDescription(v) => assign(&mut self.description, v),
            HeroUpdate::SetBackgroundImage(v) => assign(&mut self.background_image, v),
            HeroUpdate::SetOverlayOpacity(v) => {
                assign(&mut self.overlay_opacity, v.as_count().min(100) as u32)
            }
            HeroUpdate::SetTextColor(v) => assign(&mut self.text_color, v),
            HeroUpdate::SetAlignment(v) => assign(&mut self.alignment, v),
            HeroUpdate::ToggleAnimation => flip(&mut self.animation.enabled),
            HeroUpdate::SetAnimationDuration(v) => {
                assign(&mut self.animation.duration, clamp_seconds(v.as_float()))
            }
            HeroUpdate::SetAnimationDelay(v) => {
                assign(&mut self.animation.delay, clamp_seconds(v.as_float()))
            }
            HeroUpdate::ToggleRotatingGallery => flip(&mut self.rotating_gallery),
            HeroUpdate::ToggleVisible => flip(&mut self.is_visible),
            HeroUpdate::Buttons(op) => ListEditor::new(&mut self.buttons).with_min(1).apply(op),
            HeroUpdate::Gallery(op) => ListEditor::new(&mut self.gallery).apply(op),
        }
    }

    fn normalize(&mut self) {
        self.overlay_opacity = self.overlay_opacity.min(100);
        self.animation.clamp();
    }

    fn fields() -> &'static [FieldSpec] {
        FIELDS
    }

    fn lists() -> &'static [ListSpec] {
        LISTS
    }
}
