//! 多个分区共用的类型：主题色、对齐、按钮、动画

use serde::{Deserialize, Serialize};

use crate::section::list::{Flag, ListItem};

/// 主题色名，预览与公开页面使用同一套 CSS 类
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeColor {
    #[default]
    Primary,
    Secondary,
    Accent,
    Success,
    Warning,
    Danger,
    Light,
    Dark,
}

impl ThemeColor {
    pub const ALL: [ThemeColor; 8] = [
        ThemeColor::Primary,
        ThemeColor::Secondary,
        ThemeColor::Accent,
        ThemeColor::Success,
        ThemeColor::Warning,
        ThemeColor::Danger,
        ThemeColor::Light,
        ThemeColor::Dark,
    ];

    pub const OPTIONS: &'static [(&'static str, &'static str)] = &[
        ("primary", "主色"),
        ("secondary", "辅色"),
        ("accent", "强调色"),
        ("success", "绿色"),
        ("warning", "橙色"),
        ("danger", "红色"),
        ("light", "浅色"),
        ("dark", "深色"),
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Accent => "accent",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Danger => "danger",
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    /// 未知名称回退到主色
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == name)
            .unwrap_or_default()
    }

    pub fn css_class(self) -> &'static str {
        match self {
            Self::Primary => "bg-primary",
            Self::Secondary => "bg-secondary",
            Self::Accent => "bg-accent",
            Self::Success => "bg-success",
            Self::Warning => "bg-warning",
            Self::Danger => "bg-danger",
            Self::Light => "bg-light",
            Self::Dark => "bg-dark",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    #[default]
    Center,
    Right,
}

impl Alignment {
    pub const OPTIONS: &'static [(&'static str, &'static str)] =
        &[("left", "左对齐"), ("center", "居中"), ("right", "右对齐")];

    pub fn from_name(name: &str) -> Self {
        match name {
            "left" => Self::Left,
            "right" => Self::Right,
            _ => Self::Center,
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            Self::Left => "text-left items-start",
            Self::Center => "text-center items-center",
            Self::Right => "text-right items-end",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonStyle {
    #[default]
    Solid,
    Outline,
    Ghost,
}

impl ButtonStyle {
    pub const OPTIONS: &'static [(&'static str, &'static str)] =
        &[("solid", "实心"), ("outline", "描边"), ("ghost", "文字")];
}

/// 行动按钮（横幅与行动号召共用）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CtaButton {
    pub id: String,
    pub label: String,
    pub url: String,
    pub style: ButtonStyle,
    pub color: ThemeColor,
    pub is_visible: bool,
}

impl CtaButton {
    pub(crate) fn new(id: &str, label: &str, url: &str, style: ButtonStyle) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            url: url.into(),
            style,
            color: ThemeColor::Primary,
            is_visible: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum ButtonPatch {
    Label(String),
    Url(String),
    Style(ButtonStyle),
    Color(ThemeColor),
}

impl ListItem for CtaButton {
    type Patch = ButtonPatch;

    item_id!();

    fn placeholder() -> Self {
        Self::new("", "New Button", "#", ButtonStyle::Outline)
    }

    fn patch(&mut self, patch: ButtonPatch) {
        match patch {
            ButtonPatch::Label(label) => self.label = label,
            ButtonPatch::Url(url) => self.url = url,
            ButtonPatch::Style(style) => self.style = style,
            ButtonPatch::Color(color) => self.color = color,
        }
    }

    fn toggle(&mut self, flag: Flag) -> bool {
        match flag {
            Flag::Visible => {
                self.is_visible = !self.is_visible;
                true
            }
            _ => false,
        }
    }
}

/// 入场动画，时长与延迟单位为秒
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Animation {
    pub enabled: bool,
    pub duration: f64,
    pub delay: f64,
}

impl Default for Animation {
    fn default() -> Self {
        Self {
            enabled: true,
            duration: 1.0,
            delay: 0.0,
        }
    }
}

impl Animation {
    pub const MAX_SECONDS: f64 = 10.0;

    pub fn clamp(&mut self) {
        self.duration = clamp_seconds(self.duration);
        self.delay = clamp_seconds(self.delay);
    }
}

pub(crate) fn clamp_seconds(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, Animation::MAX_SECONDS)
    } else {
        0.0
    }
}
