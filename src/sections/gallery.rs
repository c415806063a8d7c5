use serde::{Deserialize, Serialize};

use crate::section::field::{FieldKind, FieldSpec, ItemField, ListSpec, NumberInput, field, item};
use crate::section::list::{Flag, ListEditor, ListItem, ListOp, StringListOp, apply_strings};
use crate::section::{Outcome, Section, SectionKey};
use crate::sections::assign;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GalleryLayout {
    #[default]
    Grid,
    Masonry,
    Carousel,
}

impl GalleryLayout {
    pub const OPTIONS: &'static [(&'static str, &'static str)] =
        &[("grid", "网格"), ("masonry", "瀑布流"), ("carousel", "轮播")];
}

/// 图片墙
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GallerySection {
    pub title: String,
    pub subtitle: String,
    pub layout: GalleryLayout,
    /// 网格列数，1-6
    pub columns: u32,
    /// 分类名；图片的 category 不校验是否在此列表中
    pub categories: Vec<String>,
    pub items: Vec<GalleryItem>,
}

impl Default for GallerySection {
    fn default() -> Self {
        Self {
            title: "Moments of Impact".into(),
            subtitle: "Stories captured in the field".into(),
            layout: GalleryLayout::Grid,
            columns: 3,
            categories: vec!["Education".into(), "Health".into(), "Community".into()],
            items: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GalleryItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image: String,
    pub category: String,
    pub date: String,
    pub featured: bool,
    pub is_visible: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum GalleryItemPatch {
    Title(String),
    Description(String),
    Image(String),
    Category(String),
    Date(String),
}

impl ListItem for GalleryItem {
    type Patch = GalleryItemPatch;

    item_id!();

    fn placeholder() -> Self {
        Self {
            title: "New Photo".into(),
            date: chrono::Utc::now().format("%Y-%m-%d").to_string(),
            is_visible: true,
            ..Self::default()
        }
    }

    fn patch(&mut self, patch: GalleryItemPatch) {
        match patch {
            GalleryItemPatch::Title(v) => self.title = v,
            GalleryItemPatch::Description(v) => self.description = v,
            GalleryItemPatch::Image(v) => self.image = v,
            GalleryItemPatch::Category(v) => self.category = v,
            GalleryItemPatch::Date(v) => self.date = v,
        }
    }

    fn toggle(&mut self, flag: Flag) -> bool {
        match flag {
            Flag::Featured => self.featured = !self.featured,
            Flag::Visible => self.is_visible = !self.is_visible,
            Flag::Available => return false,
        }
        true
    }
}

#[derive(Deserialize)]
#[serde(tag = "op", content = "args", rename_all = "snake_case")]
pub enum GalleryUpdate {
    SetTitle(String),
    SetSubtitle(String),
    SetLayout(GalleryLayout),
    SetColumns(NumberInput),
    Categories(StringListOp),
    Items(ListOp<GalleryItem>),
}

const FIELDS: &[FieldSpec] = &[
    field("set_title", "title", "标题", FieldKind::Text),
    field("set_subtitle", "subtitle", "副标题", FieldKind::Text),
    field("set_layout", "layout", "布局", FieldKind::Select(GalleryLayout::OPTIONS)),
    field("set_columns", "columns", "列数", FieldKind::Range { min: 1, max: 6 }),
    field("categories", "categories", "分类", FieldKind::Tags),
];

const ITEM_FIELDS: &[ItemField] = &[
    item("title", "标题", FieldKind::Text),
    item("description", "说明", FieldKind::TextArea),
    item("image", "图片", FieldKind::Image),
    item("category", "分类", FieldKind::Text),
    item("date", "日期", FieldKind::Date),
];

const LISTS: &[ListSpec] = &[ListSpec {
    op: "items",
    label: "图片",
    min_items: 0,
    fields: ITEM_FIELDS,
}];

fn clamp_columns(columns: i64) -> u32 {
    columns.clamp(1, 6) as u32
}

impl Section for GallerySection {
    const KEY: SectionKey = SectionKey::Gallery;
    type Update = GalleryUpdate;

    fn apply(&mut self, update: GalleryUpdate) -> Outcome {
        match update {
            GalleryUpdate::SetTitle(v) => assign(&mut self.title, v),
            GalleryUpdate::SetSubtitle(v) => assign(&mut self.subtitle, v),
            GalleryUpdate::SetLayout(v) => assign(&mut self.layout, v),
            GalleryUpdate::SetColumns(v) => assign(&mut self.columns, clamp_columns(v.as_int())),
            GalleryUpdate::Categories(op) => apply_strings(&mut self.categories, op),
            GalleryUpdate::Items(op) => ListEditor::new(&mut self.items).apply(op),
        }
    }

    fn normalize(&mut self) {
        self.columns = clamp_columns(self.columns as i64);
    }

    fn fields() -> &'static [FieldSpec] {
        FIELDS
    }

    fn lists() -> &'static [ListSpec] {
        LISTS
    }
}

impl GallerySection {
    /// 公开页面：可见图片，可按分类过滤（不区分大小写），推荐项在前
    pub fn visible_items(&self, category: Option<&str>) -> Vec<&GalleryItem> {
        let category = category.map(str::trim).filter(|c| !c.is_empty());
        let mut items: Vec<&GalleryItem> = self
            .items
            .iter()
            .filter(|item| item.is_visible)
            .filter(|item| category.is_none_or(|c| item.category.eq_ignore_ascii_case(c)))
            .collect();
        items.sort_by_key(|item| !item.featured);
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo(id: &str, category: &str, featured: bool, visible: bool) -> GalleryItem {
        GalleryItem {
            id: id.into(),
            title: id.into(),
            category: category.into(),
            featured,
            is_visible: visible,
            ..GalleryItem::default()
        }
    }

    #[test]
    fn visible_items_filter_by_category() {
        let mut gallery = GallerySection::default();
        gallery.items = vec![
            photo("a", "Health", false, true),
            photo("b", "Education", true, true),
            photo("c", "health", true, true),
            photo("d", "Health", false, false),
        ];

        let all: Vec<&str> = gallery.visible_items(None).iter().map(|i| i.id.as_str()).collect();
        assert_eq!(all, vec!["b", "c", "a"]);

        let health: Vec<&str> = gallery
            .visible_items(Some("HEALTH"))
            .iter()
            .map(|i| i.id.as_str())
            .collect();
        assert_eq!(health, vec!["c", "a"]);

        assert_eq!(gallery.visible_items(Some("  ")).len(), 3);
    }

    #[test]
    fn columns_are_clamped() {
        let mut gallery = GallerySection::default();
        gallery.apply(GalleryUpdate::SetColumns(NumberInput::Text("12".into())));
        assert_eq!(gallery.columns, 6);
        gallery.apply(GalleryUpdate::SetColumns(NumberInput::Text("abc".into())));
        assert_eq!(gallery.columns, 1);
    }

    #[test]
    fn categories_are_a_set() {
        let mut gallery = GallerySection::default();
        assert_eq!(
            gallery.apply(GalleryUpdate::Categories(StringListOp::Add { value: "health".into() })),
            Outcome::Ignored
        );
        assert_eq!(
            gallery.apply(GalleryUpdate::Categories(StringListOp::Add { value: "Relief".into() })),
            Outcome::Applied
        );
        assert_eq!(gallery.categories.len(), 4);
    }

    #[test]
    fn item_category_is_not_validated() {
        let mut gallery = GallerySection::default();
        gallery.apply(GalleryUpdate::Items(ListOp::Add {
            item: Some(photo("", "Unlisted", false, true)),
        }));
        assert_eq!(gallery.items[0].category, "Unlisted");
    }
}
