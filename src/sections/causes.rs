use serde::{Deserialize, Serialize};

use crate::section::field::{FieldKind, FieldSpec, ItemField, ListSpec, NumberInput, field, item};
use crate::section::list::{Flag, ListEditor, ListItem, ListOp};
use crate::section::{Outcome, Section, SectionKey};
use crate::sections::{assign, flip};

/// 重点募捐项目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CausesSection {
    pub title: String,
    pub subtitle: String,
    pub show_progress: bool,
    pub causes: Vec<Cause>,
}

impl Default for CausesSection {
    fn default() -> Self {
        Self {
            title: "Featured Causes".into(),
            subtitle: "Choose where your support makes the biggest difference".into(),
            show_progress: true,
            causes: vec![
                Cause::new("education", "Education for Every Child", "Education", 32_000.0, 50_000.0, 1),
                Cause::new("clean-water", "Clean Water Access", "Health", 18_500.0, 25_000.0, 2),
                Cause::new("disaster-relief", "Disaster Relief Fund", "Emergency", 41_000.0, 40_000.0, 3),
            ],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cause {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image: String,
    pub category: String,
    pub raised: f64,
    pub goal: f64,
    pub priority: u32,
    pub featured: bool,
    pub is_visible: bool,
}

impl Cause {
    fn new(id: &str, title: &str, category: &str, raised: f64, goal: f64, priority: u32) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            category: category.into(),
            raised,
            goal,
            priority,
            featured: priority == 1,
            is_visible: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum CausePatch {
    Title(String),
    Description(String),
    Image(String),
    Category(String),
    Raised(NumberInput),
    Goal(NumberInput),
}

impl ListItem for Cause {
    type Patch = CausePatch;

    item_id!();

    fn placeholder() -> Self {
        Self::new("", "New Cause", "General", 0.0, 1_000.0, 0)
    }

    fn patch(&mut self, patch: CausePatch) {
        match patch {
            CausePatch::Title(v) => self.title = v,
            CausePatch::Description(v) => self.description = v,
            CausePatch::Image(v) => self.image = v,
            CausePatch::Category(v) => self.category = v,
            CausePatch::Raised(v) => self.raised = v.as_float().max(0.0),
            CausePatch::Goal(v) => self.goal = v.as_float().max(0.0),
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

    fn order(&self) -> Option<u32> {
        Some(self.priority)
    }

    fn set_order(&mut self, order: u32) {
        self.priority = order;
    }
}

#[derive(Deserialize)]
#[serde(tag = "op", content = "args", rename_all = "snake_case")]
pub enum CausesUpdate {
    SetTitle(String),
    SetSubtitle(String),
    ToggleShowProgress,
    Causes(ListOp<Cause>),
}

const FIELDS: &[FieldSpec] = &[
    field("set_title", "title", "标题", FieldKind::Text),
    field("set_subtitle", "subtitle", "副标题", FieldKind::Text),
    field("toggle_show_progress", "show_progress", "显示募捐进度", FieldKind::Toggle),
];

const CAUSE_FIELDS: &[ItemField] = &[
    item("title", "项目名称", FieldKind::Text),
    item("description", "简介", FieldKind::TextArea),
    item("image", "封面", FieldKind::Image),
    item("category", "分类", FieldKind::Text),
    item("raised", "已筹", FieldKind::Number { min: 0, max: i64::MAX }),
    item("goal", "目标金额", FieldKind::Number { min: 0, max: i64::MAX }),
];

const LISTS: &[ListSpec] = &[ListSpec {
    op: "causes",
    label: "项目",
    min_items: 0,
    fields: CAUSE_FIELDS,
}];

impl Section for CausesSection {
    const KEY: SectionKey = SectionKey::Causes;
    type Update = CausesUpdate;

    fn apply(&mut self, update: CausesUpdate) -> Outcome {
        match update {
            CausesUpdate::SetTitle(v) => assign(&mut self.title, v),
            CausesUpdate::SetSubtitle(v) => assign(&mut self.subtitle, v),
            CausesUpdate::ToggleShowProgress => flip(&mut self.show_progress),
            CausesUpdate::Causes(op) => ListEditor::new(&mut self.causes).apply(op),
        }
    }

    fn normalize(&mut self) {
        for cause in &mut self.causes {
            cause.raised = cause.raised.max(0.0);
            cause.goal = cause.goal.max(0.0);
        }
    }

    fn fields() -> &'static [FieldSpec] {
        FIELDS
    }

    fn lists() -> &'static [ListSpec] {
        LISTS
    }
}
