use serde::{Deserialize, Serialize};

use crate::section::field::{FieldKind, FieldSpec, ItemField, ListSpec, NumberInput, field, item};
use crate::section::list::{Flag, ListEditor, ListItem, ListOp};
use crate::section::{Outcome, Section, SectionKey};
use crate::sections::common::ThemeColor;
use crate::sections::{assign, flip};

/// 影响力数据：统计数字 + 目标进度
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactSection {
    pub title: String,
    pub subtitle: String,
    pub background_color: ThemeColor,
    pub stats: Vec<Stat>,
    pub goals: Vec<Goal>,
    pub is_visible: bool,
}

impl Default for ImpactSection {
    fn default() -> Self {
        Self {
            title: "Our Global Impact".into(),
            subtitle: "Measurable change in the communities we serve".into(),
            background_color: ThemeColor::Light,
            stats: vec![
                Stat::new("people-helped", "People Helped", 25_000, "+", 1),
                Stat::new("countries", "Countries", 12, "", 2),
                Stat::new("volunteers", "Volunteers", 1_500, "+", 3),
                Stat::new("projects", "Projects Completed", 340, "", 4),
            ],
            goals: vec![Goal {
                id: "clean-water".into(),
                title: "Clean Water Wells".into(),
                description: "Fund 100 new wells in rural villages".into(),
                current: 64.0,
                target: 100.0,
                unit: "wells".into(),
                deadline: "2026-12-31".into(),
                color: ThemeColor::Success,
            }],
            is_visible: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stat {
    pub id: String,
    pub label: String,
    pub value: u64,
    pub suffix: String,
    pub icon: String,
    pub order: u32,
    pub is_visible: bool,
}

impl Stat {
    fn new(id: &str, label: &str, value: u64, suffix: &str, order: u32) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            value,
            suffix: suffix.into(),
            icon: String::new(),
            order,
            is_visible: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum StatPatch {
    Label(String),
    Value(NumberInput),
    Suffix(String),
    Icon(String),
}

impl ListItem for Stat {
    type Patch = StatPatch;

    item_id!();

    fn placeholder() -> Self {
        Self::new("", "New Metric", 0, "", 0)
    }

    fn patch(&mut self, patch: StatPatch) {
        match patch {
            StatPatch::Label(v) => self.label = v,
            StatPatch::Value(v) => self.value = v.as_count(),
            StatPatch::Suffix(v) => self.suffix = v,
            StatPatch::Icon(v) => self.icon = v,
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

    fn order(&self) -> Option<u32> {
        Some(self.order)
    }

    fn set_order(&mut self, order: u32) {
        self.order = order;
    }
}

/// 带进度条的目标
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Goal {
    pub id: String,
    pub title: String,
    pub description: String,
    pub current: f64,
    pub target: f64,
    pub unit: String,
    pub deadline: String,
    pub color: ThemeColor,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum GoalPatch {
    Title(String),
    Description(String),
    Current(NumberInput),
    Target(NumberInput),
    Unit(String),
    Deadline(String),
    Color(ThemeColor),
}

impl ListItem for Goal {
    type Patch = GoalPatch;

    item_id!();

    fn placeholder() -> Self {
        Self {
            title: "New Goal".into(),
            target: 100.0,
            ..Self::default()
        }
    }

    fn patch(&mut self, patch: GoalPatch) {
        match patch {
            GoalPatch::Title(v) => self.title = v,
            GoalPatch::Description(v) => self.description = v,
            GoalPatch::Current(v) => self.current = v.as_float().max(0.0),
            GoalPatch::Target(v) => self.target = v.as_float().max(0.0),
            GoalPatch::Unit(v) => self.unit = v,
            GoalPatch::Deadline(v) => self.deadline = v,
            GoalPatch::Color(v) => self.color = v,
        }
    }
}

#[derive(Deserialize)]
#[serde(tag = "op", content = "args", rename_all = "snake_case")]
pub enum ImpactUpdate {
    SetTitle(String),
    SetSubtitle(String),
    SetBackgroundColor(ThemeColor),
    ToggleVisible,
    Stats(ListOp<Stat>),
    Goals(ListOp<Goal>),
}

const FIELDS: &[FieldSpec] = &[
    field("set_title", "title", "标题", FieldKind::Text),
    field("set_subtitle", "subtitle", "副标题", FieldKind::Text),
    field("set_background_color", "background_color", "背景色", FieldKind::Select(ThemeColor::OPTIONS)),
    field("toggle_visible", "is_visible", "显示该分区", FieldKind::Toggle),
];

const STAT_FIELDS: &[ItemField] = &[
    item("label", "名称", FieldKind::Text),
    item("value", "数值", FieldKind::Number { min: 0, max: i64::MAX }),
    item("suffix", "后缀", FieldKind::Text),
    item("icon", "图标", FieldKind::Text),
];

const GOAL_FIELDS: &[ItemField] = &[
    item("title", "目标", FieldKind::Text),
    item("description", "说明", FieldKind::TextArea),
    item("current", "当前", FieldKind::Number { min: 0, max: i64::MAX }),
    item("target", "目标值", FieldKind::Number { min: 0, max: i64::MAX }),
    item("unit", "单位", FieldKind::Text),
    item("deadline", "截止日期", FieldKind::Date),
    item("color", "进度条颜色", FieldKind::Select(ThemeColor::OPTIONS)),
];

const LISTS: &[ListSpec] = &[
    ListSpec {
        op: "stats",
        label: "统计数字",
        min_items: 0,
        fields: STAT_FIELDS,
    },
    ListSpec {
        op: "goals",
        label: "目标",
        min_items: 0,
        fields: GOAL_FIELDS,
    },
];

impl Section for ImpactSection {
    const KEY: SectionKey = SectionKey::Impact;
    type Update = ImpactUpdate;

    fn apply(&mut self, update: ImpactUpdate) -> Outcome {
        match update {
            ImpactUpdate::SetTitle(v) => assign(&mut self.title, v),
            ImpactUpdate::SetSubtitle(v) => assign(&mut self.subtitle, v),
            ImpactUpdate::SetBackgroundColor(v) => assign(&mut self.background_color, v),
            ImpactUpdate::ToggleVisible => flip(&mut self.is_visible),
            ImpactUpdate::Stats(op) => ListEditor::new(&mut self.stats).apply(op),
            ImpactUpdate::Goals(op) => ListEditor::new(&mut self.goals).apply(op),
        }
    }

    fn normalize(&mut self) {
        for goal in &mut self.goals {
            goal.current = goal.current.max(0.0);
            goal.target = goal.target.max(0.0);
        }
    }

    fn fields() -> &'static [FieldSpec] {
        FIELDS
    }

    fn lists() -> &'static [ListSpec] {
        LISTS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_metric_with_garbage_value_falls_back_to_zero() {
        let mut impact = ImpactSection::default();
        impact.apply(ImpactUpdate::Stats(ListOp::Add { item: None }));
        let added = impact.stats.last().unwrap().clone();
        assert_eq!(added.label, "New Metric");
        assert_eq!(added.value, 0);
        assert_eq!(added.order, 5);

        let update: ImpactUpdate = serde_json::from_value(json!({
            "op": "stats",
            "args": {
                "action": "patch",
                "id": added.id,
                "patch": { "field": "value", "value": "abc" }
            }
        }))
        .unwrap();
        assert_eq!(impact.apply(update), Outcome::Applied);
        assert_eq!(impact.stats.last().unwrap().value, 0);
    }

    #[test]
    fn moving_stats_swaps_order() {
        let mut impact = ImpactSection::default();
        impact.apply(ImpactUpdate::Stats(ListOp::Move {
            id: "volunteers".into(),
            direction: crate::section::list::Direction::Up,
        }));
        let mut stats = impact.stats.clone();
        stats.sort_by_key(|s| s.order);
        let ids: Vec<&str> = stats.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["people-helped", "volunteers", "countries", "projects"]);
    }

    #[test]
    fn hidden_stats_are_not_public() {
        let mut impact = ImpactSection::default();
        impact.apply(ImpactUpdate::Stats(ListOp::Toggle {
            id: "countries".into(),
            flag: Flag::Visible,
        }));
        assert_eq!(impact.stats.iter().filter(|s| s.is_visible).count(), 3);
    }
}
