use serde::{Deserialize, Serialize};

use crate::section::field::{FieldKind, FieldSpec, ItemField, ListSpec, NumberInput, field, item};
use crate::section::list::{ListEditor, ListItem, ListOp, StringListOp, apply_strings};
use crate::section::{Outcome, Section, SectionKey};
use crate::sections::{assign, flip};

/// 志愿者招募与报名记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolunteerSection {
    pub title: String,
    pub description: String,
    pub accepting: bool,
    pub signups: Vec<Volunteer>,
}

impl Default for VolunteerSection {
    fn default() -> Self {
        Self {
            title: "Volunteer With Us".into(),
            description: "Give your time and skills to communities that need them.".into(),
            accepting: true,
            signups: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolunteerStatus {
    #[default]
    Pending,
    Approved,
    Active,
    Inactive,
}

impl VolunteerStatus {
    pub const ALL: [VolunteerStatus; 4] = [
        VolunteerStatus::Pending,
        VolunteerStatus::Approved,
        VolunteerStatus::Active,
        VolunteerStatus::Inactive,
    ];

    pub const OPTIONS: &'static [(&'static str, &'static str)] = &[
        ("pending", "待审核"),
        ("approved", "已通过"),
        ("active", "活跃"),
        ("inactive", "不活跃"),
    ];
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Volunteer {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub skills: Vec<String>,
    pub availability: String,
    pub status: VolunteerStatus,
    pub joined: String,
    pub hours: u32,
    pub notes: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum VolunteerPatch {
    Name(String),
    Email(String),
    Phone(String),
    Skills(StringListOp),
    Availability(String),
    Status(VolunteerStatus),
    Hours(NumberInput),
    Notes(String),
}

impl ListItem for Volunteer {
    type Patch = VolunteerPatch;

    item_id!();

    fn placeholder() -> Self {
        Self {
            name: "New Volunteer".into(),
            availability: "Weekends".into(),
            joined: chrono::Utc::now().format("%Y-%m-%d").to_string(),
            ..Self::default()
        }
    }

    fn patch(&mut self, patch: VolunteerPatch) {
        match patch {
            VolunteerPatch::Name(v) => self.name = v,
            VolunteerPatch::Email(v) => self.email = v.trim().to_string(),
            VolunteerPatch::Phone(v) => self.phone = v,
            VolunteerPatch::Skills(op) => {
                apply_strings(&mut self.skills, op);
            }
            VolunteerPatch::Availability(v) => self.availability = v,
            VolunteerPatch::Status(v) => self.status = v,
            VolunteerPatch::Hours(v) => self.hours = v.as_count().min(u32::MAX as u64) as u32,
            VolunteerPatch::Notes(v) => self.notes = v,
        }
    }
}

#[derive(Deserialize)]
#[serde(tag = "op", content = "args", rename_all = "snake_case")]
pub enum VolunteerUpdate {
    SetTitle(String),
    SetDescription(String),
    ToggleAccepting,
    Signups(ListOp<Volunteer>),
}

const FIELDS: &[FieldSpec] = &[
    field("set_title", "title", "标题", FieldKind::Text),
    field("set_description", "description", "描述", FieldKind::TextArea),
    field("toggle_accepting", "accepting", "开放报名", FieldKind::Toggle),
];

const SIGNUP_FIELDS: &[ItemField] = &[
    item("name", "姓名", FieldKind::Text),
    item("email", "邮箱", FieldKind::Text),
    item("phone", "电话", FieldKind::Text),
    item("skills", "技能", FieldKind::Tags),
    item("availability", "可服务时间", FieldKind::Text),
    item("status", "状态", FieldKind::Select(VolunteerStatus::OPTIONS)),
    item("hours", "服务时长（小时）", FieldKind::Number { min: 0, max: 100_000 }),
    item("notes", "备注", FieldKind::TextArea),
];

const LISTS: &[ListSpec] = &[ListSpec {
    op: "signups",
    label: "报名记录",
    min_items: 0,
    fields: SIGNUP_FIELDS,
}];

impl Section for VolunteerSection {
    const KEY: SectionKey = SectionKey::Volunteers;
    type Update = VolunteerUpdate;

    fn apply(&mut self, update: VolunteerUpdate) -> Outcome {
        match update {
            VolunteerUpdate::SetTitle(v) => assign(&mut self.title, v),
            VolunteerUpdate::SetDescription(v) => assign(&mut self.description, v),
            VolunteerUpdate::ToggleAccepting => flip(&mut self.accepting),
            VolunteerUpdate::Signups(op) => ListEditor::new(&mut self.signups).apply(op),
        }
    }

    fn fields() -> &'static [FieldSpec] {
        FIELDS
    }

    fn lists() -> &'static [ListSpec] {
        LISTS
    }
}

impl VolunteerSection {
    /// 各状态人数，顺序与 `VolunteerStatus::ALL` 一致
    pub fn status_counts(&self) -> Vec<(VolunteerStatus, usize)> {
        VolunteerStatus::ALL
            .into_iter()
            .map(|status| {
                let count = self.signups.iter().filter(|v| v.status == status).count();
                (status, count)
            })
            .collect()
    }

    pub fn total_hours(&self) -> u64 {
        self.signups.iter().map(|v| v.hours as u64).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_counts_and_hours() {
        let mut section = VolunteerSection::default();
        for _ in 0..3 {
            section.apply(VolunteerUpdate::Signups(ListOp::Add { item: None }));
        }
        let first = section.signups[0].id.clone();
        section.apply(VolunteerUpdate::Signups(ListOp::Patch {
            id: first.clone(),
            patch: VolunteerPatch::Status(VolunteerStatus::Active),
        }));
        section.apply(VolunteerUpdate::Signups(ListOp::Patch {
            id: first,
            patch: VolunteerPatch::Hours(NumberInput::Text("12h".into())),
        }));

        let counts = section.status_counts();
        assert_eq!(counts[0], (VolunteerStatus::Pending, 2));
        assert_eq!(counts[2], (VolunteerStatus::Active, 1));
        assert_eq!(section.total_hours(), 12);
    }

    #[test]
    fn skills_dedupe() {
        let mut volunteer = Volunteer::placeholder();
        volunteer.patch(VolunteerPatch::Skills(StringListOp::Add { value: "First aid".into() }));
        volunteer.patch(VolunteerPatch::Skills(StringListOp::Add { value: "first AID".into() }));
        assert_eq!(volunteer.skills, vec!["First aid".to_string()]);
    }

    #[test]
    fn unknown_signup_is_ignored() {
        let mut section = VolunteerSection::default();
        let outcome = section.apply(VolunteerUpdate::Signups(ListOp::Remove { id: "nobody".into() }));
        assert_eq!(outcome, Outcome::Ignored);
    }
}
