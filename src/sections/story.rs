use serde::{Deserialize, Serialize};

use crate::section::field::{FieldKind, FieldSpec, ItemField, ListSpec, NumberInput, field, item};
use crate::section::list::{Flag, ListEditor, ListItem, ListOp};
use crate::section::{Outcome, Section, SectionKey};
use crate::sections::{assign, flip};

/// 机构故事：段落（Markdown）、成就、团队
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorySection {
    pub heading: String,
    pub subheading: String,
    pub image: String,
    pub founded_year: u32,
    pub mission: String,
    pub vision: String,
    pub paragraphs: Vec<Paragraph>,
    pub achievements: Vec<Achievement>,
    pub team: Vec<TeamMember>,
    pub is_visible: bool,
}

impl Default for StorySection {
    fn default() -> Self {
        Self {
            heading: "Our Story".into(),
            subheading: "From a small community project to a global movement".into(),
            image: String::new(),
            founded_year: 2010,
            mission: "To empower communities through sustainable development.".into(),
            vision: "A world where every person has the opportunity to thrive.".into(),
            paragraphs: vec![
                Paragraph {
                    id: "origin".into(),
                    text: "We started with **five volunteers** and a borrowed truck, delivering supplies to families after the floods.".into(),
                },
                Paragraph {
                    id: "today".into(),
                    text: "Today our teams work across twelve countries on education, health and clean water.".into(),
                },
            ],
            achievements: vec![
                Achievement::new("families", "Families Supported", "25,000+"),
                Achievement::new("schools", "Schools Built", "48"),
            ],
            team: Vec::new(),
            is_visible: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Paragraph {
    pub id: String,
    /// Markdown
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum ParagraphPatch {
    Text(String),
}

impl ListItem for Paragraph {
    type Patch = ParagraphPatch;

    item_id!();

    fn placeholder() -> Self {
        Self {
            id: String::new(),
            text: "New paragraph".into(),
        }
    }

    fn patch(&mut self, patch: ParagraphPatch) {
        match patch {
            ParagraphPatch::Text(v) => self.text = v,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Achievement {
    pub id: String,
    pub title: String,
    /// 展示文本，如 "25,000+"
    pub value: String,
    pub description: String,
    pub icon: String,
}

impl Achievement {
    fn new(id: &str, title: &str, value: &str) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            value: value.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum AchievementPatch {
    Title(String),
    Value(String),
    Description(String),
    Icon(String),
}

impl ListItem for Achievement {
    type Patch = AchievementPatch;

    item_id!();

    fn placeholder() -> Self {
        Self::new("", "New Achievement", "0")
    }

    fn patch(&mut self, patch: AchievementPatch) {
        match patch {
            AchievementPatch::Title(v) => self.title = v,
            AchievementPatch::Value(v) => self.value = v,
            AchievementPatch::Description(v) => self.description = v,
            AchievementPatch::Icon(v) => self.icon = v,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialPlatform {
    Facebook,
    Twitter,
    Instagram,
    Linkedin,
    Youtube,
    #[default]
    Website,
}

impl SocialPlatform {
    pub const OPTIONS: &'static [(&'static str, &'static str)] = &[
        ("facebook", "Facebook"),
        ("twitter", "Twitter / X"),
        ("instagram", "Instagram"),
        ("linkedin", "LinkedIn"),
        ("youtube", "YouTube"),
        ("website", "网站"),
    ];
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialLink {
    pub id: String,
    pub platform: SocialPlatform,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum SocialPatch {
    Platform(SocialPlatform),
    Url(String),
}

impl ListItem for SocialLink {
    type Patch = SocialPatch;

    item_id!();

    fn placeholder() -> Self {
        Self::default()
    }

    fn patch(&mut self, patch: SocialPatch) {
        match patch {
            SocialPatch::Platform(v) => self.platform = v,
            SocialPatch::Url(v) => self.url = v,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamMember {
    pub id: String,
    pub name: String,
    pub role: String,
    pub photo: String,
    pub bio: String,
    pub featured: bool,
    pub social: Vec<SocialLink>,
}

/// 团队成员的 patch；`social` 嵌套一层列表操作
#[derive(Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum TeamPatch {
    Name(String),
    Role(String),
    Photo(String),
    Bio(String),
    Social(ListOp<SocialLink>),
}

impl ListItem for TeamMember {
    type Patch = TeamPatch;

    item_id!();

    fn placeholder() -> Self {
        Self {
            name: "New Member".into(),
            role: "Volunteer".into(),
            ..Self::default()
        }
    }

    fn patch(&mut self, patch: TeamPatch) {
        match patch {
            TeamPatch::Name(v) => self.name = v,
            TeamPatch::Role(v) => self.role = v,
            TeamPatch::Photo(v) => self.photo = v,
            TeamPatch::Bio(v) => self.bio = v,
            TeamPatch::Social(op) => {
                let outcome = ListEditor::new(&mut self.social).apply(op);
                tracing::debug!("成员 {} 社交链接：{outcome:?}", self.id);
            }
        }
    }

    fn toggle(&mut self, flag: Flag) -> bool {
        match flag {
            Flag::Featured => {
                self.featured = !self.featured;
                true
            }
            _ => false,
        }
    }
}

#[derive(Deserialize)]
#[serde(tag = "op", content = "args", rename_all = "snake_case")]
pub enum StoryUpdate {
    SetHeading(String),
    SetSubheading(String),
    SetImage(String),
    SetFoundedYear(NumberInput),
    SetMission(String),
    SetVision(String),
    ToggleVisible,
    Paragraphs(ListOp<Paragraph>),
    Achievements(ListOp<Achievement>),
    Team(ListOp<TeamMember>),
}

const FIELDS: &[FieldSpec] = &[
    field("set_heading", "heading", "标题", FieldKind::Text),
    field("set_subheading", "subheading", "副标题", FieldKind::Text),
    field("set_image", "image", "配图", FieldKind::Image),
    field("set_founded_year", "founded_year", "成立年份", FieldKind::Number { min: 1800, max: 2100 }),
    field("set_mission", "mission", "使命", FieldKind::TextArea),
    field("set_vision", "vision", "愿景", FieldKind::TextArea),
    field("toggle_visible", "is_visible", "显示该分区", FieldKind::Toggle),
];

const TEAM_FIELDS: &[ItemField] = &[
    item("name", "姓名", FieldKind::Text),
    item("role", "职务", FieldKind::Text),
    item("photo", "照片", FieldKind::Image),
    item("bio", "简介", FieldKind::TextArea),
];

const LISTS: &[ListSpec] = &[
    ListSpec {
        op: "paragraphs",
        label: "段落（支持 Markdown）",
        min_items: 1,
        fields: &[item("text", "内容", FieldKind::TextArea)],
    },
    ListSpec {
        op: "achievements",
        label: "成就",
        min_items: 0,
        fields: &[
            item("title", "名称", FieldKind::Text),
            item("value", "数值", FieldKind::Text),
            item("description", "说明", FieldKind::Text),
            item("icon", "图标", FieldKind::Text),
        ],
    },
    ListSpec {
        op: "team",
        label: "团队成员",
        min_items: 0,
        fields: TEAM_FIELDS,
    },
];

impl Section for StorySection {
    const KEY: SectionKey = SectionKey::Story;
    type Update = StoryUpdate;

    fn apply(&mut self, update: StoryUpdate) -> Outcome {
        match update {
            StoryUpdate::SetHeading(v) => assign(&mut self.heading, v),
            StoryUpdate::SetSubheading(v) => assign(&mut self.subheading, v),
            StoryUpdate::SetImage(v) => assign(&mut self.image, v),
            StoryUpdate::SetFoundedYear(v) => {
                assign(&mut self.founded_year, v.as_count().min(u32::MAX as u64) as u32)
            }
            StoryUpdate::SetMission(v) => assign(&mut self.mission, v),
            StoryUpdate::SetVision(v) => assign(&mut self.vision, v),
            StoryUpdate::ToggleVisible => flip(&mut self.is_visible),
            StoryUpdate::Paragraphs(op) => ListEditor::new(&mut self.paragraphs).with_min(1).apply(op),
            StoryUpdate::Achievements(op) => ListEditor::new(&mut self.achievements).apply(op),
            StoryUpdate::Team(op) => ListEditor::new(&mut self.team).apply(op),
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
    fn last_paragraph_is_kept() {
        let mut story = StorySection::default();
        assert_eq!(
            story.apply(StoryUpdate::Paragraphs(ListOp::Remove { id: "origin".into() })),
            Outcome::Applied
        );
        assert!(matches!(
            story.apply(StoryUpdate::Paragraphs(ListOp::Remove { id: "today".into() })),
            Outcome::Refused(_)
        ));
        assert_eq!(story.paragraphs.len(), 1);
    }

    #[test]
    fn team_member_social_links_nest() {
        let mut story = StorySection::default();
        story.apply(StoryUpdate::Team(ListOp::Add { item: None }));
        let member = story.team[0].id.clone();

        let update: StoryUpdate = serde_json::from_value(json!({
            "op": "team",
            "args": {
                "action": "patch",
                "id": member,
                "patch": {
                    "field": "social",
                    "value": { "action": "add", "item": { "platform": "linkedin", "url": "https://linkedin.com/in/amina" } }
                }
            }
        }))
        .unwrap();
        assert_eq!(story.apply(update), Outcome::Applied);

        let social = &story.team[0].social;
        assert_eq!(social.len(), 1);
        assert_eq!(social[0].platform, SocialPlatform::Linkedin);
        assert!(!social[0].id.is_empty());
    }

    #[test]
    fn founded_year_parses_text() {
        let mut story = StorySection::default();
        story.apply(StoryUpdate::SetFoundedYear(NumberInput::Text("1998".into())));
        assert_eq!(story.founded_year, 1998);
    }
}
