//! 学习资源门户：电子书、视频、论坛话题、工作坊、导师

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::section::field::{FieldKind, FieldSpec, ItemField, ListSpec, NumberInput, field, item};
use crate::section::list::{Flag, ListEditor, ListItem, ListOp};
use crate::section::{Outcome, Section, SectionKey};
use crate::sections::assign;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourcesSection {
    pub title: String,
    pub subtitle: String,
    pub ebooks: Vec<Ebook>,
    pub videos: Vec<Video>,
    pub forums: Vec<ForumTopic>,
    pub workshops: Vec<Workshop>,
    pub mentors: Vec<Mentor>,
}

impl Default for ResourcesSection {
    fn default() -> Self {
        Self {
            title: "Learning Resources".into(),
            subtitle: "Free guides, talks and mentoring for changemakers".into(),
            ebooks: vec![Ebook {
                id: "field-guide".into(),
                title: "Community Development Field Guide".into(),
                author: "Program Team".into(),
                description: "Practical steps for running a local development project.".into(),
                category: "Guides".into(),
                pages: 86,
                published: "2025-03-01".into(),
                available: true,
                ..Ebook::default()
            }],
            videos: Vec::new(),
            forums: Vec::new(),
            workshops: vec![Workshop {
                id: "grant-writing".into(),
                title: "Grant Writing Basics".into(),
                description: "How to write proposals that get funded.".into(),
                category: "Fundraising".into(),
                instructor: "Development Office".into(),
                date: "2026-11-20".into(),
                location: "Online".into(),
                capacity: 40,
                status: WorkshopStatus::Upcoming,
                ..Workshop::default()
            }],
            mentors: Vec::new(),
        }
    }
}

// ── 列表项 ──

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ebook {
    pub id: String,
    pub title: String,
    pub author: String,
    pub description: String,
    pub category: String,
    pub cover: String,
    pub file_url: String,
    pub pages: u32,
    pub downloads: u64,
    pub published: String,
    pub featured: bool,
    pub available: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum EbookPatch {
    Title(String),
    Author(String),
    Description(String),
    Category(String),
    Cover(String),
    FileUrl(String),
    Pages(NumberInput),
    Published(String),
}

impl ListItem for Ebook {
    type Patch = EbookPatch;

    item_id!();

    fn placeholder() -> Self {
        Self {
            title: "New E-book".into(),
            published: today(),
            available: true,
            ..Self::default()
        }
    }

    fn patch(&mut self, patch: EbookPatch) {
        match patch {
            EbookPatch::Title(v) => self.title = v,
            EbookPatch::Author(v) => self.author = v,
            EbookPatch::Description(v) => self.description = v,
            EbookPatch::Category(v) => self.category = v,
            EbookPatch::Cover(v) => self.cover = v,
            EbookPatch::FileUrl(v) => self.file_url = v,
            EbookPatch::Pages(v) => self.pages = to_u32(v.as_count()),
            EbookPatch::Published(v) => self.published = v,
        }
    }

    fn toggle(&mut self, flag: Flag) -> bool {
        match flag {
            Flag::Featured => self.featured = !self.featured,
            Flag::Available => self.available = !self.available,
            Flag::Visible => return false,
        }
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Video {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub url: String,
    pub thumbnail: String,
    /// 展示文本，如 "12:30"
    pub duration: String,
    pub views: u64,
    pub published: String,
    pub featured: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum VideoPatch {
    Title(String),
    Description(String),
    Category(String),
    Url(String),
    Thumbnail(String),
    Duration(String),
    Published(String),
}

impl ListItem for Video {
    type Patch = VideoPatch;

    item_id!();

    fn placeholder() -> Self {
        Self {
            title: "New Video".into(),
            published: today(),
            ..Self::default()
        }
    }

    fn patch(&mut self, patch: VideoPatch) {
        match patch {
            VideoPatch::Title(v) => self.title = v,
            VideoPatch::Description(v) => self.description = v,
            VideoPatch::Category(v) => self.category = v,
            VideoPatch::Url(v) => self.url = v,
            VideoPatch::Thumbnail(v) => self.thumbnail = v,
            VideoPatch::Duration(v) => self.duration = v,
            VideoPatch::Published(v) => self.published = v,
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

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForumTopic {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub author: String,
    pub replies: u64,
    pub views: u64,
    pub last_activity: String,
    /// 置顶
    pub featured: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum ForumPatch {
    Title(String),
    Description(String),
    Category(String),
    Author(String),
    LastActivity(String),
}

impl ListItem for ForumTopic {
    type Patch = ForumPatch;

    item_id!();

    fn placeholder() -> Self {
        Self {
            title: "New Topic".into(),
            last_activity: today(),
            ..Self::default()
        }
    }

    fn patch(&mut self, patch: ForumPatch) {
        match patch {
            ForumPatch::Title(v) => self.title = v,
            ForumPatch::Description(v) => self.description = v,
            ForumPatch::Category(v) => self.category = v,
            ForumPatch::Author(v) => self.author = v,
            ForumPatch::LastActivity(v) => self.last_activity = v,
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

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkshopStatus {
    #[default]
    Upcoming,
    Ongoing,
    Completed,
    Cancelled,
}

impl WorkshopStatus {
    pub const OPTIONS: &'static [(&'static str, &'static str)] = &[
        ("upcoming", "即将开始"),
        ("ongoing", "进行中"),
        ("completed", "已结束"),
        ("cancelled", "已取消"),
    ];
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Workshop {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub instructor: String,
    pub date: String,
    pub location: String,
    pub capacity: u32,
    pub enrolled: u32,
    pub status: WorkshopStatus,
    pub featured: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum WorkshopPatch {
    Title(String),
    Description(String),
    Category(String),
    Instructor(String),
    Date(String),
    Location(String),
    Capacity(NumberInput),
    Enrolled(NumberInput),
    Status(WorkshopStatus),
}

impl ListItem for Workshop {
    type Patch = WorkshopPatch;

    item_id!();

    fn placeholder() -> Self {
        Self {
            title: "New Workshop".into(),
            date: today(),
            location: "Online".into(),
            capacity: 20,
            ..Self::default()
        }
    }

    fn patch(&mut self, patch: WorkshopPatch) {
        match patch {
            WorkshopPatch::Title(v) => self.title = v,
            WorkshopPatch::Description(v) => self.description = v,
            WorkshopPatch::Category(v) => self.category = v,
            WorkshopPatch::Instructor(v) => self.instructor = v,
            WorkshopPatch::Date(v) => self.date = v,
            WorkshopPatch::Location(v) => self.location = v,
            WorkshopPatch::Capacity(v) => self.capacity = to_u32(v.as_count()),
            WorkshopPatch::Enrolled(v) => self.enrolled = to_u32(v.as_count()),
            WorkshopPatch::Status(v) => self.status = v,
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

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Mentor {
    pub id: String,
    pub name: String,
    pub expertise: String,
    pub bio: String,
    pub photo: String,
    /// 0-5
    pub rating: f64,
    pub sessions: u64,
    pub available: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum MentorPatch {
    Name(String),
    Expertise(String),
    Bio(String),
    Photo(String),
    Rating(NumberInput),
    Sessions(NumberInput),
}

impl ListItem for Mentor {
    type Patch = MentorPatch;

    item_id!();

    fn placeholder() -> Self {
        Self {
            name: "New Mentor".into(),
            available: true,
            ..Self::default()
        }
    }

    fn patch(&mut self, patch: MentorPatch) {
        match patch {
            MentorPatch::Name(v) => self.name = v,
            MentorPatch::Expertise(v) => self.expertise = v,
            MentorPatch::Bio(v) => self.bio = v,
            MentorPatch::Photo(v) => self.photo = v,
            MentorPatch::Rating(v) => self.rating = v.as_float().clamp(0.0, 5.0),
            MentorPatch::Sessions(v) => self.sessions = v.as_count(),
        }
    }

    fn toggle(&mut self, flag: Flag) -> bool {
        match flag {
            Flag::Available => {
                self.available = !self.available;
                true
            }
            _ => false,
        }
    }
}

fn today() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

fn to_u32(value: u64) -> u32 {
    value.min(u32::MAX as u64) as u32
}

// ── 分区 ──

#[derive(Deserialize)]
#[serde(tag = "op", content = "args", rename_all = "snake_case")]
pub enum ResourcesUpdate {
    SetTitle(String),
    SetSubtitle(String),
    Ebooks(ListOp<Ebook>),
    Videos(ListOp<Video>),
    Forums(ListOp<ForumTopic>),
    Workshops(ListOp<Workshop>),
    Mentors(ListOp<Mentor>),
}

const FIELDS: &[FieldSpec] = &[
    field("set_title", "title", "标题", FieldKind::Text),
    field("set_subtitle", "subtitle", "副标题", FieldKind::Text),
];

const EBOOK_FIELDS: &[ItemField] = &[
    item("title", "书名", FieldKind::Text),
    item("author", "作者", FieldKind::Text),
    item("description", "简介", FieldKind::TextArea),
    item("category", "分类", FieldKind::Text),
    item("cover", "封面", FieldKind::Image),
    item("file_url", "文件", FieldKind::Image),
    item("pages", "页数", FieldKind::Number { min: 0, max: 100_000 }),
    item("published", "发布日期", FieldKind::Date),
];

const VIDEO_FIELDS: &[ItemField] = &[
    item("title", "标题", FieldKind::Text),
    item("description", "简介", FieldKind::TextArea),
    item("category", "分类", FieldKind::Text),
    item("url", "视频地址", FieldKind::Image),
    item("thumbnail", "缩略图", FieldKind::Image),
    item("duration", "时长", FieldKind::Text),
    item("published", "发布日期", FieldKind::Date),
];

const FORUM_FIELDS: &[ItemField] = &[
    item("title", "话题", FieldKind::Text),
    item("description", "摘要", FieldKind::TextArea),
    item("category", "分类", FieldKind::Text),
    item("author", "发起人", FieldKind::Text),
    item("last_activity", "最后活动", FieldKind::Date),
];

const WORKSHOP_FIELDS: &[ItemField] = &[
    item("title", "名称", FieldKind::Text),
    item("description", "简介", FieldKind::TextArea),
    item("category", "分类", FieldKind::Text),
    item("instructor", "讲师", FieldKind::Text),
    item("date", "日期", FieldKind::Date),
    item("location", "地点", FieldKind::Text),
    item("capacity", "名额", FieldKind::Number { min: 0, max: 100_000 }),
    item("enrolled", "已报名", FieldKind::Number { min: 0, max: 100_000 }),
    item("status", "状态", FieldKind::Select(WorkshopStatus::OPTIONS)),
];

const MENTOR_FIELDS: &[ItemField] = &[
    item("name", "姓名", FieldKind::Text),
    item("expertise", "擅长领域", FieldKind::Text),
    item("bio", "简介", FieldKind::TextArea),
    item("photo", "照片", FieldKind::Image),
    item("rating", "评分", FieldKind::Number { min: 0, max: 5 }),
    item("sessions", "辅导次数", FieldKind::Number { min: 0, max: i64::MAX }),
];

const LISTS: &[ListSpec] = &[
    ListSpec { op: "ebooks", label: "电子书", min_items: 0, fields: EBOOK_FIELDS },
    ListSpec { op: "videos", label: "视频", min_items: 0, fields: VIDEO_FIELDS },
    ListSpec { op: "forums", label: "论坛话题", min_items: 0, fields: FORUM_FIELDS },
    ListSpec { op: "workshops", label: "工作坊", min_items: 0, fields: WORKSHOP_FIELDS },
    ListSpec { op: "mentors", label: "导师", min_items: 0, fields: MENTOR_FIELDS },
];

impl Section for ResourcesSection {
    const KEY: SectionKey = SectionKey::Resources;
    type Update = ResourcesUpdate;

    fn apply(&mut self, update: ResourcesUpdate) -> Outcome {
        match update {
            ResourcesUpdate::SetTitle(v) => assign(&mut self.title, v),
            ResourcesUpdate::SetSubtitle(v) => assign(&mut self.subtitle, v),
            ResourcesUpdate::Ebooks(op) => ListEditor::new(&mut self.ebooks).apply(op),
            ResourcesUpdate::Videos(op) => ListEditor::new(&mut self.videos).apply(op),
            ResourcesUpdate::Forums(op) => ListEditor::new(&mut self.forums).apply(op),
            ResourcesUpdate::Workshops(op) => ListEditor::new(&mut self.workshops).apply(op),
            ResourcesUpdate::Mentors(op) => ListEditor::new(&mut self.mentors).apply(op),
        }
    }

    fn normalize(&mut self) {
        for mentor in &mut self.mentors {
            mentor.rating = if mentor.rating.is_finite() {
                mentor.rating.clamp(0.0, 5.0)
            } else {
                0.0
            };
        }
    }

    fn fields() -> &'static [FieldSpec] {
        FIELDS
    }

    fn lists() -> &'static [ListSpec] {
        LISTS
    }
}

// ── 门户搜索与排序 ──

/// 门户标签页
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Ebooks,
    Videos,
    Forums,
    Workshops,
    Mentorship,
}

impl Tab {
    pub const ALL: [Tab; 5] = [Tab::Ebooks, Tab::Videos, Tab::Forums, Tab::Workshops, Tab::Mentorship];

    pub fn as_str(self) -> &'static str {
        match self {
            Tab::Ebooks => "ebooks",
            Tab::Videos => "videos",
            Tab::Forums => "forums",
            Tab::Workshops => "workshops",
            Tab::Mentorship => "mentorship",
        }
    }

    pub fn from_name(name: &str) -> Option<Tab> {
        Tab::ALL.into_iter().find(|t| t.as_str() == name.trim())
    }

    pub fn label(self) -> &'static str {
        match self {
            Tab::Ebooks => "E-books",
            Tab::Videos => "Videos",
            Tab::Forums => "Forums",
            Tab::Workshops => "Workshops",
            Tab::Mentorship => "Mentorship",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Title,
    Newest,
    Popular,
}

impl SortOrder {
    pub fn from_name(name: &str) -> Option<SortOrder> {
        match name.trim() {
            "title" => Some(SortOrder::Title),
            "newest" => Some(SortOrder::Newest),
            "popular" => Some(SortOrder::Popular),
            _ => None,
        }
    }
}

/// 可被门户搜索与排序的资源
pub trait Searchable {
    fn title(&self) -> &str;
    /// 参与搜索的文本（标题之外）
    fn keywords(&self) -> [&str; 2];
    /// ISO 日期，字符串比较即时间顺序
    fn date(&self) -> &str;
    fn popularity(&self) -> f64;
    fn featured(&self) -> bool {
        false
    }
}

impl Searchable for Ebook {
    fn title(&self) -> &str {
        &self.title
    }
    fn keywords(&self) -> [&str; 2] {
        [&self.description, &self.category]
    }
    fn date(&self) -> &str {
        &self.published
    }
    fn popularity(&self) -> f64 {
        self.downloads as f64
    }
    fn featured(&self) -> bool {
        self.featured
    }
}

impl Searchable for Video {
    fn title(&self) -> &str {
        &self.title
    }
    fn keywords(&self) -> [&str; 2] {
        [&self.description, &self.category]
    }
    fn date(&self) -> &str {
        &self.published
    }
    fn popularity(&self) -> f64 {
        self.views as f64
    }
    fn featured(&self) -> bool {
        self.featured
    }
}

impl Searchable for ForumTopic {
    fn title(&self) -> &str {
        &self.title
    }
    fn keywords(&self) -> [&str; 2] {
        [&self.description, &self.category]
    }
    fn date(&self) -> &str {
        &self.last_activity
    }
    fn popularity(&self) -> f64 {
        (self.replies + self.views) as f64
    }
    fn featured(&self) -> bool {
        self.featured
    }
}

impl Searchable for Workshop {
    fn title(&self) -> &str {
        &self.title
    }
    fn keywords(&self) -> [&str; 2] {
        [&self.description, &self.category]
    }
    fn date(&self) -> &str {
        &self.date
    }
    fn popularity(&self) -> f64 {
        self.enrolled as f64
    }
    fn featured(&self) -> bool {
        self.featured
    }
}

impl Searchable for Mentor {
    fn title(&self) -> &str {
        &self.name
    }
    fn keywords(&self) -> [&str; 2] {
        [&self.bio, &self.expertise]
    }
    fn date(&self) -> &str {
        ""
    }
    fn popularity(&self) -> f64 {
        self.rating * 1_000.0 + self.sessions as f64
    }
}

/// 按关键字过滤（标题、描述、分类，不区分大小写）并排序；同分时按标题
pub fn search<'a, T: Searchable>(items: &'a [T], query: &str, sort: SortOrder) -> Vec<&'a T> {
    let query = query.trim().to_lowercase();
    let mut hits: Vec<&T> = items
        .iter()
        .filter(|item| {
            query.is_empty()
                || item.title().to_lowercase().contains(&query)
                || item
                    .keywords()
                    .iter()
                    .any(|text| text.to_lowercase().contains(&query))
        })
        .collect();

    let by_title = |a: &&T, b: &&T| a.title().to_lowercase().cmp(&b.title().to_lowercase());
    match sort {
        SortOrder::Title => hits.sort_by(by_title),
        SortOrder::Newest => hits.sort_by(|a, b| b.date().cmp(a.date()).then_with(|| by_title(a, b))),
        SortOrder::Popular => hits.sort_by(|a, b| {
            b.popularity()
                .partial_cmp(&a.popularity())
                .unwrap_or(Ordering::Equal)
                .then_with(|| by_title(a, b))
        }),
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ebook(title: &str, category: &str, published: &str, downloads: u64) -> Ebook {
        Ebook {
            id: title.to_lowercase(),
            title: title.into(),
            category: category.into(),
            published: published.into(),
            downloads,
            ..Ebook::default()
        }
    }

    fn library() -> Vec<Ebook> {
        vec![
            ebook("Water Sanitation", "Health", "2024-05-01", 40),
            ebook("Budgeting for NGOs", "Finance", "2025-01-10", 300),
            ebook("after-school Clubs", "Education", "2023-09-15", 120),
        ]
    }

    fn titles(hits: &[&Ebook]) -> Vec<String> {
        hits.iter().map(|e| e.title.clone()).collect()
    }

    #[test]
    fn search_is_case_insensitive_over_title_and_category() {
        let books = library();
        assert_eq!(titles(&search(&books, "WATER", SortOrder::Title)), vec!["Water Sanitation"]);
        assert_eq!(titles(&search(&books, "finance", SortOrder::Title)), vec!["Budgeting for NGOs"]);
        assert!(search(&books, "astronomy", SortOrder::Title).is_empty());
        assert_eq!(search(&books, "  ", SortOrder::Title).len(), 3);
    }

    #[test]
    fn sort_orders() {
        let books = library();
        assert_eq!(
            titles(&search(&books, "", SortOrder::Title)),
            vec!["after-school Clubs", "Budgeting for NGOs", "Water Sanitation"]
        );
        assert_eq!(
            titles(&search(&books, "", SortOrder::Newest)),
            vec!["Budgeting for NGOs", "Water Sanitation", "after-school Clubs"]
        );
        assert_eq!(
            titles(&search(&books, "", SortOrder::Popular)),
            vec!["Budgeting for NGOs", "after-school Clubs", "Water Sanitation"]
        );
    }

    #[test]
    fn mentor_availability_double_toggle() {
        let mut resources = ResourcesSection::default();
        resources.apply(ResourcesUpdate::Mentors(ListOp::Add { item: None }));
        let id = resources.mentors[0].id.clone();
        let before = resources.clone();
        for _ in 0..2 {
            resources.apply(ResourcesUpdate::Mentors(ListOp::Toggle {
                id: id.clone(),
                flag: Flag::Available,
            }));
        }
        assert_eq!(resources, before);
    }

    #[test]
    fn mentor_rating_is_bounded() {
        let mut mentor = Mentor::placeholder();
        mentor.patch(MentorPatch::Rating(NumberInput::Text("9".into())));
        assert_eq!(mentor.rating, 5.0);
    }

    #[test]
    fn tab_names_match_query_values() {
        let parsed: Tab = serde_json::from_value(serde_json::json!("mentorship")).unwrap();
        assert_eq!(parsed, Tab::Mentorship);
        assert_eq!(Tab::ALL.map(Tab::as_str)[3], "workshops");
    }
}
