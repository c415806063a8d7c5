use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SectionError;
use crate::section::field::{FieldSpec, ListSpec};

pub mod editor;
pub mod field;
pub mod list;
pub mod preview;
pub mod registry;

/// 站点上所有可编辑分区
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKey {
    Hero,
    Cta,
    Impact,
    Causes,
    Story,
    Gallery,
    Resources,
    Careers,
    Volunteers,
}

impl SectionKey {
    pub const ALL: [SectionKey; 9] = [
        SectionKey::Hero,
        SectionKey::Cta,
        SectionKey::Impact,
        SectionKey::Causes,
        SectionKey::Story,
        SectionKey::Gallery,
        SectionKey::Resources,
        SectionKey::Careers,
        SectionKey::Volunteers,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hero => "hero",
            Self::Cta => "cta",
            Self::Impact => "impact",
            Self::Causes => "causes",
            Self::Story => "story",
            Self::Gallery => "gallery",
            Self::Resources => "resources",
            Self::Careers => "careers",
            Self::Volunteers => "volunteers",
        }
    }

    /// 后台显示名称
    pub fn label(self) -> &'static str {
        match self {
            Self::Hero => "首页横幅",
            Self::Cta => "行动号召",
            Self::Impact => "影响力数据",
            Self::Causes => "重点项目",
            Self::Story => "机构故事",
            Self::Gallery => "图片墙",
            Self::Resources => "学习资源",
            Self::Careers => "招聘岗位",
            Self::Volunteers => "志愿者",
        }
    }

    /// 远程内容 API 的默认端点名
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::Hero => "hero-section",
            Self::Cta => "cta",
            Self::Impact => "impact",
            Self::Causes => "causeImpact",
            Self::Story => "story",
            Self::Gallery => "gallery-hero",
            Self::Resources => "resources",
            Self::Careers => "jobs",
            Self::Volunteers => "volunteers",
        }
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionKey {
    type Err = SectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SectionKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| SectionError::UnknownSection(s.to_string()))
    }
}

/// 一次更新的结果
///
/// 只有 `Applied` 会把编辑器标记为 dirty。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum Outcome {
    Applied,
    /// 目标不存在（如未知 id），静默忽略
    Ignored,
    /// 违反约束（如列表最少保留一项），拒绝执行
    Refused(&'static str),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }
}

/// 可编辑分区：整体序列化、整体持久化，通过类型化的更新指令修改
pub trait Section:
    Serialize + DeserializeOwned + Clone + Default + PartialEq + Send + Sync + 'static
{
    const KEY: SectionKey;

    /// 该分区的封闭更新指令集
    type Update: DeserializeOwned + Send;

    /// reducer：把一条更新应用到当前状态
    fn apply(&mut self, update: Self::Update) -> Outcome;

    /// 通过路径写入字段后调用，用于把数值等拉回合法范围
    fn normalize(&mut self) {}

    /// 后台表单的标量字段定义
    fn fields() -> &'static [FieldSpec] {
        &[]
    }

    /// 后台表单的列表编辑器定义
    fn lists() -> &'static [ListSpec] {
        &[]
    }
}
