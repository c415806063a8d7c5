use serde::{Deserialize, Serialize};

use crate::section::field::{FieldKind, FieldSpec, ItemField, ListSpec, field, item};
use crate::section::list::{Flag, ListEditor, ListItem, ListOp, StringListOp, apply_strings};
use crate::section::{Outcome, Section, SectionKey};
use crate::sections::assign;

/// 招聘岗位
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CareersSection {
    pub title: String,
    pub subtitle: String,
    pub contact_email: String,
    pub jobs: Vec<Job>,
}

impl Default for CareersSection {
    fn default() -> Self {
        Self {
            title: "Join Our Team".into(),
            subtitle: "Build a career that changes lives".into(),
            contact_email: "careers@example.org".into(),
            jobs: vec![Job {
                id: "program-coordinator".into(),
                title: "Program Coordinator".into(),
                department: "Programs".into(),
                location: "Nairobi, Kenya".into(),
                employment_type: EmploymentType::FullTime,
                description: "Coordinate field programs and partner organisations.".into(),
                requirements: vec![
                    "3+ years in community development".into(),
                    "Fluent English and Swahili".into(),
                ],
                status: JobStatus::Open,
                priority: 1,
                ..Job::default()
            }],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentType {
    #[default]
    FullTime,
    PartTime,
    Contract,
    Internship,
    Volunteer,
}

impl EmploymentType {
    pub const OPTIONS: &'static [(&'static str, &'static str)] = &[
        ("full_time", "全职"),
        ("part_time", "兼职"),
        ("contract", "合同"),
        ("internship", "实习"),
        ("volunteer", "志愿"),
    ];
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Open,
    Closed,
    #[default]
    Draft,
}

impl JobStatus {
    pub const OPTIONS: &'static [(&'static str, &'static str)] =
        &[("open", "招聘中"), ("closed", "已关闭"), ("draft", "草稿")];
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Job {
    pub id: String,
    pub title: String,
    pub department: String,
    pub location: String,
    pub employment_type: EmploymentType,
    pub description: String,
    pub requirements: Vec<String>,
    pub salary: String,
    pub deadline: String,
    pub status: JobStatus,
    pub priority: u32,
    pub featured: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum JobPatch {
    Title(String),
    Department(String),
    Location(String),
    EmploymentType(EmploymentType),
    Description(String),
    Requirements(StringListOp),
    Salary(String),
    Deadline(String),
    Status(JobStatus),
}

impl ListItem for Job {
    type Patch = JobPatch;

    item_id!();

    fn placeholder() -> Self {
        Self {
            title: "New Position".into(),
            location: "Remote".into(),
            ..Self::default()
        }
    }

    fn patch(&mut self, patch: JobPatch) {
        match patch {
            JobPatch::Title(v) => self.title = v,
            JobPatch::Department(v) => self.department = v,
            JobPatch::Location(v) => self.location = v,
            JobPatch::EmploymentType(v) => self.employment_type = v,
            JobPatch::Description(v) => self.description = v,
            JobPatch::Requirements(op) => {
                apply_strings(&mut self.requirements, op);
            }
            JobPatch::Salary(v) => self.salary = v,
            JobPatch::Deadline(v) => self.deadline = v,
            JobPatch::Status(v) => self.status = v,
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

    fn order(&self) -> Option<u32> {
        Some(self.priority)
    }

    fn set_order(&mut self, order: u32) {
        self.priority = order;
    }
}

#[derive(Deserialize)]
#[serde(tag = "op", content = "args", rename_all = "snake_case")]
pub enum CareersUpdate {
    SetTitle(String),
    SetSubtitle(String),
    SetContactEmail(String),
    Jobs(ListOp<Job>),
}

const FIELDS: &[FieldSpec] = &[
    field("set_title", "title", "标题", FieldKind::Text),
    field("set_subtitle", "subtitle", "副标题", FieldKind::Text),
    field("set_contact_email", "contact_email", "投递邮箱", FieldKind::Text),
];

const JOB_FIELDS: &[ItemField] = &[
    item("title", "职位", FieldKind::Text),
    item("department", "部门", FieldKind::Text),
    item("location", "地点", FieldKind::Text),
    item("employment_type", "类型", FieldKind::Select(EmploymentType::OPTIONS)),
    item("description", "职位描述", FieldKind::TextArea),
    item("requirements", "任职要求", FieldKind::Tags),
    item("salary", "薪资", FieldKind::Text),
    item("deadline", "截止日期", FieldKind::Date),
    item("status", "状态", FieldKind::Select(JobStatus::OPTIONS)),
];

const LISTS: &[ListSpec] = &[ListSpec {
    op: "jobs",
    label: "岗位",
    min_items: 0,
    fields: JOB_FIELDS,
}];

impl Section for CareersSection {
    const KEY: SectionKey = SectionKey::Careers;
    type Update = CareersUpdate;

    fn apply(&mut self, update: CareersUpdate) -> Outcome {
        match update {
            CareersUpdate::SetTitle(v) => assign(&mut self.title, v),
            CareersUpdate::SetSubtitle(v) => assign(&mut self.subtitle, v),
            CareersUpdate::SetContactEmail(v) => assign(&mut self.contact_email, v.trim().to_string()),
            CareersUpdate::Jobs(op) => ListEditor::new(&mut self.jobs).apply(op),
        }
    }

    fn fields() -> &'static [FieldSpec] {
        FIELDS
    }

    fn lists() -> &'static [ListSpec] {
        LISTS
    }
}

impl CareersSection {
    /// 招聘中的岗位，推荐在前，其余按 priority
    pub fn open_jobs(&self) -> Vec<&Job> {
        let mut jobs: Vec<&Job> = self
            .jobs
            .iter()
            .filter(|job| job.status == JobStatus::Open)
            .collect();
        jobs.sort_by_key(|job| (!job.featured, job.priority));
        jobs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_jobs_start_as_drafts_at_the_end() {
        let mut careers = CareersSection::default();
        careers.apply(CareersUpdate::Jobs(ListOp::Add { item: None }));
        let added = careers.jobs.last().unwrap();
        assert_eq!(added.status, JobStatus::Draft);
        assert_eq!(added.priority, 2);
        assert_eq!(careers.open_jobs().len(), 1);
    }

    #[test]
    fn requirements_patch_through_string_ops() {
        let mut careers = CareersSection::default();
        let update: CareersUpdate = serde_json::from_value(json!({
            "op": "jobs",
            "args": {
                "action": "patch",
                "id": "program-coordinator",
                "patch": { "field": "requirements", "value": { "action": "add", "value": "Driving licence" } }
            }
        }))
        .unwrap();
        careers.apply(update);
        assert_eq!(careers.jobs[0].requirements.len(), 3);
    }

    #[test]
    fn open_jobs_follow_priority() {
        let mut careers = CareersSection::default();
        careers.jobs.push(Job {
            id: "driver".into(),
            title: "Driver".into(),
            status: JobStatus::Open,
            priority: 0,
            ..Job::default()
        });
        careers.jobs.push(Job {
            id: "closed".into(),
            status: JobStatus::Closed,
            ..Job::default()
        });
        let ids: Vec<&str> = careers.open_jobs().iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["driver", "program-coordinator"]);
    }

    #[test]
    fn employment_type_uses_snake_case() {
        let job: Job = serde_json::from_value(json!({ "employment_type": "part_time" })).unwrap();
        assert_eq!(job.employment_type, EmploymentType::PartTime);
    }
}
