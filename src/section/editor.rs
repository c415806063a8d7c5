use serde::Serialize;
use serde_json::Value;

use crate::error::{SectionError, StoreError};
use crate::section::field::{parse_float, parse_int};
use crate::section::{Outcome, Section, SectionKey};
use crate::store::{SectionStore, StoredSection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorStatus {
    Clean,
    Dirty,
    Saving,
}

/// 一次保存请求：`begin_save` 产出，交给存储后再由 `finish_save` 收尾
#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub key: SectionKey,
    pub data: Value,
    pub expected_version: Option<u64>,
}

/// 单个分区的编辑状态：当前值、上次保存的快照和 dirty 标记
#[derive(Debug, Clone)]
pub struct SectionEditor<S: Section> {
    current: S,
    snapshot: S,
    dirty: bool,
    saving: bool,
    version: Option<u64>,
    updated_at: Option<String>,
    notice: Option<String>,
}

impl<S: Section> Default for SectionEditor<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S: Section> SectionEditor<S> {
    pub fn new(initial: S) -> Self {
        Self {
            snapshot: initial.clone(),
            current: initial,
            dirty: false,
            saving: false,
            version: None,
            updated_at: None,
            notice: None,
        }
    }

    pub fn from_stored(stored: StoredSection) -> Result<Self, SectionError> {
        let data: S = serde_json::from_value(stored.data).map_err(|e| {
            SectionError::InvalidField {
                path: stored.key.to_string(),
                reason: e.to_string(),
            }
        })?;
        let mut editor = Self::new(data);
        editor.version = Some(stored.version);
        editor.updated_at = Some(stored.updated_at);
        Ok(editor)
    }

    /// 从存储加载；不存在时使用默认值，失败时同样回退默认值并记录提示，不向调用方报错
    pub async fn load<St: SectionStore>(store: &St) -> Self {
        match store.fetch_section(S::KEY).await {
            Ok(Some(stored)) => match Self::from_stored(stored) {
                Ok(editor) => editor,
                Err(e) => {
                    tracing::warn!("分区 {} 数据无法解析，使用默认内容：{e}", S::KEY);
                    Self::with_notice(format!("已保存的内容无法解析，当前显示默认内容：{e}"))
                }
            },
            Ok(None) => Self::default(),
            Err(e) => {
                tracing::warn!("加载分区 {} 失败，使用默认内容：{e}", S::KEY);
                Self::with_notice(format!("加载失败，当前显示默认内容：{e}"))
            }
        }
    }

    /// 从存储加载，错误原样返回（重新加载时使用）
    pub async fn fetch<St: SectionStore>(store: &St) -> Result<Self, SectionError> {
        match store.fetch_section(S::KEY).await? {
            Some(stored) => Self::from_stored(stored),
            None => Ok(Self::default()),
        }
    }

    fn with_notice(notice: String) -> Self {
        let mut editor = Self::default();
        editor.notice = Some(notice);
        editor
    }

    pub fn data(&self) -> &S {
        &self.current
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn status(&self) -> EditorStatus {
        if self.saving {
            EditorStatus::Saving
        } else if self.dirty {
            EditorStatus::Dirty
        } else {
            EditorStatus::Clean
        }
    }

    pub fn version(&self) -> Option<u64> {
        self.version
    }

    pub fn updated_at(&self) -> Option<&str> {
        self.updated_at.as_deref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// 加载失败后显示的是默认内容，且还没有被编辑过
    pub fn is_fallback(&self) -> bool {
        self.notice.is_some() && !self.dirty && !self.saving
    }

    pub fn apply(&mut self, update: S::Update) -> Outcome {
        let outcome = self.current.apply(update);
        if outcome.is_applied() {
            self.dirty = true;
        }
        outcome
    }

    pub fn apply_json(&mut self, update: Value) -> Result<Outcome, SectionError> {
        let update: S::Update = serde_json::from_value(update).map_err(SectionError::InvalidUpdate)?;
        Ok(self.apply(update))
    }

    /// 按点分路径写入字段（如 `animation.duration`、`buttons.0.label`）
    ///
    /// 路径必须已存在；数值字段收到字符串时按 parseInt/parseFloat 规则转换。
    /// 列表整体和列表项的 id 只能通过列表操作修改。
    pub fn set_field(&mut self, path: &str, value: Value) -> Result<Outcome, SectionError> {
        let mut root = serde_json::to_value(&self.current).map_err(SectionError::InvalidUpdate)?;
        set_path(&mut root, path, value).map_err(|reason| SectionError::InvalidField {
            path: path.to_string(),
            reason,
        })?;
        let mut next: S = serde_json::from_value(root).map_err(|e| SectionError::InvalidField {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        next.normalize();
        self.current = next;
        self.dirty = true;
        Ok(Outcome::Applied)
    }

    pub fn begin_save(&mut self) -> Result<SaveRequest, SectionError> {
        if self.saving {
            return Err(SectionError::SaveInProgress(S::KEY));
        }
        let data = serde_json::to_value(&self.current).map_err(SectionError::InvalidUpdate)?;
        self.saving = true;
        Ok(SaveRequest {
            key: S::KEY,
            data,
            expected_version: self.version,
        })
    }

    /// 保存成功：快照替换为已保存内容；保存期间若有新编辑则保持 dirty。
    /// 保存失败：保持 dirty，错误原样返回。
    pub fn finish_save(
        &mut self,
        request: SaveRequest,
        result: Result<StoredSection, StoreError>,
    ) -> Result<(), SectionError> {
        self.saving = false;
        let stored = result?;

        let sent: S = serde_json::from_value(request.data).map_err(SectionError::InvalidUpdate)?;
        let saved = serde_json::from_value::<S>(stored.data).unwrap_or_else(|_| sent.clone());
        let untouched = self.current == sent;

        self.snapshot = saved;
        self.version = Some(stored.version);
        self.updated_at = Some(stored.updated_at);
        self.notice = None;
        if untouched {
            self.current = self.snapshot.clone();
            self.dirty = false;
        } else {
            self.dirty = self.current != self.snapshot;
        }
        Ok(())
    }

    pub async fn save<St: SectionStore>(&mut self, store: &St) -> Result<&S, SectionError> {
        let request = self.begin_save()?;
        let result = store
            .save_section(request.key, &request.data, request.expected_version)
            .await;
        if let Err(e) = &result {
            tracing::error!("保存分区 {} 失败：{e}", S::KEY);
        }
        self.finish_save(request, result)?;
        Ok(&self.current)
    }

    /// 恢复到上次保存的快照（从未保存过则为默认值）
    pub fn reset(&mut self) {
        self.current = self.snapshot.clone();
        self.dirty = false;
    }
}

fn set_path(root: &mut Value, path: &str, value: Value) -> Result<(), String> {
    let mut target = root;
    for segment in path.split('.') {
        if segment.is_empty() {
            return Err("路径包含空段".to_string());
        }
        target = match target {
            Value::Object(map) => map
                .get_mut(segment)
                .ok_or_else(|| format!("不存在的字段 {segment}"))?,
            Value::Array(items) => {
                let index: usize = segment
                    .parse()
                    .map_err(|_| format!("{segment} 不是有效的下标"))?;
                items
                    .get_mut(index)
                    .ok_or_else(|| format!("下标 {index} 越界"))?
            }
            _ => return Err(format!("{segment} 的上级不是对象或数组")),
        };
    }
    if path.rsplit('.').next() == Some("id") {
        return Err("列表项 id 不能直接修改".to_string());
    }
    if holds_list(target) {
        return Err("列表只能通过添加、删除、排序等列表操作修改".to_string());
    }
    *target = coerce(target, value);
    Ok(())
}

/// 值本身是数组，或是包含数组 / 列表项 id 的对象
fn holds_list(value: &Value) -> bool {
    match value {
        Value::Array(_) => true,
        Value::Object(map) => map.contains_key("id") || map.values().any(holds_list),
        _ => false,
    }
}

/// 按旧值的类型转换表单提交的字符串
fn coerce(existing: &Value, incoming: Value) -> Value {
    let Value::String(text) = &incoming else {
        return incoming;
    };
    match existing {
        Value::Number(n) if n.is_u64() => Value::from(parse_int(text).max(0)),
        Value::Number(n) if n.is_i64() => Value::from(parse_int(text)),
        Value::Number(_) => Value::from(parse_float(text)),
        Value::Bool(_) => Value::Bool(matches!(text.trim(), "true" | "on" | "1")),
        _ => incoming,
    }
}
