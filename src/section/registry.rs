use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{SectionError, StoreError};
use crate::section::editor::{EditorStatus, SaveRequest, SectionEditor};
use crate::section::field::{FieldSpec, ListSpec};
use crate::section::{Outcome, Section, SectionKey};
use crate::sections::{
    careers::CareersSection, causes::CausesSection, cta::CtaSection, gallery::GallerySection,
    hero::HeroSection, impact::ImpactSection, resources::ResourcesSection, story::StorySection,
    volunteers::VolunteerSection,
};
use crate::store::{ContentStore, SectionEvent, SectionStore, StoredSection};

/// 编辑器对外展示的状态（API 响应 / 后台页面）
#[derive(Debug, Clone, Serialize)]
pub struct EditorView {
    pub key: SectionKey,
    pub label: &'static str,
    pub status: EditorStatus,
    pub dirty: bool,
    pub version: Option<u64>,
    pub updated_at: Option<String>,
    pub notice: Option<String>,
    pub data: Value,
}

/// 擦除具体分区类型后的编辑器，供注册表统一存放
pub trait DynEditor: Send + Sync {
    fn view(&self) -> EditorView;
    fn apply_json(&mut self, update: Value) -> Result<Outcome, SectionError>;
    fn set_field(&mut self, path: &str, value: Value) -> Result<Outcome, SectionError>;
    fn begin_save(&mut self) -> Result<SaveRequest, SectionError>;
    fn finish_save(
        &mut self,
        request: SaveRequest,
        result: Result<StoredSection, StoreError>,
    ) -> Result<(), SectionError>;
    fn reset(&mut self);
    fn is_fallback(&self) -> bool;
    fn fields(&self) -> &'static [FieldSpec];
    fn lists(&self) -> &'static [ListSpec];
}

impl<S: Section> DynEditor for SectionEditor<S> {
    fn view(&self) -> EditorView {
        EditorView {
            key: S::KEY,
            label: S::KEY.label(),
            status: self.status(),
            dirty: self.is_dirty(),
            version: self.version(),
            updated_at: self.updated_at().map(str::to_string),
            notice: self.notice().map(str::to_string),
            data: serde_json::to_value(self.data()).unwrap_or(Value::Null),
        }
    }

    fn apply_json(&mut self, update: Value) -> Result<Outcome, SectionError> {
        SectionEditor::apply_json(self, update)
    }

    fn set_field(&mut self, path: &str, value: Value) -> Result<Outcome, SectionError> {
        SectionEditor::set_field(self, path, value)
    }

    fn begin_save(&mut self) -> Result<SaveRequest, SectionError> {
        SectionEditor::begin_save(self)
    }

    fn finish_save(
        &mut self,
        request: SaveRequest,
        result: Result<StoredSection, StoreError>,
    ) -> Result<(), SectionError> {
        SectionEditor::finish_save(self, request, result)
    }

    fn reset(&mut self) {
        SectionEditor::reset(self)
    }

    fn is_fallback(&self) -> bool {
        SectionEditor::is_fallback(self)
    }

    fn fields(&self) -> &'static [FieldSpec] {
        S::fields()
    }

    fn lists(&self) -> &'static [ListSpec] {
        S::lists()
    }
}

/// 按 key 选出具体分区类型，`$S` 在 `$body` 中代表该类型
macro_rules! dispatch {
    ($key:expr, $S:ident => $body:expr) => {
        match $key {
            SectionKey::Hero => {
                type $S = HeroSection;
                $body
            }
            SectionKey::Cta => {
                type $S = CtaSection;
                $body
            }
            SectionKey::Impact => {
                type $S = ImpactSection;
                $body
            }
            SectionKey::Causes => {
                type $S = CausesSection;
                $body
            }
            SectionKey::Story => {
                type $S = StorySection;
                $body
            }
            SectionKey::Gallery => {
                type $S = GallerySection;
                $body
            }
            SectionKey::Resources => {
                type $S = ResourcesSection;
                $body
            }
            SectionKey::Careers => {
                type $S = CareersSection;
                $body
            }
            SectionKey::Volunteers => {
                type $S = VolunteerSection;
                $body
            }
        }
    };
}

/// 按 key 从存储加载对应类型的编辑器，失败时回退默认内容
pub async fn load_editor<St: SectionStore>(key: SectionKey, store: &St) -> Box<dyn DynEditor> {
    dispatch!(key, S => Box::new(SectionEditor::<S>::load(store).await) as Box<dyn DynEditor>)
}

/// 按 key 从存储加载对应类型的编辑器，失败时返回错误
pub async fn fetch_editor<St: SectionStore>(
    key: SectionKey,
    store: &St,
) -> Result<Box<dyn DynEditor>, SectionError> {
    dispatch!(key, S => {
        let editor = SectionEditor::<S>::fetch(store).await?;
        Ok(Box::new(editor) as Box<dyn DynEditor>)
    })
}

/// 只解析不执行，检查更新指令对该分区是否合法
pub fn check_update(key: SectionKey, update: Value) -> Result<(), SectionError> {
    dispatch!(key, S => serde_json::from_value::<<S as Section>::Update>(update)
        .map(drop)
        .map_err(SectionError::InvalidUpdate))
}

/// 分区的内置默认内容（seed 写入存储用）
pub fn default_data(key: SectionKey) -> Value {
    dispatch!(key, S => SectionEditor::<S>::default().view().data)
}

/// 所有分区的编辑器（草稿只存在内存中），首次访问时懒加载
#[derive(Clone, Default)]
pub struct EditorRegistry {
    editors: Arc<Mutex<HashMap<SectionKey, Box<dyn DynEditor>>>>,
}

impl EditorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 加载时不持有锁，避免慢请求阻塞其他分区。
    /// 上次加载失败且未被编辑的分区会再次尝试加载。
    async fn ensure_loaded(&self, key: SectionKey, store: &ContentStore) {
        let stale = |editor: Option<&Box<dyn DynEditor>>| editor.is_none_or(|e| e.is_fallback());
        if !stale(self.editors.lock().await.get(&key)) {
            return;
        }
        let loaded = load_editor(key, store).await;
        let mut editors = self.editors.lock().await;
        if stale(editors.get(&key)) {
            editors.insert(key, loaded);
        }
    }

    pub async fn with_editor<R>(
        &self,
        key: SectionKey,
        store: &ContentStore,
        f: impl FnOnce(&mut Box<dyn DynEditor>) -> R,
    ) -> Result<R, SectionError> {
        self.ensure_loaded(key, store).await;
        let mut editors = self.editors.lock().await;
        let editor = editors
            .get_mut(&key)
            .ok_or_else(|| SectionError::UnknownSection(key.to_string()))?;
        Ok(f(editor))
    }

    pub async fn view(&self, key: SectionKey, store: &ContentStore) -> Result<EditorView, SectionError> {
        self.with_editor(key, store, |e| e.view()).await
    }

    /// 编辑页面需要的状态和表单定义
    pub async fn form(
        &self,
        key: SectionKey,
        store: &ContentStore,
    ) -> Result<(EditorView, &'static [FieldSpec], &'static [ListSpec]), SectionError> {
        self.with_editor(key, store, |e| (e.view(), e.fields(), e.lists())).await
    }

    pub async fn apply(
        &self,
        key: SectionKey,
        store: &ContentStore,
        update: Value,
    ) -> Result<(Outcome, EditorView), SectionError> {
        self.with_editor(key, store, |e| {
            let outcome = e.apply_json(update)?;
            Ok((outcome, e.view()))
        })
        .await?
    }

    pub async fn set_field(
        &self,
        key: SectionKey,
        store: &ContentStore,
        path: &str,
        value: Value,
    ) -> Result<(Outcome, EditorView), SectionError> {
        self.with_editor(key, store, |e| {
            let outcome = e.set_field(path, value)?;
            Ok((outcome, e.view()))
        })
        .await?
    }

    /// 保存在独立任务中执行，请求方断开连接也不会让编辑器卡在 Saving 状态
    pub async fn save(&self, key: SectionKey, store: &ContentStore) -> Result<EditorView, SectionError> {
        let registry = self.clone();
        let store = store.clone();
        tokio::spawn(async move { registry.save_inner(key, &store).await }).await?
    }

    async fn save_inner(&self, key: SectionKey, store: &ContentStore) -> Result<EditorView, SectionError> {
        let request = self.with_editor(key, store, |e| e.begin_save()).await??;
        let result = store
            .save_section(key, &request.data, request.expected_version)
            .await;
        match &result {
            Ok(stored) => tracing::info!("分区 {key} 已保存（版本 {}）", stored.version),
            Err(e) => tracing::error!("保存分区 {key} 失败：{e}"),
        }
        self.with_editor(key, store, |e| {
            e.finish_save(request, result)?;
            Ok(e.view())
        })
        .await?
    }

    pub async fn reset(&self, key: SectionKey, store: &ContentStore) -> Result<EditorView, SectionError> {
        let view = self
            .with_editor(key, store, |e| {
                e.reset();
                e.view()
            })
            .await?;
        store.notify(SectionEvent::Reset { key });
        Ok(view)
    }

    /// 丢弃草稿并从存储重新加载（版本冲突后取回最新内容和版本）。
    /// 加载失败时保留现有编辑器。
    pub async fn reload(&self, key: SectionKey, store: &ContentStore) -> Result<EditorView, SectionError> {
        let fresh = fetch_editor(key, store).await?;
        let view = fresh.view();
        let mut editors = self.editors.lock().await;
        if editors.get(&key).is_some_and(|e| e.view().status == EditorStatus::Saving) {
            return Err(SectionError::SaveInProgress(key));
        }
        editors.insert(key, fresh);
        drop(editors);
        tracing::info!("分区 {key} 已从存储重新加载");
        store.notify(SectionEvent::Reset { key });
        Ok(view)
    }

    /// 已加载编辑器的状态，未加载的分区为 None
    pub async fn loaded_views(&self) -> HashMap<SectionKey, EditorView> {
        self.editors
            .lock()
            .await
            .iter()
            .map(|(key, editor)| (*key, editor.view()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ContentStore;

    #[tokio::test]
    async fn apply_save_reset_through_registry() {
        let store = ContentStore::memory();
        let registry = EditorRegistry::new();

        let (outcome, view) = registry
            .apply(
                SectionKey::Cta,
                &store,
                serde_json::json!({ "op": "set_heading", "args": "Give today" }),
            )
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Applied);
        assert!(view.dirty);
        assert_eq!(view.data["heading"], "Give today");

        let saved = registry.save(SectionKey::Cta, &store).await.unwrap();
        assert!(!saved.dirty);
        assert_eq!(saved.version, Some(1));

        let reset = registry.reset(SectionKey::Cta, &store).await.unwrap();
        assert_eq!(reset.data["heading"], "Give today");
    }

    #[tokio::test]
    async fn malformed_update_is_rejected_without_marking_dirty() {
        let store = ContentStore::memory();
        let registry = EditorRegistry::new();
        let err = registry
            .apply(SectionKey::Hero, &store, serde_json::json!({ "op": "set_colour" }))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_update");
        assert!(!registry.view(SectionKey::Hero, &store).await.unwrap().dirty);
    }

    #[tokio::test]
    async fn save_events_reach_subscribers() {
        let store = ContentStore::memory();
        let mut events = store.subscribe();
        let registry = EditorRegistry::new();
        registry
            .set_field(SectionKey::Impact, &store, "title", Value::from("Impact 2026"))
            .await
            .unwrap();
        registry.save(SectionKey::Impact, &store).await.unwrap();

        match events.recv().await.unwrap() {
            SectionEvent::Saved { key, version, .. } => {
                assert_eq!(key, SectionKey::Impact);
                assert_eq!(version, 1);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_load_is_retried_once_upstream_recovers() {
        let healthy = ContentStore::memory();
        healthy
            .save_section(
                SectionKey::Impact,
                &serde_json::json!({ "title": "Impact from upstream" }),
                None,
            )
            .await
            .unwrap();
        let registry = EditorRegistry::new();

        let fallback = registry.view(SectionKey::Impact, &ContentStore::memory_failing()).await.unwrap();
        assert!(fallback.notice.is_some());
        assert_eq!(fallback.data["title"], "Our Global Impact");

        let recovered = registry.view(SectionKey::Impact, &healthy).await.unwrap();
        assert!(recovered.notice.is_none());
        assert_eq!(recovered.version, Some(1));
        assert_eq!(recovered.data["title"], "Impact from upstream");
    }

    #[tokio::test]
    async fn edited_fallback_is_kept() {
        let registry = EditorRegistry::new();
        registry
            .set_field(SectionKey::Impact, &ContentStore::memory_failing(), "title", Value::from("Draft"))
            .await
            .unwrap();
        let view = registry.view(SectionKey::Impact, &ContentStore::memory()).await.unwrap();
        assert!(view.dirty);
        assert_eq!(view.data["title"], "Draft");
    }

    #[tokio::test]
    async fn reload_recovers_from_a_conflict() {
        let store = ContentStore::memory();
        let registry = EditorRegistry::new();
        registry
            .set_field(SectionKey::Cta, &store, "heading", Value::from("Ours"))
            .await
            .unwrap();
        registry.save(SectionKey::Cta, &store).await.unwrap();

        // 另一个写入方抢先保存了版本 2
        let mut theirs = default_data(SectionKey::Cta);
        theirs["heading"] = Value::from("Theirs");
        store.save_section(SectionKey::Cta, &theirs, Some(1)).await.unwrap();

        registry
            .set_field(SectionKey::Cta, &store, "heading", Value::from("Ours again"))
            .await
            .unwrap();
        let err = registry.save(SectionKey::Cta, &store).await.unwrap_err();
        assert_eq!(err.kind(), "conflict");

        let reloaded = registry.reload(SectionKey::Cta, &store).await.unwrap();
        assert!(!reloaded.dirty);
        assert_eq!(reloaded.version, Some(2));
        assert_eq!(reloaded.data["heading"], "Theirs");

        registry
            .set_field(SectionKey::Cta, &store, "heading", Value::from("Merged"))
            .await
            .unwrap();
        assert_eq!(registry.save(SectionKey::Cta, &store).await.unwrap().version, Some(3));
    }

    #[tokio::test]
    async fn failed_reload_keeps_drafts() {
        let store = ContentStore::memory();
        let registry = EditorRegistry::new();
        registry
            .set_field(SectionKey::Hero, &store, "title", Value::from("Draft"))
            .await
            .unwrap();
        let err = registry
            .reload(SectionKey::Hero, &ContentStore::memory_failing())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "upstream");
        let view = registry.view(SectionKey::Hero, &store).await.unwrap();
        assert!(view.dirty);
        assert_eq!(view.data["title"], "Draft");
    }

    #[test]
    fn default_data_matches_section_defaults() {
        assert_eq!(default_data(SectionKey::Impact)["title"], "Our Global Impact");
        assert_eq!(default_data(SectionKey::Cta)["buttons"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn check_update_parses_without_applying() {
        assert!(check_update(SectionKey::Hero, serde_json::json!({ "op": "set_title", "args": "x" })).is_ok());
        let err = check_update(SectionKey::Hero, serde_json::json!({ "op": "no_such_op", "args": "x" }))
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_update");
    }

    #[tokio::test]
    async fn loaded_views_only_lists_touched_sections() {
        let store = ContentStore::memory();
        let registry = EditorRegistry::new();
        registry.view(SectionKey::Gallery, &store).await.unwrap();
        let views = registry.loaded_views().await;
        assert_eq!(views.len(), 1);
        assert!(views.contains_key(&SectionKey::Gallery));
    }
}
