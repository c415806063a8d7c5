use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::StoreError;
use crate::section::SectionKey;
use crate::store::{SectionStore, StoredSection};

/// 测试用内存存储，版本语义与 SQLite 存储一致
#[derive(Clone, Default)]
pub struct MemoryStore {
    sections: Arc<Mutex<HashMap<SectionKey, StoredSection>>>,
    fail: bool,
}

impl MemoryStore {
    /// 所有读写都返回 503
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn unavailable() -> StoreError {
        StoreError::Status {
            status: 503,
            body: "upstream unavailable".into(),
        }
    }
}

impl SectionStore for MemoryStore {
    async fn fetch_section(&self, key: SectionKey) -> Result<Option<StoredSection>, StoreError> {
        if self.fail {
            return Err(Self::unavailable());
        }
        Ok(self.sections.lock().unwrap().get(&key).cloned())
    }

    async fn save_section(
        &self,
        key: SectionKey,
        data: &Value,
        expected_version: Option<u64>,
    ) -> Result<StoredSection, StoreError> {
        if self.fail {
            return Err(Self::unavailable());
        }
        let mut sections = self.sections.lock().unwrap();
        let actual = sections.get(&key).map(|s| s.version);
        if actual != expected_version {
            return Err(StoreError::Conflict {
                key,
                expected: expected_version,
                actual,
            });
        }
        let stored = StoredSection {
            key,
            data: data.clone(),
            version: actual.map_or(1, |v| v + 1),
            updated_at: chrono::Utc::now().to_rfc3339(),
        };
        sections.insert(key, stored.clone());
        Ok(stored)
    }
}
