//! 列表编辑器：对分区中的数组字段做增删改、排序和开关切换

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::section::Outcome;

/// 可切换的布尔标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    Featured,
    Visible,
    Available,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

/// 列表项：带唯一 id，可按 patch 修改单个字段
pub trait ListItem: Clone + Serialize + DeserializeOwned + PartialEq + Send + Sync {
    type Patch: DeserializeOwned + Send;

    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);

    /// 点击“添加”时使用的占位数据
    fn placeholder() -> Self;

    fn patch(&mut self, patch: Self::Patch);

    /// 切换标记，不支持该标记时返回 false
    fn toggle(&mut self, _flag: Flag) -> bool {
        false
    }

    /// 显式排序字段（order / priority），没有时按数组位置排序
    fn order(&self) -> Option<u32> {
        None
    }

    fn set_order(&mut self, _order: u32) {}
}

/// 列表操作指令，JSON 形如 `{"action": "remove", "id": "..."}`
#[derive(Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
#[serde(bound(deserialize = "T: ListItem"))]
pub enum ListOp<T: ListItem> {
    Add {
        #[serde(default)]
        item: Option<T>,
    },
    Patch {
        id: String,
        patch: T::Patch,
    },
    Remove {
        id: String,
    },
    Move {
        id: String,
        direction: Direction,
    },
    Toggle {
        id: String,
        flag: Flag,
    },
}

/// 字符串集合（标签、分类、要求等）的操作
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StringListOp {
    Add { value: String },
    Remove { value: String },
}

pub struct ListEditor<'a, T> {
    items: &'a mut Vec<T>,
    min_items: usize,
}

impl<'a, T: ListItem> ListEditor<'a, T> {
    pub fn new(items: &'a mut Vec<T>) -> Self {
        Self { items, min_items: 0 }
    }

    /// 设置最少保留数量，低于该数量的删除会被拒绝
    pub fn with_min(mut self, min_items: usize) -> Self {
        self.min_items = min_items;
        self
    }

    pub fn apply(&mut self, op: ListOp<T>) -> Outcome {
        match op {
            ListOp::Add { item } => {
                self.add(item);
                Outcome::Applied
            }
            ListOp::Patch { id, patch } => self.update(&id, patch),
            ListOp::Remove { id } => self.remove(&id),
            ListOp::Move { id, direction } => self.reorder(&id, direction),
            ListOp::Toggle { id, flag } => self.toggle(&id, flag),
        }
    }

    /// 追加一项；id 总是重新生成，有序列表排在最后
    pub fn add(&mut self, defaults: Option<T>) -> &T {
        let mut item = defaults.unwrap_or_else(T::placeholder);
        item.set_id(mint_id(self.items));
        if item.order().is_some() {
            let next = self
                .items
                .iter()
                .filter_map(ListItem::order)
                .max()
                .map_or(1, |max| max + 1);
            item.set_order(next);
        }
        self.items.push(item);
        let last = self.items.len() - 1;
        &self.items[last]
    }

    pub fn update(&mut self, id: &str, patch: T::Patch) -> Outcome {
        match self.items.iter_mut().find(|item| item.id() == id) {
            Some(item) => {
                item.patch(patch);
                Outcome::Applied
            }
            None => Outcome::Ignored,
        }
    }

    pub fn remove(&mut self, id: &str) -> Outcome {
        if !self.items.iter().any(|item| item.id() == id) {
            return Outcome::Ignored;
        }
        if self.items.len() <= self.min_items {
            return Outcome::Refused("已达到最少保留数量");
        }
        self.items.retain(|item| item.id() != id);
        Outcome::Applied
    }

    /// 与相邻项交换位置；有序列表交换 order 值后重新排序
    ///
    /// 找不到 id 或已在首尾时不做任何改动。
    pub fn reorder(&mut self, id: &str, direction: Direction) -> Outcome {
        let ordered = self.items.iter().all(|item| item.order().is_some());

        // 按显示顺序定位，确认能移动之后才重新编号
        let mut positions: Vec<usize> = (0..self.items.len()).collect();
        if ordered {
            positions.sort_by_key(|&i| self.items[i].order());
        }
        let Some(index) = positions.iter().position(|&i| self.items[i].id() == id) else {
            return Outcome::Ignored;
        };
        let neighbor = match direction {
            Direction::Up => index.checked_sub(1),
            Direction::Down => Some(index + 1).filter(|&i| i < positions.len()),
        };
        let Some(neighbor) = neighbor else {
            return Outcome::Ignored;
        };

        if ordered {
            // 稳定排序，编号后 index / neighbor 与上面的显示顺序一致
            self.renumber();
            let a = self.items[index].order().unwrap_or_default();
            let b = self.items[neighbor].order().unwrap_or_default();
            self.items[index].set_order(b);
            self.items[neighbor].set_order(a);
        }
        self.items.swap(index, neighbor);
        Outcome::Applied
    }

    pub fn toggle(&mut self, id: &str, flag: Flag) -> Outcome {
        match self.items.iter_mut().find(|item| item.id() == id) {
            Some(item) => {
                if item.toggle(flag) {
                    Outcome::Applied
                } else {
                    Outcome::Refused("该列表项不支持此标记")
                }
            }
            None => Outcome::Ignored,
        }
    }

    /// 按现有 order 排序并重新编号为 1..=n，消除重复值
    fn renumber(&mut self) {
        self.items.sort_by_key(|item| item.order().unwrap_or(u32::MAX));
        for (i, item) in self.items.iter_mut().enumerate() {
            item.set_order(i as u32 + 1);
        }
    }
}

/// 生成列表内唯一的 id
pub fn mint_id<T: ListItem>(items: &[T]) -> String {
    loop {
        let id = ulid::Ulid::new().to_string();
        if !items.iter().any(|item| item.id() == id) {
            return id;
        }
    }
}

/// 字符串集合操作：去重添加、按值删除，空白值忽略
pub fn apply_strings(values: &mut Vec<String>, op: StringListOp) -> Outcome {
    match op {
        StringListOp::Add { value } => {
            let value = value.trim();
            if value.is_empty() || values.iter().any(|v| v.eq_ignore_ascii_case(value)) {
                return Outcome::Ignored;
            }
            values.push(value.to_string());
            Outcome::Applied
        }
        StringListOp::Remove { value } => {
            let before = values.len();
            values.retain(|v| v != &value);
            if values.len() == before {
                Outcome::Ignored
            } else {
                Outcome::Applied
            }
        }
    }
}
