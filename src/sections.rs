//! 站点的各个可编辑分区

use crate::section::Outcome;

/// 为带 `id: String` 字段的列表项生成 `id` / `set_id`
///
/// 定义在各 `mod` 声明之前，子模块按文本作用域直接使用。
macro_rules! item_id {
    () => {
        fn id(&self) -> &str {
            &self.id
        }

        fn set_id(&mut self, id: String) {
            self.id = id;
        }
    };
}

pub mod careers;
pub mod causes;
pub mod common;
pub mod cta;
pub mod gallery;
pub mod hero;
pub mod impact;
pub mod resources;
pub mod story;
pub mod volunteers;

/// 赋值；新旧相同时视为未修改
pub(crate) fn assign<T: PartialEq>(slot: &mut T, value: T) -> Outcome {
    if *slot == value {
        Outcome::Ignored
    } else {
        *slot = value;
        Outcome::Applied
    }
}

pub(crate) fn flip(flag: &mut bool) -> Outcome {
    *flag = !*flag;
    Outcome::Applied
}
