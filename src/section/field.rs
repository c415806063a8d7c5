//! 字段编辑原语：数值输入容错、颜色值、百分比，以及后台表单的字段定义

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#([0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("颜色正则"));

/// 数值输入：JSON 数字或表单字符串均可，无法解析时按 0 处理而不是报错
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumberInput {
    Number(f64),
    Text(String),
}

impl NumberInput {
    pub fn as_int(&self) -> i64 {
        match self {
            NumberInput::Number(n) if n.is_finite() => n.trunc() as i64,
            NumberInput::Number(_) => 0,
            NumberInput::Text(s) => parse_int(s),
        }
    }

    pub fn as_float(&self) -> f64 {
        match self {
            NumberInput::Number(n) if n.is_finite() => *n,
            NumberInput::Number(_) => 0.0,
            NumberInput::Text(s) => parse_float(s),
        }
    }

    /// 非负整数，负数截为 0
    pub fn as_count(&self) -> u64 {
        self.as_int().max(0) as u64
    }
}

/// 按 `parseInt` 规则取前导整数，取不到时返回 0，超出 i64 范围时取边界值
pub fn parse_int(s: &str) -> i64 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let value = digits[..end]
        .bytes()
        .fold(0i64, |acc, b| acc.saturating_mul(10).saturating_add(i64::from(b - b'0')));
    if negative { value.saturating_neg() } else { value }
}

/// 按 `parseFloat` 规则取最长的合法数值前缀，取不到时返回 0
pub fn parse_float(s: &str) -> f64 {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'-' | b'+')) {
        end = 1;
    }
    let mut seen_digit = false;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
        seen_digit = true;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
            seen_digit = true;
        }
    }
    if !seen_digit {
        return 0.0;
    }
    // 指数部分只有在后面跟着数字时才算数
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'-' | b'+')) {
            exp_end += 1;
        }
        let digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > digits_start {
            end = exp_end;
        }
    }
    s[..end]
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// 进度百分比，结果限制在 [0, 100]；目标为 0 或非法时为 0
pub fn percent(current: f64, total: f64) -> f64 {
    if !current.is_finite() || !total.is_finite() || total <= 0.0 {
        return 0.0;
    }
    (current / total * 100.0).clamp(0.0, 100.0)
}

/// `#rgb` 或 `#rrggbb` 格式的颜色值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(String);

impl HexColor {
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        HEX_COLOR
            .is_match(value)
            .then(|| HexColor(value.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 内置默认值，调用方保证格式正确
    pub(crate) fn literal(value: &str) -> Self {
        HexColor(value.to_string())
    }
}

impl TryFrom<String> for HexColor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        HexColor::parse(&value).ok_or_else(|| format!("无效的颜色值：{value}"))
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.0
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── 后台表单定义 ──

/// 表单控件类型
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Text,
    TextArea,
    Number { min: i64, max: i64 },
    Range { min: i64, max: i64 },
    Color,
    Select(&'static [(&'static str, &'static str)]),
    /// 复选框：提交时不带参数，直接发送对应的 toggle 指令
    Toggle,
    /// 图片/文件 URL，旁边带上传按钮
    Image,
    Date,
    /// 字符串集合，提交 `{"action": "add" | "remove", "value": ...}`
    Tags,
}

/// 分区标量字段：`op` 为更新指令名，`path` 为在分区 JSON 中读取当前值的路径
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub op: &'static str,
    pub path: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
}

/// 列表项字段：`name` 既是 JSON 字段名，也是 patch 指令里的 field
#[derive(Debug, Clone, Copy)]
pub struct ItemField {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
}

/// 列表编辑器：`op` 同时是分区 JSON 中的数组字段名和更新指令名
#[derive(Debug, Clone, Copy)]
pub struct ListSpec {
    pub op: &'static str,
    pub label: &'static str,
    pub min_items: usize,
    pub fields: &'static [ItemField],
}

pub const fn field(
    op: &'static str,
    path: &'static str,
    label: &'static str,
    kind: FieldKind,
) -> FieldSpec {
    FieldSpec { op, path, label, kind }
}

pub const fn item(name: &'static str, label: &'static str, kind: FieldKind) -> ItemField {
    ItemField { name, label, kind }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_int_follows_leading_digits() {
        assert_eq!(parse_int("42"), 42);
        assert_eq!(parse_int("  7 "), 7);
        assert_eq!(parse_int("12abc"), 12);
        assert_eq!(parse_int("-3"), -3);
        assert_eq!(parse_int("12.9"), 12);
        assert_eq!(parse_int("abc"), 0);
        assert_eq!(parse_int(""), 0);
        assert_eq!(parse_int("-"), 0);
    }

    #[test]
    fn parse_int_saturates_huge_values() {
        assert_eq!(parse_int("99999999999999999999"), i64::MAX);
        assert_eq!(parse_int("-99999999999999999999"), -i64::MAX);
        assert_eq!(parse_int("9223372036854775807"), i64::MAX);
    }

    #[test]
    fn parse_float_takes_numeric_prefix() {
        assert_eq!(parse_float("2.5s"), 2.5);
        assert_eq!(parse_float(".5"), 0.5);
        assert_eq!(parse_float("1e3"), 1000.0);
        assert_eq!(parse_float("1e"), 1.0);
        assert_eq!(parse_float("-0.25"), -0.25);
        assert_eq!(parse_float("NaN"), 0.0);
        assert_eq!(parse_float("abc"), 0.0);
        assert_eq!(parse_float("."), 0.0);
    }

    #[test]
    fn number_input_accepts_strings_and_numbers() {
        let from_text: NumberInput = serde_json::from_value(serde_json::json!("abc")).unwrap();
        assert_eq!(from_text.as_int(), 0);
        let from_text: NumberInput = serde_json::from_value(serde_json::json!("1500")).unwrap();
        assert_eq!(from_text.as_count(), 1500);
        let from_number: NumberInput = serde_json::from_value(serde_json::json!(3.7)).unwrap();
        assert_eq!(from_number.as_int(), 3);
        assert_eq!(from_number.as_float(), 3.7);
        assert_eq!(NumberInput::Text("-8".into()).as_count(), 0);
    }

    #[test]
    fn percent_is_clamped() {
        assert_eq!(percent(50.0, 200.0), 25.0);
        assert_eq!(percent(250_000.0, 100_000.0), 100.0);
        assert_eq!(percent(-10.0, 100.0), 0.0);
        assert_eq!(percent(10.0, 0.0), 0.0);
        assert_eq!(percent(f64::NAN, 100.0), 0.0);
    }

    #[test]
    fn hex_color_validation() {
        assert_eq!(HexColor::parse("#FFF").unwrap().as_str(), "#fff");
        assert_eq!(HexColor::parse(" #1a2b3c ").unwrap().as_str(), "#1a2b3c");
        assert!(HexColor::parse("red").is_none());
        assert!(HexColor::parse("#12345").is_none());
        assert!(serde_json::from_value::<HexColor>(serde_json::json!("blue")).is_err());
    }
}
