use serde::{Deserialize, Serialize};

use crate::section::field::{FieldKind, FieldSpec, HexColor, ListSpec, field};
use crate::section::list::{ListEditor, ListOp};
use crate::section::{Outcome, Section, SectionKey};
use crate::sections::common::{Alignment, ButtonStyle, CtaButton, ThemeColor};
use crate::sections::hero::BUTTON_FIELDS;
use crate::sections::{assign, flip};

/// 行动号召
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CtaSection {
    pub heading: String,
    pub description: String,
    pub background_color: ThemeColor,
    pub text_color: HexColor,
    pub alignment: Alignment,
    pub buttons: Vec<CtaButton>,
    pub is_visible: bool,
}

impl Default for CtaSection {
    fn default() -> Self {
        Self {
            heading: "Make a Difference Today".into(),
            description: "Your support provides food, shelter and education to those who need it most.".into(),
            background_color: ThemeColor::Primary,
            text_color: HexColor::literal("#ffffff"),
            alignment: Alignment::Center,
            buttons: vec![
                CtaButton::new("donate", "Donate Now", "/donate", ButtonStyle::Solid),
                CtaButton::new("volunteer", "Become a Volunteer", "/volunteer", ButtonStyle::Outline),
            ],
            is_visible: true,
        }
    }
}

#[derive(Deserialize)]
#[serde(tag = "op", content = "args", rename_all = "snake_case")]
pub enum CtaUpdate {
    SetHeading(String),
    SetDescription(String),
    SetBackgroundColor(ThemeColor),
    SetTextColor(HexColor),
    SetAlignment(Alignment),
    ToggleVisible,
    Buttons(ListOp<CtaButton>),
}

const FIELDS: &[FieldSpec] = &[
    field("set_heading", "heading", "标题", FieldKind::Text),
    field("set_description", "description", "描述", FieldKind::TextArea),
    field("set_background_color", "background_color", "背景色", FieldKind::Select(ThemeColor::OPTIONS)),
    field("set_text_color", "text_color", "文字颜色", FieldKind::Color),
    field("set_alignment", "alignment", "对齐方式", FieldKind::Select(Alignment::OPTIONS)),
    field("toggle_visible", "is_visible", "显示该分区", FieldKind::Toggle),
];

const LISTS: &[ListSpec] = &[ListSpec {
    op: "buttons",
    label: "按钮",
    min_items: 1,
    fields: BUTTON_FIELDS,
}];

impl Section for CtaSection {
    const KEY: SectionKey = SectionKey::Cta;
    type Update = CtaUpdate;

    fn apply(&mut self, update: CtaUpdate) -> Outcome {
        match update {
            CtaUpdate::SetHeading(v) => assign(&mut self.heading, v),
            CtaUpdate::SetDescription(v) => assign(&mut self.description, v),
            CtaUpdate::SetBackgroundColor(v) => assign(&mut self.background_color, v),
            CtaUpdate::SetTextColor(v) => assign(&mut self.text_color, v),
            CtaUpdate::SetAlignment(v) => assign(&mut self.alignment, v),
            CtaUpdate::ToggleVisible => flip(&mut self.is_visible),
            CtaUpdate::Buttons(op) => ListEditor::new(&mut self.buttons).with_min(1).apply(op),
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
    use crate::section::list::Flag;

    fn remove(id: &str) -> CtaUpdate {
        CtaUpdate::Buttons(ListOp::Remove { id: id.into() })
    }

    #[test]
    fn two_buttons_down_to_one_and_no_further() {
        let mut cta = CtaSection::default();
        assert_eq!(cta.buttons.len(), 2);

        assert_eq!(cta.apply(remove("volunteer")), Outcome::Applied);
        assert_eq!(cta.buttons.len(), 1);

        assert!(matches!(cta.apply(remove("donate")), Outcome::Refused(_)));
        assert_eq!(cta.buttons.len(), 1);
        assert_eq!(cta.buttons[0].id, "donate");
    }

    #[test]
    fn button_visibility_double_toggle() {
        let mut cta = CtaSection::default();
        let toggle = || CtaUpdate::Buttons(ListOp::Toggle {
            id: "donate".into(),
            flag: Flag::Visible,
        });
        cta.apply(toggle());
        assert!(!cta.buttons[0].is_visible);
        cta.apply(toggle());
        assert_eq!(cta, CtaSection::default());
    }

    #[test]
    fn setting_same_heading_is_ignored() {
        let mut cta = CtaSection::default();
        assert_eq!(
            cta.apply(CtaUpdate::SetHeading("Make a Difference Today".into())),
            Outcome::Ignored
        );
    }
}
