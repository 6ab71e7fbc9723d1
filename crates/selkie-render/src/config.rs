use crate::block::HorizontalAlignment;
use crate::text::TextStyle;
use serde::{Deserialize, Serialize};

/// Rendering knobs. Every field has a default, so partial JSON documents are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub font_size: f64,
    pub font_family: Option<String>,
    pub title_font_size: f64,
    pub visibility_icon_size: f64,
    pub default_text_alignment: HorizontalAlignment,
    /// Alignment of link labels in state diagrams.
    pub state_message_alignment: HorizontalAlignment,
    /// Engine `nodesep` override, in inches.
    pub nodesep: Option<f64>,
    /// Engine `ranksep` override, in inches.
    pub ranksep: Option<f64>,
    /// Horizontal distance between an entity and the notes absorbed next to it.
    pub absorbed_note_gap: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            font_size: 14.0,
            font_family: None,
            title_font_size: 14.0,
            visibility_icon_size: 6.0,
            default_text_alignment: HorizontalAlignment::Center,
            state_message_alignment: HorizontalAlignment::Center,
            nodesep: None,
            ranksep: None,
            absorbed_note_gap: 20.0,
        }
    }
}

impl RenderConfig {
    pub fn from_json(text: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn text_style(&self) -> TextStyle {
        TextStyle {
            font_family: self.font_family.clone(),
            font_size: self.font_size,
            font_weight: None,
        }
    }

    pub fn title_style(&self) -> TextStyle {
        TextStyle {
            font_family: self.font_family.clone(),
            font_size: self.title_font_size,
            font_weight: Some("bold".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = RenderConfig::from_json(
            r#"{ "font_size": 12, "state_message_alignment": "left", "nodesep": 0.5 }"#,
        )
        .unwrap();
        assert_eq!(config.font_size, 12.0);
        assert_eq!(config.state_message_alignment, HorizontalAlignment::Left);
        assert_eq!(config.nodesep, Some(0.5));
        assert_eq!(config.ranksep, None);
        assert_eq!(config.absorbed_note_gap, 20.0);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(RenderConfig::from_json("{ font_size: }").is_err());
    }
}
