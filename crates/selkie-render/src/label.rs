//! Link label and quantifier blocks.
//!
//! The same blocks size the engine's label boxes and are drawn by the scene assembler, so both
//! always agree on their dimension.

use crate::block::{HorizontalAlignment, Margins, TextBlock};
use crate::config::RenderConfig;
use crate::text::TextMeasurer;
use selkie_core::{Diagram, DiagramKind, Link, NotePosition};

const LABEL_MARGIN: f64 = 1.0;
const VISIBILITY_MARGIN: Margins = Margins::new(0.0, 1.0, 2.0, 0.0);

#[derive(Debug, Clone, PartialEq)]
pub struct LinkBlocks {
    pub label: TextBlock,
    pub quantifier1: Option<TextBlock>,
    pub quantifier2: Option<TextBlock>,
}

impl LinkBlocks {
    pub fn compose(
        diagram: &Diagram,
        link: &Link,
        measurer: &dyn TextMeasurer,
        config: &RenderConfig,
    ) -> Self {
        Self {
            label: link_label(diagram, link, measurer, config),
            quantifier1: quantifier(link.quantifier1.as_deref(), measurer, config),
            quantifier2: quantifier(link.quantifier2.as_deref(), measurer, config),
        }
    }
}

/// Label text with its optional visibility glyph, merged with the link note when there is one.
pub fn link_label(
    diagram: &Diagram,
    link: &Link,
    measurer: &dyn TextMeasurer,
    config: &RenderConfig,
) -> TextBlock {
    let style = config.text_style();
    let mut label = match link.label.as_deref() {
        Some(text) if !text.is_empty() => {
            let align = if diagram.kind == DiagramKind::State {
                config.state_message_alignment
            } else {
                HorizontalAlignment::Center
            };
            let mut block = TextBlock::text(text, &style, align, measurer);
            if let Some(modifier) = link.visibility {
                let glyph = TextBlock::Visibility {
                    modifier,
                    size: config.visibility_icon_size,
                }
                .with_margin(VISIBILITY_MARGIN);
                block = TextBlock::merge_lr(glyph, block);
            }
            block.with_margin(Margins::uniform(LABEL_MARGIN))
        }
        _ => TextBlock::Empty,
    };

    if let Some(note) = &link.note {
        let note_block = TextBlock::note(TextBlock::text(
            &note.text,
            &style,
            HorizontalAlignment::Left,
            measurer,
        ));
        label = match note.position {
            NotePosition::Left => TextBlock::merge_lr(note_block, label),
            NotePosition::Right => TextBlock::merge_lr(label, note_block),
            NotePosition::Top => {
                TextBlock::merge_tb(note_block, label, HorizontalAlignment::Center)
            }
            NotePosition::Bottom => {
                TextBlock::merge_tb(label, note_block, HorizontalAlignment::Center)
            }
        };
    }
    label
}

/// `None` when the quantifier is absent; an empty block (without margin) when it is blank.
pub fn quantifier(
    text: Option<&str>,
    measurer: &dyn TextMeasurer,
    config: &RenderConfig,
) -> Option<TextBlock> {
    let text = text?;
    let block = TextBlock::text(
        text,
        &config.text_style(),
        HorizontalAlignment::Center,
        measurer,
    );
    if block.is_empty() {
        return Some(block);
    }
    Some(block.with_margin(Margins::uniform(LABEL_MARGIN)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::size;
    use crate::text::{DeterministicTextMeasurer, TextStyle};
    use selkie_core::{LeafKind, VisibilityModifier};

    fn setup() -> (Diagram, Link) {
        let mut d = Diagram::new(DiagramKind::Class);
        let a = d.add_leaf("A", LeafKind::Class, None).unwrap();
        let b = d.add_leaf("B", LeafKind::Class, None).unwrap();
        (d, Link::between(a, b))
    }

    fn assert_size(actual: crate::geom::Size, width: f64, height: f64) {
        assert!((actual.width - width).abs() < 1e-9, "{actual:?} vs {width}");
        assert!((actual.height - height).abs() < 1e-9, "{actual:?} vs {height}");
    }

    fn measured(text: &str) -> crate::geom::Size {
        let m = DeterministicTextMeasurer::default();
        let metrics = m.measure(text, &RenderConfig::default().text_style());
        size(metrics.width, metrics.height)
    }

    #[test]
    fn unlabeled_links_have_an_empty_label() {
        let (d, link) = setup();
        let blocks = LinkBlocks::compose(
            &d,
            &link,
            &DeterministicTextMeasurer::default(),
            &RenderConfig::default(),
        );
        assert!(blocks.label.is_empty());
        assert!(blocks.quantifier1.is_none());
        assert!(blocks.quantifier2.is_none());
    }

    #[test]
    fn label_gets_a_one_unit_margin() {
        let (d, link) = setup();
        let link = link.with_label("owns");
        let label = link_label(
            &d,
            &link,
            &DeterministicTextMeasurer::default(),
            &RenderConfig::default(),
        );
        let m = measured("owns");
        assert_size(label.dimension(), m.width + 2.0, m.height + 2.0);
    }

    #[test]
    fn visibility_glyph_sits_left_of_the_label() {
        let (d, link) = setup();
        let link = link
            .with_label("x")
            .with_visibility(VisibilityModifier::Public);
        let config = RenderConfig::default();
        let label = link_label(&d, &link, &DeterministicTextMeasurer::default(), &config);
        let m = measured("x");
        let glyph = config.visibility_icon_size;
        assert_size(
            label.dimension(),
            m.width + glyph + 1.0 + 2.0,
            m.height.max(glyph + 2.0) + 2.0,
        );
    }

    #[test]
    fn notes_take_the_slot_named_by_their_position() {
        let (d, link) = setup();
        let m = DeterministicTextMeasurer::default();
        let config = RenderConfig::default();
        let left = link_label(
            &d,
            &link.clone().with_label("l").with_note("n", NotePosition::Left),
            &m,
            &config,
        );
        let top = link_label(
            &d,
            &link.with_label("l").with_note("n", NotePosition::Top),
            &m,
            &config,
        );
        assert!(matches!(left, TextBlock::Row(ref a, _) if matches!(**a, TextBlock::Note(_))));
        assert!(matches!(top, TextBlock::Column { ref top, .. } if matches!(**top, TextBlock::Note(_))));
    }

    #[test]
    fn blank_quantifiers_are_present_but_empty() {
        let m = DeterministicTextMeasurer::default();
        let config = RenderConfig::default();
        assert_eq!(quantifier(Some(""), &m, &config), Some(TextBlock::Empty));
        let one = quantifier(Some("1"), &m, &config).unwrap();
        let style = TextStyle::default();
        let metrics = m.measure("1", &style);
        assert_size(one.dimension(), metrics.width + 2.0, metrics.height + 2.0);
    }
}
