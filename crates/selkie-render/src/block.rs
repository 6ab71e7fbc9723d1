//! Composable text blocks.
//!
//! A [`TextBlock`] knows its own dimension and how to paint itself at a top-left origin. Blocks
//! are built once per render and shared between graph export (size hints) and scene assembly.

use crate::geom::{Point, Size, point, size};
use crate::scene::{Primitive, ScenePoint, SceneRect};
use crate::text::{DeterministicTextMeasurer, TextMeasurer, TextStyle};
use selkie_core::VisibilityModifier;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HorizontalAlignment {
    Left,
    #[default]
    Center,
    Right,
}

impl HorizontalAlignment {
    fn offset(self, available: f64, used: f64) -> f64 {
        match self {
            Self::Left => 0.0,
            Self::Center => (available - used) / 2.0,
            Self::Right => available - used,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Margins {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Margins {
    pub const fn new(left: f64, right: f64, top: f64, bottom: f64) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
        }
    }

    pub const fn uniform(v: f64) -> Self {
        Self::new(v, v, v, v)
    }
}

const NOTE_PADDING_X: f64 = 6.0;
const NOTE_PADDING_Y: f64 = 5.0;
/// Size of the folded corner of a note.
pub const NOTE_FOLD: f64 = 8.0;

#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TextBlock {
    Empty,
    Text {
        lines: Vec<TextLine>,
        line_height: f64,
        style: TextStyle,
        align: HorizontalAlignment,
    },
    Margin {
        inner: Box<TextBlock>,
        margins: Margins,
    },
    /// Two blocks side by side, vertically centered.
    Row(Box<TextBlock>, Box<TextBlock>),
    /// Two blocks stacked, each aligned inside the common width.
    Column {
        top: Box<TextBlock>,
        bottom: Box<TextBlock>,
        align: HorizontalAlignment,
    },
    /// Square visibility glyph of the given side.
    Visibility {
        modifier: VisibilityModifier,
        size: f64,
    },
    Note(Box<TextBlock>),
}

impl TextBlock {
    /// Measures `text` line by line. Text made of empty lines only yields [`TextBlock::Empty`].
    pub fn text(
        text: &str,
        style: &TextStyle,
        align: HorizontalAlignment,
        measurer: &dyn TextMeasurer,
    ) -> Self {
        let raw = DeterministicTextMeasurer::normalized_text_lines(text);
        if raw.iter().all(|l| l.is_empty()) {
            return Self::Empty;
        }
        let mut line_height: f64 = 0.0;
        let lines = raw
            .into_iter()
            .map(|text| {
                let metrics = measurer.measure(&text, style);
                line_height = line_height.max(metrics.height);
                TextLine {
                    width: metrics.width,
                    text,
                }
            })
            .collect();
        Self::Text {
            lines,
            line_height,
            style: style.clone(),
            align,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn with_margin(self, margins: Margins) -> Self {
        Self::Margin {
            inner: Box::new(self),
            margins,
        }
    }

    pub fn merge_lr(left: TextBlock, right: TextBlock) -> Self {
        Self::Row(Box::new(left), Box::new(right))
    }

    pub fn merge_tb(top: TextBlock, bottom: TextBlock, align: HorizontalAlignment) -> Self {
        Self::Column {
            top: Box::new(top),
            bottom: Box::new(bottom),
            align,
        }
    }

    pub fn note(inner: TextBlock) -> Self {
        Self::Note(Box::new(inner))
    }

    pub fn dimension(&self) -> Size {
        match self {
            Self::Empty => size(0.0, 0.0),
            Self::Text {
                lines, line_height, ..
            } => {
                let width = lines.iter().map(|l| l.width).fold(0.0, f64::max);
                size(width, line_height * lines.len() as f64)
            }
            Self::Margin { inner, margins } => {
                let d = inner.dimension();
                size(
                    d.width + margins.left + margins.right,
                    d.height + margins.top + margins.bottom,
                )
            }
            Self::Row(a, b) => {
                let (a, b) = (a.dimension(), b.dimension());
                size(a.width + b.width, a.height.max(b.height))
            }
            Self::Column { top, bottom, .. } => {
                let (a, b) = (top.dimension(), bottom.dimension());
                size(a.width.max(b.width), a.height + b.height)
            }
            Self::Visibility { size: side, .. } => size(*side, *side),
            Self::Note(inner) => {
                let d = inner.dimension();
                size(
                    d.width + 2.0 * NOTE_PADDING_X + NOTE_FOLD,
                    d.height + 2.0 * NOTE_PADDING_Y,
                )
            }
        }
    }

    /// Paints the block with its top-left corner at `origin`.
    pub fn draw(&self, origin: Point, out: &mut Vec<Primitive>) {
        match self {
            Self::Empty => {}
            Self::Text {
                lines,
                line_height,
                style,
                align,
            } => {
                let width = self.dimension().width;
                for (i, line) in lines.iter().enumerate() {
                    if line.text.is_empty() {
                        continue;
                    }
                    let x = origin.x + align.offset(width, line.width);
                    // Baseline sits one font size below the top of the line box.
                    let y = origin.y + line_height * i as f64 + style.font_size;
                    out.push(Primitive::Text {
                        at: ScenePoint { x, y },
                        text: line.text.clone(),
                        font_size: style.font_size,
                        font_family: style.font_family.clone(),
                    });
                }
            }
            Self::Margin { inner, margins } => {
                inner.draw(point(origin.x + margins.left, origin.y + margins.top), out);
            }
            Self::Row(a, b) => {
                let height = self.dimension().height;
                let (da, db) = (a.dimension(), b.dimension());
                a.draw(point(origin.x, origin.y + (height - da.height) / 2.0), out);
                b.draw(
                    point(origin.x + da.width, origin.y + (height - db.height) / 2.0),
                    out,
                );
            }
            Self::Column { top, bottom, align } => {
                let width = self.dimension().width;
                let (dt, db) = (top.dimension(), bottom.dimension());
                top.draw(point(origin.x + align.offset(width, dt.width), origin.y), out);
                bottom.draw(
                    point(
                        origin.x + align.offset(width, db.width),
                        origin.y + dt.height,
                    ),
                    out,
                );
            }
            Self::Visibility { modifier, size } => {
                draw_visibility(*modifier, origin, *size, out);
            }
            Self::Note(inner) => {
                let d = self.dimension();
                out.push(Primitive::Polygon {
                    points: note_outline(origin, d),
                    filled: false,
                });
                inner.draw(
                    point(origin.x + NOTE_PADDING_X, origin.y + NOTE_PADDING_Y),
                    out,
                );
            }
        }
    }
}

/// Outline of a note of dimension `d` at `origin`, with the fold on the top-right corner.
pub fn note_outline(origin: Point, d: Size) -> Vec<ScenePoint> {
    let (x, y) = (origin.x, origin.y);
    let fold = NOTE_FOLD.min(d.width).min(d.height);
    [
        (x, y),
        (x + d.width - fold, y),
        (x + d.width, y + fold),
        (x + d.width, y + d.height),
        (x, y + d.height),
    ]
    .into_iter()
    .map(|(x, y)| ScenePoint { x, y })
    .collect()
}

fn draw_visibility(modifier: VisibilityModifier, origin: Point, side: f64, out: &mut Vec<Primitive>) {
    let r = side / 2.0;
    let center = ScenePoint {
        x: origin.x + r,
        y: origin.y + r,
    };
    match modifier {
        VisibilityModifier::Private => out.push(Primitive::Rect {
            rect: SceneRect {
                x: origin.x,
                y: origin.y,
                width: side,
                height: side,
            },
            corner_radius: 0.0,
        }),
        VisibilityModifier::Protected => out.push(Primitive::Polygon {
            points: vec![
                ScenePoint {
                    x: center.x,
                    y: origin.y,
                },
                ScenePoint {
                    x: origin.x + side,
                    y: center.y,
                },
                ScenePoint {
                    x: center.x,
                    y: origin.y + side,
                },
                ScenePoint {
                    x: origin.x,
                    y: center.y,
                },
            ],
            filled: false,
        }),
        VisibilityModifier::PackagePrivate => out.push(Primitive::Polygon {
            points: vec![
                ScenePoint {
                    x: center.x,
                    y: origin.y,
                },
                ScenePoint {
                    x: origin.x + side,
                    y: origin.y + side,
                },
                ScenePoint {
                    x: origin.x,
                    y: origin.y + side,
                },
            ],
            filled: false,
        }),
        VisibilityModifier::Public => out.push(Primitive::Ellipse { center, rx: r, ry: r }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style() -> TextStyle {
        TextStyle {
            font_size: 10.0,
            ..TextStyle::default()
        }
    }

    fn text(s: &str) -> TextBlock {
        TextBlock::text(
            s,
            &style(),
            HorizontalAlignment::Center,
            &DeterministicTextMeasurer::default(),
        )
    }

    #[test]
    fn blank_text_is_empty() {
        assert!(text("").is_empty());
        assert!(text("\\n").is_empty());
        assert!(!text("x").is_empty());
    }

    #[test]
    fn margins_and_merges_add_up() {
        let owns = text("owns").with_margin(Margins::uniform(1.0));
        assert_eq!(owns.dimension(), size(26.0, 14.0));

        let row = TextBlock::merge_lr(text("ab"), text("abcd"));
        assert_eq!(row.dimension(), size(36.0, 12.0));

        let col = TextBlock::merge_tb(text("ab"), text("abcd"), HorizontalAlignment::Center);
        assert_eq!(col.dimension(), size(24.0, 24.0));
    }

    #[test]
    fn centered_lines_are_offset_inside_the_block() {
        let block = text("abcd\\nab");
        let mut out = Vec::new();
        block.draw(point(10.0, 20.0), &mut out);
        assert_eq!(out.len(), 2);
        let Primitive::Text { at, .. } = &out[1] else {
            panic!("expected text");
        };
        assert_eq!(at.x, 16.0);
        assert_eq!(at.y, 42.0);
    }

    #[test]
    fn note_block_reserves_padding_and_fold() {
        let note = TextBlock::note(text("ab"));
        assert_eq!(note.dimension(), size(12.0 + 12.0 + NOTE_FOLD, 22.0));
        let mut out = Vec::new();
        note.draw(point(0.0, 0.0), &mut out);
        assert!(matches!(out[0], Primitive::Polygon { .. }));
        assert!(matches!(out[1], Primitive::Text { .. }));
    }
}
