//! Entity images: the opaque drawables that stand for leaf entities.

use crate::block::{HorizontalAlignment, TextBlock};
use crate::config::RenderConfig;
use crate::geom::{Point, Size, point, size};
use crate::scene::{Primitive, ScenePoint, SceneRect};
use crate::text::{TextMeasurer, TextStyle};
use selkie_core::{Diagram, Entity, LeafKind};
use std::fmt::Debug;
use std::sync::Arc;

/// A prepared drawable with a fixed dimension.
pub trait EntityImage: Send + Sync + Debug {
    fn dimension(&self) -> Size;

    /// Paints the image with its top-left corner at `origin`.
    fn draw(&self, origin: Point, out: &mut Vec<Primitive>);
}

pub trait ImageFactory: Send + Sync + Debug {
    fn create(
        &self,
        entity: &Entity,
        diagram: &Diagram,
        measurer: &dyn TextMeasurer,
        config: &RenderConfig,
    ) -> Arc<dyn EntityImage>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Box,
    Rounded,
    Note,
    Folder,
    Ellipse,
    Actor,
    Component,
}

impl ShapeKind {
    pub fn for_leaf(kind: LeafKind) -> Self {
        match kind {
            LeafKind::Class
            | LeafKind::AbstractClass
            | LeafKind::Interface
            | LeafKind::Enum
            | LeafKind::Object
            | LeafKind::Description => Self::Box,
            LeafKind::State => Self::Rounded,
            LeafKind::Note => Self::Note,
            LeafKind::EmptyPackage => Self::Folder,
            LeafKind::UseCase => Self::Ellipse,
            LeafKind::Actor => Self::Actor,
            LeafKind::Component => Self::Component,
        }
    }
}

const PADDING_X: f64 = 10.0;
const PADDING_Y: f64 = 6.0;
const MIN_WIDTH: f64 = 40.0;
const MIN_HEIGHT: f64 = 32.0;
const FOLDER_TAB: f64 = 10.0;
const ACTOR_FIGURE: (f64, f64) = (28.0, 40.0);
const COMPONENT_TAB: (f64, f64) = (10.0, 6.0);

#[derive(Debug, Clone)]
pub struct ShapeImage {
    shape: ShapeKind,
    body: TextBlock,
    dimension: Size,
}

impl ShapeImage {
    pub fn new(shape: ShapeKind, body: TextBlock) -> Self {
        let d = body.dimension();
        let dimension = match shape {
            ShapeKind::Note => d,
            ShapeKind::Ellipse => size(
                (d.width * 1.3 + 2.0 * PADDING_X).max(MIN_WIDTH),
                (d.height * 1.3 + 2.0 * PADDING_Y).max(MIN_HEIGHT),
            ),
            ShapeKind::Actor => size(
                d.width.max(ACTOR_FIGURE.0),
                ACTOR_FIGURE.1 + d.height,
            ),
            ShapeKind::Folder => size(
                (d.width + 2.0 * PADDING_X).max(MIN_WIDTH),
                (d.height + 2.0 * PADDING_Y + FOLDER_TAB).max(MIN_HEIGHT),
            ),
            ShapeKind::Component => size(
                (d.width + 2.0 * PADDING_X + COMPONENT_TAB.0).max(MIN_WIDTH),
                (d.height + 2.0 * PADDING_Y).max(MIN_HEIGHT),
            ),
            ShapeKind::Box | ShapeKind::Rounded => size(
                (d.width + 2.0 * PADDING_X).max(MIN_WIDTH),
                (d.height + 2.0 * PADDING_Y).max(MIN_HEIGHT),
            ),
        };
        Self {
            shape,
            body,
            dimension,
        }
    }

    pub fn shape(&self) -> ShapeKind {
        self.shape
    }

    fn frame(&self, origin: Point) -> SceneRect {
        SceneRect {
            x: origin.x,
            y: origin.y,
            width: self.dimension.width,
            height: self.dimension.height,
        }
    }

    fn draw_body_centered(&self, area: SceneRect, out: &mut Vec<Primitive>) {
        let d = self.body.dimension();
        self.body.draw(
            point(
                area.x + (area.width - d.width) / 2.0,
                area.y + (area.height - d.height) / 2.0,
            ),
            out,
        );
    }
}

impl EntityImage for ShapeImage {
    fn dimension(&self) -> Size {
        self.dimension
    }

    fn draw(&self, origin: Point, out: &mut Vec<Primitive>) {
        let frame = self.frame(origin);
        match self.shape {
            ShapeKind::Note => {
                self.body.draw(origin, out);
                return;
            }
            ShapeKind::Box => out.push(Primitive::Rect {
                rect: frame,
                corner_radius: 0.0,
            }),
            ShapeKind::Rounded => out.push(Primitive::Rect {
                rect: frame,
                corner_radius: 10.0,
            }),
            ShapeKind::Ellipse => out.push(Primitive::Ellipse {
                center: ScenePoint {
                    x: frame.x + frame.width / 2.0,
                    y: frame.y + frame.height / 2.0,
                },
                rx: frame.width / 2.0,
                ry: frame.height / 2.0,
            }),
            ShapeKind::Folder => {
                out.push(Primitive::Rect {
                    rect: SceneRect {
                        x: frame.x,
                        y: frame.y,
                        width: (frame.width / 3.0).max(FOLDER_TAB * 2.0),
                        height: FOLDER_TAB,
                    },
                    corner_radius: 0.0,
                });
                let body = SceneRect {
                    y: frame.y + FOLDER_TAB,
                    height: frame.height - FOLDER_TAB,
                    ..frame
                };
                out.push(Primitive::Rect {
                    rect: body,
                    corner_radius: 0.0,
                });
                self.draw_body_centered(body, out);
                return;
            }
            ShapeKind::Component => {
                out.push(Primitive::Rect {
                    rect: frame,
                    corner_radius: 0.0,
                });
                for k in [1.0, 3.0] {
                    out.push(Primitive::Rect {
                        rect: SceneRect {
                            x: frame.x - COMPONENT_TAB.0 / 2.0,
                            y: frame.y + k * frame.height / 5.0,
                            width: COMPONENT_TAB.0,
                            height: COMPONENT_TAB.1,
                        },
                        corner_radius: 0.0,
                    });
                }
            }
            ShapeKind::Actor => {
                let cx = frame.x + frame.width / 2.0;
                let top = frame.y;
                out.push(Primitive::Ellipse {
                    center: ScenePoint { x: cx, y: top + 6.0 },
                    rx: 6.0,
                    ry: 6.0,
                });
                let p = |x: f64, y: f64| ScenePoint { x, y };
                for points in [
                    vec![p(cx, top + 12.0), p(cx, top + 28.0)],
                    vec![p(cx - 12.0, top + 17.0), p(cx + 12.0, top + 17.0)],
                    vec![p(cx - 10.0, top + 40.0), p(cx, top + 28.0), p(cx + 10.0, top + 40.0)],
                ] {
                    out.push(Primitive::Polyline {
                        points,
                        dashed: false,
                    });
                }
                let d = self.body.dimension();
                self.body.draw(
                    point(cx - d.width / 2.0, top + ACTOR_FIGURE.1),
                    out,
                );
                return;
            }
        }
        self.draw_body_centered(frame, out);
    }
}

/// Builds [`ShapeImage`]s from the entity kind, display lines and stereotype.
#[derive(Debug, Clone, Default)]
pub struct DefaultImageFactory;

impl ImageFactory for DefaultImageFactory {
    fn create(
        &self,
        entity: &Entity,
        _diagram: &Diagram,
        measurer: &dyn TextMeasurer,
        config: &RenderConfig,
    ) -> Arc<dyn EntityImage> {
        let style = config.text_style();
        let shape = ShapeKind::for_leaf(entity.leaf_kind().unwrap_or(LeafKind::EmptyPackage));
        let align = match shape {
            ShapeKind::Note => HorizontalAlignment::Left,
            _ => config.default_text_alignment,
        };

        let mut body = TextBlock::text(&entity.title(), &style, align, measurer);
        if let Some(stereotype) = entity.stereotype.as_deref().filter(|s| !s.is_empty()) {
            let small = TextStyle {
                font_size: (style.font_size - 2.0).max(1.0),
                ..style.clone()
            };
            let header = TextBlock::text(
                &format!("\u{ab}{stereotype}\u{bb}"),
                &small,
                HorizontalAlignment::Center,
                measurer,
            );
            body = TextBlock::merge_tb(header, body, HorizontalAlignment::Center);
        }
        if shape == ShapeKind::Note {
            body = TextBlock::note(body);
        }
        Arc::new(ShapeImage::new(shape, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::DeterministicTextMeasurer;
    use selkie_core::DiagramKind;

    #[test]
    fn boxes_have_a_minimum_size() {
        let mut d = Diagram::new(DiagramKind::Class);
        let a = d.add_leaf("A", LeafKind::Class, None).unwrap();
        let img = DefaultImageFactory.create(
            d.entity(a).unwrap(),
            &d,
            &DeterministicTextMeasurer::default(),
            &RenderConfig::default(),
        );
        assert_eq!(img.dimension(), size(MIN_WIDTH, MIN_HEIGHT));
    }

    #[test]
    fn long_titles_widen_the_box() {
        let mut d = Diagram::new(DiagramKind::Class);
        let a = d
            .add_leaf("AVeryLongClassName", LeafKind::Class, None)
            .unwrap();
        let config = RenderConfig::default();
        let img = DefaultImageFactory.create(
            d.entity(a).unwrap(),
            &d,
            &DeterministicTextMeasurer::default(),
            &config,
        );
        let text = 18.0 * config.font_size * 0.6;
        assert!((img.dimension().width - (text + 2.0 * PADDING_X)).abs() < 1e-9);
    }

    #[test]
    fn notes_draw_their_outline_first() {
        let mut d = Diagram::new(DiagramKind::Class);
        let n = d.add_leaf("N", LeafKind::Note, None).unwrap();
        let img = DefaultImageFactory.create(
            d.entity(n).unwrap(),
            &d,
            &DeterministicTextMeasurer::default(),
            &RenderConfig::default(),
        );
        let mut out = Vec::new();
        img.draw(point(0.0, 0.0), &mut out);
        assert!(matches!(out.first(), Some(Primitive::Polygon { .. })));
    }
}
