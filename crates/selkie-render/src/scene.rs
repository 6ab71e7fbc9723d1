//! Drawable scene: positioned diagram elements plus the primitives that paint them.
//!
//! Scene space has its origin at the top-left corner and Y growing downward.

use crate::geom::{Point, Rect};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenePoint {
    pub x: f64,
    pub y: f64,
}

impl From<Point> for ScenePoint {
    fn from(p: Point) -> Self {
        Self { x: p.x, y: p.y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SceneRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl SceneRect {
    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn contains(&self, other: &SceneRect, eps: f64) -> bool {
        other.x + eps >= self.x
            && other.y + eps >= self.y
            && other.max_x() <= self.max_x() + eps
            && other.max_y() <= self.max_y() + eps
    }
}

impl From<Rect> for SceneRect {
    fn from(r: Rect) -> Self {
        Self {
            x: r.origin.x,
            y: r.origin.y,
            width: r.size.width,
            height: r.size.height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    /// Engine node name.
    pub id: String,
    /// Entity code.
    pub entity: String,
    pub rect: SceneRect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneCluster {
    pub id: String,
    pub entity: String,
    pub rect: SceneRect,
    pub title: Option<SceneRect>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneEdge {
    /// Declaration index of the link.
    pub link: usize,
    pub from: String,
    pub to: String,
    pub minlen: u32,
    pub points: Vec<ScenePoint>,
    pub label: Option<SceneRect>,
    pub tail_label: Option<SceneRect>,
    pub head_label: Option<SceneRect>,
    pub dashed: bool,
}

/// A note drawn next to the entity it was linked to, instead of as a node of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteAttachment {
    pub note: String,
    pub sibling: String,
    pub rect: SceneRect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Primitive {
    Rect {
        rect: SceneRect,
        corner_radius: f64,
    },
    Polyline {
        points: Vec<ScenePoint>,
        dashed: bool,
    },
    Polygon {
        points: Vec<ScenePoint>,
        filled: bool,
    },
    Ellipse {
        center: ScenePoint,
        rx: f64,
        ry: f64,
    },
    Text {
        /// Left end of the baseline.
        at: ScenePoint,
        text: String,
        font_size: f64,
        font_family: Option<String>,
    },
}

impl Primitive {
    pub fn translated(self, dx: f64, dy: f64) -> Self {
        let shift = |p: ScenePoint| ScenePoint {
            x: p.x + dx,
            y: p.y + dy,
        };
        match self {
            Self::Rect {
                rect,
                corner_radius,
            } => Self::Rect {
                rect: SceneRect {
                    x: rect.x + dx,
                    y: rect.y + dy,
                    ..rect
                },
                corner_radius,
            },
            Self::Polyline { points, dashed } => Self::Polyline {
                points: points.into_iter().map(shift).collect(),
                dashed,
            },
            Self::Polygon { points, filled } => Self::Polygon {
                points: points.into_iter().map(shift).collect(),
                filled,
            },
            Self::Ellipse { center, rx, ry } => Self::Ellipse {
                center: shift(center),
                rx,
                ry,
            },
            Self::Text {
                at,
                text,
                font_size,
                font_family,
            } => Self::Text {
                at: shift(at),
                text,
                font_size,
                font_family,
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub width: f64,
    pub height: f64,
    pub nodes: Vec<SceneNode>,
    pub clusters: Vec<SceneCluster>,
    pub edges: Vec<SceneEdge>,
    pub attachments: Vec<NoteAttachment>,
    /// Paint order: earlier primitives are drawn first.
    pub primitives: Vec<Primitive>,
}

impl Scene {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.clusters.is_empty() && self.primitives.is_empty()
    }

    pub fn node(&self, entity: &str) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.entity == entity)
    }

    pub fn cluster(&self, entity: &str) -> Option<&SceneCluster> {
        self.clusters.iter().find(|c| c.entity == entity)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
