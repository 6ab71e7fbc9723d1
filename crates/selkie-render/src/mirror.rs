//! Read-back of the engine result and the Y mirror into scene space.
//!
//! The engine reports boxes with a bottom-left origin and Y growing upward. The scene wants a
//! top-left origin with Y growing downward, and a margin around everything.

use crate::Result;
use crate::builder::GraphTables;
use crate::geom::{Point, Rect, from_engine, point, rect};
use indexmap::IndexMap;
use lamantin::{BoundingBox, Context, GraphRecord};
use selkie_core::{EntityId, LinkId};

/// Blank space kept around the drawing.
pub const MARGIN: f64 = 6.0;

/// An engine-space box (Y up).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxInfo {
    pub ll: Point,
    pub ur: Point,
}

impl BoxInfo {
    pub fn new(ll: Point, ur: Point) -> Self {
        Self { ll, ur }
    }

    fn from_engine(bb: BoundingBox) -> Self {
        Self {
            ll: from_engine(bb.ll),
            ur: from_engine(bb.ur),
        }
    }

    pub fn width(&self) -> f64 {
        self.ur.x - self.ll.x
    }

    pub fn height(&self) -> f64 {
        self.ur.y - self.ll.y
    }
}

/// `y -> max_y + MARGIN - y`, where `max_y` is the top of the engine drawing.
///
/// This is not an involution: mirroring already mirrored boxes measures a new `max_y`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YMirror {
    max_y: f64,
}

impl YMirror {
    pub fn new(max_y: f64) -> Self {
        Self { max_y }
    }

    /// Mirror over the highest upper edge of `boxes` (zero when there are none).
    pub fn over<'a>(boxes: impl IntoIterator<Item = &'a BoxInfo>) -> Self {
        let max_y = boxes
            .into_iter()
            .map(|b| b.ur.y)
            .fold(None, |acc: Option<f64>, y| Some(acc.map_or(y, |m| m.max(y))));
        Self::new(max_y.unwrap_or(0.0))
    }

    pub fn max_y(&self) -> f64 {
        self.max_y
    }

    pub fn y(&self, y: f64) -> f64 {
        self.max_y + MARGIN - y
    }

    pub fn point(&self, p: Point) -> Point {
        point(p.x, self.y(p.y))
    }

    /// Scene rectangle of an engine box: its corner is the mirrored upper-left corner.
    pub fn rect(&self, b: &BoxInfo) -> Rect {
        rect(b.ll.x, self.y(b.ur.y), b.width(), b.height())
    }

    /// The box occupying the mirrored area, expressed again as lower-left / upper-right.
    pub fn mirrored(&self, b: &BoxInfo) -> BoxInfo {
        BoxInfo::new(point(b.ll.x, self.y(b.ur.y)), point(b.ur.x, self.y(b.ll.y)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeGeometry {
    pub link: LinkId,
    /// Engine-space polyline from the `entity1` end to the `entity2` end.
    pub points: Vec<Point>,
    pub label_pos: Option<Point>,
    pub tail_label_pos: Option<Point>,
    pub head_label_pos: Option<Point>,
    pub minlen: u32,
}

/// Everything the scene needs from one layout run, copied out of the engine context.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutSnapshot {
    pub nodes: IndexMap<EntityId, BoxInfo>,
    pub clusters: IndexMap<EntityId, BoxInfo>,
    pub edges: Vec<EdgeGeometry>,
    pub mirror: YMirror,
}

impl LayoutSnapshot {
    pub fn extract(ctx: &Context, tables: &GraphTables) -> Result<Self> {
        let mut nodes = IndexMap::new();
        for (&entity, &node) in &tables.nodes {
            match ctx.node_box(node) {
                Some(bb) => {
                    nodes.insert(entity, BoxInfo::from_engine(bb));
                }
                None => tracing::warn!(entity = entity.index(), "node has no layout box"),
            }
        }

        let mut clusters = IndexMap::new();
        for (&group, &subgraph) in &tables.clusters {
            match ctx.graph_record(subgraph) {
                Some(GraphRecord::Cluster(info)) => {
                    clusters.insert(group, BoxInfo::from_engine(info.bb));
                }
                _ => tracing::warn!(group = group.index(), "subgraph has no cluster record, skipped"),
            }
        }

        let mut edges = Vec::with_capacity(tables.edges.len());
        for projected in &tables.edges {
            let Some(route) = ctx.edge_route(projected.edge) else {
                tracing::debug!(link = projected.link.index(), "edge has no route");
                continue;
            };
            let minlen = ctx
                .attr(projected.edge, "minlen")
                .and_then(|v| v.parse().ok())
                .unwrap_or(1);
            edges.push(EdgeGeometry {
                link: projected.link,
                points: route.points.iter().copied().map(from_engine).collect(),
                label_pos: route.label_pos.map(from_engine),
                tail_label_pos: route.tail_label_pos.map(from_engine),
                head_label_pos: route.head_label_pos.map(from_engine),
                minlen,
            });
        }

        let mirror = YMirror::over(nodes.values().chain(clusters.values()));
        Ok(Self {
            nodes,
            clusters,
            edges,
            mirror,
        })
    }

    pub fn edge(&self, link: LinkId) -> Option<&EdgeGeometry> {
        self.edges.iter().find(|e| e.link == link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxes() -> Vec<BoxInfo> {
        vec![
            BoxInfo::new(point(0.0, 0.0), point(54.0, 36.0)),
            BoxInfo::new(point(0.0, 108.0), point(54.0, 144.0)),
        ]
    }

    #[test]
    fn mirror_flips_orientation() {
        let boxes = boxes();
        let m = YMirror::over(&boxes);
        assert_eq!(m.max_y(), 144.0);
        let low = m.rect(&boxes[0]);
        let high = m.rect(&boxes[1]);
        // The box lowest in engine space ends up at the bottom of the scene.
        assert!(high.origin.y < low.origin.y);
        assert_eq!(high.origin.y, MARGIN);
        assert_eq!(low.origin.y, 144.0 + MARGIN - 36.0);
        assert_eq!(low.size.height, 36.0);
    }

    #[test]
    fn mirroring_twice_shifts_by_the_margin() {
        let boxes = boxes();
        let first = YMirror::over(&boxes);
        let mirrored: Vec<BoxInfo> = boxes.iter().map(|b| first.mirrored(b)).collect();
        let second = YMirror::over(&mirrored);
        for (orig, again) in boxes.iter().zip(&mirrored) {
            let back = second.mirrored(again);
            assert_eq!(back.ll.y, orig.ll.y + MARGIN);
            assert_eq!(back.ur.y, orig.ur.y + MARGIN);
        }
    }

    #[test]
    fn no_boxes_mirror_around_zero() {
        let m = YMirror::over(std::iter::empty());
        assert_eq!(m.y(0.0), MARGIN);
    }
}
