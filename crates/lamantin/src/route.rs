//! Edge end points and the final write-back into engine space.

use crate::attrs::CLUSTER_MARGIN;
use crate::geom::{BoundingBox, Frame, Point, Size};
use crate::graph::{Arena, ClusterInfo, EdgeId, EdgeRoute, GraphInfo, GraphRecord, SubgraphId};
use crate::layout::{Placement, Routed};
use dugong::util::{Rect, intersect_rect};
use rustc_hash::FxHashMap;

/// Horizontal reach of a self-loop beyond the node's right side.
const LOOP_REACH: f64 = 18.0;
/// Distance between an end label and the point where the edge meets its node.
const END_LABEL_OFFSET: f64 = 4.0;

/// Converts top-down drawing coordinates to Y-up engine coordinates.
#[derive(Debug, Clone, Copy)]
struct YUp(f64);

impl YUp {
    fn point(self, p: Point) -> Point {
        Point::new(p.x, self.0 - p.y)
    }

    fn frame(self, f: Frame) -> BoundingBox {
        BoundingBox {
            ll: Point::new(f.x, self.0 - f.max_y()),
            ur: Point::new(f.max_x(), self.0 - f.y),
        }
    }
}

/// Running extent of everything drawn.
#[derive(Debug, Clone, Copy)]
struct Extent {
    min: Point,
    max: Point,
}

impl Extent {
    fn empty() -> Self {
        Self {
            min: Point::new(f64::INFINITY, f64::INFINITY),
            max: Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    fn add_point(&mut self, p: Point) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    fn add_frame(&mut self, f: &Frame) {
        self.add_point(Point::new(f.x, f.y));
        self.add_point(Point::new(f.max_x(), f.max_y()));
    }

    fn origin(&self) -> Point {
        if self.min.x.is_finite() {
            self.min
        } else {
            Point::default()
        }
    }

    fn size(&self) -> Size {
        if self.min.x.is_finite() {
            Size::new(self.max.x - self.min.x, self.max.y - self.min.y)
        } else {
            Size::default()
        }
    }
}

/// Point where the segment from the center of `frame` towards `toward` leaves the frame.
pub(crate) fn clip_to_frame(frame: &Frame, toward: Point) -> Point {
    let c = frame.center();
    if toward == c {
        return c;
    }
    let p = intersect_rect(
        Rect {
            x: c.x,
            y: c.y,
            width: frame.width,
            height: frame.height,
        },
        dugong::Point {
            x: toward.x,
            y: toward.y,
        },
    );
    Point::new(p.x, p.y)
}

fn self_loop(frame: &Frame, label: Option<Size>) -> (Vec<Point>, Option<Point>) {
    let c = frame.center();
    let right = frame.max_x();
    let q = frame.height / 4.0;
    let reach = right + LOOP_REACH;
    let points = vec![
        Point::new(right, c.y - q),
        Point::new(reach, c.y - q),
        Point::new(reach, c.y + q),
        Point::new(right, c.y + q),
    ];
    let label = label.map(|l| Point::new(reach + 2.0 + l.width / 2.0, c.y));
    (points, label)
}

fn end_label(anchor: Point, next: Point, label: Size) -> Point {
    let dx = next.x - anchor.x;
    let dy = next.y - anchor.y;
    let len = (dx * dx + dy * dy).sqrt();
    let (ux, uy) = if len > 0.0 {
        (dx / len, dy / len)
    } else {
        (1.0, 0.0)
    };
    let along = label.height / 2.0 + END_LABEL_OFFSET;
    let side = label.width / 2.0 + END_LABEL_OFFSET;
    Point::new(
        anchor.x + ux * along - uy * side,
        anchor.y + uy * along + ux * side,
    )
}

/// Full polyline and label center of a non-loop edge.
fn through(
    tail: &Frame,
    head: &Frame,
    routed: Routed,
    label: Option<Size>,
) -> (Vec<Point>, Option<Point>) {
    let first_target = routed.bends.first().copied().unwrap_or_else(|| head.center());
    let last_source = routed.bends.last().copied().unwrap_or_else(|| tail.center());
    let mut points = Vec::with_capacity(routed.bends.len() + 2);
    points.push(clip_to_frame(tail, first_target));
    points.extend(routed.bends);
    points.push(clip_to_frame(head, last_source));

    let label_pos = match (routed.label, label) {
        (Some(p), Some(_)) => Some(p),
        (None, Some(l)) => {
            let a = points[0];
            let b = points[points.len() - 1];
            Some(Point::new(
                (a.x + b.x) / 2.0,
                (a.y + b.y) / 2.0 - l.height / 2.0 - 2.0,
            ))
        }
        (_, None) => None,
    };
    (points, label_pos)
}

/// Writes node boxes, graph records and edge routes for `root` back into the arena.
///
/// The drawing is translated so that everything drawn, labels included, starts at the origin,
/// then flipped to Y-up against its total height.
pub(crate) fn finish(arena: &mut Arena, root: SubgraphId, mut placement: Placement) {
    let mut extent = Extent::empty();
    for f in placement.nodes.values().chain(placement.clusters.values()) {
        extent.add_frame(f);
    }

    let mut routes: FxHashMap<EdgeId, EdgeRoute> = FxHashMap::default();
    for (i, edge) in arena.edges.iter().enumerate() {
        if edge.root != root {
            continue;
        }
        let (Some(tail), Some(head)) = (
            placement.nodes.get(&edge.tail),
            placement.nodes.get(&edge.head),
        ) else {
            continue;
        };
        let id = EdgeId::from_index(i);
        let (points, label_pos) = if edge.tail == edge.head {
            self_loop(tail, edge.label)
        } else {
            let routed = placement.edges.remove(&id).unwrap_or_default();
            through(tail, head, routed, edge.label)
        };

        let tail_label_pos = edge
            .tail_label
            .filter(|_| points.len() >= 2)
            .map(|l| end_label(points[0], points[1], l));
        let head_label_pos = edge.head_label.filter(|_| points.len() >= 2).map(|l| {
            let n = points.len();
            end_label(points[n - 1], points[n - 2], l)
        });

        for &p in &points {
            extent.add_point(p);
        }
        for (pos, size) in [
            (label_pos, edge.label),
            (tail_label_pos, edge.tail_label),
            (head_label_pos, edge.head_label),
        ] {
            if let (Some(p), Some(s)) = (pos, size) {
                extent.add_frame(&Frame::from_center(p, s));
            }
        }
        routes.insert(
            id,
            EdgeRoute {
                points,
                label_pos,
                tail_label_pos,
                head_label_pos,
            },
        );
    }

    let origin = extent.origin();
    let drawing = extent.size();
    let yup = YUp(drawing.height);
    let shift = |p: Point| yup.point(Point::new(p.x - origin.x, p.y - origin.y));
    let shift_frame = |f: &Frame| {
        yup.frame(Frame {
            x: f.x - origin.x,
            y: f.y - origin.y,
            ..*f
        })
    };

    for (&n, f) in &placement.nodes {
        arena.nodes[n.index()].bb = Some(shift_frame(f));
    }
    for (&g, f) in &placement.clusters {
        let label_pos = arena.graphs[g.index()].label.map(|l| {
            shift(Point::new(
                f.x + f.width / 2.0,
                f.y + CLUSTER_MARGIN / 2.0 + l.height / 2.0,
            ))
        });
        arena.graphs[g.index()].record = GraphRecord::Cluster(ClusterInfo {
            bb: shift_frame(f),
            label_pos,
        });
    }
    arena.graphs[root.index()].record = GraphRecord::Root(GraphInfo {
        bb: BoundingBox {
            ll: Point::default(),
            ur: Point::new(drawing.width, drawing.height),
        },
    });

    for (id, route) in routes {
        arena.edges[id.index()].route = Some(EdgeRoute {
            points: route.points.into_iter().map(shift).collect(),
            label_pos: route.label_pos.map(shift),
            tail_label_pos: route.tail_label_pos.map(shift),
            head_label_pos: route.head_label_pos.map(shift),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clipping_stops_at_the_box_border() {
        let frame = Frame {
            x: 0.0,
            y: 0.0,
            width: 40.0,
            height: 20.0,
        };
        assert_eq!(
            clip_to_frame(&frame, Point::new(100.0, 10.0)),
            Point::new(40.0, 10.0)
        );
        assert_eq!(
            clip_to_frame(&frame, Point::new(20.0, -70.0)),
            Point::new(20.0, 0.0)
        );
        assert_eq!(
            clip_to_frame(&frame, Point::new(20.0, 10.0)),
            Point::new(20.0, 10.0)
        );
    }

    #[test]
    fn y_up_flips_against_the_total_height() {
        let yup = YUp(100.0);
        let bb = yup.frame(Frame {
            x: 5.0,
            y: 10.0,
            width: 20.0,
            height: 30.0,
        });
        assert_eq!(bb.ll, Point::new(5.0, 60.0));
        assert_eq!(bb.ur, Point::new(25.0, 90.0));
    }

    #[test]
    fn extent_covers_labels_outside_the_nodes() {
        let mut extent = Extent::empty();
        assert_eq!(extent.size(), Size::default());
        extent.add_frame(&Frame::from_center(Point::new(0.0, 0.0), Size::new(10.0, 10.0)));
        extent.add_frame(&Frame::from_center(Point::new(30.0, 0.0), Size::new(20.0, 4.0)));
        assert_eq!(extent.origin(), Point::new(-5.0, -5.0));
        assert_eq!(extent.size(), Size::new(45.0, 10.0));
    }
}
