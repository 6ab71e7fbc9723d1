//! Scene assembly from a layout snapshot.

use crate::absorb::Absorption;
use crate::block::TextBlock;
use crate::catalog::Catalog;
use crate::geom::{Point, Rect, Vector, point, rect, vector};
use crate::label::LinkBlocks;
use crate::mirror::{LayoutSnapshot, MARGIN, YMirror};
use crate::scene::{
    NoteAttachment, Primitive, Scene, SceneCluster, SceneEdge, SceneNode, ScenePoint, SceneRect,
};
use indexmap::IndexMap;
use selkie_core::{Diagram, EntityId, LineStyle, Link, LinkDecor, LinkId};

const DECOR_LENGTH: f64 = 10.0;
const DECOR_HALF_WIDTH: f64 = 4.0;

/// Shift applied to every mirrored coordinate so that the scene starts at the margin.
#[derive(Debug, Clone, Copy)]
struct Placement {
    mirror: YMirror,
    offset: Vector,
}

impl Placement {
    fn point(&self, p: Point) -> Point {
        self.mirror.point(p) + self.offset
    }

    fn rect(&self, r: Rect) -> Rect {
        r.translate(self.offset)
    }
}

/// Smallest rectangle holding every node, cluster, route point and label of a scene.
#[derive(Debug, Clone, Copy)]
struct Extent {
    min: Point,
    max: Point,
}

impl Extent {
    fn new() -> Self {
        Self {
            min: point(f64::INFINITY, f64::INFINITY),
            max: point(f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    fn add_point(&mut self, x: f64, y: f64) {
        self.min = point(self.min.x.min(x), self.min.y.min(y));
        self.max = point(self.max.x.max(x), self.max.y.max(y));
    }

    fn add_rect(&mut self, r: &Rect) {
        self.add_point(r.min_x(), r.min_y());
        self.add_point(r.max_x(), r.max_y());
    }

    fn add_edge(&mut self, edge: &SceneEdge) {
        for p in &edge.points {
            self.add_point(p.x, p.y);
        }
        for r in [edge.label, edge.tail_label, edge.head_label].iter().flatten() {
            self.add_point(r.x, r.y);
            self.add_point(r.max_x(), r.max_y());
        }
    }

    fn is_empty(&self) -> bool {
        !self.min.x.is_finite()
    }
}

fn shift_edge(edge: &mut SceneEdge, by: Vector) {
    for p in &mut edge.points {
        p.x += by.x;
        p.y += by.y;
    }
    for r in [&mut edge.label, &mut edge.tail_label, &mut edge.head_label]
        .into_iter()
        .flatten()
    {
        r.x += by.x;
        r.y += by.y;
    }
}

pub struct Drawing<'a> {
    pub diagram: &'a Diagram,
    pub catalog: &'a Catalog,
    pub absorption: &'a Absorption,
    pub blocks: &'a IndexMap<LinkId, LinkBlocks>,
    pub snapshot: &'a LayoutSnapshot,
}

impl Drawing<'_> {
    /// Builds the scene: cluster borders and titles first, then nodes, then links on top.
    ///
    /// Edge geometry is recomputed from the snapshot every time, so assembling twice gives the
    /// same scene.
    pub fn assemble(&self) -> Scene {
        let mirror = self.snapshot.mirror;
        let node_rects: Vec<(EntityId, Rect)> = self
            .snapshot
            .nodes
            .iter()
            .map(|(&id, b)| (id, mirror.rect(b)))
            .collect();
        let cluster_rects: Vec<(EntityId, Rect)> = self
            .snapshot
            .clusters
            .iter()
            .map(|(&id, b)| (id, mirror.rect(b)))
            .collect();

        // Geometry is computed in mirrored space first; labels and bends may reach past the boxes.
        let mirrored = Placement {
            mirror,
            offset: vector(0.0, 0.0),
        };
        let mut edges = self.edge_geometry(&mirrored, &cluster_rects);

        let mut extent = Extent::new();
        for (_, r) in node_rects.iter().chain(&cluster_rects) {
            extent.add_rect(r);
        }
        for (edge, _, _) in &edges {
            extent.add_edge(edge);
        }
        if extent.is_empty() {
            return Scene::default();
        }
        let offset = vector(MARGIN - extent.min.x, (MARGIN - extent.min.y).max(0.0));
        let place = Placement { mirror, offset };
        for (edge, _, _) in &mut edges {
            shift_edge(edge, offset);
        }

        let mut scene = Scene {
            width: extent.max.x - extent.min.x + 2.0 * MARGIN,
            height: extent.max.y + offset.y + MARGIN,
            ..Scene::default()
        };

        for (group, r) in &cluster_rects {
            self.draw_cluster(*group, place.rect(*r), &mut scene);
        }
        for (entity, r) in &node_rects {
            self.draw_node(*entity, place.rect(*r), &mut scene);
        }
        for (edge, id, link) in edges {
            self.draw_edge(&edge, id, link, &mut scene.primitives);
            scene.edges.push(edge);
        }
        scene
    }

    fn edge_geometry(
        &self,
        place: &Placement,
        cluster_rects: &[(EntityId, Rect)],
    ) -> Vec<(SceneEdge, LinkId, &Link)> {
        let cluster_rect = |id: EntityId| {
            cluster_rects
                .iter()
                .find(|(g, _)| *g == id)
                .map(|(_, r)| place.rect(*r))
        };
        let mut out = Vec::new();
        for geometry in &self.snapshot.edges {
            let Some(link) = self.diagram.link(geometry.link) else {
                continue;
            };
            if link.invisible {
                continue;
            }
            let mut points: Vec<Point> =
                geometry.points.iter().map(|p| place.point(*p)).collect();
            if let Some(r) = cluster_rect(link.entity2) {
                points = clip_head(points, &r);
            }
            if let Some(r) = cluster_rect(link.entity1) {
                points.reverse();
                points = clip_head(points, &r);
                points.reverse();
            }

            let blocks = self.blocks.get(&geometry.link);
            let centered = |pos: Option<Point>, block: Option<&TextBlock>| {
                let (pos, block) = (pos?, block?);
                if block.is_empty() {
                    return None;
                }
                let c = place.point(pos);
                let d = block.dimension();
                Some(SceneRect::from(rect(
                    c.x - d.width / 2.0,
                    c.y - d.height / 2.0,
                    d.width,
                    d.height,
                )))
            };
            out.push((
                SceneEdge {
                    link: geometry.link.index(),
                    from: self.code(link.entity1),
                    to: self.code(link.entity2),
                    minlen: geometry.minlen,
                    points: points.into_iter().map(ScenePoint::from).collect(),
                    label: centered(geometry.label_pos, blocks.map(|b| &b.label)),
                    tail_label: centered(
                        geometry.tail_label_pos,
                        blocks.and_then(|b| b.quantifier1.as_ref()),
                    ),
                    head_label: centered(
                        geometry.head_label_pos,
                        blocks.and_then(|b| b.quantifier2.as_ref()),
                    ),
                    dashed: link.style == LineStyle::Dashed,
                },
                geometry.link,
                link,
            ));
        }
        out
    }

    fn draw_cluster(&self, group: EntityId, r: Rect, scene: &mut Scene) {
        let Some(cluster) = self.catalog.cluster(group) else {
            tracing::warn!(group = group.index(), "no cluster prepared, border skipped");
            return;
        };
        scene.primitives.push(Primitive::Rect {
            rect: r.into(),
            corner_radius: 0.0,
        });
        let mut title = None;
        if !cluster.title.is_empty() {
            let d = cluster.title.dimension();
            let at = point(r.center().x - d.width / 2.0, r.min_y());
            cluster.title.draw(at, &mut scene.primitives);
            title = Some(SceneRect::from(rect(at.x, at.y, d.width, d.height)));
        }
        scene.clusters.push(SceneCluster {
            id: cluster.id.clone(),
            entity: self.code(group),
            rect: r.into(),
            title,
        });
    }

    fn draw_node(&self, entity: EntityId, r: Rect, scene: &mut Scene) {
        let (Some(prepared), Some(image)) = (
            self.catalog.node(entity),
            self.absorption.image(entity, self.catalog),
        ) else {
            tracing::warn!(entity = entity.index(), "no prepared image, node skipped");
            return;
        };
        image.draw(r.origin, &mut scene.primitives);
        scene.nodes.push(SceneNode {
            id: prepared.uid.clone(),
            entity: self.code(entity),
            rect: r.into(),
        });
        if let Some(attached) = self.absorption.attachment(entity) {
            for (note, note_rect) in attached.note_rects(r.origin) {
                scene.attachments.push(NoteAttachment {
                    note: self.code(note),
                    sibling: self.code(entity),
                    rect: note_rect.into(),
                });
            }
        }
    }

    fn draw_edge(&self, edge: &SceneEdge, id: LinkId, link: &Link, out: &mut Vec<Primitive>) {
        if edge.points.len() < 2 {
            return;
        }
        out.push(Primitive::Polyline {
            points: edge.points.clone(),
            dashed: edge.dashed,
        });
        let n = edge.points.len();
        let p = |s: &ScenePoint| point(s.x, s.y);
        out.extend(decoration(link.decor1, p(&edge.points[0]), p(&edge.points[1])));
        out.extend(decoration(
            link.decor2,
            p(&edge.points[n - 1]),
            p(&edge.points[n - 2]),
        ));

        let Some(blocks) = self.blocks.get(&id) else {
            return;
        };
        let slots = [
            (edge.label, Some(&blocks.label)),
            (edge.tail_label, blocks.quantifier1.as_ref()),
            (edge.head_label, blocks.quantifier2.as_ref()),
        ];
        for (r, block) in slots {
            if let (Some(r), Some(block)) = (r, block) {
                block.draw(point(r.x, r.y), out);
            }
        }
    }

    fn code(&self, id: EntityId) -> String {
        self.diagram
            .entity(id)
            .map(|e| e.code.clone())
            .unwrap_or_default()
    }
}

/// Cuts the polyline where it first enters `r`, keeping the part outside.
fn clip_head(points: Vec<Point>, r: &Rect) -> Vec<Point> {
    let inside = |p: &Point| {
        p.x >= r.min_x() && p.x <= r.max_x() && p.y >= r.min_y() && p.y <= r.max_y()
    };
    let Some(first_in) = points.iter().position(inside) else {
        return points;
    };
    if first_in == 0 {
        return points;
    }
    let (a, b) = (points[first_in - 1], points[first_in]);
    let hit = boundary_hit(a, b, r).unwrap_or(b);
    let mut out = points[..first_in].to_vec();
    out.push(hit);
    out
}

/// First point of segment `a -> b` on the border of `r`, with `a` outside.
fn boundary_hit(a: Point, b: Point, r: &Rect) -> Option<Point> {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let mut best: Option<f64> = None;
    let mut consider = |t: f64| {
        if !(0.0..=1.0).contains(&t) {
            return;
        }
        let (x, y) = (a.x + dx * t, a.y + dy * t);
        let eps = 1e-9;
        if x >= r.min_x() - eps
            && x <= r.max_x() + eps
            && y >= r.min_y() - eps
            && y <= r.max_y() + eps
        {
            best = Some(best.map_or(t, |b: f64| b.min(t)));
        }
    };
    if dx != 0.0 {
        consider((r.min_x() - a.x) / dx);
        consider((r.max_x() - a.x) / dx);
    }
    if dy != 0.0 {
        consider((r.min_y() - a.y) / dy);
        consider((r.max_y() - a.y) / dy);
    }
    best.map(|t| point(a.x + dx * t, a.y + dy * t))
}

/// End decoration with its tip at `tip`, oriented along `from -> tip`.
fn decoration(decor: LinkDecor, tip: Point, from: Point) -> Option<Primitive> {
    let (filled, diamond) = match decor {
        LinkDecor::None => return None,
        LinkDecor::Arrow => (true, false),
        LinkDecor::Extends => (false, false),
        LinkDecor::Composition => (true, true),
        LinkDecor::Aggregation => (false, true),
    };
    let len = ((tip.x - from.x).powi(2) + (tip.y - from.y).powi(2)).sqrt();
    if len == 0.0 {
        return None;
    }
    let (ux, uy) = ((tip.x - from.x) / len, (tip.y - from.y) / len);
    let (nx, ny) = (-uy, ux);
    let at = |along: f64, across: f64| ScenePoint {
        x: tip.x - ux * along + nx * across,
        y: tip.y - uy * along + ny * across,
    };
    let points = if diamond {
        vec![
            at(0.0, 0.0),
            at(DECOR_LENGTH, DECOR_HALF_WIDTH),
            at(2.0 * DECOR_LENGTH, 0.0),
            at(DECOR_LENGTH, -DECOR_HALF_WIDTH),
        ]
    } else {
        vec![
            at(0.0, 0.0),
            at(DECOR_LENGTH, DECOR_HALF_WIDTH),
            at(DECOR_LENGTH, -DECOR_HALF_WIDTH),
        ]
    };
    Some(Primitive::Polygon { points, filled })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clipping_stops_on_the_rectangle_border() {
        let r = rect(100.0, 100.0, 50.0, 50.0);
        let path = vec![point(0.0, 125.0), point(50.0, 125.0), point(125.0, 125.0)];
        let clipped = clip_head(path, &r);
        assert_eq!(clipped.len(), 3);
        assert_eq!(clipped[1], point(50.0, 125.0));
        assert!((clipped[2].x - 100.0).abs() < 1e-9);
        assert!((clipped[2].y - 125.0).abs() < 1e-9);
    }

    #[test]
    fn paths_already_inside_are_kept() {
        let r = rect(0.0, 0.0, 10.0, 10.0);
        let path = vec![point(1.0, 1.0), point(5.0, 5.0)];
        assert_eq!(clip_head(path.clone(), &r), path);
    }

    #[test]
    fn decorations_point_along_the_edge() {
        let Some(Primitive::Polygon { points, filled }) =
            decoration(LinkDecor::Arrow, point(0.0, 0.0), point(0.0, -20.0))
        else {
            panic!("expected a polygon");
        };
        assert!(filled);
        assert_eq!(points[0], ScenePoint { x: 0.0, y: 0.0 });
        assert!(points[1..].iter().all(|p| (p.y + DECOR_LENGTH).abs() < 1e-9));
        assert!(decoration(LinkDecor::None, point(0.0, 0.0), point(1.0, 0.0)).is_none());
    }
}
