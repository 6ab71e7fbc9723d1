//! Note absorption.
//!
//! A note with a single visible link is not laid out as a node of its own: it is drawn next to
//! the entity on the other end of that link, and the link itself disappears. The decision is
//! taken once per render and carried as a [`LinkRenderKind`] per link.

use crate::catalog::Catalog;
use crate::geom::{Point, Rect, Size, point, rect, size};
use crate::image::EntityImage;
use crate::scene::{Primitive, ScenePoint};
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use selkie_core::{Diagram, EntityId, Link, LinkId};
use std::sync::Arc;

/// Vertical gap between notes absorbed by the same entity.
const STACK_GAP: f64 = 4.0;
/// Half height of the connector wedge where it meets the note.
const WEDGE_HALF: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkRenderKind {
    #[default]
    Normal,
    AbsorbedNote {
        note: EntityId,
        sibling: EntityId,
    },
}

/// A note can be absorbed when it is a leaf note with exactly one visible link whose other end
/// is not a note itself.
pub fn is_absorbable(diagram: &Diagram, entity: EntityId) -> bool {
    let Some(e) = diagram.entity(entity) else {
        return false;
    };
    if !e.is_note() || diagram.visible_link_count(entity) != 1 {
        return false;
    }
    diagram
        .links()
        .map(|(_, l)| l)
        .filter(|l| l.touches(entity) && !l.invisible && diagram.is_link_active(l))
        .filter_map(|l| l.other(entity))
        .all(|other| diagram.entity(other).is_some_and(|o| !o.is_note()))
}

/// The `(note, sibling)` pair a link folds into a decoration.
///
/// `entity2` is only looked at when `entity1` is not absorbable; once a side is picked, both of
/// its ends must have a prepared image or the link stays normal.
fn absorbed_side(
    diagram: &Diagram,
    link: &Link,
    prepared: impl Fn(EntityId) -> bool,
) -> Option<(EntityId, EntityId)> {
    let side = if is_absorbable(diagram, link.entity1) {
        (link.entity1, link.entity2)
    } else if is_absorbable(diagram, link.entity2) {
        (link.entity2, link.entity1)
    } else {
        return None;
    };
    (prepared(side.0) && prepared(side.1)).then_some(side)
}

/// An entity image with the notes absorbed by the entity stacked on its right.
#[derive(Debug)]
pub struct AttachedNotes {
    sibling: Arc<dyn EntityImage>,
    notes: Vec<(EntityId, Arc<dyn EntityImage>)>,
    gap: f64,
}

impl AttachedNotes {
    fn stack_size(&self) -> Size {
        let width = self
            .notes
            .iter()
            .map(|(_, n)| n.dimension().width)
            .fold(0.0, f64::max);
        let height = self
            .notes
            .iter()
            .map(|(_, n)| n.dimension().height)
            .sum::<f64>()
            + STACK_GAP * self.notes.len().saturating_sub(1) as f64;
        size(width, height)
    }

    /// Top-left corner of the sibling image inside the composite.
    pub fn sibling_origin(&self, origin: Point) -> Point {
        let h = self.dimension().height;
        point(
            origin.x,
            origin.y + (h - self.sibling.dimension().height) / 2.0,
        )
    }

    pub fn sibling_dimension(&self) -> Size {
        self.sibling.dimension()
    }

    /// Rectangles of every absorbed note when the composite is drawn at `origin`.
    pub fn note_rects(&self, origin: Point) -> Vec<(EntityId, Rect)> {
        let h = self.dimension().height;
        let x = origin.x + self.sibling.dimension().width + self.gap;
        let mut y = origin.y + (h - self.stack_size().height) / 2.0;
        let mut out = Vec::with_capacity(self.notes.len());
        for (id, note) in &self.notes {
            let d = note.dimension();
            out.push((*id, rect(x, y, d.width, d.height)));
            y += d.height + STACK_GAP;
        }
        out
    }
}

impl EntityImage for AttachedNotes {
    fn dimension(&self) -> Size {
        let sib = self.sibling.dimension();
        let stack = self.stack_size();
        size(
            sib.width + self.gap + stack.width,
            sib.height.max(stack.height),
        )
    }

    fn draw(&self, origin: Point, out: &mut Vec<Primitive>) {
        let sib_origin = self.sibling_origin(origin);
        let sib = self.sibling.dimension();
        self.sibling.draw(sib_origin, out);

        let tip = ScenePoint {
            x: sib_origin.x + sib.width,
            y: sib_origin.y + sib.height / 2.0,
        };
        for ((_, note), (_, r)) in self.notes.iter().zip(self.note_rects(origin)) {
            let mid = r.origin.y + r.size.height / 2.0;
            let half = WEDGE_HALF.min(r.size.height / 2.0);
            out.push(Primitive::Polygon {
                points: vec![
                    ScenePoint {
                        x: r.origin.x,
                        y: mid - half,
                    },
                    tip,
                    ScenePoint {
                        x: r.origin.x,
                        y: mid + half,
                    },
                ],
                filled: false,
            });
            note.draw(r.origin, out);
        }
    }
}

#[derive(Debug, Default)]
pub struct Absorption {
    kinds: Vec<LinkRenderKind>,
    absorbed: FxHashSet<EntityId>,
    attached: IndexMap<EntityId, Arc<AttachedNotes>>,
}

impl Absorption {
    /// Decides, in link declaration order, which links fold their note into a decoration.
    ///
    /// `entity1` is tried before `entity2`, see [`absorbed_side`].
    pub fn compute(diagram: &Diagram, catalog: &Catalog, gap: f64) -> Self {
        let mut kinds = Vec::new();
        let mut absorbed = FxHashSet::default();
        let mut pending: IndexMap<EntityId, Vec<EntityId>> = IndexMap::new();

        for (id, link) in diagram.links() {
            let mut kind = LinkRenderKind::Normal;
            if diagram.is_link_active(link) && !link.invisible {
                let prepared = |e: EntityId| catalog.node(e).is_some();
                if let Some((note, sibling)) = absorbed_side(diagram, link, prepared) {
                    kind = LinkRenderKind::AbsorbedNote { note, sibling };
                }
            }
            if let LinkRenderKind::AbsorbedNote { note, sibling } = kind {
                tracing::debug!(
                    link = id.index(),
                    note = note.index(),
                    sibling = sibling.index(),
                    "note absorbed"
                );
                absorbed.insert(note);
                pending.entry(sibling).or_default().push(note);
            }
            kinds.push(kind);
        }

        let attached = pending
            .into_iter()
            .filter_map(|(sibling, notes)| {
                let sibling_image = catalog.node(sibling)?.image.clone();
                let notes = notes
                    .into_iter()
                    .filter_map(|n| Some((n, catalog.node(n)?.image.clone())))
                    .collect();
                Some((
                    sibling,
                    Arc::new(AttachedNotes {
                        sibling: sibling_image,
                        notes,
                        gap,
                    }),
                ))
            })
            .collect();

        Self {
            kinds,
            absorbed,
            attached,
        }
    }

    pub fn kind(&self, link: LinkId) -> LinkRenderKind {
        self.kinds.get(link.index()).copied().unwrap_or_default()
    }

    pub fn is_absorbed(&self, entity: EntityId) -> bool {
        self.absorbed.contains(&entity)
    }

    pub fn attachment(&self, sibling: EntityId) -> Option<&AttachedNotes> {
        self.attached.get(&sibling).map(Arc::as_ref)
    }

    /// The image laid out for `entity`: its prepared image, or the composite carrying its
    /// absorbed notes.
    pub fn image(&self, entity: EntityId, catalog: &Catalog) -> Option<Arc<dyn EntityImage>> {
        if let Some(composite) = self.attached.get(&entity) {
            let image: Arc<dyn EntityImage> = composite.clone();
            return Some(image);
        }
        catalog.node(entity).map(|n| n.image.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RenderOptions;
    use selkie_core::{DiagramKind, LeafKind, Link};

    fn diagram() -> (Diagram, EntityId, EntityId, EntityId) {
        let mut d = Diagram::new(DiagramKind::Class);
        let a = d.add_leaf("A", LeafKind::Class, None).unwrap();
        let b = d.add_leaf("B", LeafKind::Class, None).unwrap();
        let n = d.add_leaf("N", LeafKind::Note, None).unwrap();
        (d, a, b, n)
    }

    #[test]
    fn single_link_notes_are_absorbed() {
        let (mut d, a, b, n) = diagram();
        d.add_link(Link::between(a, b)).unwrap();
        let l = d.add_link(Link::between(n, a)).unwrap();
        let catalog = Catalog::prepare(&d, &RenderOptions::default()).unwrap();
        let abs = Absorption::compute(&d, &catalog, 20.0);

        assert_eq!(
            abs.kind(l),
            LinkRenderKind::AbsorbedNote {
                note: n,
                sibling: a
            }
        );
        assert!(abs.is_absorbed(n));
        let composite = abs.image(a, &catalog).unwrap();
        let sib = catalog.node(a).unwrap().image.dimension();
        let note = catalog.node(n).unwrap().image.dimension();
        assert_eq!(
            composite.dimension(),
            size(sib.width + 20.0 + note.width, sib.height.max(note.height))
        );
    }

    #[test]
    fn second_endpoint_is_checked_too() {
        let (mut d, a, _, n) = diagram();
        let l = d.add_link(Link::between(a, n)).unwrap();
        let catalog = Catalog::prepare(&d, &RenderOptions::default()).unwrap();
        let abs = Absorption::compute(&d, &catalog, 20.0);
        assert_eq!(
            abs.kind(l),
            LinkRenderKind::AbsorbedNote {
                note: n,
                sibling: a
            }
        );
    }

    #[test]
    fn an_unprepared_first_side_does_not_fall_through() {
        let (mut d, a, _, n) = diagram();
        let l = d.add_link(Link::between(n, a)).unwrap();
        let link = d.link(l).unwrap();

        assert_eq!(absorbed_side(&d, link, |_| true), Some((n, a)));
        assert_eq!(absorbed_side(&d, link, |e| e != a), None);
        assert_eq!(absorbed_side(&d, link, |e| e != n), None);
    }

    #[test]
    fn notes_with_several_links_stay_nodes() {
        let (mut d, a, b, n) = diagram();
        let l1 = d.add_link(Link::between(n, a)).unwrap();
        d.add_link(Link::between(n, b)).unwrap();
        let catalog = Catalog::prepare(&d, &RenderOptions::default()).unwrap();
        let abs = Absorption::compute(&d, &catalog, 20.0);
        assert_eq!(abs.kind(l1), LinkRenderKind::Normal);
        assert!(!abs.is_absorbed(n));
    }

    #[test]
    fn invisible_links_neither_count_nor_absorb() {
        let (mut d, a, b, n) = diagram();
        let hidden = d.add_link(Link::between(n, b).invisible()).unwrap();
        let shown = d.add_link(Link::between(n, a)).unwrap();
        let catalog = Catalog::prepare(&d, &RenderOptions::default()).unwrap();
        let abs = Absorption::compute(&d, &catalog, 20.0);
        assert_eq!(abs.kind(hidden), LinkRenderKind::Normal);
        assert!(matches!(abs.kind(shown), LinkRenderKind::AbsorbedNote { .. }));
    }

    #[test]
    fn note_to_note_links_are_kept() {
        let mut d = Diagram::new(DiagramKind::Class);
        let n1 = d.add_leaf("N1", LeafKind::Note, None).unwrap();
        let n2 = d.add_leaf("N2", LeafKind::Note, None).unwrap();
        let l = d.add_link(Link::between(n1, n2)).unwrap();
        let catalog = Catalog::prepare(&d, &RenderOptions::default()).unwrap();
        let abs = Absorption::compute(&d, &catalog, 20.0);
        assert_eq!(abs.kind(l), LinkRenderKind::Normal);
    }

    #[test]
    fn stacked_notes_do_not_overlap() {
        let (mut d, a, _, n) = diagram();
        let n2 = d.add_leaf("N2", LeafKind::Note, None).unwrap();
        d.add_link(Link::between(n, a)).unwrap();
        d.add_link(Link::between(n2, a)).unwrap();
        let catalog = Catalog::prepare(&d, &RenderOptions::default()).unwrap();
        let abs = Absorption::compute(&d, &catalog, 20.0);
        let rects = abs.attachment(a).unwrap().note_rects(point(0.0, 0.0));
        assert_eq!(rects.len(), 2);
        assert_eq!(rects[0].0, n);
        assert!(rects[1].1.origin.y >= rects[0].1.max_y() + STACK_GAP - 1e-9);
    }
}
