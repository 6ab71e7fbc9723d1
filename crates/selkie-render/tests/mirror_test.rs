use selkie_core::{Diagram, DiagramKind, LeafKind, Link};
use selkie_render::builder::GraphBuilder;
use selkie_render::catalog::Catalog;
use selkie_render::edges::EdgeProjector;
use selkie_render::invoke::{run_layout, with_layout_session};
use selkie_render::label::LinkBlocks;
use selkie_render::mirror::{BoxInfo, LayoutSnapshot, MARGIN, YMirror};
use selkie_render::{Absorption, RenderOptions};
use indexmap::IndexMap;

fn snapshot(d: &Diagram) -> LayoutSnapshot {
    let options = RenderOptions::default();
    let catalog = Catalog::prepare(d, &options).unwrap();
    let absorption = Absorption::compute(d, &catalog, options.config.absorbed_note_gap);
    let blocks: IndexMap<_, _> = d
        .links()
        .map(|(id, l)| {
            (
                id,
                LinkBlocks::compose(d, l, options.text_measurer.as_ref(), &options.config),
            )
        })
        .collect();
    with_layout_session(|ctx| {
        let mut tables = GraphBuilder::new(ctx, d, &catalog, &absorption).build()?;
        EdgeProjector::new(d, &absorption, &blocks).project(ctx, &mut tables)?;
        run_layout(ctx, tables.root, d.rankdir, &options.config)?;
        LayoutSnapshot::extract(ctx, &tables)
    })
    .unwrap()
}

fn chain() -> Diagram {
    let mut d = Diagram::new(DiagramKind::Class);
    let a = d.add_leaf("A", LeafKind::Class, None).unwrap();
    let b = d.add_leaf("B", LeafKind::Class, None).unwrap();
    d.add_link(Link::between(a, b)).unwrap();
    d
}

#[test]
fn engine_y_up_becomes_scene_y_down() {
    let d = chain();
    let snap = snapshot(&d);
    let a = snap.nodes[&d.find("A").unwrap()];
    let b = snap.nodes[&d.find("B").unwrap()];
    // The first rank is on top in engine space too, but with the larger Y.
    assert!(a.ll.y > b.ur.y);

    let ra = snap.mirror.rect(&a);
    let rb = snap.mirror.rect(&b);
    assert!(ra.max_y() < rb.origin.y);
    assert!((ra.origin.y - MARGIN).abs() < 1e-9);
}

#[test]
fn mirroring_is_not_an_involution() {
    let d = chain();
    let snap = snapshot(&d);
    let mirrored: Vec<BoxInfo> = snap.nodes.values().map(|b| snap.mirror.mirrored(b)).collect();
    let again = YMirror::over(&mirrored);
    // Applying the mirror twice shifts by the difference of the two reference heights.
    let shift = again.max_y() - snap.mirror.max_y();
    let lowest = snap.nodes.values().map(|b| b.ll.y).fold(f64::INFINITY, f64::min);
    assert!((shift - (MARGIN - lowest)).abs() < 1e-9);
    for (orig, m) in snap.nodes.values().zip(&mirrored) {
        let back = again.mirrored(m);
        assert!((back.ll.y - (orig.ll.y + shift)).abs() < 1e-9);
        assert!((back.ur.y - (orig.ur.y + shift)).abs() < 1e-9);
    }
}

#[test]
fn edges_are_read_back_with_their_minlen() {
    let d = chain();
    let snap = snapshot(&d);
    assert_eq!(snap.edges.len(), 1);
    assert_eq!(snap.edges[0].minlen, 1);
    assert!(snap.edges[0].points.len() >= 2);
}
