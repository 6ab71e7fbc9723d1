use lamantin::{BoundingBox, Context, Error, GraphRecord, Size, encode_label_dim};

fn center_y(bb: &BoundingBox) -> f64 {
    (bb.ll.y + bb.ur.y) / 2.0
}

#[test]
fn layout_can_layout_a_single_node() {
    let mut ctx = Context::open();
    let g = ctx.open_graph("g");
    let a = ctx.create_node(g, "a").unwrap();

    ctx.layout(g).unwrap();

    let bb = ctx.node_box(a).unwrap();
    assert_eq!(bb.ll.x, 0.0);
    assert_eq!(bb.ll.y, 0.0);
    assert_eq!(bb.ur.x, 54.0);
    assert_eq!(bb.ur.y, 36.0);
    match ctx.graph_record(g) {
        Some(GraphRecord::Root(info)) => {
            assert_eq!(info.bb.ur.x, 54.0);
            assert_eq!(info.bb.ur.y, 36.0);
        }
        other => panic!("unexpected root record: {other:?}"),
    }
}

#[test]
fn layout_sizes_are_inches() {
    let mut ctx = Context::open();
    let g = ctx.open_graph("g");
    let a = ctx.create_node(g, "a").unwrap();
    ctx.set_attr(a, "width", "2").unwrap();
    ctx.set_attr(a, "height", "0.5").unwrap();

    ctx.layout(g).unwrap();

    let bb = ctx.node_box(a).unwrap();
    assert_eq!(bb.width(), 144.0);
    assert_eq!(bb.height(), 36.0);
}

#[test]
fn layout_left_to_right_places_ranks_along_x() {
    let mut ctx = Context::open();
    let g = ctx.open_graph("g");
    ctx.set_attr(g, "rankdir", "LR").unwrap();
    let a = ctx.create_node(g, "a").unwrap();
    let b = ctx.create_node(g, "b").unwrap();
    for n in [a, b] {
        ctx.set_attr(n, "width", "1").unwrap();
        ctx.set_attr(n, "height", "0.5").unwrap();
    }
    let e = ctx.create_edge(g, a, b).unwrap();

    ctx.layout(g).unwrap();

    let ba = ctx.node_box(a).unwrap();
    let bb = ctx.node_box(b).unwrap();
    assert_eq!(ba.width(), 72.0);
    assert_eq!(ba.height(), 36.0);
    assert!(ba.ur.x < bb.ll.x);
    assert_eq!(center_y(&ba), center_y(&bb));

    let route = ctx.edge_route(e).unwrap();
    let first = route.points.first().unwrap();
    let last = route.points.last().unwrap();
    assert!((first.x - ba.ur.x).abs() < 1e-6);
    assert!((last.x - bb.ll.x).abs() < 1e-6);
    assert!(route.points.iter().all(|p| (p.y - center_y(&ba)).abs() < 1e-6));
    assert!(route.label_pos.is_none());
}

#[test]
fn layout_minlen_zero_puts_both_ends_on_one_rank() {
    let mut ctx = Context::open();
    let g = ctx.open_graph("g");
    ctx.set_attr(g, "rankdir", "LR").unwrap();
    let a = ctx.create_node(g, "a").unwrap();
    let b = ctx.create_node(g, "b").unwrap();
    let e = ctx.create_edge(g, a, b).unwrap();
    ctx.set_attr(e, "minlen", "0").unwrap();

    ctx.layout(g).unwrap();

    let ba = ctx.node_box(a).unwrap();
    let bb = ctx.node_box(b).unwrap();
    assert_eq!(ba.center().x, bb.center().x);
    assert_eq!(ctx.edge_route(e).unwrap().points.len(), 2);
}

#[test]
fn layout_places_edge_labels_between_the_ends() {
    let mut ctx = Context::open();
    let g = ctx.open_graph("g");
    let a = ctx.create_node(g, "a").unwrap();
    let b = ctx.create_node(g, "b").unwrap();
    let e = ctx.create_edge(g, a, b).unwrap();
    ctx.set_attr(e, "label", &encode_label_dim(40, 14)).unwrap();
    ctx.set_attr(e, "taillabel", &encode_label_dim(10, 10)).unwrap();

    ctx.layout(g).unwrap();

    let ba = ctx.node_box(a).unwrap();
    let bb = ctx.node_box(b).unwrap();
    let route = ctx.edge_route(e).unwrap();
    let label = route.label_pos.unwrap();
    // Y-up: the tail sits above the head in a top-down layout.
    assert!(label.y < ba.ll.y && label.y > bb.ur.y);
    assert!(route.tail_label_pos.is_some());
    assert!(route.head_label_pos.is_none());
}

#[test]
fn layout_gives_labels_of_short_edges_their_own_room() {
    let mut ctx = Context::open();
    let g = ctx.open_graph("g");
    let a = ctx.create_node(g, "a").unwrap();
    let b = ctx.create_node(g, "b").unwrap();
    let e = ctx.create_edge(g, a, b).unwrap();
    ctx.set_attr(e, "label", &encode_label_dim(120, 30)).unwrap();

    ctx.layout(g).unwrap();

    let ba = ctx.node_box(a).unwrap();
    let bb = ctx.node_box(b).unwrap();
    let center = ctx.edge_route(e).unwrap().label_pos.unwrap();
    let label = BoundingBox::from_center(center, Size::new(120.0, 30.0));
    assert!(label.ur.y <= ba.ll.y + 1e-6);
    assert!(label.ll.y >= bb.ur.y - 1e-6);

    let Some(GraphRecord::Root(root)) = ctx.graph_record(g) else {
        panic!("root record missing");
    };
    assert!(root.bb.contains(&label, 1e-6));
}

#[test]
fn layout_lifts_labels_of_same_rank_edges_above_them() {
    let mut ctx = Context::open();
    let g = ctx.open_graph("g");
    let a = ctx.create_node(g, "a").unwrap();
    let b = ctx.create_node(g, "b").unwrap();
    let e = ctx.create_edge(g, a, b).unwrap();
    ctx.set_attr(e, "minlen", "0").unwrap();
    ctx.set_attr(e, "label", &encode_label_dim(80, 20)).unwrap();

    ctx.layout(g).unwrap();

    let ba = ctx.node_box(a).unwrap();
    let bb = ctx.node_box(b).unwrap();
    assert_eq!(center_y(&ba), center_y(&bb));
    let center = ctx.edge_route(e).unwrap().label_pos.unwrap();
    let label = BoundingBox::from_center(center, Size::new(80.0, 20.0));
    assert!(label.ll.y >= ba.ur.y - 1e-6);
}

#[test]
fn layout_breaks_cycles() {
    let mut ctx = Context::open();
    let g = ctx.open_graph("g");
    let a = ctx.create_node(g, "a").unwrap();
    let b = ctx.create_node(g, "b").unwrap();
    let c = ctx.create_node(g, "c").unwrap();
    let edges = [
        ctx.create_edge(g, a, b).unwrap(),
        ctx.create_edge(g, b, c).unwrap(),
        ctx.create_edge(g, c, a).unwrap(),
    ];

    ctx.layout(g).unwrap();

    for e in edges {
        assert!(ctx.edge_route(e).unwrap().points.len() >= 2);
    }
    let ya = center_y(&ctx.node_box(a).unwrap());
    let yc = center_y(&ctx.node_box(c).unwrap());
    assert!(ya > yc);
}

#[test]
fn layout_routes_self_loops() {
    let mut ctx = Context::open();
    let g = ctx.open_graph("g");
    let a = ctx.create_node(g, "a").unwrap();
    let e = ctx.create_edge(g, a, a).unwrap();

    ctx.layout(g).unwrap();

    let bb = ctx.node_box(a).unwrap();
    let route = ctx.edge_route(e).unwrap();
    assert_eq!(route.points.len(), 4);
    assert!(route.points.iter().all(|p| p.x >= bb.ur.x));
}

#[test]
fn layout_rejects_subgraphs_and_bad_attributes() {
    let mut ctx = Context::open();
    let g = ctx.open_graph("g");
    let sub = ctx.create_subgraph(g, "cluster_a").unwrap();
    let a = ctx.create_node(g, "a").unwrap();
    let b = ctx.create_node(g, "b").unwrap();
    let e = ctx.create_edge(g, a, b).unwrap();

    assert_eq!(ctx.layout(sub), Err(Error::NotARoot(sub)));
    assert!(matches!(
        ctx.set_attr(e, "minlen", "-1"),
        Err(Error::InvalidAttribute { .. })
    ));
    assert!(ctx.set_attr(a, "width", "wide").is_err());
    ctx.set_attr(e, "arrowhead", "none").unwrap();
    assert_eq!(ctx.attr(e, "arrowhead"), Some("none"));
}

#[test]
fn contexts_do_not_share_state() {
    let mut first = Context::open();
    let mut second = Context::open();
    assert_ne!(first.id(), second.id());

    let g1 = first.open_graph("g");
    let g2 = second.open_graph("g");
    let a = first.create_node(g1, "a").unwrap();
    second.create_node(g2, "a").unwrap();
    second.create_node(g2, "b").unwrap();

    first.layout(g1).unwrap();
    assert!(first.node_box(a).is_some());
    assert_eq!(first.node_name(a), Some("a"));
    second.close();
    first.close();
}
