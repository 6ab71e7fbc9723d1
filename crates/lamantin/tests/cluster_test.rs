use lamantin::{BoundingBox, Context, GraphRecord, SubgraphId, encode_label_dim};

fn cluster_box(ctx: &Context, g: SubgraphId) -> BoundingBox {
    match ctx.graph_record(g) {
        Some(GraphRecord::Cluster(info)) => info.bb,
        other => panic!("expected a cluster record, got {other:?}"),
    }
}

#[test]
fn clusters_enclose_their_nodes_and_nested_clusters() {
    let mut ctx = Context::open();
    let g = ctx.open_graph("g");
    ctx.set_attr(g, "rankdir", "LR").unwrap();
    let outer = ctx.create_subgraph(g, "cluster_outer").unwrap();
    ctx.set_attr(outer, "label", &encode_label_dim(60, 16)).unwrap();
    let inner = ctx.create_subgraph(outer, "cluster_inner").unwrap();
    let a = ctx.create_node(outer, "a").unwrap();
    let b = ctx.create_node(inner, "b").unwrap();
    let c = ctx.create_node(inner, "c").unwrap();
    let x = ctx.create_node(g, "x").unwrap();
    ctx.create_edge(g, a, b).unwrap();
    ctx.create_edge(g, b, c).unwrap();
    ctx.create_edge(g, x, c).unwrap();

    ctx.layout(g).unwrap();

    let outer_bb = cluster_box(&ctx, outer);
    let inner_bb = cluster_box(&ctx, inner);
    assert!(outer_bb.contains(&inner_bb, 1e-6));
    for n in [a, b, c] {
        assert!(outer_bb.contains(&ctx.node_box(n).unwrap(), 1e-6));
    }
    for n in [b, c] {
        assert!(inner_bb.contains(&ctx.node_box(n).unwrap(), 1e-6));
    }
    assert!(!outer_bb.contains(&ctx.node_box(x).unwrap(), 1e-6));

    let Some(GraphRecord::Root(root)) = ctx.graph_record(g) else {
        panic!("root record missing");
    };
    assert!(root.bb.contains(&outer_bb, 1e-6));
    assert!(root.bb.contains(&ctx.node_box(x).unwrap(), 1e-6));
}

#[test]
fn cluster_titles_sit_on_top() {
    let mut ctx = Context::open();
    let g = ctx.open_graph("g");
    ctx.set_attr(g, "rankdir", "LR").unwrap();
    let cluster = ctx.create_subgraph(g, "cluster_0").unwrap();
    ctx.set_attr(cluster, "label", &encode_label_dim(200, 20)).unwrap();
    let a = ctx.create_node(cluster, "a").unwrap();

    ctx.layout(g).unwrap();

    let Some(GraphRecord::Cluster(info)) = ctx.graph_record(cluster) else {
        panic!("cluster record missing");
    };
    assert!(info.bb.width() >= 216.0 - 1e-6);
    let title = info.label_pos.unwrap();
    let node = ctx.node_box(a).unwrap();
    // Y-up: the title is above the node.
    assert!(title.y > node.ur.y);
    assert!(title.y < info.bb.ur.y);
}

#[test]
fn empty_and_plain_subgraphs_stay_pending() {
    let mut ctx = Context::open();
    let g = ctx.open_graph("g");
    let empty = ctx.create_subgraph(g, "cluster_empty").unwrap();
    let plain = ctx.create_subgraph(g, "rank_same").unwrap();
    ctx.create_node(plain, "a").unwrap();

    ctx.layout(g).unwrap();

    assert_eq!(ctx.graph_record(empty), Some(&GraphRecord::Pending));
    assert_eq!(ctx.graph_record(plain), Some(&GraphRecord::Pending));
    assert_eq!(ctx.subgraphs(g), &[empty, plain]);
}

#[test]
fn edges_into_clusters_end_on_the_inner_node() {
    let mut ctx = Context::open();
    let g = ctx.open_graph("g");
    let cluster = ctx.create_subgraph(g, "cluster_0").unwrap();
    let inside = ctx.create_node(cluster, "inside").unwrap();
    let outside = ctx.create_node(g, "outside").unwrap();
    let e = ctx.create_edge(g, outside, inside).unwrap();

    ctx.layout(g).unwrap();

    let route = ctx.edge_route(e).unwrap();
    let last = *route.points.last().unwrap();
    let inner = ctx.node_box(inside).unwrap();
    assert!(last.x >= inner.ll.x - 1e-6 && last.x <= inner.ur.x + 1e-6);
    assert!(last.y >= inner.center().y - 1e-6 && last.y <= inner.ur.y + 1e-6);
    let on_border = (last.y - inner.ur.y).abs() < 1e-6
        || (last.x - inner.ll.x).abs() < 1e-6
        || (last.x - inner.ur.x).abs() < 1e-6;
    assert!(on_border);
}
