//! Layered layout on top of `dugong`.
//!
//! The records of one root graph are exported into a compound `dugong` multigraph: nodes keep
//! their point sizes, `cluster*` subgraphs become compound parents and every edge carries its
//! label box. The dagre stages then run in order and the result is read back as top-down drawing
//! frames for [`crate::route::finish`].
//!
//! Two kinds of edges never reach the later stages. Self-loops are not exported at all. Edges
//! whose ends end up on one rank are taken out after ranking; a labeled one is exported with a
//! label node on the half rank above its ends, so its label owns space nothing else is placed in.

use crate::attrs::{CLUSTER_MARGIN, RankDir};
use crate::geom::{Frame, Point, Size};
use crate::graph::{Arena, EdgeId, NodeId, SubgraphId};
use dugong::graphlib::{EdgeKey, Graph, GraphOptions};
use dugong::{
    EdgeLabel, GraphLabel, NodeLabel, acyclic, add_border_segments, coordinate_system,
    nesting_graph, normalize, order, parent_dummy_chains, position, rank, util,
};
use rustc_hash::FxHashMap;

type LayoutGraph = Graph<NodeLabel, EdgeLabel, GraphLabel>;

/// Separation next to dummy nodes, in points.
const EDGE_SEP: f64 = 10.0;

const EDGE_PROXY: &str = "edge-proxy";
const BORDER: &str = "border";

pub(crate) fn is_cluster(name: &str) -> bool {
    name.starts_with("cluster")
}

fn node_key(node: NodeId) -> String {
    format!("n{}", node.index())
}

fn cluster_key(graph: SubgraphId) -> String {
    format!("c{}", graph.index())
}

fn label_key(edge: EdgeId) -> String {
    format!("l{}", edge.index())
}

fn edge_name(edge: EdgeId) -> String {
    format!("e{}", edge.index())
}

/// The exported edge behind `key`, following the name a reversed edge keeps on its label.
fn edge_of(key: &EdgeKey, label: &EdgeLabel) -> Option<EdgeId> {
    let name = if label.reversed {
        label.forward_name.as_deref()
    } else {
        key.name.as_deref()
    };
    let index: usize = name?.strip_prefix('e')?.parse().ok()?;
    Some(EdgeId::from_index(index))
}

fn rank_of(g: &LayoutGraph, v: &str) -> Option<i32> {
    g.node(v).and_then(|n| n.rank)
}

fn frame_of(label: &NodeLabel) -> Option<Frame> {
    Some(Frame::from_center(
        Point::new(label.x?, label.y?),
        Size::new(label.width, label.height),
    ))
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Insets {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Insets {
    /// Insets for a cluster with an optional title, expressed in the working space of `dir`.
    ///
    /// In the drawing the title always sits on top, so the working side that receives it depends
    /// on how the working space maps onto the drawing.
    pub fn for_cluster(label: Option<Size>, dir: RankDir) -> Self {
        let m = CLUSTER_MARGIN;
        let title = m + label.map_or(0.0, |l| l.height);
        match dir {
            RankDir::TB => Self {
                left: m,
                top: title,
                right: m,
                bottom: m,
            },
            RankDir::BT => Self {
                left: m,
                top: m,
                right: m,
                bottom: title,
            },
            RankDir::LR | RankDir::RL => Self {
                left: title,
                top: m,
                right: m,
                bottom: m,
            },
        }
    }
}

/// Bend points and label center of one edge, top-down drawing space.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Routed {
    /// Points between the two ends, tail side first.
    pub bends: Vec<Point>,
    pub label: Option<Point>,
}

/// Top-down drawing-space result of a layout, not yet translated to the origin.
#[derive(Debug, Default)]
pub(crate) struct Placement {
    pub nodes: FxHashMap<NodeId, Frame>,
    pub clusters: FxHashMap<SubgraphId, Frame>,
    pub edges: FxHashMap<EdgeId, Routed>,
}

struct Layout<'a> {
    arena: &'a Arena,
    root: SubgraphId,
    dir: RankDir,
    g: LayoutGraph,
    /// Innermost exported cluster of every node, `None` at the top level.
    owner: FxHashMap<NodeId, Option<SubgraphId>>,
    /// Exported clusters, parents before children.
    clusters: Vec<SubgraphId>,
    cluster_parent: FxHashMap<SubgraphId, Option<SubgraphId>>,
    /// Label nodes of labeled `minlen=0` edges.
    flat_labels: FxHashMap<EdgeId, String>,
    /// Edges whose ends share a rank.
    flat: Vec<EdgeId>,
}

/// Lays out the root graph `root` of `arena`.
pub(crate) fn run(arena: &Arena, root: SubgraphId) -> Placement {
    let dir = arena.graphs[root.index()].rankdir;
    let mut layout = Layout {
        arena,
        root,
        dir,
        g: Graph::new(GraphOptions {
            multigraph: true,
            compound: true,
            ..Default::default()
        }),
        owner: FxHashMap::default(),
        clusters: Vec::new(),
        cluster_parent: FxHashMap::default(),
        flat_labels: FxHashMap::default(),
        flat: Vec::new(),
    };
    layout.export();
    tracing::trace!(
        nodes = layout.g.node_count(),
        edges = layout.g.edge_count(),
        clusters = layout.clusters.len(),
        "layout graph exported"
    );
    layout.rank();
    layout.order();
    layout.position();
    layout.read_back()
}

impl<'a> Layout<'a> {
    fn export(&mut self) {
        let arena = self.arena;
        let rec = &arena.graphs[self.root.index()];
        self.g.set_graph(GraphLabel {
            rankdir: match self.dir {
                RankDir::TB => dugong::RankDir::TB,
                RankDir::BT => dugong::RankDir::BT,
                RankDir::LR => dugong::RankDir::LR,
                RankDir::RL => dugong::RankDir::RL,
            },
            nodesep: rec.nodesep,
            // Edges span twice their minlen, the rank in between holds their labels.
            ranksep: rec.ranksep / 2.0,
            edgesep: EDGE_SEP,
            ..Default::default()
        });
        self.export_graph(self.root, None);

        for (i, e) in arena.edges.iter().enumerate() {
            if e.root != self.root || e.tail == e.head {
                continue;
            }
            let id = EdgeId::from_index(i);
            let label = e.label.unwrap_or_default();
            let flat_label = e.minlen == 0 && !label.is_empty();
            let carried = if flat_label { Size::default() } else { label };
            self.g.set_edge_named(
                node_key(e.tail),
                node_key(e.head),
                Some(edge_name(id)),
                Some(EdgeLabel {
                    width: carried.width,
                    height: carried.height,
                    minlen: 2 * e.minlen as usize,
                    weight: 1.0,
                    ..Default::default()
                }),
            );
            if flat_label {
                self.add_label_node(id, e.tail, e.head, label);
            }
        }
    }

    fn export_graph(&mut self, graph: SubgraphId, enclosing: Option<SubgraphId>) {
        let arena = self.arena;
        let rec = &arena.graphs[graph.index()];
        for &n in &rec.nodes {
            let size = arena.nodes[n.index()].size;
            let key = node_key(n);
            self.g.set_node(
                key.clone(),
                NodeLabel {
                    width: size.width,
                    height: size.height,
                    ..Default::default()
                },
            );
            if let Some(c) = enclosing {
                self.g.set_parent(key, cluster_key(c));
            }
            self.owner.insert(n, enclosing);
        }
        for &child in &rec.subgraphs {
            if !arena.has_content(child) {
                continue;
            }
            if !is_cluster(&arena.graphs[child.index()].name) {
                self.export_graph(child, enclosing);
                continue;
            }
            let key = cluster_key(child);
            self.g.set_node(key.clone(), NodeLabel::default());
            if let Some(c) = enclosing {
                self.g.set_parent(key, cluster_key(c));
            }
            self.clusters.push(child);
            self.cluster_parent.insert(child, enclosing);
            self.export_graph(child, Some(child));
        }
    }

    /// Enclosing clusters of `node`, innermost first.
    fn cluster_chain(&self, node: NodeId) -> Vec<SubgraphId> {
        let mut chain = Vec::new();
        let mut cur = self.owner.get(&node).copied().flatten();
        while let Some(c) = cur {
            chain.push(c);
            cur = self.cluster_parent.get(&c).copied().flatten();
        }
        chain
    }

    fn add_label_node(&mut self, edge: EdgeId, tail: NodeId, head: NodeId, label: Size) {
        let key = label_key(edge);
        self.g.set_node(
            key.clone(),
            NodeLabel {
                width: label.width,
                height: label.height,
                ..Default::default()
            },
        );
        let outer = self.cluster_chain(head);
        if let Some(common) = self.cluster_chain(tail).into_iter().find(|c| outer.contains(c)) {
            self.g.set_parent(key.clone(), cluster_key(common));
        }
        for end in [tail, head] {
            self.g.set_edge_with_label(
                key.clone(),
                node_key(end),
                EdgeLabel {
                    minlen: 1,
                    weight: 1.0,
                    ..Default::default()
                },
            );
        }
        self.flat_labels.insert(edge, key);
    }

    fn rank(&mut self) {
        acyclic::run(&mut self.g);
        nesting_graph::run(&mut self.g);

        // Ranking runs on the leaves only, clusters take their span from their border nodes.
        let mut ranked = util::as_non_compound_graph(&self.g);
        rank::rank(&mut ranked);
        for v in self.g.node_ids() {
            if !self.g.children(&v).is_empty() {
                continue;
            }
            let Some(r) = rank_of(&ranked, &v) else {
                continue;
            };
            if let Some(n) = self.g.node_mut(&v) {
                n.rank = Some(r);
            }
        }

        self.split_flat_edges();
        let proxies = self.inject_label_proxies();
        util::remove_empty_ranks(&mut self.g);
        nesting_graph::cleanup(&mut self.g);
        util::normalize_ranks(&mut self.g);
        self.remove_label_proxies(proxies);
        self.assign_cluster_rank_spans();
    }

    /// Takes edges whose ends share a rank out of the graph.
    ///
    /// A labeled `minlen=0` edge that still spans ranks gives up its label node and carries the
    /// label itself, like any other edge.
    fn split_flat_edges(&mut self) {
        for key in self.g.edge_keys() {
            let Some(id) = self.g.edge_by_key(&key).and_then(|l| edge_of(&key, l)) else {
                continue;
            };
            if rank_of(&self.g, &key.v) != rank_of(&self.g, &key.w) {
                if let Some(node) = self.flat_labels.remove(&id) {
                    let size = self.arena.edges[id.index()].label.unwrap_or_default();
                    self.g.remove_node(&node);
                    if let Some(l) = self.g.edge_mut_by_key(&key) {
                        l.width = size.width;
                        l.height = size.height;
                    }
                }
                continue;
            }
            self.g.remove_edge_key(&key);
            self.flat.push(id);
        }
    }

    /// Marks the rank halfway along every labeled edge so that it survives rank compaction.
    fn inject_label_proxies(&mut self) -> Vec<String> {
        let mut proxies = Vec::new();
        for key in self.g.edge_keys() {
            let Some(edge) = self.g.edge_by_key(&key) else {
                continue;
            };
            if edge.width <= 0.0 || edge.height <= 0.0 {
                continue;
            }
            let (Some(v), Some(w)) = (rank_of(&self.g, &key.v), rank_of(&self.g, &key.w)) else {
                continue;
            };
            let id = util::unique_id("_ep");
            self.g.set_node(
                id.clone(),
                NodeLabel {
                    rank: Some((w - v) / 2 + v),
                    dummy: Some(EDGE_PROXY.to_string()),
                    edge_obj: Some(key.clone()),
                    ..Default::default()
                },
            );
            proxies.push(id);
        }
        proxies
    }

    fn remove_label_proxies(&mut self, proxies: Vec<String>) {
        for v in proxies {
            let Some(node) = self.g.node(&v).cloned() else {
                continue;
            };
            if let Some(edge) = node.edge_obj.as_ref().and_then(|k| self.g.edge_mut_by_key(k)) {
                edge.label_rank = node.rank;
            }
            self.g.remove_node(&v);
        }
    }

    fn assign_cluster_rank_spans(&mut self) {
        for &c in &self.clusters {
            let key = cluster_key(c);
            let Some(node) = self.g.node(&key) else {
                continue;
            };
            let (Some(top), Some(bottom)) = (&node.border_top, &node.border_bottom) else {
                continue;
            };
            let (Some(min), Some(max)) = (rank_of(&self.g, top), rank_of(&self.g, bottom)) else {
                continue;
            };
            if let Some(n) = self.g.node_mut(&key) {
                n.min_rank = Some(min);
                n.max_rank = Some(max);
            }
        }
    }

    fn order(&mut self) {
        normalize::run(&mut self.g);
        parent_dummy_chains::parent_dummy_chains(&mut self.g);
        add_border_segments::add_border_segments(&mut self.g);
        order::order(&mut self.g, order::OrderOptions::default());
    }

    fn position(&mut self) {
        coordinate_system::adjust(&mut self.g);
        self.size_borders();
        position::position(&mut self.g);
        for (v, x) in position::bk::position_x(&self.g) {
            if let Some(n) = self.g.node_mut(&v) {
                n.x = Some(x);
            }
        }
        self.frame_clusters();
        self.remove_border_nodes();
        normalize::undo(&mut self.g);
        coordinate_system::undo(&mut self.g);

        for key in self.g.edge_keys() {
            if let Some(l) = self.g.edge_mut_by_key(&key) {
                if l.reversed {
                    l.points.reverse();
                }
            }
        }
        acyclic::undo(&mut self.g);
    }

    /// Gives border nodes the size of the cluster insets, in working space.
    ///
    /// The top border node also gets the title width so the top rank of a cluster is at least as
    /// wide as its title when the title runs across the working space.
    fn size_borders(&mut self) {
        let arena = self.arena;
        let dir = self.dir;
        for &c in &self.clusters {
            let title = arena.graphs[c.index()].label;
            let insets = Insets::for_cluster(title, dir);
            let title_width = title.map_or(0.0, |t| t.width);
            let Some(node) = self.g.node(&cluster_key(c)).cloned() else {
                continue;
            };
            let mut sized = Vec::new();
            if let Some(top) = node.border_top {
                let width = if dir == RankDir::TB { title_width } else { 0.0 };
                sized.push((top, width, insets.top));
            }
            if let Some(bottom) = node.border_bottom {
                let width = if dir == RankDir::BT { title_width } else { 0.0 };
                sized.push((bottom, width, insets.bottom));
            }
            sized.extend(node.border_left.into_iter().flatten().map(|v| (v, insets.left, 0.0)));
            sized.extend(node.border_right.into_iter().flatten().map(|v| (v, insets.right, 0.0)));
            for (v, width, height) in sized {
                if let Some(n) = self.g.node_mut(&v) {
                    n.width = width;
                    n.height = height;
                }
            }
        }
    }

    /// Working-space cluster boxes: border nodes, members and nested clusters, widened along the
    /// title when the title is longer than the content.
    fn frame_clusters(&mut self) {
        let arena = self.arena;
        let mut frames: FxHashMap<SubgraphId, Frame> = FxHashMap::default();
        for &c in self.clusters.iter().rev() {
            let Some(node) = self.g.node(&cluster_key(c)) else {
                continue;
            };
            let borders = node
                .border_top
                .iter()
                .chain(&node.border_bottom)
                .chain(node.border_left.iter().flatten())
                .chain(node.border_right.iter().flatten());
            let members = self
                .owner
                .iter()
                .filter(|&(_, &o)| o == Some(c))
                .map(|(&n, _)| node_key(n));
            let mut frame: Option<Frame> = None;
            for v in borders.cloned().chain(members) {
                if let Some(f) = self.g.node(&v).and_then(frame_of) {
                    frame = Some(frame.map_or(f, |acc| acc.union(&f)));
                }
            }
            for (child, _) in self.cluster_parent.iter().filter(|&(_, &p)| p == Some(c)) {
                if let Some(f) = frames.get(child) {
                    frame = Some(frame.map_or(*f, |acc| acc.union(f)));
                }
            }
            let Some(mut frame) = frame else {
                continue;
            };
            if let Some(title) = arena.graphs[c.index()].label {
                let needed = title.width + 2.0 * CLUSTER_MARGIN;
                if self.dir.is_horizontal() {
                    frame = frame.grown_to(frame.width, needed);
                } else {
                    frame = frame.grown_to(needed, frame.height);
                }
            }
            frames.insert(c, frame);
        }
        for (c, frame) in frames {
            if let Some(n) = self.g.node_mut(&cluster_key(c)) {
                let center = frame.center();
                n.x = Some(center.x);
                n.y = Some(center.y);
                n.width = frame.width;
                n.height = frame.height;
            }
        }
    }

    fn remove_border_nodes(&mut self) {
        let borders: Vec<String> = self
            .g
            .node_ids()
            .into_iter()
            .filter(|v| self.g.node(v).and_then(|n| n.dummy.as_deref()) == Some(BORDER))
            .collect();
        for v in borders {
            self.g.remove_node(&v);
        }
    }

    fn read_back(self) -> Placement {
        let mut out = Placement::default();
        for &n in self.owner.keys() {
            let Some(label) = self.g.node(&node_key(n)) else {
                continue;
            };
            let (Some(x), Some(y)) = (label.x, label.y) else {
                continue;
            };
            let size = self.arena.nodes[n.index()].size;
            out.nodes.insert(n, Frame::from_center(Point::new(x, y), size));
        }
        for &c in &self.clusters {
            if let Some(frame) = self.g.node(&cluster_key(c)).and_then(frame_of) {
                out.clusters.insert(c, frame);
            }
        }
        for key in self.g.edge_keys() {
            let Some(label) = self.g.edge_by_key(&key) else {
                continue;
            };
            let Some(id) = edge_of(&key, label) else {
                continue;
            };
            out.edges.insert(
                id,
                Routed {
                    bends: label.points.iter().map(|p| Point::new(p.x, p.y)).collect(),
                    label: label.x.zip(label.y).map(|(x, y)| Point::new(x, y)),
                },
            );
        }
        for &id in &self.flat {
            let label = self
                .flat_labels
                .get(&id)
                .and_then(|v| self.g.node(v))
                .and_then(|n| Some(Point::new(n.x?, n.y?)));
            out.edges.insert(
                id,
                Routed {
                    bends: Vec::new(),
                    label,
                },
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Handle;

    #[test]
    fn reversed_edges_keep_their_export_name() {
        let forward = EdgeLabel::default();
        let key = EdgeKey::new("n0", "n1", Some("e7"));
        assert_eq!(edge_of(&key, &forward), Some(EdgeId::from_index(7)));

        let reversed = EdgeLabel {
            reversed: true,
            forward_name: Some("e3".to_string()),
            ..Default::default()
        };
        let key = EdgeKey::new("n1", "n0", Some("rev1"));
        assert_eq!(edge_of(&key, &reversed), Some(EdgeId::from_index(3)));
        assert_eq!(edge_of(&EdgeKey::new("l0", "n0", None::<String>), &forward), None);
    }

    #[test]
    fn cluster_frames_contain_their_nodes() {
        let mut arena = Arena::default();
        let g = arena.open_root("g");
        let c = arena.create_subgraph(g, "cluster_0").unwrap();
        let a = arena.create_node(c, "a").unwrap();
        let b = arena.create_node(c, "b").unwrap();
        let x = arena.create_node(g, "x").unwrap();
        arena.create_edge(g, a, b).unwrap();
        arena.create_edge(g, x, a).unwrap();

        let placement = run(&arena, g);
        let frame = placement.clusters[&c];
        for n in [a, b] {
            let f = placement.nodes[&n];
            assert!(f.x >= frame.x - 1e-9 && f.max_x() <= frame.max_x() + 1e-9);
            assert!(f.y >= frame.y - 1e-9 && f.max_y() <= frame.max_y() + 1e-9);
        }
        let fx = placement.nodes[&x];
        let outside = fx.max_y() <= frame.y + 1e-9
            || fx.y >= frame.max_y() - 1e-9
            || fx.max_x() <= frame.x + 1e-9
            || fx.x >= frame.max_x() - 1e-9;
        assert!(outside);
    }

    #[test]
    fn plain_subgraphs_do_not_form_boxes() {
        let mut arena = Arena::default();
        let g = arena.open_root("g");
        let s = arena.create_subgraph(g, "same_rank").unwrap();
        let a = arena.create_node(s, "a").unwrap();

        let placement = run(&arena, g);
        assert!(placement.clusters.is_empty());
        assert!(placement.nodes.contains_key(&a));
    }

    #[test]
    fn titled_clusters_are_wide_enough_for_the_title() {
        let mut arena = Arena::default();
        let g = arena.open_root("g");
        let c = arena.create_subgraph(g, "cluster_t").unwrap();
        arena
            .set_attr(Handle::Graph(c), "label", &crate::encode_label_dim(300, 20))
            .unwrap();
        arena.create_node(c, "a").unwrap();

        let placement = run(&arena, g);
        let frame = placement.clusters[&c];
        assert!(frame.width >= 300.0 + 2.0 * CLUSTER_MARGIN - 1e-9);
        assert!(frame.height >= 36.0 + 20.0 + 2.0 * CLUSTER_MARGIN - 1e-9);
    }

    #[test]
    fn labeled_flat_edges_get_a_label_node_above_their_ends() {
        let mut arena = Arena::default();
        let g = arena.open_root("g");
        let a = arena.create_node(g, "a").unwrap();
        let b = arena.create_node(g, "b").unwrap();
        let e = arena.create_edge(g, a, b).unwrap();
        arena.set_attr(Handle::Edge(e), "minlen", "0").unwrap();
        arena
            .set_attr(Handle::Edge(e), "label", &crate::encode_label_dim(80, 14))
            .unwrap();

        let placement = run(&arena, g);
        let fa = placement.nodes[&a];
        let fb = placement.nodes[&b];
        assert!((fa.center().y - fb.center().y).abs() < 1e-9);

        let routed = &placement.edges[&e];
        assert!(routed.bends.is_empty());
        let label = Frame::from_center(routed.label.unwrap(), Size::new(80.0, 14.0));
        assert!(label.max_y() <= fa.y + 1e-9);
    }
}
