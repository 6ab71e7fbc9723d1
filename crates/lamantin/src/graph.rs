//! Arena-owned graph records.
//!
//! All records live in one [`Arena`] owned by a [`crate::Context`]. Callers only ever hold
//! copyable index handles; dropping the context drops every record at once.

use crate::attrs::{
    self, DEFAULT_NODE_HEIGHT_IN, DEFAULT_NODE_WIDTH_IN, DEFAULT_NODESEP_IN, DEFAULT_RANKSEP_IN,
    POINTS_PER_INCH, RankDir,
};
use crate::error::{Error, Result};
use crate::geom::{BoundingBox, Point, Size};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }

            pub(crate) fn from_index(index: usize) -> Self {
                Self(index as u32)
            }
        }
    };
}

handle!(
    /// A node handle, valid only inside the context that created it.
    NodeId
);
handle!(
    /// An edge handle, valid only inside the context that created it.
    EdgeId
);
handle!(
    /// A root graph or subgraph handle, valid only inside the context that created it.
    SubgraphId
);

/// Anything an attribute can be set on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    Graph(SubgraphId),
    Node(NodeId),
    Edge(EdgeId),
}

impl From<SubgraphId> for Handle {
    fn from(value: SubgraphId) -> Self {
        Self::Graph(value)
    }
}

impl From<NodeId> for Handle {
    fn from(value: NodeId) -> Self {
        Self::Node(value)
    }
}

impl From<EdgeId> for Handle {
    fn from(value: EdgeId) -> Self {
        Self::Edge(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphInfo {
    pub bb: BoundingBox,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterInfo {
    pub bb: BoundingBox,
    /// Center of the reserved title area, when the cluster has a `label`.
    pub label_pos: Option<Point>,
}

/// What the engine stored on a graph record after layout.
///
/// Root graphs get [`GraphRecord::Root`], clusters that received content get
/// [`GraphRecord::Cluster`]. Subgraphs without any node stay [`GraphRecord::Pending`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum GraphRecord {
    #[default]
    Pending,
    Root(GraphInfo),
    Cluster(ClusterInfo),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EdgeRoute {
    /// Polyline from the tail boundary to the head boundary.
    pub points: Vec<Point>,
    pub label_pos: Option<Point>,
    pub tail_label_pos: Option<Point>,
    pub head_label_pos: Option<Point>,
}

#[derive(Debug, Clone)]
pub(crate) struct NodeRec {
    pub name: String,
    pub graph: SubgraphId,
    pub root: SubgraphId,
    pub size: Size,
    pub attrs: BTreeMap<String, String>,
    pub bb: Option<BoundingBox>,
}

#[derive(Debug, Clone)]
pub(crate) struct EdgeRec {
    pub tail: NodeId,
    pub head: NodeId,
    pub root: SubgraphId,
    pub minlen: u32,
    pub label: Option<Size>,
    pub tail_label: Option<Size>,
    pub head_label: Option<Size>,
    pub attrs: BTreeMap<String, String>,
    pub route: Option<EdgeRoute>,
}

#[derive(Debug, Clone)]
pub(crate) struct SubgraphRec {
    pub name: String,
    pub parent: Option<SubgraphId>,
    pub root: SubgraphId,
    pub label: Option<Size>,
    pub subgraphs: Vec<SubgraphId>,
    pub nodes: Vec<NodeId>,
    pub attrs: BTreeMap<String, String>,
    pub rankdir: RankDir,
    pub nodesep: f64,
    pub ranksep: f64,
    pub record: GraphRecord,
}

impl SubgraphRec {
    fn new(name: &str, parent: Option<SubgraphId>, root: SubgraphId) -> Self {
        Self {
            name: name.to_string(),
            parent,
            root,
            label: None,
            subgraphs: Vec::new(),
            nodes: Vec::new(),
            attrs: BTreeMap::new(),
            rankdir: RankDir::TB,
            nodesep: DEFAULT_NODESEP_IN * POINTS_PER_INCH,
            ranksep: DEFAULT_RANKSEP_IN * POINTS_PER_INCH,
            record: GraphRecord::Pending,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Arena {
    pub nodes: Vec<NodeRec>,
    pub edges: Vec<EdgeRec>,
    pub graphs: Vec<SubgraphRec>,
    node_names: FxHashMap<(SubgraphId, String), NodeId>,
    subgraph_names: FxHashMap<(SubgraphId, String), SubgraphId>,
}

impl Arena {
    pub fn open_root(&mut self, name: &str) -> SubgraphId {
        let id = SubgraphId::from_index(self.graphs.len());
        self.graphs.push(SubgraphRec::new(name, None, id));
        id
    }

    pub fn graph(&self, id: SubgraphId) -> Result<&SubgraphRec> {
        self.graphs.get(id.index()).ok_or(Error::UnknownGraph(id))
    }

    fn graph_mut(&mut self, id: SubgraphId) -> Result<&mut SubgraphRec> {
        self.graphs.get_mut(id.index()).ok_or(Error::UnknownGraph(id))
    }

    pub fn node(&self, id: NodeId) -> Result<&NodeRec> {
        self.nodes.get(id.index()).ok_or(Error::UnknownNode(id))
    }

    pub fn create_subgraph(&mut self, parent: SubgraphId, name: &str) -> Result<SubgraphId> {
        let root = self.graph(parent)?.root;
        if let Some(&existing) = self.subgraph_names.get(&(parent, name.to_string())) {
            return Ok(existing);
        }
        let id = SubgraphId::from_index(self.graphs.len());
        self.graphs.push(SubgraphRec::new(name, Some(parent), root));
        self.graph_mut(parent)?.subgraphs.push(id);
        self.subgraph_names.insert((parent, name.to_string()), id);
        Ok(id)
    }

    /// Node names are unique per root graph; asking twice returns the first node.
    pub fn create_node(&mut self, graph: SubgraphId, name: &str) -> Result<NodeId> {
        let root = self.graph(graph)?.root;
        if let Some(&existing) = self.node_names.get(&(root, name.to_string())) {
            return Ok(existing);
        }
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(NodeRec {
            name: name.to_string(),
            graph,
            root,
            size: Size::new(
                DEFAULT_NODE_WIDTH_IN * POINTS_PER_INCH,
                DEFAULT_NODE_HEIGHT_IN * POINTS_PER_INCH,
            ),
            attrs: BTreeMap::new(),
            bb: None,
        });
        self.graph_mut(graph)?.nodes.push(id);
        self.node_names.insert((root, name.to_string()), id);
        Ok(id)
    }

    pub fn create_edge(&mut self, graph: SubgraphId, tail: NodeId, head: NodeId) -> Result<EdgeId> {
        let root = self.graph(graph)?.root;
        for n in [tail, head] {
            let rec = self.node(n)?;
            if rec.root != root {
                return Err(Error::ForeignNode {
                    node: rec.name.clone(),
                });
            }
        }
        let id = EdgeId::from_index(self.edges.len());
        self.edges.push(EdgeRec {
            tail,
            head,
            root,
            minlen: 1,
            label: None,
            tail_label: None,
            head_label: None,
            attrs: BTreeMap::new(),
            route: None,
        });
        Ok(id)
    }

    pub fn set_attr(&mut self, handle: Handle, name: &str, value: &str) -> Result<()> {
        match handle {
            Handle::Graph(id) => {
                let g = self.graph_mut(id)?;
                match name {
                    "rankdir" => g.rankdir = attrs::parse_rankdir(name, value)?,
                    "nodesep" => g.nodesep = attrs::parse_inches(name, value)? * POINTS_PER_INCH,
                    "ranksep" => g.ranksep = attrs::parse_inches(name, value)? * POINTS_PER_INCH,
                    "label" => g.label = Some(attrs::label_size(value)).filter(|s| !s.is_empty()),
                    _ => {}
                }
                g.attrs.insert(name.to_string(), value.to_string());
            }
            Handle::Node(id) => {
                let n = self.nodes.get_mut(id.index()).ok_or(Error::UnknownNode(id))?;
                match name {
                    "width" => n.size.width = attrs::parse_inches(name, value)? * POINTS_PER_INCH,
                    "height" => {
                        n.size.height = attrs::parse_inches(name, value)? * POINTS_PER_INCH
                    }
                    _ => {}
                }
                n.attrs.insert(name.to_string(), value.to_string());
            }
            Handle::Edge(id) => {
                let e = self.edges.get_mut(id.index()).ok_or(Error::UnknownEdge(id))?;
                match name {
                    "minlen" => e.minlen = attrs::parse_minlen(name, value)?,
                    "label" => e.label = Some(attrs::label_size(value)).filter(|s| !s.is_empty()),
                    "taillabel" => {
                        e.tail_label = Some(attrs::label_size(value)).filter(|s| !s.is_empty())
                    }
                    "headlabel" => {
                        e.head_label = Some(attrs::label_size(value)).filter(|s| !s.is_empty())
                    }
                    _ => {}
                }
                e.attrs.insert(name.to_string(), value.to_string());
            }
        }
        Ok(())
    }

    pub fn attr(&self, handle: Handle, name: &str) -> Option<&str> {
        let attrs = match handle {
            Handle::Graph(id) => &self.graphs.get(id.index())?.attrs,
            Handle::Node(id) => &self.nodes.get(id.index())?.attrs,
            Handle::Edge(id) => &self.edges.get(id.index())?.attrs,
        };
        attrs.get(name).map(String::as_str)
    }

    /// Returns `true` when `graph` transitively contains at least one node.
    pub fn has_content(&self, graph: SubgraphId) -> bool {
        let Some(g) = self.graphs.get(graph.index()) else {
            return false;
        };
        !g.nodes.is_empty() || g.subgraphs.iter().any(|&c| self.has_content(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_names_are_unique_per_root() {
        let mut arena = Arena::default();
        let g = arena.open_root("g");
        let sub = arena.create_subgraph(g, "cluster_a").unwrap();
        let a = arena.create_node(g, "a").unwrap();
        let again = arena.create_node(sub, "a").unwrap();
        assert_eq!(a, again);
        assert_eq!(arena.graph(sub).unwrap().nodes.len(), 0);
    }

    #[test]
    fn edges_cannot_cross_roots() {
        let mut arena = Arena::default();
        let g1 = arena.open_root("g1");
        let g2 = arena.open_root("g2");
        let a = arena.create_node(g1, "a").unwrap();
        let b = arena.create_node(g2, "b").unwrap();
        assert!(matches!(
            arena.create_edge(g1, a, b),
            Err(Error::ForeignNode { .. })
        ));
    }

    #[test]
    fn content_is_found_in_nested_subgraphs() {
        let mut arena = Arena::default();
        let g = arena.open_root("g");
        let outer = arena.create_subgraph(g, "outer").unwrap();
        let inner = arena.create_subgraph(outer, "inner").unwrap();
        let empty = arena.create_subgraph(g, "empty").unwrap();
        arena.create_node(inner, "n").unwrap();
        assert!(arena.has_content(outer));
        assert!(!arena.has_content(empty));
    }

    #[test]
    fn node_size_attributes_are_inches() {
        let mut arena = Arena::default();
        let g = arena.open_root("g");
        let n = arena.create_node(g, "n").unwrap();
        arena.set_attr(Handle::Node(n), "width", "0.1").unwrap();
        arena.set_attr(Handle::Node(n), "height", "2").unwrap();
        let size = arena.node(n).unwrap().size;
        assert!((size.width - 7.2).abs() < 1e-9);
        assert!((size.height - 144.0).abs() < 1e-9);
        assert_eq!(arena.attr(Handle::Node(n), "width"), Some("0.1"));
    }
}
