#![forbid(unsafe_code)]

//! Layered graph layout with clusters, driven through string attributes.
//!
//! Ranking, ordering and coordinate assignment are done by `dugong`; this crate owns the records,
//! the attribute parsing and the engine-space write-back.
//!
//! The engine is driven through a [`Context`]: build a root graph with subgraphs, nodes and edges,
//! set string attributes on them, run [`Context::layout`] and read the computed geometry back.
//! Coordinates are points with a Y-up origin at the bottom-left of the root graph.
//!
//! A context owns every record it creates. Handles are plain indices and must not outlive the
//! context; closing the context releases all of it.

pub mod attrs;
pub mod error;
pub mod geom;
pub mod graph;
mod layout;
mod route;

pub use attrs::{RankDir, decode_label_dim, encode_label_dim};
pub use error::{Error, Result};
pub use geom::{BoundingBox, Point, Size};
pub use graph::{ClusterInfo, EdgeId, EdgeRoute, GraphInfo, GraphRecord, Handle, NodeId, SubgraphId};

use graph::Arena;
use std::sync::atomic::{AtomicU64, Ordering};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

static NEXT_CONTEXT: AtomicU64 = AtomicU64::new(1);

/// An engine context: owns all graphs, nodes and edges created through it.
#[derive(Debug)]
pub struct Context {
    id: u64,
    arena: Arena,
}

impl Context {
    pub fn open() -> Self {
        let id = NEXT_CONTEXT.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(context = id, "layout context opened");
        Self {
            id,
            arena: Arena::default(),
        }
    }

    /// Releases the context and everything it owns.
    pub fn close(self) {
        drop(self);
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Creates a new root graph.
    pub fn open_graph(&mut self, name: &str) -> SubgraphId {
        self.arena.open_root(name)
    }

    /// Creates (or returns the existing) subgraph `name` under `parent`.
    ///
    /// Subgraphs whose name starts with `cluster` are laid out as boxes; others only group nodes.
    pub fn create_subgraph(&mut self, parent: SubgraphId, name: &str) -> Result<SubgraphId> {
        self.arena.create_subgraph(parent, name)
    }

    /// Creates (or returns the existing) node `name` in `graph`. Names are unique per root graph.
    pub fn create_node(&mut self, graph: SubgraphId, name: &str) -> Result<NodeId> {
        self.arena.create_node(graph, name)
    }

    pub fn create_edge(&mut self, graph: SubgraphId, tail: NodeId, head: NodeId) -> Result<EdgeId> {
        self.arena.create_edge(graph, tail, head)
    }

    /// Sets an attribute.
    ///
    /// Recognized attributes:
    /// - graph: `rankdir`, `nodesep` / `ranksep` (inches), `label`
    /// - node: `width` / `height` (inches)
    /// - edge: `minlen`, `label`, `taillabel`, `headlabel`
    ///
    /// Labels are either text (sized by a rough estimate) or a pre-measured box produced by
    /// [`encode_label_dim`]. Any other attribute is stored verbatim.
    pub fn set_attr(&mut self, handle: impl Into<Handle>, name: &str, value: &str) -> Result<()> {
        self.arena.set_attr(handle.into(), name, value)
    }

    pub fn attr(&self, handle: impl Into<Handle>, name: &str) -> Option<&str> {
        self.arena.attr(handle.into(), name)
    }

    pub fn node_name(&self, node: NodeId) -> Option<&str> {
        self.arena.nodes.get(node.index()).map(|n| n.name.as_str())
    }

    pub fn subgraphs(&self, graph: SubgraphId) -> &[SubgraphId] {
        self.arena
            .graphs
            .get(graph.index())
            .map(|g| g.subgraphs.as_slice())
            .unwrap_or_default()
    }

    /// Lays out the root graph `graph`.
    pub fn layout(&mut self, graph: SubgraphId) -> Result<()> {
        let rec = self.arena.graph(graph)?;
        if rec.parent.is_some() {
            return Err(Error::NotARoot(graph));
        }
        tracing::trace!(
            context = self.id,
            graph = %rec.name,
            rankdir = ?rec.rankdir,
            "layout started"
        );
        let placement = layout::run(&self.arena, graph);
        route::finish(&mut self.arena, graph, placement);
        tracing::trace!(context = self.id, "layout finished");
        Ok(())
    }

    /// Final box of a node, available after layout.
    pub fn node_box(&self, node: NodeId) -> Option<BoundingBox> {
        self.arena.nodes.get(node.index()).and_then(|n| n.bb)
    }

    pub fn graph_record(&self, graph: SubgraphId) -> Option<&GraphRecord> {
        self.arena.graphs.get(graph.index()).map(|g| &g.record)
    }

    pub fn edge_route(&self, edge: EdgeId) -> Option<&EdgeRoute> {
        self.arena
            .edges
            .get(edge.index())
            .and_then(|e| e.route.as_ref())
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        tracing::trace!(context = self.id, "layout context closed");
    }
}
