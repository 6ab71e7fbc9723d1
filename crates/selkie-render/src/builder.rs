//! Graph export: visible leafs become engine nodes, printed groups become `cluster*` subgraphs.

use crate::absorb::Absorption;
use crate::catalog::Catalog;
use crate::Result;
use indexmap::IndexMap;
use lamantin::{Context, EdgeId, NodeId, SubgraphId, encode_label_dim};
use selkie_core::{Diagram, EntityId, LinkId};

const POINTS_PER_INCH: f64 = 72.0;
/// Cluster title hints are reported slightly shorter than the title block.
const TITLE_HEIGHT_TRIM: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectedEdge {
    pub link: LinkId,
    pub edge: EdgeId,
}

/// Correlation between model entities and engine handles, valid for one layout session.
#[derive(Debug, Clone)]
pub struct GraphTables {
    pub root: SubgraphId,
    pub nodes: IndexMap<EntityId, NodeId>,
    pub clusters: IndexMap<EntityId, SubgraphId>,
    pub anchors: IndexMap<EntityId, NodeId>,
    pub edges: Vec<ProjectedEdge>,
}

impl GraphTables {
    fn new(root: SubgraphId) -> Self {
        Self {
            root,
            nodes: IndexMap::new(),
            clusters: IndexMap::new(),
            anchors: IndexMap::new(),
            edges: Vec::new(),
        }
    }

    /// `true` when nothing was exported, in which case there is nothing to lay out.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.clusters.is_empty()
    }
}

pub(crate) fn inches(points: f64) -> String {
    format!("{}", points / POINTS_PER_INCH)
}

pub struct GraphBuilder<'a> {
    ctx: &'a mut Context,
    diagram: &'a Diagram,
    catalog: &'a Catalog,
    absorption: &'a Absorption,
    tables: GraphTables,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(
        ctx: &'a mut Context,
        diagram: &'a Diagram,
        catalog: &'a Catalog,
        absorption: &'a Absorption,
    ) -> Self {
        let root = ctx.open_graph("selkie");
        Self {
            ctx,
            diagram,
            catalog,
            absorption,
            tables: GraphTables::new(root),
        }
    }

    /// Exports root leafs first, then every root group recursively.
    pub fn build(mut self) -> Result<GraphTables> {
        let root = self.tables.root;
        for leaf in self.diagram.root_leafs() {
            self.export_leaf(root, leaf)?;
        }
        for group in self.diagram.child_groups(None) {
            self.export_group(root, group)?;
        }
        tracing::trace!(
            nodes = self.tables.nodes.len(),
            clusters = self.tables.clusters.len(),
            "graph exported"
        );
        Ok(self.tables)
    }

    fn export_leaf(&mut self, graph: SubgraphId, entity: EntityId) -> Result<()> {
        if self.absorption.is_absorbed(entity) {
            return Ok(());
        }
        let (Some(prepared), Some(image)) = (
            self.catalog.node(entity),
            self.absorption.image(entity, self.catalog),
        ) else {
            tracing::warn!(entity = entity.index(), "no prepared image, entity skipped");
            return Ok(());
        };
        let d = image.dimension();
        let node = self.ctx.create_node(graph, &prepared.uid)?;
        self.ctx.set_attr(node, "shape", "rect")?;
        self.ctx.set_attr(node, "width", &inches(d.width))?;
        self.ctx.set_attr(node, "height", &inches(d.height))?;
        self.tables.nodes.insert(entity, node);
        Ok(())
    }

    fn export_group(&mut self, graph: SubgraphId, group: EntityId) -> Result<()> {
        if self.diagram.is_empty_package(group) {
            return self.export_leaf(graph, group);
        }
        let Some(entity) = self.diagram.entity(group) else {
            return Ok(());
        };
        if entity.packed {
            return self.export_content(graph, group);
        }
        let Some(cluster) = self.catalog.cluster(group) else {
            tracing::warn!(group = %entity.code, "no cluster prepared, group skipped");
            return Ok(());
        };
        let subgraph = self.ctx.create_subgraph(graph, &cluster.id)?;
        if !cluster.title.is_empty() {
            let d = cluster.title.dimension();
            let hint = encode_label_dim(d.width as i32, (d.height - TITLE_HEIGHT_TRIM) as i32);
            self.ctx.set_attr(subgraph, "label", &hint)?;
        }
        self.tables.clusters.insert(group, subgraph);
        self.export_content(subgraph, group)
    }

    fn export_content(&mut self, graph: SubgraphId, group: EntityId) -> Result<()> {
        for leaf in self.diagram.leafs_of(group) {
            self.export_leaf(graph, leaf)?;
        }
        for child in self.diagram.child_groups(Some(group)) {
            self.export_group(graph, child)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RenderOptions;
    use selkie_core::{DiagramKind, GroupKind, LeafKind, Link};

    fn build(d: &Diagram) -> (Context, GraphTables) {
        let options = RenderOptions::default();
        let catalog = Catalog::prepare(d, &options).unwrap();
        let absorption = Absorption::compute(d, &catalog, 20.0);
        let mut ctx = Context::open();
        let tables = GraphBuilder::new(&mut ctx, d, &catalog, &absorption)
            .build()
            .unwrap();
        (ctx, tables)
    }

    #[test]
    fn leafs_and_groups_are_exported_with_their_nesting() {
        let mut d = Diagram::new(DiagramKind::Component);
        let g = d.add_group("G", GroupKind::Package, None).unwrap();
        let a = d.add_leaf("a", LeafKind::Component, Some(g)).unwrap();
        let b = d.add_leaf("b", LeafKind::Component, None).unwrap();

        let (ctx, tables) = build(&d);
        assert_eq!(tables.nodes.keys().copied().collect::<Vec<_>>(), vec![b, a]);
        let sg = tables.clusters[&g];
        assert_eq!(ctx.subgraphs(tables.root), &[sg]);
        assert_eq!(ctx.node_name(tables.nodes[&a]), Some("ent0001"));
        assert!(ctx.attr(sg, "label").is_some());
    }

    #[test]
    fn packed_groups_export_into_their_parent() {
        let mut d = Diagram::new(DiagramKind::Class);
        let g = d.add_group("G", GroupKind::Namespace, None).unwrap();
        d.add_leaf("a", LeafKind::Class, Some(g)).unwrap();
        d.set_packed(g, true).unwrap();

        let (ctx, tables) = build(&d);
        assert!(tables.clusters.is_empty());
        assert_eq!(tables.nodes.len(), 1);
        assert!(ctx.subgraphs(tables.root).is_empty());
    }

    #[test]
    fn empty_packages_become_nodes() {
        let mut d = Diagram::new(DiagramKind::Class);
        let p = d.add_group("P", GroupKind::Package, None).unwrap();
        let (_, tables) = build(&d);
        assert!(tables.nodes.contains_key(&p));
        assert!(tables.clusters.is_empty());
    }

    #[test]
    fn absorbed_notes_are_not_exported() {
        let mut d = Diagram::new(DiagramKind::Class);
        let a = d.add_leaf("A", LeafKind::Class, None).unwrap();
        let n = d.add_leaf("N", LeafKind::Note, None).unwrap();
        d.add_link(Link::between(n, a)).unwrap();
        let (_, tables) = build(&d);
        assert!(tables.nodes.contains_key(&a));
        assert!(!tables.nodes.contains_key(&n));
    }

    #[test]
    fn concurrent_regions_are_skipped() {
        let mut d = Diagram::new(DiagramKind::State);
        let s = d.add_group("S", GroupKind::State, None).unwrap();
        let r = d.add_group("r", GroupKind::ConcurrentState, Some(s)).unwrap();
        let inner = d.add_leaf("x", LeafKind::State, Some(r)).unwrap();
        d.add_leaf("y", LeafKind::State, Some(s)).unwrap();
        let (_, tables) = build(&d);
        assert!(tables.clusters.contains_key(&s));
        assert!(!tables.clusters.contains_key(&r));
        assert!(!tables.nodes.contains_key(&inner));
    }
}
