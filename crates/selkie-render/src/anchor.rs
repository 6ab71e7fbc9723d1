use crate::builder::GraphTables;
use crate::catalog::node_uid;
use crate::{Error, Result};
use lamantin::{Context, NodeId};
use selkie_core::EntityId;

/// Side of an anchor node, in inches.
const ANCHOR_SIZE: &str = "0.1";

pub fn anchor_name(group: EntityId) -> String {
    format!("z{}", node_uid(group))
}

/// Hands out the node that stands for a group when a link ends on the group itself.
///
/// Anchors are created on first use, one per group, inside the group's subgraph.
pub struct AnchorResolver<'a> {
    ctx: &'a mut Context,
    tables: &'a mut GraphTables,
}

impl<'a> AnchorResolver<'a> {
    pub fn new(ctx: &'a mut Context, tables: &'a mut GraphTables) -> Self {
        Self { ctx, tables }
    }

    pub fn resolve(&mut self, group: EntityId) -> Result<NodeId> {
        if let Some(&node) = self.tables.anchors.get(&group) {
            return Ok(node);
        }
        let Some(&subgraph) = self.tables.clusters.get(&group) else {
            return Err(Error::InvariantViolation {
                message: format!("group #{} has no subgraph to anchor links", group.index()),
            });
        };
        let node = self.ctx.create_node(subgraph, &anchor_name(group))?;
        self.ctx.set_attr(node, "shape", "rect")?;
        self.ctx.set_attr(node, "width", ANCHOR_SIZE)?;
        self.ctx.set_attr(node, "height", ANCHOR_SIZE)?;
        self.tables.anchors.insert(group, node);
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::absorb::Absorption;
    use crate::builder::GraphBuilder;
    use crate::catalog::Catalog;
    use crate::RenderOptions;
    use selkie_core::{Diagram, DiagramKind, GroupKind, LeafKind};

    #[test]
    fn anchors_are_memoized_per_group() {
        let mut d = Diagram::new(DiagramKind::Component);
        let g = d.add_group("G", GroupKind::Rectangle, None).unwrap();
        d.add_leaf("a", LeafKind::Component, Some(g)).unwrap();
        let catalog = Catalog::prepare(&d, &RenderOptions::default()).unwrap();
        let absorption = Absorption::compute(&d, &catalog, 20.0);
        let mut ctx = Context::open();
        let mut tables = GraphBuilder::new(&mut ctx, &d, &catalog, &absorption)
            .build()
            .unwrap();

        let mut anchors = AnchorResolver::new(&mut ctx, &mut tables);
        let first = anchors.resolve(g).unwrap();
        let second = anchors.resolve(g).unwrap();
        assert_eq!(first, second);
        assert_eq!(ctx.node_name(first), Some("zent0000"));
        assert_eq!(ctx.attr(first, "width"), Some("0.1"));
        assert_eq!(tables.anchors.len(), 1);
    }

    #[test]
    fn groups_without_subgraph_are_an_invariant_violation() {
        let mut d = Diagram::new(DiagramKind::Component);
        let g = d.add_group("G", GroupKind::Rectangle, None).unwrap();
        d.add_leaf("a", LeafKind::Component, Some(g)).unwrap();
        d.set_packed(g, true).unwrap();
        let catalog = Catalog::prepare(&d, &RenderOptions::default()).unwrap();
        let absorption = Absorption::compute(&d, &catalog, 20.0);
        let mut ctx = Context::open();
        let mut tables = GraphBuilder::new(&mut ctx, &d, &catalog, &absorption)
            .build()
            .unwrap();

        let err = AnchorResolver::new(&mut ctx, &mut tables)
            .resolve(g)
            .unwrap_err();
        assert!(matches!(err, Error::InvariantViolation { .. }));
    }
}
