//! Link projection: one engine edge per drawable link, with pre-measured label boxes.

use crate::absorb::{Absorption, LinkRenderKind};
use crate::anchor::AnchorResolver;
use crate::block::TextBlock;
use crate::builder::{GraphTables, ProjectedEdge};
use crate::label::LinkBlocks;
use crate::Result;
use indexmap::IndexMap;
use lamantin::{Context, EdgeId, NodeId, encode_label_dim};
use selkie_core::{Diagram, EntityId, LinkId};

fn label_hint(block: &TextBlock) -> String {
    let d = block.dimension();
    encode_label_dim(d.width as i32, d.height as i32)
}

pub struct EdgeProjector<'a> {
    diagram: &'a Diagram,
    absorption: &'a Absorption,
    blocks: &'a IndexMap<LinkId, LinkBlocks>,
}

impl<'a> EdgeProjector<'a> {
    pub fn new(
        diagram: &'a Diagram,
        absorption: &'a Absorption,
        blocks: &'a IndexMap<LinkId, LinkBlocks>,
    ) -> Self {
        Self {
            diagram,
            absorption,
            blocks,
        }
    }

    /// Creates the edges in link declaration order. Links whose ends were not exported are
    /// dropped.
    pub fn project(&self, ctx: &mut Context, tables: &mut GraphTables) -> Result<()> {
        for (id, link) in self.diagram.links() {
            if !self.diagram.is_link_active(link) {
                continue;
            }
            if let LinkRenderKind::AbsorbedNote { .. } = self.absorption.kind(id) {
                continue;
            }
            let tail = self.endpoint(ctx, tables, link.entity1)?;
            let head = self.endpoint(ctx, tables, link.entity2)?;
            let (Some(tail), Some(head)) = (tail, head) else {
                tracing::debug!(link = id.index(), "link endpoint not exported, edge dropped");
                continue;
            };
            let edge = ctx.create_edge(tables.root, tail, head)?;
            self.decorate(ctx, edge, id, link.length, link.invisible)?;
            tables.edges.push(ProjectedEdge { link: id, edge });
        }
        tracing::trace!(edges = tables.edges.len(), "links projected");
        Ok(())
    }

    fn endpoint(
        &self,
        ctx: &mut Context,
        tables: &mut GraphTables,
        entity: EntityId,
    ) -> Result<Option<NodeId>> {
        if let Some(&node) = tables.nodes.get(&entity) {
            return Ok(Some(node));
        }
        match self.diagram.entity(entity) {
            Some(e) if e.is_group() => AnchorResolver::new(ctx, tables).resolve(entity).map(Some),
            _ => Ok(None),
        }
    }

    fn decorate(
        &self,
        ctx: &mut Context,
        edge: EdgeId,
        id: LinkId,
        length: u32,
        invisible: bool,
    ) -> Result<()> {
        ctx.set_attr(edge, "arrowtail", "none")?;
        ctx.set_attr(edge, "arrowhead", "none")?;
        ctx.set_attr(edge, "minlen", &length.saturating_sub(1).to_string())?;
        if invisible {
            ctx.set_attr(edge, "style", "invis")?;
        }
        let Some(blocks) = self.blocks.get(&id) else {
            return Ok(());
        };
        if !blocks.label.is_empty() {
            ctx.set_attr(edge, "label", &label_hint(&blocks.label))?;
        }
        if let Some(q) = &blocks.quantifier1 {
            ctx.set_attr(edge, "taillabel", &label_hint(q))?;
        }
        if let Some(q) = &blocks.quantifier2 {
            ctx.set_attr(edge, "headlabel", &label_hint(q))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;
    use crate::catalog::Catalog;
    use crate::text::DeterministicTextMeasurer;
    use crate::{RenderConfig, RenderOptions};
    use selkie_core::{DiagramKind, GroupKind, LeafKind, Link};

    fn project(d: &Diagram) -> Result<(Context, GraphTables)> {
        let options = RenderOptions::default();
        let catalog = Catalog::prepare(d, &options)?;
        let absorption = Absorption::compute(d, &catalog, 20.0);
        let blocks: IndexMap<LinkId, LinkBlocks> = d
            .links()
            .map(|(id, l)| {
                (
                    id,
                    LinkBlocks::compose(
                        d,
                        l,
                        &DeterministicTextMeasurer::default(),
                        &RenderConfig::default(),
                    ),
                )
            })
            .collect();
        let mut ctx = Context::open();
        let mut tables = GraphBuilder::new(&mut ctx, d, &catalog, &absorption).build()?;
        EdgeProjector::new(d, &absorption, &blocks).project(&mut ctx, &mut tables)?;
        Ok((ctx, tables))
    }

    #[test]
    fn unlabeled_length_one_links_get_minlen_zero_and_no_label() {
        let mut d = Diagram::new(DiagramKind::Class);
        let a = d.add_leaf("A", LeafKind::Class, None).unwrap();
        let b = d.add_leaf("B", LeafKind::Class, None).unwrap();
        d.add_link(Link::between(a, b).with_length(1)).unwrap();

        let (ctx, tables) = project(&d).unwrap();
        let edge = tables.edges[0].edge;
        assert_eq!(ctx.attr(edge, "minlen"), Some("0"));
        assert_eq!(ctx.attr(edge, "arrowhead"), Some("none"));
        assert_eq!(ctx.attr(edge, "label"), None);
        assert_eq!(ctx.attr(edge, "taillabel"), None);
    }

    #[test]
    fn labels_and_quantifiers_become_size_hints() {
        let mut d = Diagram::new(DiagramKind::Class);
        let a = d.add_leaf("A", LeafKind::Class, None).unwrap();
        let b = d.add_leaf("B", LeafKind::Class, None).unwrap();
        d.add_link(
            Link::between(a, b)
                .with_label("owns")
                .with_quantifiers(Some("1"), Some("")),
        )
        .unwrap();

        let (ctx, tables) = project(&d).unwrap();
        let edge = tables.edges[0].edge;
        // "owns" is 33.6 x 16.8 at the default font, plus a one-unit margin.
        assert_eq!(ctx.attr(edge, "label"), Some(encode_label_dim(35, 18).as_str()));
        assert_eq!(ctx.attr(edge, "taillabel"), Some(encode_label_dim(10, 18).as_str()));
        assert_eq!(ctx.attr(edge, "headlabel"), Some(encode_label_dim(0, 0).as_str()));
    }

    #[test]
    fn links_to_groups_use_one_anchor() {
        let mut d = Diagram::new(DiagramKind::Component);
        let g = d.add_group("G", GroupKind::Rectangle, None).unwrap();
        d.add_leaf("inner", LeafKind::Component, Some(g)).unwrap();
        let a = d.add_leaf("a", LeafKind::Component, None).unwrap();
        let b = d.add_leaf("b", LeafKind::Component, None).unwrap();
        d.add_link(Link::between(a, g)).unwrap();
        d.add_link(Link::between(g, b)).unwrap();

        let (_, tables) = project(&d).unwrap();
        assert_eq!(tables.edges.len(), 2);
        assert_eq!(tables.anchors.len(), 1);
        assert!(tables.anchors.contains_key(&g));
    }

    #[test]
    fn links_to_unexported_leafs_are_dropped() {
        let mut d = Diagram::new(DiagramKind::State);
        let s = d.add_group("S", GroupKind::State, None).unwrap();
        let r = d.add_group("r", GroupKind::ConcurrentState, Some(s)).unwrap();
        let hidden = d.add_leaf("x", LeafKind::State, Some(r)).unwrap();
        let y = d.add_leaf("y", LeafKind::State, Some(s)).unwrap();
        d.add_link(Link::between(y, hidden)).unwrap();

        let (_, tables) = project(&d).unwrap();
        assert!(tables.edges.is_empty());
    }

    #[test]
    fn links_to_packed_groups_fail() {
        let mut d = Diagram::new(DiagramKind::Class);
        let g = d.add_group("G", GroupKind::Namespace, None).unwrap();
        d.add_leaf("a", LeafKind::Class, Some(g)).unwrap();
        let b = d.add_leaf("b", LeafKind::Class, None).unwrap();
        d.set_packed(g, true).unwrap();
        d.add_link(Link::between(b, g)).unwrap();

        assert!(matches!(
            project(&d),
            Err(crate::Error::InvariantViolation { .. })
        ));
    }

    #[test]
    fn removed_links_are_not_projected() {
        let mut d = Diagram::new(DiagramKind::Class);
        let a = d.add_leaf("A", LeafKind::Class, None).unwrap();
        let b = d.add_leaf("B", LeafKind::Class, None).unwrap();
        let l = d.add_link(Link::between(a, b)).unwrap();
        d.set_link_removed(l, true).unwrap();
        let (_, tables) = project(&d).unwrap();
        assert!(tables.edges.is_empty());
    }
}
