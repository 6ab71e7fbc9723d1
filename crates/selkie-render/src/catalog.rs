//! Per-render preparation of entity images and cluster titles.
//!
//! Every visible leaf gets one [`PreparedNode`] and every printed group one [`Cluster`], before
//! anything is handed to the layout engine.

use crate::block::TextBlock;
use crate::image::EntityImage;
use crate::{Error, RenderOptions, Result};
use indexmap::IndexMap;
use selkie_core::{Diagram, EntityId, GroupKind};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct PreparedNode {
    /// Engine node name.
    pub uid: String,
    pub entity: EntityId,
    pub image: Arc<dyn EntityImage>,
}

#[derive(Debug, Clone)]
pub struct Cluster {
    /// Engine subgraph name.
    pub id: String,
    pub group: EntityId,
    pub title: TextBlock,
}

pub fn node_uid(entity: EntityId) -> String {
    format!("ent{:04}", entity.index())
}

pub fn cluster_id(group: EntityId) -> String {
    format!("cluster_{}", group.index())
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    nodes: IndexMap<EntityId, PreparedNode>,
    clusters: IndexMap<EntityId, Cluster>,
}

impl Catalog {
    pub fn prepare(diagram: &Diagram, options: &RenderOptions) -> Result<Self> {
        let mut catalog = Self::default();
        let mut prep = Preparer {
            diagram,
            options,
            catalog: &mut catalog,
        };
        for leaf in diagram.root_leafs() {
            prep.leaf(leaf)?;
        }
        for group in diagram.child_groups(None) {
            prep.group(group)?;
        }
        tracing::trace!(
            nodes = catalog.nodes.len(),
            clusters = catalog.clusters.len(),
            "catalog prepared"
        );
        Ok(catalog)
    }

    pub fn node(&self, entity: EntityId) -> Option<&PreparedNode> {
        self.nodes.get(&entity)
    }

    pub fn cluster(&self, group: EntityId) -> Option<&Cluster> {
        self.clusters.get(&group)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &PreparedNode> + '_ {
        self.nodes.values()
    }

    pub fn clusters(&self) -> impl Iterator<Item = &Cluster> + '_ {
        self.clusters.values()
    }
}

struct Preparer<'a> {
    diagram: &'a Diagram,
    options: &'a RenderOptions,
    catalog: &'a mut Catalog,
}

impl Preparer<'_> {
    fn leaf(&mut self, id: EntityId) -> Result<()> {
        let Some(entity) = self.diagram.entity(id) else {
            return Err(Error::InvariantViolation {
                message: format!("unknown entity #{}", id.index()),
            });
        };
        if entity.removed {
            return Err(Error::InvariantViolation {
                message: format!("removed entity {} reached image preparation", entity.code),
            });
        }
        let image = self.options.image_factory.create(
            entity,
            self.diagram,
            self.options.text_measurer.as_ref(),
            &self.options.config,
        );
        self.catalog.nodes.insert(
            id,
            PreparedNode {
                uid: node_uid(id),
                entity: id,
                image,
            },
        );
        Ok(())
    }

    fn group(&mut self, id: EntityId) -> Result<()> {
        if self.diagram.is_empty_package(id) {
            return self.leaf(id);
        }
        let Some(entity) = self.diagram.entity(id) else {
            return Ok(());
        };
        if entity.group_kind() == Some(GroupKind::ConcurrentState) {
            tracing::debug!(group = %entity.code, "concurrent region is not printed");
            return Ok(());
        }
        if !entity.packed {
            let config = &self.options.config;
            let title = TextBlock::text(
                &entity.title(),
                &config.title_style(),
                config.default_text_alignment,
                self.options.text_measurer.as_ref(),
            );
            self.catalog.clusters.insert(
                id,
                Cluster {
                    id: cluster_id(id),
                    group: id,
                    title,
                },
            );
        }
        for leaf in self.diagram.leafs_of(id) {
            self.leaf(leaf)?;
        }
        for child in self.diagram.child_groups(Some(id)) {
            self.group(child)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use selkie_core::{DiagramKind, LeafKind};

    #[test]
    fn every_visible_leaf_and_printed_group_is_prepared() {
        let mut d = Diagram::new(DiagramKind::State);
        let s = d.add_group("S", GroupKind::State, None).unwrap();
        let a = d.add_leaf("a", LeafKind::State, Some(s)).unwrap();
        let region = d
            .add_group("r1", GroupKind::ConcurrentState, Some(s))
            .unwrap();
        let hidden = d.add_leaf("b", LeafKind::State, Some(region)).unwrap();
        let empty = d.add_group("P", GroupKind::Package, None).unwrap();

        let catalog = Catalog::prepare(&d, &RenderOptions::default()).unwrap();
        assert_eq!(catalog.node(a).map(|n| n.uid.as_str()), Some("ent0001"));
        assert!(catalog.node(hidden).is_none());
        assert!(catalog.cluster(region).is_none());
        assert_eq!(catalog.cluster(s).map(|c| c.id.as_str()), Some("cluster_0"));
        assert!(catalog.cluster(empty).is_none());
        assert!(catalog.node(empty).is_some());
    }

    #[test]
    fn packed_groups_have_no_cluster_but_keep_their_leafs() {
        let mut d = Diagram::new(DiagramKind::Class);
        let g = d.add_group("G", GroupKind::Namespace, None).unwrap();
        let a = d.add_leaf("a", LeafKind::Class, Some(g)).unwrap();
        d.set_packed(g, true).unwrap();

        let catalog = Catalog::prepare(&d, &RenderOptions::default()).unwrap();
        assert!(catalog.cluster(g).is_none());
        assert!(catalog.node(a).is_some());
    }
}
