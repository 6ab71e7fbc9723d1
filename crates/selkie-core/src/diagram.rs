use crate::entity::{Entity, EntityId, EntityKind, GroupKind, LeafKind};
use crate::error::{Error, Result};
use crate::link::{Link, LinkId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagramKind {
    #[default]
    Class,
    Component,
    UseCase,
    State,
    Object,
    Description,
}

impl DiagramKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Component => "component",
            Self::UseCase => "use-case",
            Self::State => "state",
            Self::Object => "object",
            Self::Description => "description",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RankDir {
    #[default]
    TopToBottom,
    LeftToRight,
}

/// Summary of a diagram, used in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagramMetadata {
    pub kind: DiagramKind,
    pub title: Option<String>,
    pub entities: usize,
    pub groups: usize,
    pub links: usize,
}

/// A hierarchical diagram: entities (leafs and nested groups) connected by links.
///
/// Entities and links are stored in declaration order; iteration helpers preserve it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagram {
    pub kind: DiagramKind,
    pub title: Option<String>,
    pub rankdir: RankDir,
    entities: Vec<Entity>,
    links: Vec<Link>,
    codes: IndexMap<String, EntityId>,
}

impl Diagram {
    pub fn new(kind: DiagramKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn add_leaf(
        &mut self,
        code: impl Into<String>,
        kind: LeafKind,
        parent: Option<EntityId>,
    ) -> Result<EntityId> {
        self.add_entity(code.into(), EntityKind::Leaf(kind), parent)
    }

    pub fn add_group(
        &mut self,
        code: impl Into<String>,
        kind: GroupKind,
        parent: Option<EntityId>,
    ) -> Result<EntityId> {
        self.add_entity(code.into(), EntityKind::Group(kind), parent)
    }

    fn add_entity(
        &mut self,
        code: String,
        kind: EntityKind,
        parent: Option<EntityId>,
    ) -> Result<EntityId> {
        if self.codes.contains_key(&code) {
            return Err(Error::DuplicateCode { code });
        }
        if let Some(parent) = parent {
            let p = self.entity(parent).ok_or_else(|| Error::UnknownEntity {
                reference: format!("#{}", parent.index()),
            })?;
            if !p.is_group() {
                return Err(Error::ParentNotGroup {
                    code: p.code.clone(),
                });
            }
        }
        let id = EntityId(self.entities.len() as u32);
        self.entities.push(Entity {
            display: vec![code.clone()],
            code: code.clone(),
            kind,
            parent,
            removed: false,
            packed: false,
            stereotype: None,
        });
        self.codes.insert(code, id);
        Ok(id)
    }

    pub fn add_link(&mut self, link: Link) -> Result<LinkId> {
        for end in [link.entity1, link.entity2] {
            if self.entity(end).is_none() {
                return Err(Error::UnknownEntity {
                    reference: format!("#{}", end.index()),
                });
            }
        }
        if link.length == 0 {
            return Err(Error::InvalidLinkLength {
                length: link.length,
            });
        }
        let id = LinkId(self.links.len() as u32);
        self.links.push(link);
        Ok(id)
    }

    fn entity_mut(&mut self, id: EntityId) -> Result<&mut Entity> {
        self.entities
            .get_mut(id.index())
            .ok_or_else(|| Error::UnknownEntity {
                reference: format!("#{}", id.index()),
            })
    }

    pub fn set_display(&mut self, id: EntityId, lines: Vec<String>) -> Result<()> {
        self.entity_mut(id)?.display = lines;
        Ok(())
    }

    pub fn set_stereotype(&mut self, id: EntityId, stereotype: Option<String>) -> Result<()> {
        self.entity_mut(id)?.stereotype = stereotype;
        Ok(())
    }

    pub fn set_removed(&mut self, id: EntityId, removed: bool) -> Result<()> {
        self.entity_mut(id)?.removed = removed;
        Ok(())
    }

    /// A packed group is collapsed: its content is laid out in the enclosing group.
    pub fn set_packed(&mut self, id: EntityId, packed: bool) -> Result<()> {
        self.entity_mut(id)?.packed = packed;
        Ok(())
    }

    pub fn set_link_removed(&mut self, id: LinkId, removed: bool) -> Result<()> {
        let link = self
            .links
            .get_mut(id.index())
            .ok_or_else(|| Error::UnknownEntity {
                reference: format!("link #{}", id.index()),
            })?;
        link.removed = removed;
        Ok(())
    }

    pub fn find(&self, code: &str) -> Option<EntityId> {
        self.codes.get(code).copied()
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.index())
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id.index())
    }

    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &Entity)> + '_ {
        self.entities
            .iter()
            .enumerate()
            .map(|(i, e)| (EntityId(i as u32), e))
    }

    pub fn links(&self) -> impl Iterator<Item = (LinkId, &Link)> + '_ {
        self.links
            .iter()
            .enumerate()
            .map(|(i, l)| (LinkId(i as u32), l))
    }

    fn visible_children(
        &self,
        parent: Option<EntityId>,
        keep: fn(&Entity) -> bool,
    ) -> Vec<EntityId> {
        self.entities()
            .filter(|(_, e)| e.parent == parent && !e.removed && keep(e))
            .map(|(id, _)| id)
            .collect()
    }

    /// Visible leafs outside of any group.
    pub fn root_leafs(&self) -> Vec<EntityId> {
        self.visible_children(None, Entity::is_leaf)
    }

    /// Visible leafs directly inside `group`.
    pub fn leafs_of(&self, group: EntityId) -> Vec<EntityId> {
        self.visible_children(Some(group), Entity::is_leaf)
    }

    /// Visible groups directly inside `parent` (`None` for the top level).
    pub fn child_groups(&self, parent: Option<EntityId>) -> Vec<EntityId> {
        self.visible_children(parent, Entity::is_group)
    }

    /// `true` for a package group without any visible content.
    pub fn is_empty_package(&self, id: EntityId) -> bool {
        match self.entity(id) {
            Some(e) if e.group_kind() == Some(GroupKind::Package) => {
                self.leafs_of(id).is_empty() && self.child_groups(Some(id)).is_empty()
            }
            _ => false,
        }
    }

    /// A link takes part in layout unless it or one of its ends was removed.
    pub fn is_link_active(&self, link: &Link) -> bool {
        let removed = |id| self.entity(id).is_none_or(|e| e.removed);
        !link.removed && !removed(link.entity1) && !removed(link.entity2)
    }

    /// Number of active, visible links touching `entity`.
    pub fn visible_link_count(&self, entity: EntityId) -> usize {
        self.links
            .iter()
            .filter(|l| l.touches(entity) && !l.invisible && self.is_link_active(l))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.iter().all(|e| e.removed)
    }

    pub fn metadata(&self) -> DiagramMetadata {
        let visible = self.entities.iter().filter(|e| !e.removed);
        let (groups, leafs): (Vec<&Entity>, Vec<&Entity>) = visible.partition(|e| e.is_group());
        DiagramMetadata {
            kind: self.kind,
            title: self.title.clone(),
            entities: leafs.len(),
            groups: groups.len(),
            links: self.links.iter().filter(|l| self.is_link_active(l)).count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::Link;

    #[test]
    fn codes_are_unique() {
        let mut d = Diagram::new(DiagramKind::Class);
        d.add_leaf("A", LeafKind::Class, None).unwrap();
        assert!(matches!(
            d.add_leaf("A", LeafKind::Interface, None),
            Err(Error::DuplicateCode { .. })
        ));
    }

    #[test]
    fn leafs_cannot_contain_entities() {
        let mut d = Diagram::new(DiagramKind::Class);
        let a = d.add_leaf("A", LeafKind::Class, None).unwrap();
        assert!(matches!(
            d.add_leaf("B", LeafKind::Class, Some(a)),
            Err(Error::ParentNotGroup { .. })
        ));
    }

    #[test]
    fn zero_length_links_are_rejected() {
        let mut d = Diagram::new(DiagramKind::Class);
        let a = d.add_leaf("A", LeafKind::Class, None).unwrap();
        let b = d.add_leaf("B", LeafKind::Class, None).unwrap();
        assert!(matches!(
            d.add_link(Link::between(a, b).with_length(0)),
            Err(Error::InvalidLinkLength { length: 0 })
        ));
    }

    #[test]
    fn children_are_listed_in_declaration_order_without_removed_ones() {
        let mut d = Diagram::new(DiagramKind::Class);
        let g = d.add_group("G", GroupKind::Package, None).unwrap();
        let a = d.add_leaf("A", LeafKind::Class, Some(g)).unwrap();
        let b = d.add_leaf("B", LeafKind::Class, Some(g)).unwrap();
        let c = d.add_leaf("C", LeafKind::Class, Some(g)).unwrap();
        let r = d.add_leaf("R", LeafKind::Class, None).unwrap();
        d.set_removed(b, true).unwrap();

        assert_eq!(d.leafs_of(g), vec![a, c]);
        assert_eq!(d.root_leafs(), vec![r]);
        assert_eq!(d.child_groups(None), vec![g]);
        assert!(!d.is_empty_package(g));
    }

    #[test]
    fn empty_packages_are_detected() {
        let mut d = Diagram::new(DiagramKind::Class);
        let p = d.add_group("P", GroupKind::Package, None).unwrap();
        let ns = d.add_group("N", GroupKind::Namespace, None).unwrap();
        assert!(d.is_empty_package(p));
        assert!(!d.is_empty_package(ns));
    }

    #[test]
    fn links_to_removed_entities_are_inactive() {
        let mut d = Diagram::new(DiagramKind::Class);
        let a = d.add_leaf("A", LeafKind::Class, None).unwrap();
        let n = d.add_leaf("N", LeafKind::Note, None).unwrap();
        let b = d.add_leaf("B", LeafKind::Class, None).unwrap();
        d.add_link(Link::between(n, a)).unwrap();
        d.add_link(Link::between(n, b)).unwrap();
        d.add_link(Link::between(n, a).invisible()).unwrap();
        assert_eq!(d.visible_link_count(n), 2);

        d.set_removed(b, true).unwrap();
        assert_eq!(d.visible_link_count(n), 1);
        assert_eq!(d.metadata().links, 2);
        assert_eq!(d.metadata().entities, 2);
    }
}
