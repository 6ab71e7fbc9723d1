use serde::{Deserialize, Serialize};

/// Index of an entity inside its [`crate::Diagram`], in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub(crate) u32);

impl EntityId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LeafKind {
    Class,
    AbstractClass,
    Interface,
    Enum,
    Object,
    Note,
    UseCase,
    Actor,
    Component,
    State,
    Description,
    EmptyPackage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupKind {
    Package,
    Namespace,
    State,
    /// A region of a composite state. Its content is not printed as a cluster.
    ConcurrentState,
    Rectangle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Leaf(LeafKind),
    Group(GroupKind),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub code: String,
    pub display: Vec<String>,
    pub kind: EntityKind,
    pub parent: Option<EntityId>,
    pub removed: bool,
    pub packed: bool,
    pub stereotype: Option<String>,
}

impl Entity {
    pub fn is_group(&self) -> bool {
        matches!(self.kind, EntityKind::Group(_))
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, EntityKind::Leaf(_))
    }

    pub fn leaf_kind(&self) -> Option<LeafKind> {
        match self.kind {
            EntityKind::Leaf(kind) => Some(kind),
            EntityKind::Group(_) => None,
        }
    }

    pub fn group_kind(&self) -> Option<GroupKind> {
        match self.kind {
            EntityKind::Group(kind) => Some(kind),
            EntityKind::Leaf(_) => None,
        }
    }

    pub fn is_note(&self) -> bool {
        self.leaf_kind() == Some(LeafKind::Note)
    }

    /// Display text joined with newlines, falling back to the code.
    pub fn title(&self) -> String {
        if self.display.is_empty() {
            self.code.clone()
        } else {
            self.display.join("\n")
        }
    }
}
