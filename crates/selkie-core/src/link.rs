use crate::entity::EntityId;
use serde::{Deserialize, Serialize};

/// Index of a link inside its [`crate::Diagram`], in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkId(pub(crate) u32);

impl LinkId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkDecor {
    #[default]
    None,
    Arrow,
    Extends,
    Composition,
    Aggregation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
}

/// Direction of the small reading arrow some diagrams print next to a link label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkArrow {
    #[default]
    NoneOrSeveral,
    DirectNormal,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VisibilityModifier {
    Private,
    Protected,
    PackagePrivate,
    Public,
}

impl VisibilityModifier {
    pub fn symbol(self) -> char {
        match self {
            Self::Private => '-',
            Self::Protected => '#',
            Self::PackagePrivate => '~',
            Self::Public => '+',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotePosition {
    Left,
    Right,
    Top,
    Bottom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkNote {
    pub text: String,
    pub position: NotePosition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub entity1: EntityId,
    pub entity2: EntityId,
    pub label: Option<String>,
    pub quantifier1: Option<String>,
    pub quantifier2: Option<String>,
    pub note: Option<LinkNote>,
    /// Minimum rank separation plus one: `1` keeps both ends on one rank, `2` (the default)
    /// puts them on adjacent ranks.
    pub length: u32,
    pub invisible: bool,
    pub removed: bool,
    pub decor1: LinkDecor,
    pub decor2: LinkDecor,
    pub style: LineStyle,
    pub arrow: LinkArrow,
    pub visibility: Option<VisibilityModifier>,
}

impl Link {
    pub fn between(entity1: EntityId, entity2: EntityId) -> Self {
        Self {
            entity1,
            entity2,
            label: None,
            quantifier1: None,
            quantifier2: None,
            note: None,
            length: 2,
            invisible: false,
            removed: false,
            decor1: LinkDecor::None,
            decor2: LinkDecor::None,
            style: LineStyle::Solid,
            arrow: LinkArrow::NoneOrSeveral,
            visibility: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_quantifiers(
        mut self,
        quantifier1: Option<impl Into<String>>,
        quantifier2: Option<impl Into<String>>,
    ) -> Self {
        self.quantifier1 = quantifier1.map(Into::into);
        self.quantifier2 = quantifier2.map(Into::into);
        self
    }

    pub fn with_length(mut self, length: u32) -> Self {
        self.length = length;
        self
    }

    pub fn with_note(mut self, text: impl Into<String>, position: NotePosition) -> Self {
        self.note = Some(LinkNote {
            text: text.into(),
            position,
        });
        self
    }

    pub fn with_decors(mut self, decor1: LinkDecor, decor2: LinkDecor) -> Self {
        self.decor1 = decor1;
        self.decor2 = decor2;
        self
    }

    pub fn with_style(mut self, style: LineStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_arrow(mut self, arrow: LinkArrow) -> Self {
        self.arrow = arrow;
        self
    }

    pub fn with_visibility(mut self, visibility: VisibilityModifier) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn invisible(mut self) -> Self {
        self.invisible = true;
        self
    }

    pub fn touches(&self, entity: EntityId) -> bool {
        self.entity1 == entity || self.entity2 == entity
    }

    /// The endpoint opposite to `entity`, if the link touches it.
    pub fn other(&self, entity: EntityId) -> Option<EntityId> {
        if self.entity1 == entity {
            Some(self.entity2)
        } else if self.entity2 == entity {
            Some(self.entity1)
        } else {
            None
        }
    }
}
