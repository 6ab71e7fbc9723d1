//! JSON model documents.
//!
//! A document lists entities (parents before children) and links that refer to entities by
//! code:
//!
//! ```json
//! {
//!   "kind": "class",
//!   "rankdir": "left-to-right",
//!   "entities": [
//!     { "code": "G", "kind": { "group": "package" } },
//!     { "code": "A", "kind": { "leaf": "class" }, "parent": "G" },
//!     { "code": "B", "kind": { "leaf": "class" } }
//!   ],
//!   "links": [ { "from": "A", "to": "B", "label": "owns" } ]
//! }
//! ```

use crate::diagram::{Diagram, DiagramKind, RankDir};
use crate::entity::EntityKind;
use crate::error::{Error, Result};
use crate::link::{LineStyle, Link, LinkArrow, LinkDecor, LinkNote, VisibilityModifier};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramSource {
    #[serde(default)]
    pub kind: DiagramKind,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub rankdir: RankDir,
    #[serde(default)]
    pub entities: Vec<EntitySource>,
    #[serde(default)]
    pub links: Vec<LinkSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySource {
    pub code: String,
    pub kind: EntityKind,
    #[serde(default)]
    pub display: Option<Vec<String>>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub removed: bool,
    #[serde(default)]
    pub packed: bool,
    #[serde(default)]
    pub stereotype: Option<String>,
}

fn default_length() -> u32 {
    2
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSource {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub quantifier1: Option<String>,
    #[serde(default)]
    pub quantifier2: Option<String>,
    #[serde(default)]
    pub note: Option<LinkNote>,
    #[serde(default = "default_length")]
    pub length: u32,
    #[serde(default)]
    pub invisible: bool,
    #[serde(default)]
    pub removed: bool,
    #[serde(default)]
    pub decor1: LinkDecor,
    #[serde(default)]
    pub decor2: LinkDecor,
    #[serde(default)]
    pub style: LineStyle,
    #[serde(default)]
    pub arrow: LinkArrow,
    #[serde(default)]
    pub visibility: Option<VisibilityModifier>,
}

impl DiagramSource {
    pub fn into_diagram(self) -> Result<Diagram> {
        let mut diagram = Diagram::new(self.kind);
        diagram.title = self.title;
        diagram.rankdir = self.rankdir;

        let lookup = |diagram: &Diagram, code: &str| {
            diagram.find(code).ok_or_else(|| Error::UnknownEntity {
                reference: code.to_string(),
            })
        };

        for e in self.entities {
            let parent = match e.parent.as_deref() {
                Some(code) => Some(lookup(&diagram, code)?),
                None => None,
            };
            let id = match e.kind {
                EntityKind::Leaf(kind) => diagram.add_leaf(e.code, kind, parent)?,
                EntityKind::Group(kind) => diagram.add_group(e.code, kind, parent)?,
            };
            if let Some(display) = e.display {
                diagram.set_display(id, display)?;
            }
            diagram.set_stereotype(id, e.stereotype)?;
            diagram.set_removed(id, e.removed)?;
            diagram.set_packed(id, e.packed)?;
        }

        for l in self.links {
            let mut link = Link::between(lookup(&diagram, &l.from)?, lookup(&diagram, &l.to)?)
                .with_length(l.length)
                .with_quantifiers(l.quantifier1, l.quantifier2)
                .with_decors(l.decor1, l.decor2)
                .with_style(l.style)
                .with_arrow(l.arrow);
            link.label = l.label;
            link.note = l.note;
            link.invisible = l.invisible;
            link.removed = l.removed;
            link.visibility = l.visibility;
            diagram.add_link(link)?;
        }

        tracing::debug!(
            kind = diagram.kind.as_str(),
            entities = diagram.entities().count(),
            links = diagram.links().count(),
            "diagram model loaded"
        );
        Ok(diagram)
    }
}

impl Diagram {
    /// Loads a diagram from a JSON model document.
    pub fn from_json(text: &str) -> Result<Self> {
        let source: DiagramSource = serde_json::from_str(text)?;
        source.into_diagram()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{GroupKind, LeafKind};
    use crate::link::NotePosition;

    #[test]
    fn loads_entities_groups_and_links() {
        let d = Diagram::from_json(
            r#"{
                "kind": "class",
                "title": "Shop",
                "rankdir": "left-to-right",
                "entities": [
                    { "code": "G", "kind": { "group": "package" }, "display": ["Orders"] },
                    { "code": "A", "kind": { "leaf": "class" }, "parent": "G" },
                    { "code": "B", "kind": { "leaf": "interface" } },
                    { "code": "N", "kind": { "leaf": "note" }, "display": ["remember"] }
                ],
                "links": [
                    { "from": "A", "to": "B", "label": "owns", "quantifier2": "*",
                      "decor2": "arrow", "style": "dashed",
                      "note": { "text": "why", "position": "top" } },
                    { "from": "N", "to": "A", "length": 1 }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(d.title.as_deref(), Some("Shop"));
        assert_eq!(d.rankdir, RankDir::LeftToRight);
        let g = d.find("G").unwrap();
        let a = d.find("A").unwrap();
        assert_eq!(d.entity(g).unwrap().group_kind(), Some(GroupKind::Package));
        assert_eq!(d.entity(g).unwrap().display, vec!["Orders".to_string()]);
        assert_eq!(d.entity(a).unwrap().parent, Some(g));
        assert_eq!(
            d.entity(d.find("B").unwrap()).unwrap().leaf_kind(),
            Some(LeafKind::Interface)
        );

        let links: Vec<&Link> = d.links().map(|(_, l)| l).collect();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].length, 2);
        assert_eq!(links[0].label.as_deref(), Some("owns"));
        assert_eq!(links[0].quantifier1, None);
        assert_eq!(links[0].quantifier2.as_deref(), Some("*"));
        assert_eq!(links[0].style, LineStyle::Dashed);
        assert_eq!(
            links[0].note.as_ref().map(|n| n.position),
            Some(NotePosition::Top)
        );
        assert_eq!(links[1].length, 1);
    }

    #[test]
    fn unknown_parents_are_reported_by_code() {
        let err = Diagram::from_json(
            r#"{ "entities": [ { "code": "A", "kind": { "leaf": "class" }, "parent": "Nope" } ] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnknownEntity { reference } if reference == "Nope"));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(Diagram::from_json("{"), Err(Error::Json(_))));
    }
}
