#![forbid(unsafe_code)]

//! Semantic model for hierarchical diagrams.
//!
//! A [`Diagram`] holds entities (leafs and nested groups) and the links between them. The model
//! is layout-agnostic: it only records what is drawn, never where.

pub mod diagram;
pub mod entity;
pub mod error;
pub mod link;
pub mod source;

pub use diagram::{Diagram, DiagramKind, DiagramMetadata, RankDir};
pub use entity::{Entity, EntityId, EntityKind, GroupKind, LeafKind};
pub use error::{Error, Result};
pub use link::{
    LineStyle, Link, LinkArrow, LinkDecor, LinkId, LinkNote, NotePosition, VisibilityModifier,
};
pub use source::DiagramSource;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
