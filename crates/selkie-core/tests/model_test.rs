use selkie_core::{
    Diagram, DiagramKind, GroupKind, LeafKind, Link, LinkDecor, NotePosition, VisibilityModifier,
};

#[test]
fn nested_groups_keep_their_hierarchy() {
    let mut d = Diagram::new(DiagramKind::Component);
    let outer = d.add_group("outer", GroupKind::Package, None).unwrap();
    let inner = d.add_group("inner", GroupKind::Rectangle, Some(outer)).unwrap();
    let a = d.add_leaf("a", LeafKind::Component, Some(inner)).unwrap();
    let b = d.add_leaf("b", LeafKind::Component, Some(outer)).unwrap();

    assert_eq!(d.child_groups(None), vec![outer]);
    assert_eq!(d.child_groups(Some(outer)), vec![inner]);
    assert_eq!(d.leafs_of(outer), vec![b]);
    assert_eq!(d.leafs_of(inner), vec![a]);
    assert!(d.root_leafs().is_empty());
    assert!(!d.is_empty());
}

#[test]
fn link_builder_keeps_every_attribute() {
    let mut d = Diagram::new(DiagramKind::Class);
    let a = d.add_leaf("A", LeafKind::Class, None).unwrap();
    let b = d.add_leaf("B", LeafKind::Class, None).unwrap();
    let id = d
        .add_link(
            Link::between(a, b)
                .with_label("owns")
                .with_quantifiers(Some("1"), Some("*"))
                .with_note("why", NotePosition::Left)
                .with_decors(LinkDecor::Composition, LinkDecor::Arrow)
                .with_visibility(VisibilityModifier::Private)
                .with_length(3),
        )
        .unwrap();

    let link = d.link(id).unwrap();
    assert_eq!(link.label.as_deref(), Some("owns"));
    assert_eq!(link.quantifier1.as_deref(), Some("1"));
    assert_eq!(link.quantifier2.as_deref(), Some("*"));
    assert_eq!(link.decor1, LinkDecor::Composition);
    assert_eq!(link.visibility.map(|v| v.symbol()), Some('-'));
    assert_eq!(link.length, 3);
    assert_eq!(link.other(a), Some(b));
    assert_eq!(link.other(b), Some(a));
}

#[test]
fn removing_everything_empties_the_diagram() {
    let mut d = Diagram::new(DiagramKind::UseCase);
    let a = d.add_leaf("a", LeafKind::UseCase, None).unwrap();
    assert!(!d.is_empty());
    d.set_removed(a, true).unwrap();
    assert!(d.is_empty());
    assert_eq!(d.metadata().entities, 0);
}
