use selkie_core::{Diagram, DiagramKind, GroupKind, LeafKind, Link};
use selkie_render::{RenderOptions, Scene, render};
use std::sync::Arc;
use std::thread;

fn diagram(seed: usize) -> Diagram {
    let mut d = Diagram::new(DiagramKind::Component);
    let g = d.add_group("grp", GroupKind::Package, None).unwrap();
    let mut prev = d.add_leaf("root", LeafKind::Component, None).unwrap();
    for i in 0..(3 + seed % 4) {
        let parent = if i % 2 == 0 { Some(g) } else { None };
        let next = d
            .add_leaf(format!("n{i}"), LeafKind::Component, parent)
            .unwrap();
        d.add_link(Link::between(prev, next).with_label(format!("l{i}")))
            .unwrap();
        prev = next;
    }
    d.add_link(Link::between(prev, g)).unwrap();
    d
}

fn scene_of(d: &Diagram, options: &RenderOptions) -> Scene {
    match render(d, options) {
        Ok(r) => r.scene,
        Err(f) => panic!("{f}"),
    }
}

#[test]
fn concurrent_renders_match_serial_renders() {
    let options = Arc::new(RenderOptions::default());
    let diagrams: Vec<Arc<Diagram>> = (0..8).map(|i| Arc::new(diagram(i))).collect();
    let serial: Vec<Scene> = diagrams.iter().map(|d| scene_of(d, &options)).collect();

    let handles: Vec<_> = diagrams
        .iter()
        .cloned()
        .map(|d| {
            let options = options.clone();
            thread::spawn(move || scene_of(&d, &options))
        })
        .collect();

    for (handle, expected) in handles.into_iter().zip(&serial) {
        let scene = handle.join().expect("render thread panicked");
        assert_eq!(&scene, expected);
    }
}
