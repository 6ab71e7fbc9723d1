#![forbid(unsafe_code)]

//! `selkie` lays out hierarchical diagrams (classes, components, states, use cases) with a
//! layered layout engine and hands back a drawable scene.
//!
//! # Features
//!
//! - `render`: enable layout + scene assembly + SVG output (`selkie::render`)

pub use selkie_core::*;

#[cfg(feature = "render")]
pub mod render {
    pub use selkie_render::scene::Scene;
    pub use selkie_render::svg::{SvgRenderOptions, render_scene_svg};
    pub use selkie_render::text::{DeterministicTextMeasurer, TextMeasurer};
    pub use selkie_render::{
        CrashReport, RenderConfig, RenderFailure, RenderOptions, Rendered, render,
    };

    #[derive(Debug, thiserror::Error)]
    pub enum HeadlessError {
        #[error(transparent)]
        Model(#[from] selkie_core::Error),
        #[error(transparent)]
        Render(#[from] selkie_render::Error),
        #[error(transparent)]
        Failed(#[from] Box<RenderFailure>),
    }

    pub type Result<T> = std::result::Result<T, HeadlessError>;

    /// Loads a JSON model document and renders it to an SVG string.
    ///
    /// A failed layout is reported as [`HeadlessError::Failed`], which still carries the crash
    /// report and the placeholder scene.
    pub fn render_json_to_svg(
        model: &str,
        options: &RenderOptions,
        svg_options: &SvgRenderOptions,
    ) -> Result<String> {
        let diagram = selkie_core::Diagram::from_json(model)?;
        let rendered = render(&diagram, options).map_err(Box::new)?;
        Ok(render_scene_svg(&rendered.scene, svg_options))
    }

    /// Converts an arbitrary string into a conservative SVG `id` token, so several diagrams can
    /// be inlined in one document without colliding.
    pub fn sanitize_svg_id(raw: &str) -> String {
        let raw = raw.trim();
        if raw.is_empty() {
            return "s-untitled".to_string();
        }

        let mut out = String::with_capacity(raw.len() + 4);
        for ch in raw.chars() {
            let ok = ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == ':' || ch == '.';
            out.push(if ok { ch } else { '-' });
        }

        let starts_ok = out.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
        if !starts_ok {
            out.insert_str(0, "s-");
        }

        while out.contains("--") {
            out = out.replace("--", "-");
        }
        let out = out.trim_matches('-');
        if out.is_empty() || out == "s" {
            return "s-untitled".to_string();
        }
        out.to_string()
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn svg_ids_are_sanitized() {
            assert_eq!(sanitize_svg_id("  "), "s-untitled");
            assert_eq!(sanitize_svg_id("my diagram"), "my-diagram");
            assert_eq!(sanitize_svg_id("1st"), "s-1st");
            assert_eq!(sanitize_svg_id("a//b"), "a-b");
        }

        #[test]
        fn json_models_render_to_svg() {
            let svg = render_json_to_svg(
                r#"{
                    "kind": "class",
                    "entities": [
                        { "code": "A", "kind": { "leaf": "class" } },
                        { "code": "B", "kind": { "leaf": "class" } }
                    ],
                    "links": [ { "from": "A", "to": "B", "label": "owns" } ]
                }"#,
                &RenderOptions::default(),
                &SvgRenderOptions::default(),
            )
            .unwrap();
            assert!(svg.starts_with("<svg"));
            assert!(svg.contains(">owns</text>"));
        }

        #[test]
        fn unknown_references_are_model_errors() {
            let err = render_json_to_svg(
                r#"{ "entities": [], "links": [ { "from": "A", "to": "B" } ] }"#,
                &RenderOptions::default(),
                &SvgRenderOptions::default(),
            )
            .unwrap_err();
            assert!(matches!(err, HeadlessError::Model(_)));
        }
    }
}
