//! Diagnostic report and placeholder scene for failed renders.

use crate::block::{HorizontalAlignment, TextBlock};
use crate::config::RenderConfig;
use crate::geom::point;
use crate::mirror::MARGIN;
use crate::scene::{Primitive, Scene, SceneRect};
use crate::text::TextMeasurer;
use crate::Error;
use selkie_core::DiagramMetadata;
use serde::Serialize;

const ISSUES_URL: &str = concat!(env!("CARGO_PKG_REPOSITORY"), "/issues");

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrashReport {
    pub error: String,
    pub metadata: DiagramMetadata,
    lines: Vec<String>,
}

impl CrashReport {
    pub fn new(error: &Error, metadata: DiagramMetadata) -> Self {
        let mut lines = vec![
            "An error has occurred while laying out this diagram:".to_string(),
            format!("  {error}"),
            String::new(),
            format!("Diagram kind: {}", metadata.kind.as_str()),
        ];
        if let Some(title) = metadata.title.as_deref() {
            lines.push(format!("Title: {title}"));
        }
        lines.extend([
            format!(
                "Entities: {}, groups: {}, links: {}",
                metadata.entities, metadata.groups, metadata.links
            ),
            format!("selkie-render {}", crate::VERSION),
            format!("Platform: {} {}", std::env::consts::OS, std::env::consts::ARCH),
            String::new(),
            "Sorry, this diagram could not be drawn.".to_string(),
            format!("Please report it at {ISSUES_URL} with the diagram source attached."),
        ]);
        Self {
            error: error.to_string(),
            metadata,
            lines,
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn to_text(&self) -> String {
        self.lines.join("\n")
    }
}

/// A framed block of the report lines, in place of the diagram.
pub fn error_scene(report: &CrashReport, measurer: &dyn TextMeasurer, config: &RenderConfig) -> Scene {
    let block = TextBlock::text(
        &report.to_text(),
        &config.text_style(),
        HorizontalAlignment::Left,
        measurer,
    );
    let d = block.dimension();
    let frame = SceneRect {
        x: MARGIN,
        y: MARGIN,
        width: d.width + 2.0 * MARGIN,
        height: d.height + 2.0 * MARGIN,
    };
    let mut primitives = vec![Primitive::Rect {
        rect: frame,
        corner_radius: 0.0,
    }];
    block.draw(point(2.0 * MARGIN, 2.0 * MARGIN), &mut primitives);
    Scene {
        width: frame.max_x() + MARGIN,
        height: frame.max_y() + MARGIN,
        primitives,
        ..Scene::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::DeterministicTextMeasurer;
    use selkie_core::DiagramKind;

    fn metadata() -> DiagramMetadata {
        DiagramMetadata {
            kind: DiagramKind::Class,
            title: Some("Orders".to_string()),
            entities: 3,
            groups: 1,
            links: 2,
        }
    }

    #[test]
    fn report_names_the_error_and_the_diagram() {
        let err = Error::InvariantViolation {
            message: "boom".to_string(),
        };
        let report = CrashReport::new(&err, metadata());
        let text = report.to_text();
        assert!(text.contains("boom"));
        assert!(text.contains("Diagram kind: class"));
        assert!(text.contains("Title: Orders"));
        assert!(text.contains("Entities: 3, groups: 1, links: 2"));
        assert!(report.lines().iter().any(|l| l.starts_with("Sorry")));
        assert!(report.lines().last().is_some_and(|l| l.contains("/issues")));
    }

    #[test]
    fn error_scene_prints_every_non_empty_line() {
        let err = Error::EnginePanic {
            message: "bad".to_string(),
        };
        let report = CrashReport::new(&err, metadata());
        let scene = error_scene(
            &report,
            &DeterministicTextMeasurer::default(),
            &RenderConfig::default(),
        );
        let texts = scene
            .primitives
            .iter()
            .filter(|p| matches!(p, Primitive::Text { .. }))
            .count();
        let non_empty = report.lines().iter().filter(|l| !l.is_empty()).count();
        assert_eq!(texts, non_empty);
        assert!(scene.nodes.is_empty());
        assert!(scene.width > 0.0 && scene.height > 0.0);
    }
}
