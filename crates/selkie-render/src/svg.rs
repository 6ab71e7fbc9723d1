//! Debug-quality SVG output for scenes.

use crate::scene::{Primitive, Scene, ScenePoint};
use std::fmt::Write as _;

#[derive(Debug, Clone)]
pub struct SvgRenderOptions {
    /// Optional id on the root `<svg>` element.
    pub diagram_id: Option<String>,
    /// When true, attach `data-entity` ids to node and cluster outlines.
    pub include_entity_ids: bool,
    pub font_family: String,
}

impl Default for SvgRenderOptions {
    fn default() -> Self {
        Self {
            diagram_id: None,
            include_entity_ids: true,
            font_family: "ui-sans-serif, system-ui, sans-serif".to_string(),
        }
    }
}

pub fn render_scene_svg(scene: &Scene, options: &SvgRenderOptions) -> String {
    let w = scene.width.max(1.0);
    let h = scene.height.max(1.0);

    let mut out = String::new();
    let id_attr = options
        .diagram_id
        .as_deref()
        .map(|id| format!(r#" id="{}""#, escape_xml(id)))
        .unwrap_or_default();
    let _ = writeln!(
        &mut out,
        r#"<svg xmlns="http://www.w3.org/2000/svg"{id_attr} width="{}" height="{}" viewBox="0 0 {} {}">"#,
        fmt(w),
        fmt(h),
        fmt(w),
        fmt(h)
    );
    let _ = write!(
        &mut out,
        r#"<style>
.shape {{ fill: none; stroke: #1f2937; stroke-width: 1; }}
.filled {{ fill: #1f2937; stroke: #1f2937; stroke-width: 1; }}
.edge {{ fill: none; stroke: #111827; stroke-width: 1; }}
.edge.dashed {{ stroke-dasharray: 5 5; }}
.label {{ fill: #111827; font-family: {}; }}
.hitbox {{ fill: none; stroke: none; }}
</style>
"#,
        escape_xml(&options.font_family)
    );

    if options.include_entity_ids {
        out.push_str(r#"<g class="hitboxes">"#);
        for c in &scene.clusters {
            let _ = write!(
                &mut out,
                r#"<rect class="hitbox" data-entity="{}" x="{}" y="{}" width="{}" height="{}" />"#,
                escape_xml(&c.entity),
                fmt(c.rect.x),
                fmt(c.rect.y),
                fmt(c.rect.width),
                fmt(c.rect.height)
            );
        }
        for n in &scene.nodes {
            let _ = write!(
                &mut out,
                r#"<rect class="hitbox" data-entity="{}" x="{}" y="{}" width="{}" height="{}" />"#,
                escape_xml(&n.entity),
                fmt(n.rect.x),
                fmt(n.rect.y),
                fmt(n.rect.width),
                fmt(n.rect.height)
            );
        }
        out.push_str("</g>\n");
    }

    out.push_str(r#"<g class="scene">"#);
    for p in &scene.primitives {
        render_primitive(&mut out, p);
    }
    out.push_str("</g>\n");
    out.push_str("</svg>\n");
    out
}

fn render_primitive(out: &mut String, p: &Primitive) {
    match p {
        Primitive::Rect {
            rect,
            corner_radius,
        } => {
            let _ = write!(
                out,
                r#"<rect class="shape" x="{}" y="{}" width="{}" height="{}""#,
                fmt(rect.x),
                fmt(rect.y),
                fmt(rect.width),
                fmt(rect.height)
            );
            if *corner_radius > 0.0 {
                let r = fmt(*corner_radius);
                let _ = write!(out, r#" rx="{r}" ry="{r}""#);
            }
            out.push_str(" />");
        }
        Primitive::Polyline { points, dashed } => {
            let class = if *dashed { "edge dashed" } else { "edge" };
            let _ = write!(
                out,
                r#"<polyline class="{class}" points="{}" />"#,
                points_attr(points)
            );
        }
        Primitive::Polygon { points, filled } => {
            let class = if *filled { "filled" } else { "shape" };
            let _ = write!(
                out,
                r#"<polygon class="{class}" points="{}" />"#,
                points_attr(points)
            );
        }
        Primitive::Ellipse { center, rx, ry } => {
            let _ = write!(
                out,
                r#"<ellipse class="shape" cx="{}" cy="{}" rx="{}" ry="{}" />"#,
                fmt(center.x),
                fmt(center.y),
                fmt(*rx),
                fmt(*ry)
            );
        }
        Primitive::Text {
            at,
            text,
            font_size,
            font_family,
        } => {
            let family = font_family
                .as_deref()
                .map(|f| format!(r#" font-family="{}""#, escape_xml(f)))
                .unwrap_or_default();
            let _ = write!(
                out,
                r#"<text class="label" x="{}" y="{}" font-size="{}"{family}>{}</text>"#,
                fmt(at.x),
                fmt(at.y),
                fmt(*font_size),
                escape_xml(text)
            );
        }
    }
}

fn points_attr(points: &[ScenePoint]) -> String {
    let mut s = String::new();
    for (idx, p) in points.iter().enumerate() {
        if idx > 0 {
            s.push(' ');
        }
        let _ = write!(&mut s, "{},{}", fmt(p.x), fmt(p.y));
    }
    s
}

fn fmt(v: f64) -> String {
    // Avoid `-0` and tiny float noise in attribute values.
    if !v.is_finite() {
        return "0".to_string();
    }

    let mut v = if v.abs() < 1e-9 { 0.0 } else { v };
    let nearest = v.round();
    if (v - nearest).abs() < 1e-6 {
        v = nearest;
    }
    let s = v.to_string();
    if s == "-0" { "0".to_string() } else { s }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneRect;

    #[test]
    fn numbers_are_normalized() {
        assert_eq!(fmt(-0.0), "0");
        assert_eq!(fmt(12.0000000001), "12");
        assert_eq!(fmt(f64::NAN), "0");
        assert_eq!(fmt(1.5), "1.5");
    }

    #[test]
    fn text_is_escaped() {
        let scene = Scene {
            width: 10.0,
            height: 10.0,
            primitives: vec![Primitive::Text {
                at: ScenePoint { x: 0.0, y: 0.0 },
                text: "a<b & 'c'".to_string(),
                font_size: 14.0,
                font_family: None,
            }],
            ..Scene::default()
        };
        let svg = render_scene_svg(&scene, &SvgRenderOptions::default());
        assert!(svg.contains("a&lt;b &amp; &#39;c&#39;"));
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn rounded_rects_carry_their_radius() {
        let mut out = String::new();
        render_primitive(
            &mut out,
            &Primitive::Rect {
                rect: SceneRect {
                    x: 1.0,
                    y: 2.0,
                    width: 3.0,
                    height: 4.0,
                },
                corner_radius: 10.0,
            },
        );
        assert_eq!(
            out,
            r#"<rect class="shape" x="1" y="2" width="3" height="4" rx="10" ry="10" />"#
        );
    }
}
