#![forbid(unsafe_code)]

//! Layered layout for hierarchical diagrams.
//!
//! [`render`] projects a [`selkie_core::Diagram`] onto the `lamantin` layout engine, runs it under
//! a process-wide lock, reads the result back and assembles a drawable [`Scene`]. Failures never
//! escape as panics: they come back as a [`RenderFailure`] carrying a diagnostic report and a
//! placeholder scene.

pub mod absorb;
pub mod anchor;
pub mod assemble;
pub mod block;
pub mod builder;
pub mod catalog;
pub mod config;
pub mod crash;
pub mod edges;
pub mod geom;
pub mod image;
pub mod invoke;
pub mod label;
pub mod mirror;
pub mod scene;
pub mod svg;
pub mod text;

pub use absorb::{Absorption, LinkRenderKind};
pub use config::RenderConfig;
pub use crash::{CrashReport, error_scene};
pub use image::{DefaultImageFactory, EntityImage, ImageFactory};
pub use scene::Scene;
pub use svg::{SvgRenderOptions, render_scene_svg};
pub use text::{DeterministicTextMeasurer, TextMeasurer, TextMetrics, TextStyle};

use crate::assemble::Drawing;
use crate::builder::GraphBuilder;
use crate::catalog::Catalog;
use crate::edges::EdgeProjector;
use crate::invoke::{run_layout, with_layout_session};
use crate::label::LinkBlocks;
use crate::mirror::LayoutSnapshot;
use indexmap::IndexMap;
use selkie_core::{Diagram, DiagramMetadata, LinkId};
use std::sync::Arc;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invariant violation: {message}")]
    InvariantViolation { message: String },
    #[error("layout engine error: {0}")]
    Layout(#[from] lamantin::Error),
    #[error("layout engine panicked: {message}")]
    EnginePanic { message: String },
    #[error("invalid diagram: {0}")]
    Model(#[from] selkie_core::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone)]
pub struct RenderOptions {
    pub config: RenderConfig,
    pub text_measurer: Arc<dyn TextMeasurer + Send + Sync>,
    pub image_factory: Arc<dyn ImageFactory>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            config: RenderConfig::default(),
            text_measurer: Arc::new(DeterministicTextMeasurer::default()),
            image_factory: Arc::new(DefaultImageFactory),
        }
    }
}

impl RenderOptions {
    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Rendered {
    pub scene: Scene,
    pub metadata: DiagramMetadata,
}

/// A failed render: the error, its report and the scene drawn in place of the diagram.
#[derive(Debug)]
pub struct RenderFailure {
    pub error: Error,
    pub report: CrashReport,
    pub scene: Scene,
}

impl std::fmt::Display for RenderFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "render failed: {}", self.error)
    }
}

impl std::error::Error for RenderFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

pub type RenderResult = std::result::Result<Rendered, RenderFailure>;

pub fn render(diagram: &Diagram, options: &RenderOptions) -> RenderResult {
    let metadata = diagram.metadata();
    match layout_scene(diagram, options) {
        Ok(scene) => Ok(Rendered { scene, metadata }),
        Err(error) => {
            tracing::error!(%error, kind = diagram.kind.as_str(), "diagram render failed");
            let report = CrashReport::new(&error, metadata);
            let scene = error_scene(
                &report,
                options.text_measurer.as_ref(),
                &options.config,
            );
            Err(RenderFailure {
                error,
                report,
                scene,
            })
        }
    }
}

fn layout_scene(diagram: &Diagram, options: &RenderOptions) -> Result<Scene> {
    let config = &options.config;
    let measurer = options.text_measurer.as_ref();

    let catalog = Catalog::prepare(diagram, options)?;
    let absorption = Absorption::compute(diagram, &catalog, config.absorbed_note_gap);
    let blocks: IndexMap<LinkId, LinkBlocks> = diagram
        .links()
        .filter(|(id, link)| {
            diagram.is_link_active(link) && absorption.kind(*id) == LinkRenderKind::Normal
        })
        .map(|(id, link)| (id, LinkBlocks::compose(diagram, link, measurer, config)))
        .collect();

    let snapshot = with_layout_session(|ctx| {
        let mut tables = GraphBuilder::new(ctx, diagram, &catalog, &absorption).build()?;
        if tables.is_empty() {
            tracing::debug!("nothing to lay out");
            return Ok(None);
        }
        EdgeProjector::new(diagram, &absorption, &blocks).project(ctx, &mut tables)?;
        run_layout(ctx, tables.root, diagram.rankdir, config)?;
        LayoutSnapshot::extract(ctx, &tables).map(Some)
    })?;

    let Some(snapshot) = snapshot else {
        return Ok(Scene::default());
    };
    Ok(Drawing {
        diagram,
        catalog: &catalog,
        absorption: &absorption,
        blocks: &blocks,
        snapshot: &snapshot,
    }
    .assemble())
}
