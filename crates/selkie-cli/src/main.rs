use selkie::Diagram;
use selkie_render::{RenderConfig, RenderOptions, SvgRenderOptions, render, render_scene_svg};
use serde::Serialize;
use std::io::Read;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Model(selkie::Error),
    Render(selkie_render::Error),
    Json(serde_json::Error),
    /// The layout failed; the placeholder output has already been written.
    Failed(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Model(err) => write!(f, "{err}"),
            CliError::Render(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::Failed(report) => write!(f, "{report}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<selkie::Error> for CliError {
    fn from(value: selkie::Error) -> Self {
        Self::Model(value)
    }
}

impl From<selkie_render::Error> for CliError {
    fn from(value: selkie_render::Error) -> Self {
        Self::Render(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum OutputFormat {
    #[default]
    Svg,
    Json,
}

impl FromStr for OutputFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "svg" => Ok(Self::Svg),
            "json" => Ok(Self::Json),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    input: Option<String>,
    config: Option<String>,
    format: OutputFormat,
    pretty: bool,
    diagram_id: Option<String>,
    out: Option<String>,
}

#[derive(Serialize)]
struct SceneOut<'a> {
    metadata: &'a selkie::DiagramMetadata,
    scene: &'a selkie_render::Scene,
}

#[derive(Serialize)]
struct FailureOut<'a> {
    report: &'a selkie_render::CrashReport,
    scene: &'a selkie_render::Scene,
}

fn usage() -> &'static str {
    "selkie\n\
\n\
USAGE:\n\
  selkie [--config <config.json>] [--format svg|json] [--pretty] [--id <diagram-id>] [-o <path>] [<model.json>|-]\n\
\n\
NOTES:\n\
  - If <model.json> is omitted or '-', the model is read from stdin.\n\
  - svg prints the drawing; json prints the metadata and the assembled scene.\n\
  - When the layout fails, the error placeholder is still written and the exit code is 4.\n\
  - Diagnostics go to stderr; tune them with RUST_LOG (default: warn).\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "--pretty" => args.pretty = true,
            "--config" => {
                let Some(path) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.config = Some(path.clone());
            }
            "--format" => {
                let Some(fmt) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.format = fmt
                    .parse::<OutputFormat>()
                    .map_err(|_| CliError::Usage(usage()))?;
            }
            "--id" => {
                let Some(id) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.diagram_id = Some(id.clone());
            }
            "-o" | "--out" => {
                let Some(out) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.out = Some(out.clone());
            }
            "--" => {
                if let Some(rest) = it.next() {
                    if args.input.is_some() {
                        return Err(CliError::Usage(usage()));
                    }
                    args.input = Some(rest.clone());
                }
                if it.next().is_some() {
                    return Err(CliError::Usage(usage()));
                }
            }
            "-" => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some("-".to_string());
            }
            other if other.starts_with('-') => return Err(CliError::Usage(usage())),
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    Ok(args)
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn to_json(value: &impl Serialize, pretty: bool) -> Result<String, CliError> {
    let mut text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    text.push('\n');
    Ok(text)
}

fn write_text(text: &str, out: Option<&str>) -> Result<(), CliError> {
    match out {
        None | Some("-") => {
            print!("{text}");
            Ok(())
        }
        Some(path) => {
            std::fs::write(path, text)?;
            Ok(())
        }
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let model = read_input(args.input.as_deref())?;
    let diagram = Diagram::from_json(&model)?;
    tracing::debug!(
        input = args.input.as_deref().unwrap_or("-"),
        kind = diagram.kind.as_str(),
        "model loaded"
    );

    let config = match args.config.as_deref() {
        Some(path) => RenderConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => RenderConfig::default(),
    };
    let svg_options = SvgRenderOptions {
        diagram_id: args.diagram_id.clone(),
        font_family: config
            .font_family
            .clone()
            .unwrap_or_else(|| SvgRenderOptions::default().font_family),
        ..Default::default()
    };
    let options = RenderOptions::default().with_config(config);

    match render(&diagram, &options) {
        Ok(rendered) => {
            let text = match args.format {
                OutputFormat::Svg => render_scene_svg(&rendered.scene, &svg_options),
                OutputFormat::Json => to_json(
                    &SceneOut {
                        metadata: &rendered.metadata,
                        scene: &rendered.scene,
                    },
                    args.pretty,
                )?,
            };
            write_text(&text, args.out.as_deref())
        }
        Err(failure) => {
            let text = match args.format {
                OutputFormat::Svg => render_scene_svg(&failure.scene, &svg_options),
                OutputFormat::Json => to_json(
                    &FailureOut {
                        report: &failure.report,
                        scene: &failure.scene,
                    },
                    args.pretty,
                )?,
            };
            write_text(&text, args.out.as_deref())?;
            Err(CliError::Failed(failure.report.to_text()))
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    init_tracing();

    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    match run(args) {
        Ok(()) => {}
        Err(err @ CliError::Failed(_)) => {
            eprintln!("{err}");
            std::process::exit(4);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
