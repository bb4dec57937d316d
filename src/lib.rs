pub mod canvas;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod geometry;
pub mod ingest;
pub mod layout;
pub mod layout_dump;
pub mod model;
pub mod render;
pub mod script;
pub mod surface;
pub mod text_metrics;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;

pub use canvas::{CanvasEvent, GraphCanvas};
pub use config::Config;
pub use error::GraphError;
pub use ingest::{Payload, load_payload, parse_payload};
pub use model::{ArgumentGraph, ClaimId, Metadata, RelationId, RelationKind, TargetRef};
pub use script::{Script, load_script, parse_script};

use config::Size;
use surface::SvgSurface;

/// Options for one-shot rendering of a payload.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub config: Config,
    /// Use the fixed glyph estimate instead of system fonts.
    pub fast_text: bool,
    /// Overlay the layout boxes.
    pub debug_layout: bool,
}

impl RenderOptions {
    pub fn classic() -> Self {
        Self::default()
    }

    pub fn modern() -> Self {
        let mut config = Config::default();
        config.theme = theme::Theme::modern();
        config.render.background = config.theme.background.clone();
        Self {
            config,
            ..Self::default()
        }
    }
}

fn blank_canvas(options: &RenderOptions) -> GraphCanvas<SvgSurface> {
    let render = &options.config.render;
    let mut style = options.config.style();
    style.debug_layout = options.debug_layout;

    let mut surface = SvgSurface::new(0, 0).with_background(render.background.clone());
    if options.fast_text {
        surface = surface.fast_text();
    }

    GraphCanvas::new(surface, Size::new(render.width, render.height), style)
        .with_layout_config(options.config.layout.clone())
}

/// Loads `payload` into a fresh canvas, lays it out, fits it vertically and
/// draws one frame.
pub fn render_canvas(
    payload: &Payload,
    options: &RenderOptions,
) -> anyhow::Result<GraphCanvas<SvgSurface>> {
    let mut canvas = blank_canvas(options);
    load_payload(canvas.graph_mut(), payload)?;
    canvas.apply_layout()?;
    canvas.fit_vertically(options.config.render.padding);
    canvas.draw();
    Ok(canvas)
}

/// Like [`render_canvas`] for a script, fitted on both axes so the surface
/// hugs the graph.
pub fn render_script_canvas(
    script: &Script,
    options: &RenderOptions,
) -> anyhow::Result<GraphCanvas<SvgSurface>> {
    let mut canvas = blank_canvas(options);
    load_script(canvas.graph_mut(), script)?;
    canvas.apply_layout()?;
    canvas.fit(options.config.render.padding);
    canvas.draw();
    Ok(canvas)
}

/// Parses a JSON or JSON5 payload and renders it to an SVG string.
pub fn render_with_options(input: &str, options: RenderOptions) -> anyhow::Result<String> {
    let payload = parse_payload(input)?;
    let canvas = render_canvas(&payload, &options)?;
    Ok(canvas.surface().to_svg())
}

/// Parses a script and renders it to an SVG string.
pub fn render_script_with_options(input: &str, options: RenderOptions) -> anyhow::Result<String> {
    let canvas = render_script_canvas(&parse_script(input), &options)?;
    Ok(canvas.surface().to_svg())
}

pub fn render(input: &str) -> anyhow::Result<String> {
    render_with_options(input, RenderOptions::default())
}
