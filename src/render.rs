use crate::config::RenderConfig;
use crate::geometry::{self, Path, Point, Rect};
use crate::layout::{LayoutOutline, OutlineKind};
use crate::model::{ArgumentGraph, ClaimId, RelationKind, TargetRef};
use crate::surface::{Font, Surface};
use crate::theme::{ScopePalette, Style};
use anyhow::Result;
use std::path::Path as FsPath;

const SELECTION_INSET: f32 = 2.0;
const SELECTION_LINE_WIDTH: f32 = 3.0;
const CROSS_SCALE: f32 = 0.75;

/// Everything a single frame paints.
#[derive(Debug, Clone, Copy)]
pub struct Scene<'a> {
    pub graph: &'a ArgumentGraph,
    pub style: &'a Style,
    pub selection: &'a [ClaimId],
    pub focused: bool,
    pub outline: Option<&'a LayoutOutline>,
}

/// Paints relations, then claims, then the selection outlines, then the
/// layout boxes if the style asks for them. The surface is not cleared.
pub fn draw_scene<S: Surface + ?Sized>(
    surface: &mut S,
    scene: &Scene<'_>,
    palette: &mut ScopePalette,
) {
    draw_relations(surface, scene);
    draw_claims(surface, scene, palette);
    draw_selection(surface, scene);
    if scene.style.debug_layout
        && let Some(outline) = scene.outline
    {
        draw_outline(surface, outline, scene.style.scale);
    }
}

fn draw_relations<S: Surface + ?Sized>(surface: &mut S, scene: &Scene<'_>) {
    let graph = scene.graph;
    let scale = scene.style.scale;
    let radius = scene.style.relation.size;

    for relation in graph.relations() {
        let source = TargetRef::Claim(relation.claim);
        let (Some(source_box), Some(target_box)) =
            (graph.box_geom(source), graph.box_geom(relation.target))
        else {
            continue;
        };

        // Both ends stop on the box borders rather than at the centers.
        let from = geometry::offset_position(target_box, source_box);
        let to = geometry::offset_position(source_box, target_box);
        let color = (scene.style.relation.color)(relation);

        let (from, to) = (from.scaled(scale), to.scaled(scale));
        match relation.kind {
            Some(RelationKind::Support) => {
                let end = geometry::retracted_end(scale * radius, from, to);
                surface.stroke_path(&Path::line(from, end), &color, scale);
                surface.fill_path(&geometry::arrow_path(scale * radius, from, to), &color);
            }
            Some(RelationKind::Attack) => {
                let end = geometry::retracted_end(scale * radius, from, to);
                surface.stroke_path(&Path::line(from, end), &color, scale);
                let cross = geometry::cross_path(CROSS_SCALE * scale * radius, from, to);
                surface.stroke_path(&cross, &color, 2.0 * scale);
            }
            None => surface.stroke_path(&Path::line(from, to), &color, scale),
        }
    }
}

/// Claims in list order, except selected ones, which come last in
/// selection order so the most recently selected ends up on top.
fn paint_order(graph: &ArgumentGraph, selection: &[ClaimId]) -> Vec<ClaimId> {
    let mut order: Vec<ClaimId> = graph
        .claims()
        .map(|claim| claim.id)
        .filter(|id| !selection.contains(id))
        .collect();
    order.extend(selection.iter().copied().filter(|id| graph.claim(*id).is_some()));
    order
}

fn draw_claims<S: Surface + ?Sized>(
    surface: &mut S,
    scene: &Scene<'_>,
    palette: &mut ScopePalette,
) {
    let style = &scene.style.claim;
    let scale = scene.style.scale;

    for id in paint_order(scene.graph, scene.selection) {
        let Some(claim) = scene.graph.claim(id) else {
            continue;
        };
        let rect = claim.rect().scaled(scale);
        surface.fill_rect(rect, &(style.background)(claim));
        surface.stroke_rect(rect, &(style.border)(claim, palette), scale);

        let font = Font::new(
            (style.font_style)(claim),
            scale * style.font_size,
            style.font_family.clone(),
        );
        let color = (style.font_color)(claim);
        for (idx, line) in claim.text.iter().enumerate() {
            let baseline = Point::new(
                scale * (claim.x() + style.padding),
                scale * (claim.y() + style.padding / 2.0 + (idx + 1) as f32 * style.line_height),
            );
            surface.fill_text(line, baseline, &font, &color);
        }
    }
}

fn draw_selection<S: Surface + ?Sized>(surface: &mut S, scene: &Scene<'_>) {
    let scale = scene.style.scale;
    let color = if scene.focused {
        &scene.style.focus_color
    } else {
        &scene.style.blur_color
    };

    for id in scene.selection {
        if let Some(claim) = scene.graph.claim(*id) {
            let rect = claim.rect().inflate(SELECTION_INSET).scaled(scale);
            surface.stroke_rect(rect, color, SELECTION_LINE_WIDTH * scale);
        }
    }
}

/// Debug overlay: rows red, columns green, inset 2px per nesting level;
/// spacers and claim slots filled translucent.
pub fn draw_outline<S: Surface + ?Sized>(surface: &mut S, outline: &LayoutOutline, scale: f32) {
    for item in &outline.boxes {
        let inset = 2.0 * item.depth as f32;
        match item.kind {
            OutlineKind::Horizontal | OutlineKind::Vertical => {
                let color = if item.kind == OutlineKind::Horizontal { "red" } else { "green" };
                let rect = Rect::new(
                    item.rect.x + inset,
                    item.rect.y + inset,
                    item.rect.width - 2.0 * inset,
                    item.rect.height - 2.0 * inset,
                );
                surface.stroke_rect(rect.scaled(scale), color, scale);
            }
            OutlineKind::Spacer => {
                surface.fill_rect(item.rect.scaled(scale), "rgba(255, 0, 255, 0.5)")
            }
            OutlineKind::Claim => {
                surface.fill_rect(item.rect.scaled(scale), "rgba(255, 255, 0, 0.5)")
            }
        }
    }
}

pub fn write_output_svg(svg: &str, output: Option<&FsPath>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &FsPath, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    let fallback = usvg::Size::from_wh(800.0, 600.0)
        .ok_or_else(|| anyhow::anyhow!("invalid fallback size"))?;
    opt.default_size =
        usvg::Size::from_wh(render_cfg.width, render_cfg.height).unwrap_or(fallback);

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

#[cfg(not(feature = "png"))]
pub fn write_output_png(_svg: &str, _output: &FsPath, _render_cfg: &RenderConfig) -> Result<()> {
    anyhow::bail!("PNG output requires the `png` feature")
}
