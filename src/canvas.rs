//! The interactive controller: owns the graph and a surface, turns pointer
//! and keyboard input into selection and drag changes, and repaints at most
//! once per host frame.

use crate::config::{LayoutConfig, Size};
use crate::error::Result;
use crate::events::{DRAW, DROP, EventBus, ListenerId};
use crate::geometry::Point;
use crate::layout::{Layout, LayoutOutline};
use crate::model::{
    ArgumentGraph, ClaimId, Deleted, Metadata, RelationFilter, RelationId, RelationKind, Sources,
    TargetRef,
};
use crate::render::{Scene, draw_scene};
use crate::surface::{Font, Surface};
use crate::theme::{ScopePalette, Style};

/// Pointer travel, in either axis, before a press becomes a drag.
pub const DRAG_THRESHOLD: f32 = 2.0;
/// Arrow-key nudge, multiplied by the style scale.
pub const KEY_STEP: f32 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEvent {
    Draw { width: u32, height: u32 },
    Drop { claims: Vec<ClaimId> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Delete,
    Backspace,
    Tab,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    #[default]
    Default,
    Pointer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    Idle,
    Pressed,
    Dragging,
}

#[derive(Debug)]
pub struct GraphCanvas<S: Surface> {
    graph: ArgumentGraph,
    surface: S,
    style: Style,
    palette: ScopePalette,
    layout_config: LayoutConfig,
    container: Size,
    focused: bool,
    cursor: Cursor,
    selected_claims: Vec<ClaimId>,
    drag_start: Option<Point>,
    was_dragging: bool,
    frame_requested: bool,
    outline: Option<LayoutOutline>,
    events: EventBus<CanvasEvent>,
}

impl<S: Surface> GraphCanvas<S> {
    pub fn new(surface: S, container: Size, style: Style) -> Self {
        let palette = style.palette();
        let mut canvas = Self {
            graph: ArgumentGraph::new(),
            surface,
            style,
            palette,
            layout_config: LayoutConfig::default(),
            container,
            focused: false,
            cursor: Cursor::Default,
            selected_claims: Vec::new(),
            drag_start: None,
            was_dragging: false,
            frame_requested: false,
            outline: None,
            events: EventBus::new(),
        };
        canvas.update_canvas_size();
        canvas
    }

    pub fn with_layout_config(mut self, config: LayoutConfig) -> Self {
        self.layout_config = config;
        self
    }

    pub fn graph(&self) -> &ArgumentGraph {
        &self.graph
    }

    /// Direct access to the model; schedules a redraw.
    pub fn graph_mut(&mut self) -> &mut ArgumentGraph {
        self.update();
        &mut self.graph
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    /// Edits the style in place. Claims are measured again on the next
    /// draw if the edit touched any of the text metrics, and scope colours
    /// are handed out afresh if the palette changed.
    pub fn update_style(&mut self, edit: impl FnOnce(&mut Style)) {
        let metrics = self.style.text_metrics();
        let scope_palette = self.style.scope_palette.clone();
        edit(&mut self.style);

        if self.style.text_metrics() != metrics {
            let dropped = self.graph.invalidate_sizes();
            tracing::debug!(dropped, "text metrics changed, claims will be measured again");
        }
        if self.style.scope_palette != scope_palette {
            self.palette = self.style.palette();
        }
        self.update();
    }

    pub fn set_style(&mut self, style: Style) {
        self.update_style(|current| *current = style);
    }

    pub fn palette(&self) -> &ScopePalette {
        &self.palette
    }

    pub fn container(&self) -> Size {
        self.container
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn selected_claims(&self) -> &[ClaimId] {
        &self.selected_claims
    }

    pub fn outline(&self) -> Option<&LayoutOutline> {
        self.outline.as_ref()
    }

    pub fn interaction(&self) -> Interaction {
        match (self.drag_start, self.was_dragging) {
            (None, _) => Interaction::Idle,
            (Some(_), false) => Interaction::Pressed,
            (Some(_), true) => Interaction::Dragging,
        }
    }

    pub fn add_claim(&mut self, text: &str, metadata: Metadata) -> ClaimId {
        self.update();
        self.graph.add_claim(text, metadata)
    }

    pub fn add_relation(
        &mut self,
        sources: impl Into<Sources>,
        target: impl Into<TargetRef>,
        kind: Option<RelationKind>,
        metadata: Metadata,
    ) -> Result<Option<RelationId>> {
        let relation = self.graph.add_relation(sources, target, kind, metadata)?;
        if relation.is_some() {
            self.update();
        }
        Ok(relation)
    }

    pub fn find_root_claims(&self) -> Vec<ClaimId> {
        self.graph.find_root_claims()
    }

    pub fn find_relations(&self, criteria: &[RelationFilter]) -> Vec<RelationId> {
        self.graph.find_relations(criteria)
    }

    /// Cascading delete that also drops removed claims from the selection.
    pub fn delete(&mut self, entity: impl Into<TargetRef>) -> Deleted {
        let deleted = self.graph.delete(entity);
        self.selected_claims
            .retain(|id| !deleted.claims.contains(id));
        self.update();
        deleted
    }

    pub fn on(&mut self, name: &str, listener: impl FnMut(&CanvasEvent) + 'static) -> ListenerId {
        self.events.on(name, listener)
    }

    pub fn off(&mut self, name: &str, id: ListenerId) -> bool {
        self.events.off(name, id)
    }

    pub fn fire(&mut self, name: &str, event: &CanvasEvent) -> usize {
        self.events.fire(name, event)
    }

    /// Asks for a repaint on the next frame. Any number of requests before
    /// that frame collapse into one draw.
    pub fn update(&mut self) {
        self.frame_requested = true;
    }

    pub fn needs_frame(&self) -> bool {
        self.frame_requested
    }

    /// Host animation tick. Draws if a repaint was requested since the last
    /// one; returns whether it did.
    pub fn frame(&mut self) -> bool {
        if !self.frame_requested {
            return false;
        }
        tracing::trace!("drawing frame");
        self.draw();
        true
    }

    /// Container size changed; the surface follows on the next frame.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.container = Size::new(width, height);
        self.update();
    }

    pub fn set_focus(&mut self, focused: bool) {
        if self.focused != focused {
            self.focused = focused;
            self.update();
        }
    }

    /// Measures every claim that has no size yet.
    pub fn update_claim_sizes(&mut self) -> usize {
        let claim_style = &self.style.claim;
        let scale = self.style.scale;
        let font = Font::new("", scale * claim_style.font_size, claim_style.font_family.clone());
        let (padding, line_height) = (claim_style.padding, claim_style.line_height);
        let surface = &self.surface;

        self.graph.measure_claims(|lines| {
            let text_width = lines
                .iter()
                .map(|line| surface.measure_text(line, &font))
                .fold(0.0f32, f32::max);
            (
                text_width / scale + 2.0 * padding,
                lines.len() as f32 * line_height + 2.0 * padding,
            )
        })
    }

    fn update_canvas_size(&mut self) {
        let (right, bottom) = self
            .graph
            .bounds()
            .map_or((0.0, 0.0), |bounds| (bounds.right(), bounds.bottom()));
        let scale = self.style.scale;
        let width = (scale * right.max(self.container.width)).ceil().max(0.0) as u32;
        let height = (scale * bottom.max(self.container.height)).ceil().max(0.0) as u32;
        if self.surface.size() != (width, height) {
            self.surface.resize(width, height);
        }
    }

    /// Measures the claims and builds the layout tree for the current graph.
    pub fn layout(&mut self) -> Result<Layout> {
        self.update_claim_sizes();
        Layout::build(&self.graph, &self.layout_config)
    }

    /// `layout()` followed by `apply()`; keeps the outline for the debug overlay.
    pub fn apply_layout(&mut self) -> Result<()> {
        let layout = self.layout()?;
        self.outline = Some(layout.apply(&mut self.graph));
        self.update();
        Ok(())
    }

    /// Shifts all claims so the leftmost and topmost start at `padding`, then
    /// shrinks the container to the content.
    pub fn fit(&mut self, padding: f32) {
        let Some(bounds) = self.graph.bounds() else {
            return;
        };
        for claim in self.graph.claims_mut() {
            let (x, y) = (claim.x(), claim.y());
            claim.set_position(x - bounds.x + padding, y - bounds.y + padding);
        }
        if let Some(bounds) = self.graph.bounds() {
            self.resize(padding + bounds.right(), padding + bounds.bottom());
        }
    }

    /// Like `fit`, vertically only. The offset is in device pixels.
    pub fn fit_vertically(&mut self, padding: f32) {
        let Some(bounds) = self.graph.bounds() else {
            return;
        };
        let offset = padding * self.style.scale;
        for claim in self.graph.claims_mut() {
            let (x, y) = (claim.x(), claim.y());
            claim.set_position(x, y - bounds.y + offset);
        }
        if let Some(bounds) = self.graph.bounds() {
            self.resize(self.container.width, padding + bounds.bottom());
        }
    }

    pub fn draw(&mut self) {
        self.update_claim_sizes();
        self.update_canvas_size();
        self.surface.clear();

        let scene = Scene {
            graph: &self.graph,
            style: &self.style,
            selection: &self.selected_claims,
            focused: self.focused,
            outline: self.outline.as_ref(),
        };
        draw_scene(&mut self.surface, &scene, &mut self.palette);
        self.frame_requested = false;

        let (width, height) = self.surface.size();
        self.events.fire(DRAW, &CanvasEvent::Draw { width, height });
    }

    /// First claim, in list order, whose box strictly contains `point`.
    pub fn claim_at(&self, point: Point) -> Option<ClaimId> {
        self.graph
            .claims()
            .find(|claim| claim.rect().contains(point))
            .map(|claim| claim.id)
    }

    pub fn pointer_down(&mut self, point: Point, shift: bool) {
        self.was_dragging = false;
        self.drag_start = Some(point);

        if let Some(id) = self.claim_at(point)
            && !self.selected_claims.contains(&id)
        {
            if shift {
                self.selected_claims.push(id);
            } else {
                self.selected_claims = vec![id];
            }
            self.update();
        }
    }

    pub fn pointer_move(&mut self, point: Point) {
        let Some(start) = self.drag_start else {
            self.cursor = if self.claim_at(point).is_some() {
                Cursor::Pointer
            } else {
                Cursor::Default
            };
            return;
        };

        let (dx, dy) = (point.x - start.x, point.y - start.y);
        if dx.abs() > DRAG_THRESHOLD || dy.abs() > DRAG_THRESHOLD {
            self.was_dragging = true;
        }
        for id in &self.selected_claims {
            if let Some(claim) = self.graph.claim_mut(*id) {
                claim.dx = dx;
                claim.dy = dy;
            }
        }
        self.update();
    }

    pub fn pointer_up(&mut self, point: Point) {
        self.cursor = Cursor::Default;

        if !self.was_dragging {
            // A press that never became a drag leaves no offset behind.
            for id in &self.selected_claims {
                if let Some(claim) = self.graph.claim_mut(*id) {
                    claim.dx = 0.0;
                    claim.dy = 0.0;
                }
            }
            if self.claim_at(point).is_none() && !self.selected_claims.is_empty() {
                self.selected_claims.clear();
            }
            self.update();
        } else if !self.selected_claims.is_empty() {
            for id in &self.selected_claims {
                if let Some(claim) = self.graph.claim_mut(*id) {
                    claim.commit_offset();
                }
            }
            tracing::debug!(claims = self.selected_claims.len(), "dropped selection");
            self.update();
            let event = CanvasEvent::Drop {
                claims: self.selected_claims.clone(),
            };
            self.events.fire(DROP, &event);
        }

        self.drag_start = None;
        self.was_dragging = false;
    }

    /// Handles a key press while the canvas has focus. Returns `false` for
    /// keys it leaves to the host.
    pub fn key_down(&mut self, key: Key, shift: bool) -> bool {
        let step = KEY_STEP * self.style.scale;
        match key {
            Key::Delete | Key::Backspace => {
                for id in self.selected_claims.clone() {
                    self.delete(id);
                }
                self.update();
            }
            Key::Tab => {
                let ids = self.graph.claim_ids();
                if ids.is_empty() {
                    return false;
                }
                let len = ids.len() as isize;
                let direction = if shift { -1 } else { 1 };
                let idx = self
                    .selected_claims
                    .first()
                    .and_then(|first| ids.iter().position(|id| id == first))
                    .map_or(-1, |idx| idx as isize);

                if idx < len - 1 {
                    let next = (len + idx + direction).rem_euclid(len) as usize;
                    self.selected_claims = vec![ids[next]];
                } else {
                    self.selected_claims.clear();
                }
                self.update();
            }
            Key::ArrowUp => self.nudge(0.0, -step),
            Key::ArrowDown => self.nudge(0.0, step),
            Key::ArrowLeft => self.nudge(-step, 0.0),
            Key::ArrowRight => self.nudge(step, 0.0),
            Key::Other => return false,
        }
        true
    }

    fn nudge(&mut self, dx: f32, dy: f32) {
        for id in &self.selected_claims {
            if let Some(claim) = self.graph.claim_mut(*id) {
                claim.ax += dx;
                claim.ay += dy;
            }
        }
        self.update();
    }
}
