//! Tree layout for argument graphs.
//!
//! Every root claim becomes a column: the claim on top, and below it a row
//! with one column per relation pointing at it. A relation's column holds
//! the room for its arrow (or the relations attacking/supporting it) above
//! the layout of its source claim. Sizes are resolved bottom-up and cached,
//! positions are handed out top-down.

use serde::Serialize;
use std::cell::OnceCell;

use crate::config::{LayoutConfig, Size};
use crate::error::{GraphError, Result};
use crate::geometry::Rect;
use crate::model::{ArgumentGraph, ClaimId, RelationId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Horizontal,
    Vertical,
}

#[derive(Debug)]
pub enum LayoutBox {
    Container(Container),
    Claim { id: ClaimId, width: f32, height: f32 },
    Spacer(Size),
}

impl LayoutBox {
    pub fn size(&self) -> (f32, f32) {
        match self {
            LayoutBox::Container(container) => container.size(),
            LayoutBox::Claim { width, height, .. } => (*width, *height),
            LayoutBox::Spacer(size) => (size.width, size.height),
        }
    }

    fn place(
        &self,
        x: f32,
        y: f32,
        depth: usize,
        graph: &mut ArgumentGraph,
        outline: &mut LayoutOutline,
    ) {
        let (width, height) = self.size();
        let rect = Rect::new(x, y, width, height);
        match self {
            LayoutBox::Container(container) => {
                outline.push(OutlineKind::from(container.direction), rect, depth);
                container.place(x, y, depth, graph, outline);
            }
            LayoutBox::Claim { id, .. } => {
                outline.push(OutlineKind::Claim, rect, depth);
                if let Some(claim) = graph.claim_mut(*id) {
                    claim.set_position(x, y);
                }
            }
            LayoutBox::Spacer(_) => outline.push(OutlineKind::Spacer, rect, depth),
        }
    }
}

/// Row or column of boxes separated by a fixed gap.
#[derive(Debug)]
pub struct Container {
    pub direction: Direction,
    pub gap: f32,
    pub children: Vec<LayoutBox>,
    size: OnceCell<(f32, f32)>,
}

impl Container {
    pub fn new(direction: Direction, gap: f32) -> Self {
        Self {
            direction,
            gap,
            children: Vec::new(),
            size: OnceCell::new(),
        }
    }

    pub fn push(&mut self, child: LayoutBox) {
        self.children.push(child);
        self.size = OnceCell::new();
    }

    /// `(width, height)`; computed on first use.
    pub fn size(&self) -> (f32, f32) {
        *self.size.get_or_init(|| {
            let sizes = self.children.iter().map(LayoutBox::size);
            let gaps = self.children.len().saturating_sub(1) as f32 * self.gap;
            let (mut along, mut across) = (0.0f32, 0.0f32);
            for (width, height) in sizes {
                let (main, cross) = match self.direction {
                    Direction::Horizontal => (width, height),
                    Direction::Vertical => (height, width),
                };
                along += main;
                across = across.max(cross);
            }
            match self.direction {
                Direction::Horizontal => (along + gaps, across),
                Direction::Vertical => (across, along + gaps),
            }
        })
    }

    pub fn width(&self) -> f32 {
        self.size().0
    }

    pub fn height(&self) -> f32 {
        self.size().1
    }

    fn place(
        &self,
        x: f32,
        y: f32,
        depth: usize,
        graph: &mut ArgumentGraph,
        outline: &mut LayoutOutline,
    ) {
        let (width, height) = self.size();
        let mut offset = 0.0;
        for child in &self.children {
            let (child_width, child_height) = child.size();
            match self.direction {
                Direction::Horizontal => {
                    let child_y = y + (height - child_height) / 2.0;
                    child.place(x + offset, child_y, depth + 1, graph, outline);
                    offset += child_width + self.gap;
                }
                Direction::Vertical => {
                    let child_x = x + (width - child_width) / 2.0;
                    child.place(child_x, y + offset, depth + 1, graph, outline);
                    offset += child_height + self.gap;
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OutlineKind {
    Horizontal,
    Vertical,
    Spacer,
    Claim,
}

impl From<Direction> for OutlineKind {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Horizontal => OutlineKind::Horizontal,
            Direction::Vertical => OutlineKind::Vertical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OutlineBox {
    pub kind: OutlineKind,
    pub rect: Rect,
    pub depth: usize,
}

/// Where every box of the last layout pass ended up, outermost first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayoutOutline {
    pub boxes: Vec<OutlineBox>,
}

impl LayoutOutline {
    fn push(&mut self, kind: OutlineKind, rect: Rect, depth: usize) {
        self.boxes.push(OutlineBox { kind, rect, depth });
    }
}

#[derive(Debug)]
pub struct Layout {
    root: Container,
    origin_x: f32,
    origin_y: f32,
}

impl Layout {
    /// Builds the box tree for `graph`. Every claim reached must already be
    /// measured.
    pub fn build(graph: &ArgumentGraph, config: &LayoutConfig) -> Result<Self> {
        let roots = graph.find_root_claims();
        let mut builder = Builder {
            graph,
            config,
            path: Vec::new(),
        };

        let mut root = Container::new(Direction::Horizontal, config.horizontal_spacing);
        for id in &roots {
            root.push(builder.claim(*id)?);
        }
        tracing::debug!(roots = roots.len(), "built layout tree");

        Ok(Self {
            root,
            origin_x: config.origin_x,
            origin_y: config.origin_y,
        })
    }

    pub fn root(&self) -> &Container {
        &self.root
    }

    pub fn width(&self) -> f32 {
        self.root.width()
    }

    pub fn height(&self) -> f32 {
        self.root.height()
    }

    /// Writes the computed anchors onto the claims, starting at the
    /// configured origin.
    pub fn apply(&self, graph: &mut ArgumentGraph) -> LayoutOutline {
        let mut outline = LayoutOutline::default();
        let rect = Rect::new(self.origin_x, self.origin_y, self.width(), self.height());
        outline.push(OutlineKind::Horizontal, rect, 0);
        self.root
            .place(self.origin_x, self.origin_y, 0, graph, &mut outline);
        tracing::debug!(
            width = self.width(),
            height = self.height(),
            boxes = outline.boxes.len(),
            "applied layout"
        );
        outline
    }
}

struct Builder<'a> {
    graph: &'a ArgumentGraph,
    config: &'a LayoutConfig,
    /// Claims on the current recursion path.
    path: Vec<ClaimId>,
}

impl Builder<'_> {
    fn column(&self) -> Container {
        Container::new(Direction::Vertical, self.config.vertical_spacing)
    }

    fn row(&self) -> Container {
        Container::new(Direction::Horizontal, self.config.horizontal_spacing)
    }

    fn claim(&mut self, id: ClaimId) -> Result<LayoutBox> {
        if self.path.contains(&id) {
            return Err(GraphError::Cycle(id));
        }
        let claim = self.graph.claim(id).ok_or_else(|| GraphError::InvalidSource {
            found: format!("unknown {id}"),
        })?;
        let (width, height) = claim.size().ok_or(GraphError::Unmeasured(id))?;

        self.path.push(id);
        let mut column = self.column();
        column.push(LayoutBox::Claim { id, width, height });

        let incoming = self.graph.incoming(id);
        if !incoming.is_empty() {
            let mut row = self.row();
            for relation in incoming {
                row.push(self.relation(relation)?);
            }
            column.push(LayoutBox::Container(row));
        }
        self.path.pop();

        Ok(LayoutBox::Container(column))
    }

    fn relation(&mut self, id: RelationId) -> Result<LayoutBox> {
        let source = self
            .graph
            .relation(id)
            .ok_or(GraphError::MissingRelation(id))?
            .claim;

        let mut column = self.column();
        let incoming = self.graph.incoming(id);
        if incoming.is_empty() {
            column.push(LayoutBox::Spacer(self.config.leaf_spacer));
        } else {
            let mut stack = self.column();
            for relation in incoming {
                stack.push(self.relation(relation)?);
            }
            let mut row = self.row();
            row.push(LayoutBox::Spacer(self.config.relation_spacer));
            row.push(LayoutBox::Container(stack));
            column.push(LayoutBox::Container(row));
        }
        column.push(self.claim(source)?);

        Ok(LayoutBox::Container(column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Metadata, RelationKind};

    fn measured(graph: &mut ArgumentGraph) {
        graph.measure_claims(|lines| {
            let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
            (longest as f32 * 7.0 + 10.0, lines.len() as f32 * 16.0 + 10.0)
        });
    }

    #[test]
    fn container_sizes_sum_along_and_max_across() {
        let mut row = Container::new(Direction::Horizontal, 10.0);
        row.push(LayoutBox::Spacer(Size::new(20.0, 50.0)));
        row.push(LayoutBox::Spacer(Size::new(30.0, 10.0)));
        row.push(LayoutBox::Spacer(Size::new(5.0, 5.0)));
        assert_eq!(row.size(), (75.0, 50.0));

        let mut column = Container::new(Direction::Vertical, 4.0);
        column.push(LayoutBox::Spacer(Size::new(20.0, 50.0)));
        column.push(LayoutBox::Container(row));
        assert_eq!(column.size(), (75.0, 104.0));

        assert_eq!(Container::new(Direction::Vertical, 10.0).size(), (0.0, 0.0));
    }

    #[test]
    fn unmeasured_claims_fail_the_build() {
        let mut graph = ArgumentGraph::new();
        let a = graph.add_claim("a", Metadata::default());
        let err = Layout::build(&graph, &LayoutConfig::default()).unwrap_err();
        assert_eq!(err, GraphError::Unmeasured(a));
    }

    #[test]
    fn lone_claim_sits_at_origin() {
        let mut graph = ArgumentGraph::new();
        let a = graph.add_claim("alone", Metadata::default());
        measured(&mut graph);
        let layout = Layout::build(&graph, &LayoutConfig::default()).unwrap();
        layout.apply(&mut graph);

        let claim = graph.claim(a).unwrap();
        assert_eq!((claim.ax, claim.ay), (20.0, 20.0));
        // Just the claim: no row for incoming relations.
        let LayoutBox::Container(column) = &layout.root().children[0] else {
            panic!("root child should be a column");
        };
        assert_eq!(column.children.len(), 1);
    }

    #[test]
    fn supporting_claim_is_placed_below_after_spacer() {
        let mut graph = ArgumentGraph::new();
        let a = graph.add_claim("Socrates is mortal", Metadata::default());
        let b = graph.add_claim("He is a man", Metadata::assumption());
        graph
            .add_relation(b, a, Some(RelationKind::Support), Metadata::default())
            .unwrap();
        measured(&mut graph);

        let layout = Layout::build(&graph, &LayoutConfig::default()).unwrap();
        let outline = layout.apply(&mut graph);

        let a_claim = graph.claim(a).unwrap();
        let b_claim = graph.claim(b).unwrap();
        let a_height = a_claim.height.unwrap();
        assert_eq!((a_claim.ax, a_claim.ay), (20.0, 20.0));

        let row_y = 20.0 + a_height + 10.0;
        let row = outline
            .boxes
            .iter()
            .find(|b| b.kind == OutlineKind::Horizontal && b.depth == 2)
            .unwrap();
        assert_eq!(row.rect.y, row_y);
        assert_eq!(b_claim.ay, row_y + 50.0 + 10.0);
        assert!(a_claim.ay < b_claim.ay);
    }

    #[test]
    fn relation_with_incoming_reserves_side_room() {
        let mut graph = ArgumentGraph::new();
        let a = graph.add_claim("a", Metadata::default());
        let b = graph.add_claim("b", Metadata::default());
        let c = graph.add_claim("c", Metadata::default());
        let ba = graph
            .add_relation(b, a, Some(RelationKind::Support), Metadata::default())
            .unwrap()
            .unwrap();
        graph
            .add_relation(c, ba, Some(RelationKind::Attack), Metadata::default())
            .unwrap();
        measured(&mut graph);

        let layout = Layout::build(&graph, &LayoutConfig::default()).unwrap();
        layout.apply(&mut graph);

        let b_claim = graph.claim(b).unwrap();
        let c_claim = graph.claim(c).unwrap();
        // c hangs to the right of the 200px spacer, above b.
        assert!(c_claim.ax > 20.0 + 200.0);
        assert!(c_claim.ay < b_claim.ay);
        assert_eq!(graph.find_root_claims(), vec![a]);
    }

    #[test]
    fn cycles_are_reported() {
        let mut graph = ArgumentGraph::new();
        let root = graph.add_claim("root", Metadata::default());
        let a = graph.add_claim("a", Metadata::default());
        let b = graph.add_claim("b", Metadata::default());
        graph
            .add_relation(a, root, Some(RelationKind::Support), Metadata::default())
            .unwrap();
        graph
            .add_relation(b, a, Some(RelationKind::Support), Metadata::default())
            .unwrap();
        graph
            .add_relation(a, b, Some(RelationKind::Attack), Metadata::default())
            .unwrap();
        measured(&mut graph);

        let err = Layout::build(&graph, &LayoutConfig::default()).unwrap_err();
        assert_eq!(err, GraphError::Cycle(a));
    }

    #[test]
    fn roots_are_laid_out_side_by_side() {
        let mut graph = ArgumentGraph::new();
        let x = graph.add_claim("first", Metadata::default());
        let y = graph.add_claim("second", Metadata::default());
        measured(&mut graph);
        let layout = Layout::build(&graph, &LayoutConfig::default()).unwrap();
        layout.apply(&mut graph);

        let x = graph.claim(x).unwrap();
        let y = graph.claim(y).unwrap();
        assert_eq!(y.ax, x.ax + x.width.unwrap() + 10.0);
        assert_eq!(
            layout.width(),
            x.width.unwrap() + 10.0 + y.width.unwrap()
        );
    }
}
