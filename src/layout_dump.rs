use crate::model::{ArgumentGraph, RelationKind, TargetRef};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub width: f32,
    pub height: f32,
    pub claims: Vec<ClaimDump>,
    pub relations: Vec<RelationDump>,
}

#[derive(Debug, Serialize)]
pub struct ClaimDump {
    pub id: usize,
    pub text: Vec<String>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub assumption: bool,
    pub scope: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RelationDump {
    pub id: usize,
    pub source: usize,
    pub target: TargetRef,
    pub kind: Option<RelationKind>,
    pub center: Option<[f32; 2]>,
}

impl LayoutDump {
    pub fn from_graph(graph: &ArgumentGraph) -> Self {
        let claims = graph
            .claims()
            .map(|claim| {
                let rect = claim.rect();
                ClaimDump {
                    id: claim.id.0,
                    text: claim.text.clone(),
                    x: rect.x,
                    y: rect.y,
                    width: rect.width,
                    height: rect.height,
                    assumption: claim.metadata.assumption,
                    scope: claim.metadata.scope.clone(),
                }
            })
            .collect();

        let relations = graph
            .relations()
            .map(|relation| RelationDump {
                id: relation.id.0,
                source: relation.claim.0,
                target: relation.target,
                kind: relation.kind,
                center: graph
                    .relation_center(relation.id)
                    .map(|point| [point.x, point.y]),
            })
            .collect();

        let (width, height) = graph
            .bounds()
            .map_or((0.0, 0.0), |bounds| (bounds.right(), bounds.bottom()));

        LayoutDump {
            width,
            height,
            claims,
            relations,
        }
    }
}

pub fn write_layout_dump(path: &Path, graph: &ArgumentGraph) -> anyhow::Result<()> {
    let dump = LayoutDump::from_graph(graph);
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
