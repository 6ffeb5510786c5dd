use crate::error::Result;
use crate::ir::{Diagram, Icon};
use crate::layout::Layout;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub name: String,
    pub direction: String,
    pub splines: String,
    pub width: f32,
    pub height: f32,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
    pub clusters: Vec<ClusterDump>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub icon: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub label_lines: Vec<String>,
    pub cluster: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub index: usize,
    pub from: String,
    pub to: String,
    pub label: Option<String>,
    pub style: String,
    pub color: String,
    pub arrow_start: bool,
    pub arrow_end: bool,
    pub points: Vec<[f32; 2]>,
}

#[derive(Debug, Serialize)]
pub struct ClusterDump {
    pub index: usize,
    pub label: String,
    pub parent: Option<usize>,
    pub depth: usize,
    pub nodes: Vec<String>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl LayoutDump {
    pub fn from_layout(layout: &Layout, diagram: &Diagram) -> Self {
        let nodes = layout
            .nodes
            .values()
            .map(|node| NodeDump {
                id: node.id.key(),
                icon: match &node.icon {
                    Icon::Glyph(glyph) => glyph.category().to_string(),
                    Icon::Custom(path) => path.display().to_string(),
                },
                x: node.x,
                y: node.y,
                width: node.width,
                height: node.height,
                label_lines: node.label.lines.clone(),
                cluster: node.cluster.map(|c| c.0),
            })
            .collect();

        let edges = layout
            .edges
            .iter()
            .map(|edge| EdgeDump {
                index: edge.index,
                from: edge.from.key(),
                to: edge.to.key(),
                label: edge.label.as_ref().map(|label| label.lines.join("\n")),
                style: edge.style.as_token().to_string(),
                color: edge.color.clone(),
                arrow_start: edge.arrow_start,
                arrow_end: edge.arrow_end,
                points: edge.points.iter().map(|(x, y)| [*x, *y]).collect(),
            })
            .collect();

        let clusters = layout
            .clusters
            .iter()
            .map(|cluster| ClusterDump {
                index: cluster.id.0,
                label: cluster.label.clone(),
                parent: diagram
                    .get_cluster(cluster.id)
                    .and_then(|c| c.parent)
                    .map(|p| p.0),
                depth: cluster.depth,
                nodes: diagram
                    .cluster_members(cluster.id)
                    .into_iter()
                    .map(|id| id.key())
                    .collect(),
                x: cluster.x,
                y: cluster.y,
                width: cluster.width,
                height: cluster.height,
            })
            .collect();

        LayoutDump {
            name: diagram.name.clone(),
            direction: layout.direction.as_token().to_string(),
            splines: layout.splines.as_token().to_string(),
            width: layout.width,
            height: layout.height,
            nodes,
            edges,
            clusters,
        }
    }
}

pub fn write_layout_dump(path: &Path, layout: &Layout, diagram: &Diagram) -> Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(layout, diagram);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
