use crate::collapse::VisibleGraph;
use crate::ir::{NodeId, NodeKind};
use crate::layout::Layout;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub left: f32,
    pub right: f32,
    pub width: f32,
    pub roots: Vec<NodeId>,
    pub nodes: Vec<NodeDump>,
    pub columns: Vec<ColumnDump>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: NodeId,
    pub kind: NodeKind,
    pub label: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub successors: Vec<NodeId>,
    pub x: f32,
    pub rx: f32,
    pub layer: Option<usize>,
    pub column: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ColumnDump {
    pub index: usize,
    pub x: f32,
    pub width: f32,
    pub nodes: Vec<NodeId>,
}

impl LayoutDump {
    /// Nodes are listed in forest pre-order.
    pub fn from_layout(layout: &Layout, graph: &VisibleGraph) -> Self {
        let nodes = graph
            .preorder()
            .into_iter()
            .filter_map(|id| {
                let node = graph.node(id)?;
                let placed = layout.node(id)?;
                Some(NodeDump {
                    id,
                    kind: node.kind,
                    label: node.label.clone(),
                    parent: node.parent,
                    children: node.children.clone(),
                    successors: node.successors.clone(),
                    x: placed.x,
                    rx: placed.rx,
                    layer: placed.layer,
                    column: placed.column,
                })
            })
            .collect();

        let columns = layout
            .columns
            .iter()
            .map(|column| ColumnDump {
                index: column.index,
                x: column.x,
                width: column.width,
                nodes: column.nodes.clone(),
            })
            .collect();

        LayoutDump {
            left: layout.left,
            right: layout.right,
            width: layout.width(),
            roots: graph.roots().to_vec(),
            nodes,
            columns,
        }
    }
}

pub fn write_layout_dump(path: &Path, layout: &Layout, graph: &VisibleGraph) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(layout, graph);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
