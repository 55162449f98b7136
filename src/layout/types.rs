use std::collections::BTreeMap;

use crate::ir::{NodeId, NodeKind};

#[derive(Debug, Clone, PartialEq)]
pub struct NodeLayout {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Horizontal center.
    pub x: f32,
    /// Half of the box width.
    pub rx: f32,
    /// Distance from the sinks; leaves only.
    pub layer: Option<usize>,
    /// Left-to-right column index; leaves only.
    pub column: Option<usize>,
}

impl NodeLayout {
    pub fn left(&self) -> f32 {
        self.x - self.rx
    }

    pub fn right(&self) -> f32 {
        self.x + self.rx
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnLayout {
    pub index: usize,
    pub x: f32,
    pub width: f32,
    pub nodes: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Layout {
    pub nodes: BTreeMap<NodeId, NodeLayout>,
    pub columns: Vec<ColumnLayout>,
    pub left: f32,
    pub right: f32,
}

impl Layout {
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeLayout> {
        self.nodes.get(&id)
    }
}
