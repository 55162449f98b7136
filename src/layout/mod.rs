mod ranking;
mod text;
mod types;

pub use types::*;

use ranking::*;
use text::*;

use crate::collapse::VisibleGraph;
use crate::config::LayoutConfig;
use crate::error::{GraphError, Result};
use crate::ir::NodeId;
use std::collections::BTreeMap;

/// Assigns a horizontal center and half-width to every visible node.
///
/// Leaves are placed in columns by dataflow depth; scopes get the padded
/// union of their children. Only the horizontal axis is computed.
pub fn compute_layout(graph: &VisibleGraph, config: &LayoutConfig) -> Result<Layout> {
    if !(config.scope_margin.is_finite() && config.scope_margin > 0.0) {
        return Err(GraphError::InvalidConfig {
            reason: format!("scope margin must be positive, got {}", config.scope_margin),
        });
    }
    let layers = assign_layers(graph)?;
    let columns_by_node = layers_to_columns(&layers);
    let column_count = columns_by_node
        .values()
        .copied()
        .max()
        .map_or(0, |max| max + 1);

    let mut half_widths: BTreeMap<NodeId, f32> = BTreeMap::new();
    let mut columns: Vec<ColumnLayout> = (0..column_count)
        .map(|index| ColumnLayout {
            index,
            x: 0.0,
            width: 0.0,
            nodes: Vec::new(),
        })
        .collect();
    for node in graph.leaves() {
        let rx = label_width(&node.label, config) / 2.0;
        half_widths.insert(node.id, rx);
        if let Some(&column) = columns_by_node.get(&node.id) {
            let slot = &mut columns[column];
            slot.width = slot.width.max(2.0 * rx);
            slot.nodes.push(node.id);
        }
    }

    let gaps = skip_gaps(graph, &columns_by_node, column_count, config.skip_margin);
    let pad = config.column_padding;
    let mut offset = 0.0f32;
    for column in &mut columns {
        column.x = offset + pad + column.width / 2.0;
        offset += column.width + 2.0 * pad;
        if let Some(extra) = gaps.get(column.index) {
            offset += extra;
        }
    }

    let mut layout = Layout::default();
    for node in graph.leaves() {
        let column = columns_by_node.get(&node.id).copied();
        let x = column.map_or(0.0, |index| columns[index].x);
        layout.nodes.insert(
            node.id,
            NodeLayout {
                id: node.id,
                kind: node.kind,
                x,
                rx: half_widths.get(&node.id).copied().unwrap_or(0.0),
                layer: layers.get(&node.id).copied(),
                column,
            },
        );
    }

    let mut left = 0.0f32;
    let mut right = offset;
    for &root in graph.roots() {
        let (lo, hi) = fit_scope(graph, root, config.scope_margin, &mut layout.nodes)?;
        left = left.min(lo);
        right = right.max(hi);
    }
    layout.columns = columns;
    layout.left = left;
    layout.right = right;

    tracing::debug!(
        leaves = half_widths.len(),
        columns = layout.columns.len(),
        width = layout.width(),
        "computed layout"
    );
    Ok(layout)
}

/// Returns the horizontal interval of `id`, sizing scope boxes bottom-up on
/// the way. Recursion depth follows the height of the scope tree.
fn fit_scope(
    graph: &VisibleGraph,
    id: NodeId,
    margin: f32,
    nodes: &mut BTreeMap<NodeId, NodeLayout>,
) -> Result<(f32, f32)> {
    let node = graph.get(id)?;
    if node.is_leaf() {
        let placed = nodes
            .get(&id)
            .ok_or_else(|| GraphError::malformed(id, "leaf was not placed"))?;
        return Ok((placed.left(), placed.right()));
    }
    if node.children.is_empty() {
        return Err(GraphError::malformed(id, "expanded scope has no children"));
    }

    let mut lo = f32::INFINITY;
    let mut hi = f32::NEG_INFINITY;
    for &child in &node.children {
        let (child_lo, child_hi) = fit_scope(graph, child, margin, nodes)?;
        lo = lo.min(child_lo);
        hi = hi.max(child_hi);
    }
    lo -= margin;
    hi += margin;
    nodes.insert(
        id,
        NodeLayout {
            id,
            kind: node.kind,
            x: (lo + hi) / 2.0,
            rx: (hi - lo) / 2.0,
            layer: None,
            column: None,
        },
    );
    Ok((lo, hi))
}
