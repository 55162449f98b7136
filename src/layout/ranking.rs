use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};

use crate::collapse::VisibleGraph;
use crate::error::{GraphError, Result};
use crate::ir::NodeId;

/// Longest-path-from-sink layering of the visible leaves: sinks sit on
/// layer 0 and every other leaf one past its deepest successor.
///
/// Leaves are peeled off in reverse topological order; among ready leaves
/// the smallest id goes first so the sweep is reproducible.
pub(super) fn assign_layers(graph: &VisibleGraph) -> Result<BTreeMap<NodeId, usize>> {
    let mut remaining: HashMap<NodeId, usize> = HashMap::new();
    let mut predecessors: HashMap<NodeId, Vec<NodeId>> = HashMap::new();

    for node in graph.leaves() {
        remaining.insert(node.id, node.successors.len());
        for &next in &node.successors {
            let target = graph.get(next)?;
            if !target.is_leaf() {
                return Err(GraphError::malformed(node.id, format!("successor {next} is a scope")));
            }
            predecessors.entry(next).or_default().push(node.id);
        }
    }

    let mut ready: BinaryHeap<Reverse<NodeId>> = remaining
        .iter()
        .filter(|&(_, &count)| count == 0)
        .map(|(&id, _)| Reverse(id))
        .collect();

    let mut layers: BTreeMap<NodeId, usize> = BTreeMap::new();
    while let Some(Reverse(id)) = ready.pop() {
        let node = graph.get(id)?;
        let mut layer = 0;
        for next in &node.successors {
            if let Some(&below) = layers.get(next) {
                layer = layer.max(below + 1);
            }
        }
        layers.insert(id, layer);

        if let Some(preds) = predecessors.get(&id) {
            for pred in preds {
                if let Some(count) = remaining.get_mut(pred) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        ready.push(Reverse(*pred));
                    }
                }
            }
        }
    }

    if layers.len() < remaining.len() {
        let stuck = remaining
            .keys()
            .filter(|id| !layers.contains_key(id))
            .min()
            .copied();
        return Err(GraphError::MalformedGraph {
            id: stuck,
            reason: "dataflow cycle among visible leaves".to_string(),
        });
    }
    Ok(layers)
}

/// Flips layers into columns so producers land left of their consumers.
pub(super) fn layers_to_columns(layers: &BTreeMap<NodeId, usize>) -> BTreeMap<NodeId, usize> {
    let max_layer = layers.values().copied().max().unwrap_or(0);
    layers
        .iter()
        .map(|(&id, &layer)| (id, max_layer - layer))
        .collect()
}

/// Extra horizontal room for each gap between adjacent columns, scaled by
/// the number of columns skipped by the longest edge spanning that gap.
pub(super) fn skip_gaps(
    graph: &VisibleGraph,
    columns: &BTreeMap<NodeId, usize>,
    column_count: usize,
    skip_margin: f32,
) -> Vec<f32> {
    let mut longest_skip = vec![0usize; column_count.saturating_sub(1)];
    if skip_margin <= 0.0 {
        return vec![0.0; longest_skip.len()];
    }
    for node in graph.leaves() {
        let Some(&from) = columns.get(&node.id) else {
            continue;
        };
        for next in &node.successors {
            let Some(&to) = columns.get(next) else {
                continue;
            };
            if to <= from + 1 {
                continue;
            }
            let skipped = to - from - 1;
            for gap in &mut longest_skip[from..to] {
                *gap = (*gap).max(skipped);
            }
        }
    }
    longest_skip
        .into_iter()
        .map(|skipped| skipped as f32 * skip_margin)
        .collect()
}
