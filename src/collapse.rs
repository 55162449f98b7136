use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::{GraphError, Result};
use crate::ir::{Node, NodeId, NodeKind, SourceGraph};

/// The node set seen by layout and emission for one snapshot of the
/// collapsed flags. Owns copies of every node; nothing points back into the
/// source graph.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleGraph {
    nodes: BTreeMap<NodeId, Node>,
    roots: Vec<NodeId>,
}

impl VisibleGraph {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn leaves(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(|node| node.is_leaf())
    }

    pub(crate) fn get(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(&id)
            .ok_or_else(|| GraphError::malformed(id, "not present in visible set"))
    }

    /// Depth-first pre-order over the forest: roots in order, children in
    /// their listed order.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            if order.len() > self.nodes.len() {
                break;
            }
            if let Some(node) = self.nodes.get(&id) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        order
    }

    /// Checks the forest shape and that every successor resolves inside
    /// this set.
    pub fn validate(&self) -> Result<()> {
        let mut seen: HashSet<NodeId> = HashSet::with_capacity(self.nodes.len());
        for id in self.preorder() {
            if !seen.insert(id) {
                return Err(GraphError::malformed(id, "reached twice in visible forest"));
            }
            let node = self.get(id)?;
            for &child in &node.children {
                if self.get(child)?.parent != Some(id) {
                    return Err(GraphError::malformed(child, format!("parent is not {id}")));
                }
            }
        }
        if seen.len() != self.nodes.len() {
            let stray = self
                .nodes
                .keys()
                .find(|id| !seen.contains(id))
                .copied();
            return Err(GraphError::MalformedGraph {
                id: stray,
                reason: "node unreachable from any visible root".to_string(),
            });
        }
        for &root in &self.roots {
            if self.get(root)?.parent.is_some() {
                return Err(GraphError::malformed(root, "root has a parent"));
            }
        }
        for node in self.nodes.values() {
            if node.is_scope() && !node.successors.is_empty() {
                return Err(GraphError::malformed(node.id, "scope carries dataflow edges"));
            }
            for &next in &node.successors {
                let target = self.nodes.get(&next).ok_or_else(|| {
                    GraphError::malformed(node.id, format!("successor {next} not visible"))
                })?;
                if !target.is_leaf() {
                    return Err(GraphError::malformed(node.id, format!("successor {next} is a scope")));
                }
                if node.kind == NodeKind::Collapsed && target.kind != NodeKind::Value {
                    return Err(GraphError::malformed(
                        node.id,
                        format!("exposed node {next} is not a value"),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Values inside the subtree of `root` with at least one successor outside
/// it, in depth-first order.
pub fn escaping_values(source: &SourceGraph, root: NodeId) -> Result<Vec<NodeId>> {
    let mut escaping = Vec::new();
    let mut stack = vec![root];
    let mut steps = 0usize;
    while let Some(id) = stack.pop() {
        steps += 1;
        if steps > source.len() {
            return Err(GraphError::malformed(root, "subtree walk does not terminate"));
        }
        let node = source.get(id)?;
        match node.kind {
            NodeKind::Value => {
                for &next in &node.successors {
                    if !source.is_within(next, root)? {
                        escaping.push(id);
                        break;
                    }
                }
            }
            NodeKind::Operation | NodeKind::Collapsed => {}
            NodeKind::Scope => stack.extend(node.children.iter().rev().copied()),
        }
    }
    Ok(escaping)
}

/// Builds the visible set for the current collapsed flags of `source`.
///
/// Traversal recurses once per scope level, so stack depth follows the
/// height of the scope tree.
pub fn derive_visible(source: &SourceGraph) -> Result<VisibleGraph> {
    let mut builder = Builder {
        source,
        nodes: BTreeMap::new(),
        escaped_from: HashMap::new(),
    };
    let mut roots = source.roots();
    let mut orphans = Vec::new();
    for &root in &roots {
        orphans.extend(builder.visit(root)?);
    }
    for value in orphans {
        builder.adopt(value, None)?;
        roots.push(value);
    }
    builder.rewire()?;

    let visible = VisibleGraph {
        nodes: builder.nodes,
        roots,
    };
    visible.validate()?;
    tracing::debug!(
        visible = visible.len(),
        roots = visible.roots.len(),
        escaped = builder.escaped_from.len(),
        "derived visible set"
    );
    Ok(visible)
}

struct Builder<'a> {
    source: &'a SourceGraph,
    nodes: BTreeMap<NodeId, Node>,
    /// Escaping value -> the collapsed scope it was lifted out of.
    escaped_from: HashMap<NodeId, NodeId>,
}

impl Builder<'_> {
    /// Copies `id` into the visible set and returns the values that escaped
    /// a collapsed scope and still need an owner.
    fn visit(&mut self, id: NodeId) -> Result<Vec<NodeId>> {
        let source = self.source;
        let node = source.get(id)?;
        if node.is_leaf() {
            self.nodes.insert(id, node.clone());
            return Ok(Vec::new());
        }

        if node.collapsed {
            let escaping = escaping_values(source, id)?;
            for &value in &escaping {
                self.escaped_from.insert(value, id);
            }
            let mut stand_in = node.clone();
            stand_in.kind = NodeKind::Collapsed;
            stand_in.children.clear();
            stand_in.successors = escaping.clone();
            self.nodes.insert(id, stand_in);
            return Ok(escaping);
        }

        let mut adopted = Vec::new();
        for &child in &node.children {
            adopted.extend(self.visit(child)?);
        }
        for &value in &adopted {
            self.adopt(value, Some(id))?;
        }
        let mut scope = node.clone();
        scope.children.extend(adopted);
        self.nodes.insert(id, scope);
        Ok(Vec::new())
    }

    fn adopt(&mut self, value: NodeId, parent: Option<NodeId>) -> Result<()> {
        let mut node = self.source.get(value)?.clone();
        if node.kind != NodeKind::Value {
            return Err(GraphError::malformed(value, "only values can leave a collapsed scope"));
        }
        node.parent = parent;
        self.nodes.insert(value, node);
        Ok(())
    }

    /// Points every successor at its nearest visible ancestor in the source
    /// forest and drops duplicates.
    fn rewire(&mut self) -> Result<()> {
        let mut updates = Vec::new();
        for node in self.nodes.values().filter(|node| node.is_leaf()) {
            let home = self.escaped_from.get(&node.id).copied();
            let mut seen = HashSet::new();
            let mut successors = Vec::with_capacity(node.successors.len());
            for &next in &node.successors {
                let resolved = self
                    .source
                    .find_ancestor(next, |candidate| self.nodes.contains_key(&candidate))?
                    .ok_or_else(|| {
                        GraphError::malformed(node.id, format!("successor {next} has no visible ancestor"))
                    })?;
                // Consumption inside the block the value escaped from is hidden.
                if Some(resolved) == home {
                    continue;
                }
                if seen.insert(resolved) {
                    successors.push(resolved);
                }
            }
            if successors != node.successors {
                updates.push((node.id, successors));
            }
        }
        for (id, successors) in updates {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.successors = successors;
            }
        }
        Ok(())
    }
}
