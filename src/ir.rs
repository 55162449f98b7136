use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};

pub type NodeId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Operation,
    Value,
    Scope,
    /// A scope standing in for its whole subtree. Only produced by the
    /// collapse engine, never loaded from records.
    Collapsed,
}

impl NodeKind {
    pub fn is_leaf(self) -> bool {
        !matches!(self, Self::Scope)
    }
}

/// One input record as written by the capture side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub id: NodeId,
    pub is_leaf: bool,
    #[serde(default)]
    pub is_tensor: bool,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub parent: Option<NodeId>,
    #[serde(default)]
    pub children: Vec<NodeId>,
    #[serde(default, alias = "successors")]
    pub next_nodes: Vec<NodeId>,
}

impl NodeRecord {
    pub fn operation(id: NodeId, label: &str, parent: Option<NodeId>, next: &[NodeId]) -> Self {
        Self::leaf(id, false, label, parent, next)
    }

    pub fn value(id: NodeId, label: &str, parent: Option<NodeId>, next: &[NodeId]) -> Self {
        Self::leaf(id, true, label, parent, next)
    }

    pub fn scope(id: NodeId, label: &str, parent: Option<NodeId>, children: &[NodeId]) -> Self {
        Self {
            id,
            is_leaf: false,
            is_tensor: false,
            label: Some(label.to_string()),
            parent,
            children: children.to_vec(),
            next_nodes: Vec::new(),
        }
    }

    fn leaf(id: NodeId, is_tensor: bool, label: &str, parent: Option<NodeId>, next: &[NodeId]) -> Self {
        Self {
            id,
            is_leaf: true,
            is_tensor,
            label: Some(label.to_string()),
            parent,
            children: Vec::new(),
            next_nodes: next.to_vec(),
        }
    }

    fn kind(&self) -> NodeKind {
        match (self.is_leaf, self.is_tensor) {
            (false, _) => NodeKind::Scope,
            (true, true) => NodeKind::Value,
            (true, false) => NodeKind::Operation,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub label: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Dataflow edges. Only leaves carry them.
    pub successors: Vec<NodeId>,
    /// Meaningful for scopes only.
    pub collapsed: bool,
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        self.kind.is_leaf()
    }

    pub fn is_scope(&self) -> bool {
        self.kind == NodeKind::Scope
    }
}

impl From<NodeRecord> for Node {
    fn from(record: NodeRecord) -> Self {
        let kind = record.kind();
        Self {
            id: record.id,
            kind,
            label: record.label.unwrap_or_else(|| record.id.to_string()),
            parent: record.parent,
            children: record.children,
            successors: record.next_nodes,
            collapsed: kind == NodeKind::Scope,
        }
    }
}

/// The loaded node table. Structure is frozen after [`SourceGraph::load`];
/// only the per-scope `collapsed` flags change afterwards.
#[derive(Debug, Clone)]
pub struct SourceGraph {
    nodes: Vec<Node>,
    index: HashMap<NodeId, usize>,
}

impl SourceGraph {
    pub fn load(records: Vec<NodeRecord>) -> Result<Self> {
        let mut nodes = Vec::with_capacity(records.len());
        let mut index = HashMap::with_capacity(records.len());
        for record in records {
            if index.insert(record.id, nodes.len()).is_some() {
                return Err(GraphError::malformed(record.id, "duplicate id"));
            }
            nodes.push(Node::from(record));
        }
        let graph = Self { nodes, index };
        graph.validate()?;
        tracing::debug!(nodes = graph.len(), roots = graph.roots().len(), "loaded source graph");
        Ok(graph)
    }

    fn validate(&self) -> Result<()> {
        for node in &self.nodes {
            if node.is_leaf() && !node.children.is_empty() {
                return Err(GraphError::malformed(node.id, "leaf lists children"));
            }
            if node.is_scope() && !node.successors.is_empty() {
                return Err(GraphError::malformed(node.id, "scope carries dataflow edges"));
            }
            if let Some(parent_id) = node.parent {
                let parent = self.lookup(parent_id).ok_or_else(|| {
                    GraphError::malformed(node.id, format!("dangling parent {parent_id}"))
                })?;
                if !parent.is_scope() {
                    return Err(GraphError::malformed(node.id, format!("parent {parent_id} is a leaf")));
                }
                if !parent.children.contains(&node.id) {
                    return Err(GraphError::malformed(
                        node.id,
                        format!("parent {parent_id} does not list it as a child"),
                    ));
                }
            }
            let mut seen = HashSet::new();
            for &child_id in &node.children {
                if !seen.insert(child_id) {
                    return Err(GraphError::malformed(node.id, format!("child {child_id} listed twice")));
                }
                let child = self.lookup(child_id).ok_or_else(|| {
                    GraphError::malformed(node.id, format!("dangling child {child_id}"))
                })?;
                if child.parent != Some(node.id) {
                    return Err(GraphError::malformed(
                        child_id,
                        format!("listed by {} but owned by {:?}", node.id, child.parent),
                    ));
                }
            }
            for &next in &node.successors {
                let target = self.lookup(next).ok_or_else(|| {
                    GraphError::malformed(node.id, format!("dangling successor {next}"))
                })?;
                if !target.is_leaf() {
                    return Err(GraphError::malformed(node.id, format!("successor {next} is a scope")));
                }
            }
        }
        self.check_acyclic_forest()
    }

    fn check_acyclic_forest(&self) -> Result<()> {
        let mut settled: HashSet<NodeId> = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let mut path: Vec<NodeId> = Vec::new();
            let mut on_path: HashSet<NodeId> = HashSet::new();
            let mut cursor = Some(node.id);
            while let Some(id) = cursor {
                if settled.contains(&id) {
                    break;
                }
                if !on_path.insert(id) {
                    return Err(GraphError::malformed(id, "cycle in scope hierarchy"));
                }
                path.push(id);
                cursor = self.get(id)?.parent;
            }
            settled.extend(path);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.lookup(id)
    }

    /// Nodes in record order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn roots(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|node| node.parent.is_none())
            .map(|node| node.id)
            .collect()
    }

    pub fn scope_ids(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|node| node.is_scope())
            .map(|node| node.id)
            .collect()
    }

    /// Flips the collapsed flag of a scope and returns the new value.
    pub fn toggle(&mut self, id: NodeId) -> Result<bool> {
        let scope = self.scope_mut(id)?;
        scope.collapsed = !scope.collapsed;
        Ok(scope.collapsed)
    }

    pub fn set_collapsed(&mut self, id: NodeId, collapsed: bool) -> Result<()> {
        self.scope_mut(id)?.collapsed = collapsed;
        Ok(())
    }

    pub fn expand_all(&mut self) {
        self.set_all(false);
    }

    pub fn collapse_all(&mut self) {
        self.set_all(true);
    }

    fn set_all(&mut self, collapsed: bool) {
        for node in self.nodes.iter_mut().filter(|node| node.kind == NodeKind::Scope) {
            node.collapsed = collapsed;
        }
    }

    fn scope_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        let idx = *self.index.get(&id).ok_or(GraphError::NotFound { id })?;
        let node = &mut self.nodes[idx];
        if !node.is_scope() {
            return Err(GraphError::NotFound { id });
        }
        Ok(node)
    }

    fn lookup(&self, id: NodeId) -> Option<&Node> {
        self.index.get(&id).map(|&idx| &self.nodes[idx])
    }

    /// Like [`SourceGraph::node`], but a missing id is a structural error.
    pub(crate) fn get(&self, id: NodeId) -> Result<&Node> {
        self.lookup(id)
            .ok_or_else(|| GraphError::malformed(id, "reference to unknown node"))
    }

    /// Walks from `id` (inclusive) towards its root and returns the first
    /// node accepted by `accept`. The walk is bounded by the node count.
    pub(crate) fn find_ancestor(
        &self,
        id: NodeId,
        mut accept: impl FnMut(NodeId) -> bool,
    ) -> Result<Option<NodeId>> {
        let mut cursor = Some(id);
        for _ in 0..=self.nodes.len() {
            match cursor {
                None => return Ok(None),
                Some(current) if accept(current) => return Ok(Some(current)),
                Some(current) => cursor = self.get(current)?.parent,
            }
        }
        Err(GraphError::malformed(id, "parent chain does not terminate"))
    }

    /// True when `id` lies in the subtree rooted at `root`, inclusive.
    pub fn is_within(&self, id: NodeId, root: NodeId) -> Result<bool> {
        Ok(self.find_ancestor(id, |current| current == root)?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Vec<NodeRecord> {
        vec![
            NodeRecord::scope(0, "model", None, &[1, 2, 3]),
            NodeRecord::operation(1, "linear", Some(0), &[2]),
            NodeRecord::value(2, "[4, 8]", Some(0), &[3]),
            NodeRecord::operation(3, "relu", Some(0), &[]),
        ]
    }

    #[test]
    fn loads_records_with_default_collapsed_scopes() {
        let graph = SourceGraph::load(chain()).unwrap();
        assert_eq!(graph.len(), 4);
        assert_eq!(graph.roots(), vec![0]);
        assert_eq!(graph.scope_ids(), vec![0]);
        assert!(graph.node(0).unwrap().collapsed);
        assert!(!graph.node(1).unwrap().collapsed);
        assert_eq!(graph.node(2).unwrap().kind, NodeKind::Value);
        assert_eq!(graph.node(3).unwrap().kind, NodeKind::Operation);
    }

    #[test]
    fn parses_camel_case_records() {
        let json = r#"[
            {"id": 0, "isLeaf": false, "isTensor": false, "label": "block",
             "parent": null, "children": [1], "nextNodes": []},
            {"id": 1, "isLeaf": true, "isTensor": true, "parent": 0,
             "children": [], "nextNodes": []}
        ]"#;
        let records: Vec<NodeRecord> = serde_json::from_str(json).unwrap();
        let graph = SourceGraph::load(records).unwrap();
        assert_eq!(graph.node(0).unwrap().label, "block");
        assert_eq!(graph.node(1).unwrap().label, "1");
    }

    #[test]
    fn toggle_flips_scopes_only() {
        let mut graph = SourceGraph::load(chain()).unwrap();
        assert!(!graph.toggle(0).unwrap());
        assert!(graph.toggle(0).unwrap());
        assert_eq!(graph.toggle(1), Err(GraphError::NotFound { id: 1 }));
        assert_eq!(graph.toggle(42), Err(GraphError::NotFound { id: 42 }));
        graph.expand_all();
        assert!(!graph.node(0).unwrap().collapsed);
    }

    #[test]
    fn rejects_dangling_successor() {
        let mut records = chain();
        records[3].next_nodes.push(99);
        let err = SourceGraph::load(records).unwrap_err();
        assert_eq!(err.offending_id(), Some(3));
    }

    #[test]
    fn rejects_scope_as_edge_endpoint() {
        let mut records = chain();
        records[3].next_nodes.push(0);
        assert!(matches!(
            SourceGraph::load(records),
            Err(GraphError::MalformedGraph { id: Some(3), .. })
        ));
    }

    #[test]
    fn rejects_parent_cycle() {
        let records = vec![
            NodeRecord::scope(0, "a", Some(1), &[1]),
            NodeRecord::scope(1, "b", Some(0), &[0]),
        ];
        let err = SourceGraph::load(records).unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn rejects_inconsistent_ownership() {
        let records = vec![
            NodeRecord::scope(0, "a", None, &[2]),
            NodeRecord::scope(1, "b", None, &[2]),
            NodeRecord::operation(2, "op", Some(0), &[]),
        ];
        assert!(SourceGraph::load(records).is_err());
    }

    #[test]
    fn ancestor_walk_is_inclusive() {
        let graph = SourceGraph::load(chain()).unwrap();
        assert!(graph.is_within(2, 0).unwrap());
        assert!(graph.is_within(0, 0).unwrap());
        assert!(!graph.is_within(0, 2).unwrap());
    }
}
