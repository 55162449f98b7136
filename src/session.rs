use std::fmt;

use crate::collapse::{VisibleGraph, derive_visible};
use crate::config::Config;
use crate::error::Result;
use crate::ir::{NodeId, NodeRecord, SourceGraph};
use crate::layout::{Layout, compute_layout};
use crate::layout_dump::LayoutDump;
use crate::render::write_dot;
use crate::theme::Theme;

/// A loaded graph plus the settings used to lay it out and emit it.
///
/// Every mutation takes `&mut self`, so toggles are serialized by the
/// borrow checker; hosts sharing one instance across threads wrap it in a
/// lock.
#[derive(Debug, Clone)]
pub struct ScopeGraph {
    source: SourceGraph,
    config: Config,
}

/// The visible set and its coordinates for one state of the collapsed
/// flags. Owned outright; later toggles do not affect it.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    visible: VisibleGraph,
    layout: Layout,
    theme: Theme,
}

impl ScopeGraph {
    pub fn load(records: Vec<NodeRecord>, config: Config) -> Result<Self> {
        Ok(Self {
            source: SourceGraph::load(records)?,
            config,
        })
    }

    /// Loads node records from their JSON array form.
    pub fn from_json(text: &str, config: Config) -> anyhow::Result<Self> {
        let records: Vec<NodeRecord> = serde_json::from_str(text)?;
        Ok(Self::load(records, config)?)
    }

    pub fn source(&self) -> &SourceGraph {
        &self.source
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Recomputes the visible set and layout for the current flags.
    pub fn snapshot(&self) -> Result<Snapshot> {
        let visible = derive_visible(&self.source)?;
        let layout = compute_layout(&visible, &self.config.layout)?;
        Ok(Snapshot {
            visible,
            layout,
            theme: self.config.theme.clone(),
        })
    }

    /// Flips one scope and returns the freshly laid-out result. An unknown
    /// id leaves everything untouched; a failed recomputation restores the
    /// flag before returning the error.
    pub fn toggle(&mut self, id: NodeId) -> Result<Snapshot> {
        let collapsed = self.source.toggle(id)?;
        tracing::info!(id, collapsed, "toggled scope");
        self.snapshot_or_revert(id, !collapsed)
    }

    pub fn set_collapsed(&mut self, id: NodeId, collapsed: bool) -> Result<Snapshot> {
        let previous = self
            .source
            .node(id)
            .map(|node| node.collapsed)
            .unwrap_or(collapsed);
        self.source.set_collapsed(id, collapsed)?;
        self.snapshot_or_revert(id, previous)
    }

    pub fn expand_all(&mut self) {
        self.source.expand_all();
    }

    pub fn collapse_all(&mut self) {
        self.source.collapse_all();
    }

    fn snapshot_or_revert(&mut self, id: NodeId, previous: bool) -> Result<Snapshot> {
        match self.snapshot() {
            Ok(snapshot) => Ok(snapshot),
            Err(err) => {
                tracing::warn!(id, error = %err, "recomputation failed, restoring flag");
                self.source.set_collapsed(id, previous)?;
                Err(err)
            }
        }
    }
}

impl Snapshot {
    pub fn visible(&self) -> &VisibleGraph {
        &self.visible
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Graphviz text for this snapshot.
    pub fn render(&self) -> String {
        let mut dot = String::new();
        let _ = self.write_to(&mut dot);
        dot
    }

    pub fn write_to<W: fmt::Write>(&self, out: &mut W) -> fmt::Result {
        write_dot(&self.visible, &self.theme, out)
    }

    pub fn dump(&self) -> LayoutDump {
        LayoutDump::from_layout(&self.layout, &self.visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;

    fn records() -> Vec<NodeRecord> {
        vec![
            NodeRecord::scope(0, "net", None, &[1, 2, 3]),
            NodeRecord::operation(1, "conv", Some(0), &[2]),
            NodeRecord::value(2, "feat", Some(0), &[3]),
            NodeRecord::operation(3, "pool", Some(0), &[]),
        ]
    }

    #[test]
    fn toggle_returns_recomputed_snapshot() {
        let mut graph = ScopeGraph::load(records(), Config::default()).unwrap();
        assert_eq!(graph.snapshot().unwrap().visible().len(), 1);

        let expanded = graph.toggle(0).unwrap();
        assert_eq!(expanded.visible().len(), 4);
        assert!(expanded.render().contains("subgraph \"cluster_0\""));

        let collapsed = graph.toggle(0).unwrap();
        assert_eq!(collapsed, graph.snapshot().unwrap());
        assert_eq!(collapsed.visible().len(), 1);
    }

    #[test]
    fn unknown_toggle_is_not_found() {
        let mut graph = ScopeGraph::load(records(), Config::default()).unwrap();
        assert_eq!(graph.toggle(3).unwrap_err(), GraphError::NotFound { id: 3 });
        assert!(graph.source().node(0).unwrap().collapsed);
    }

    #[test]
    fn failed_recompute_restores_flag() {
        let mut graph = ScopeGraph::load(
            vec![NodeRecord::scope(7, "empty", None, &[])],
            Config::default(),
        )
        .unwrap();
        assert!(matches!(graph.toggle(7), Err(GraphError::MalformedGraph { .. })));
        assert!(graph.source().node(7).unwrap().collapsed);
    }

    #[test]
    fn parses_json_records() {
        let graph = ScopeGraph::from_json(
            r#"[{"id": -1, "isLeaf": false, "label": "[forward]", "parent": null,
                 "children": [], "nextNodes": []}]"#,
            Config::default(),
        )
        .unwrap();
        assert_eq!(graph.source().scope_ids(), vec![-1]);
    }
}
