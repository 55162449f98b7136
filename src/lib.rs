pub mod collapse;
pub mod config;
pub mod error;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod render;
pub mod session;
pub mod theme;

#[cfg(feature = "cli")]
pub mod cli;

#[cfg(feature = "cli")]
pub use cli::run;
pub use collapse::{VisibleGraph, derive_visible, escaping_values};
pub use config::{Config, LayoutConfig, load_config};
pub use error::{GraphError, Result};
pub use ir::{Node, NodeId, NodeKind, NodeRecord, SourceGraph};
pub use layout::{Layout, NodeLayout, compute_layout};
pub use render::{render_dot, render_tree_dot};
pub use session::{ScopeGraph, Snapshot};
pub use theme::Theme;

/// Loads node records with the default configuration.
pub fn load(records: Vec<NodeRecord>) -> Result<ScopeGraph> {
    ScopeGraph::load(records, Config::default())
}
