use crate::collapse::VisibleGraph;
use crate::ir::{Node, NodeId, NodeKind, SourceGraph};
use crate::theme::Theme;
use std::fmt::{self, Write};
use std::path::Path;

const INDENT: &str = "    ";

/// Writes the visible set as a Graphviz digraph: one cluster per expanded
/// scope, one node statement per leaf, then every dataflow edge.
pub fn write_dot<W: Write>(graph: &VisibleGraph, theme: &Theme, out: &mut W) -> fmt::Result {
    writeln!(out, "digraph G {{")?;
    writeln!(out, "{INDENT}rankdir={};", quoted(&theme.direction))?;
    writeln!(out, "{INDENT}node [fontname={}];", quoted(&theme.font_family))?;

    let mut edges = String::new();
    for &root in graph.roots() {
        write_node(graph, root, 1, theme, out, &mut edges)?;
    }
    out.write_str(&edges)?;
    writeln!(out, "}}")
}

pub fn render_dot(graph: &VisibleGraph, theme: &Theme) -> String {
    let mut dot = String::new();
    // Writing into a String cannot fail.
    let _ = write_dot(graph, theme, &mut dot);
    dot
}

fn write_node<W: Write>(
    graph: &VisibleGraph,
    id: NodeId,
    depth: usize,
    theme: &Theme,
    out: &mut W,
    edges: &mut String,
) -> fmt::Result {
    let Some(node) = graph.node(id) else {
        return Ok(());
    };
    let pad = INDENT.repeat(depth);
    if node.is_leaf() {
        writeln!(
            out,
            "{pad}\"{id}\" [label={}, shape={}];",
            quoted(&node.label),
            quoted(shape_for(node, theme))
        )?;
        for next in &node.successors {
            writeln!(edges, "{INDENT}\"{id}\" -> \"{next}\";")?;
        }
        return Ok(());
    }

    let inner = INDENT.repeat(depth + 1);
    writeln!(out, "{pad}subgraph \"cluster_{id}\" {{")?;
    writeln!(out, "{inner}label={};", quoted(&node.label))?;
    writeln!(out, "{inner}style={};", quoted(&theme.cluster_style))?;
    writeln!(out, "{inner}color={};", quoted(&theme.cluster_color))?;
    for &child in &node.children {
        write_node(graph, child, depth + 1, theme, out, edges)?;
    }
    writeln!(out, "{pad}}}")
}

fn shape_for<'a>(node: &Node, theme: &'a Theme) -> &'a str {
    match node.kind {
        NodeKind::Value => theme.value_shape.as_str(),
        NodeKind::Collapsed => theme.collapsed_shape.as_str(),
        NodeKind::Operation | NodeKind::Scope => theme.operation_shape.as_str(),
    }
}

/// Writes the raw scope hierarchy top to bottom, ignoring collapsed flags.
/// Nodes with neither a parent nor children are left out.
pub fn write_tree_dot<W: Write>(source: &SourceGraph, theme: &Theme, out: &mut W) -> fmt::Result {
    writeln!(out, "digraph G {{")?;
    writeln!(out, "{INDENT}rankdir=TB;")?;
    writeln!(out, "{INDENT}node [style=filled, fillcolor={}];", quoted(&theme.scope_fill))?;

    let connected: Vec<&Node> = source
        .nodes()
        .filter(|node| node.parent.is_some() || !node.children.is_empty())
        .collect();
    for node in &connected {
        let (shape, fill) = if node.is_leaf() {
            ("ellipse", theme.leaf_fill.as_str())
        } else {
            ("box", theme.scope_fill.as_str())
        };
        writeln!(
            out,
            "{INDENT}\"{}\" [label={}, shape={shape}, fillcolor={}];",
            node.id,
            quoted(&node.label),
            quoted(fill)
        )?;
    }
    for node in &connected {
        for child in &node.children {
            writeln!(out, "{INDENT}\"{}\" -> \"{child}\";", node.id)?;
        }
    }

    let roots: Vec<String> = connected
        .iter()
        .filter(|node| node.parent.is_none())
        .map(|node| format!("\"{}\"", node.id))
        .collect();
    if roots.len() > 1 {
        writeln!(out, "{INDENT}{{rank=same; {};}}", roots.join("; "))?;
    }
    writeln!(out, "}}")
}

pub fn render_tree_dot(source: &SourceGraph, theme: &Theme) -> String {
    let mut dot = String::new();
    let _ = write_tree_dot(source, theme, &mut dot);
    dot
}

pub fn write_output_dot(dot: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, dot)?;
        }
        None => {
            print!("{}", dot);
        }
    }
    Ok(())
}

/// Escapes text for a double-quoted DOT string. CRLF counts as one line
/// break, tabs become spaces and other control characters are dropped.
fn escape_label(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\r' => out.push_str("\\n"),
            '\t' => out.push(' '),
            _ if ch.is_control() => {}
            _ => out.push(ch),
        }
    }
    out
}

fn quoted(value: &str) -> String {
    format!("\"{}\"", escape_label(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collapse::derive_visible;
    use crate::ir::NodeRecord;

    fn sample() -> SourceGraph {
        SourceGraph::load(vec![
            NodeRecord::scope(0, "Linear", None, &[1, 2]),
            NodeRecord::operation(1, "aten::addmm", Some(0), &[2]),
            NodeRecord::value(2, "[64, \"10\"]", Some(0), &[3]),
            NodeRecord::operation(3, "relu", None, &[]),
        ])
        .unwrap()
    }

    #[test]
    fn expanded_scope_becomes_cluster() {
        let mut source = sample();
        source.toggle(0).unwrap();
        let dot = render_dot(&derive_visible(&source).unwrap(), &Theme::default());
        let expected = r#"digraph G {
    rankdir="LR";
    node [fontname="Arial"];
    subgraph "cluster_0" {
        label="Linear";
        style="rounded";
        color="blue";
        "1" [label="aten::addmm", shape="box"];
        "2" [label="[64, \"10\"]", shape="ellipse"];
    }
    "3" [label="relu", shape="box"];
    "1" -> "2";
    "2" -> "3";
}
"#;
        assert_eq!(dot, expected);
    }

    #[test]
    fn collapsed_scope_is_a_plain_node() {
        let source = sample();
        let dot = render_dot(&derive_visible(&source).unwrap(), &Theme::compact());
        assert!(dot.contains("\"0\" [label=\"Linear\", shape=\"box3d\"];"));
        assert!(dot.contains("\"0\" -> \"2\";"));
        assert!(!dot.contains("cluster"));
    }

    #[test]
    fn tree_view_lists_hierarchy() {
        let dot = render_tree_dot(&sample(), &Theme::default());
        assert!(dot.contains("rankdir=TB;"));
        assert!(dot.contains("\"0\" -> \"1\";"));
        assert!(dot.contains("\"0\" [label=\"Linear\", shape=box, fillcolor=\"lightgrey\"];"));
        // Node 3 has no parent and no children.
        assert!(!dot.contains("\"3\""));
        assert!(!dot.contains("rank=same"));
    }

    #[test]
    fn hex_colors_and_spaced_values_stay_quoted() {
        let mut source = sample();
        source.toggle(0).unwrap();
        let theme = Theme {
            cluster_color: "#3366ff".to_string(),
            cluster_style: "rounded,filled".to_string(),
            value_shape: "double circle".to_string(),
            ..Theme::default()
        };
        let dot = render_dot(&derive_visible(&source).unwrap(), &theme);
        assert!(dot.contains("color=\"#3366ff\";"));
        assert!(dot.contains("style=\"rounded,filled\";"));
        assert!(dot.contains("shape=\"double circle\"];"));

        let tree = render_tree_dot(
            &source,
            &Theme {
                scope_fill: "#eeeeee".to_string(),
                ..Theme::default()
            },
        );
        assert!(tree.contains("node [style=filled, fillcolor=\"#eeeeee\"];"));
    }

    #[test]
    fn escapes_labels() {
        assert_eq!(escape_label("a\"b\\c\nd"), "a\\\"b\\\\c\\nd");
        assert_eq!(escape_label("x\r\ny\rz"), "x\\ny\\nz");
        assert_eq!(escape_label("a\tb\u{7}c"), "a bc");
    }
}
