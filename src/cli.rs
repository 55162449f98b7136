use crate::config::load_config;
use crate::ir::NodeId;
use crate::layout_dump::write_layout_dump;
use crate::render::{render_tree_dot, write_output_dot};
use crate::session::{ScopeGraph, Snapshot};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "scopeviz",
    version,
    about = "Collapsible scope-tree / dataflow graph to Graphviz"
)]
pub struct Args {
    /// Node records (.json) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "dot")]
    pub output_format: OutputFormat,

    /// Config JSON/JSON5 file (theme, themeVariables, layout)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Scope id to toggle; repeat to toggle several, applied in order
    #[arg(short = 't', long = "toggle", allow_negative_numbers = true)]
    pub toggles: Vec<NodeId>,

    /// Start with every scope expanded instead of collapsed
    #[arg(long = "expandAll")]
    pub expand_all: bool,

    /// Write one output per step: the initial state, then one per toggle
    #[arg(long = "steps")]
    pub steps: bool,

    /// Also write the final layout coordinates as JSON to this path
    #[arg(long = "layoutDump")]
    pub layout_dump: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Dataflow diagram of the visible set
    Dot,
    /// Laid-out visible set as JSON
    Json,
    /// Raw scope hierarchy
    Tree,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            Self::Dot | Self::Tree => "dot",
            Self::Json => "json",
        }
    }
}

pub fn run() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    let input = read_input(args.input.as_deref())?;
    let mut graph = ScopeGraph::from_json(&input, config).context("failed to load node records")?;
    if args.expand_all {
        graph.expand_all();
    }

    if args.steps {
        let outputs = resolve_step_outputs(
            args.output.as_deref(),
            args.output_format,
            args.toggles.len() + 1,
        )?;
        let snapshot = graph.snapshot()?;
        emit(&graph, &snapshot, args.output_format, Some(&outputs[0]))?;
        let mut last = snapshot;
        for (idx, &id) in args.toggles.iter().enumerate() {
            last = graph.toggle(id).with_context(|| format!("toggle {id} failed"))?;
            emit(&graph, &last, args.output_format, Some(&outputs[idx + 1]))?;
        }
        return write_dump(args.layout_dump.as_deref(), &last);
    }

    let mut snapshot = None;
    for &id in &args.toggles {
        snapshot = Some(graph.toggle(id).with_context(|| format!("toggle {id} failed"))?);
    }
    let snapshot = match snapshot {
        Some(snapshot) => snapshot,
        None => graph.snapshot()?,
    };
    emit(&graph, &snapshot, args.output_format, args.output.as_deref())?;
    write_dump(args.layout_dump.as_deref(), &snapshot)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn emit(
    graph: &ScopeGraph,
    snapshot: &Snapshot,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    let text = match format {
        OutputFormat::Dot => snapshot.render(),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(&snapshot.dump())?;
            json.push('\n');
            json
        }
        OutputFormat::Tree => render_tree_dot(graph.source(), &graph.config().theme),
    };
    write_output_dot(&text, output)?;
    if let Some(path) = output {
        tracing::info!(path = %path.display(), "wrote output");
    }
    Ok(())
}

fn write_dump(path: Option<&Path>, snapshot: &Snapshot) -> Result<()> {
    if let Some(path) = path {
        write_layout_dump(path, snapshot.layout(), snapshot.visible())?;
    }
    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()));
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn resolve_step_outputs(
    output: Option<&Path>,
    format: OutputFormat,
    count: usize,
) -> Result<Vec<PathBuf>> {
    let ext = format.extension();
    let base = output.ok_or_else(|| anyhow::anyhow!("Output path required for --steps"))?;
    if base.is_dir() {
        return Ok((0..count)
            .map(|idx| base.join(format!("step-{}.{}", idx, ext)))
            .collect());
    }
    let stem = base.file_stem().and_then(|s| s.to_str()).unwrap_or("graph");
    let parent = base.parent().unwrap_or_else(|| Path::new("."));
    Ok((0..count)
        .map(|idx| parent.join(format!("{}-{}.{}", stem, idx, ext)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_outputs_are_numbered_from_the_initial_state() {
        let outputs =
            resolve_step_outputs(Some(Path::new("out/click.dot")), OutputFormat::Dot, 3).unwrap();
        assert_eq!(
            outputs,
            vec![
                PathBuf::from("out/click-0.dot"),
                PathBuf::from("out/click-1.dot"),
                PathBuf::from("out/click-2.dot"),
            ]
        );
        assert!(resolve_step_outputs(None, OutputFormat::Json, 2).is_err());
    }

    #[test]
    fn parses_negative_toggle_ids() {
        let args = Args::try_parse_from(["scopeviz", "-i", "g.json", "-t", "-1", "-t", "4", "--steps"])
            .unwrap();
        assert_eq!(args.toggles, vec![-1, 4]);
        assert!(args.steps);
        assert_eq!(args.output_format, OutputFormat::Dot);
    }
}
