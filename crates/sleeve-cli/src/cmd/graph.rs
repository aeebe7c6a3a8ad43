//! `sleeve graph`: causal read→write graph.
//!
//! # Edge Direction
//!
//! An edge `R → W` means a cycle that read `R` went on to write `W`. Every
//! read of a cycle points at every write of the same cycle.

use std::io::Write;
use std::path::Path;

use clap::Args;
use serde::Serialize;
use sleeve_core::{Diagnostics, GraphView};

use super::input::InputArgs;
use super::{load_config, load_event_inputs, run_pipeline};
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

/// Arguments for `sleeve graph`.
#[derive(Args, Debug, Default)]
pub struct GraphArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Debug, Serialize)]
struct Summary {
    events: usize,
    cycles: usize,
    nodes: usize,
    edges: usize,
    skipped_events: usize,
    skipped_versions: usize,
}

#[derive(Debug, Serialize)]
struct GraphOutput {
    graph: GraphView,
    fingerprint: String,
    summary: Summary,
    diagnostics: Diagnostics,
}

/// Execute `sleeve graph`.
pub fn run_graph(
    args: &GraphArgs,
    output: OutputMode,
    project_root: &Path,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    let config = load_config(project_root, config_path, output)?;
    let inputs = load_event_inputs(&args.input, &config, output)?;
    let correlation = run_pipeline(&inputs, &config, output)?;

    let payload = GraphOutput {
        graph: correlation.graph.to_view(),
        fingerprint: correlation.graph.content_hash.clone(),
        summary: Summary {
            events: correlation.events.len(),
            cycles: correlation.groups.len(),
            nodes: correlation.graph.node_count(),
            edges: correlation.graph.edge_count(),
            skipped_events: correlation.skipped_events,
            skipped_versions: correlation.skipped_versions,
        },
        diagnostics: correlation.diagnostics,
    };

    render_mode(output, &payload, render_graph_text, render_graph_pretty)
}

fn render_graph_text(payload: &GraphOutput, w: &mut dyn Write) -> std::io::Result<()> {
    for node in &payload.graph.nodes {
        writeln!(w, "node  {}  {}", node.id, node.label.replace('\n', " "))?;
    }
    for edge in &payload.graph.edges {
        writeln!(
            w,
            "edge  {} -> {}  {}  {}",
            edge.from, edge.to, edge.reconcile_id, edge.color
        )?;
    }
    for diagnostic in &payload.diagnostics {
        writeln!(w, "diag  {diagnostic}")?;
    }
    Ok(())
}

fn render_graph_pretty(payload: &GraphOutput, w: &mut dyn Write) -> std::io::Result<()> {
    let summary = &payload.summary;
    pretty_section(w, "Causal graph")?;
    pretty_kv(w, "Events", summary.events.to_string())?;
    pretty_kv(w, "Cycles", summary.cycles.to_string())?;
    pretty_kv(w, "Nodes", summary.nodes.to_string())?;
    pretty_kv(w, "Edges", summary.edges.to_string())?;
    pretty_kv(w, "Fingerprint", &payload.fingerprint)?;

    if payload.graph.nodes.is_empty() {
        writeln!(w, "\nNo cycle wrote anything; the graph is empty.")?;
    } else {
        writeln!(w)?;
        pretty_section(w, "Nodes")?;
        for node in &payload.graph.nodes {
            let mut lines = node.label.lines();
            writeln!(w, "  {}  [{}]", lines.next().unwrap_or_default(), node.id)?;
            for status in lines {
                writeln!(w, "      {status}")?;
            }
        }

        writeln!(w)?;
        pretty_section(w, "Edges")?;
        for edge in &payload.graph.edges {
            writeln!(
                w,
                "  {} → {}  ({}, {})",
                edge.from, edge.to, edge.reconcile_id, edge.color
            )?;
        }
    }

    if !payload.diagnostics.is_empty() {
        writeln!(w)?;
        pretty_section(w, &format!("Diagnostics ({})", payload.diagnostics.len()))?;
        for diagnostic in &payload.diagnostics {
            writeln!(w, "  {diagnostic}")?;
        }
    }
    Ok(())
}
