//! `sleeve cycles`: readset and writeset of each reconcile cycle.

use std::io::Write;
use std::path::Path;

use clap::Args;
use serde::Serialize;
use sleeve_core::ReconcileGroup;

use super::input::InputArgs;
use super::{load_config, load_event_inputs, run_pipeline};
use crate::output::{OutputMode, pretty_rule, render_mode};

/// Arguments for `sleeve cycles`.
#[derive(Args, Debug, Default)]
pub struct CyclesArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Include cycles that only read.
    #[arg(long)]
    pub all: bool,
}

#[derive(Debug, Serialize)]
struct CyclesOutput {
    cycles: Vec<ReconcileGroup>,
}

/// Execute `sleeve cycles`.
pub fn run_cycles(
    args: &CyclesArgs,
    output: OutputMode,
    project_root: &Path,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    let config = load_config(project_root, config_path, output)?;
    let inputs = load_event_inputs(&args.input, &config, output)?;
    let correlation = run_pipeline(&inputs, &config, output)?;

    let cycles = correlation
        .groups
        .into_values()
        .filter(|group| args.all || !group.is_read_only())
        .collect();
    let payload = CyclesOutput { cycles };

    render_mode(output, &payload, render_cycles_text, render_cycles_pretty)
}

fn render_cycles_text(payload: &CyclesOutput, w: &mut dyn Write) -> std::io::Result<()> {
    for cycle in &payload.cycles {
        writeln!(
            w,
            "Reconcile ID: {}, Controller: {}",
            cycle.reconcile_id, cycle.controller_id
        )?;
        writeln!(w, "Readset:")?;
        for event in &cycle.readset {
            writeln!(w, "\t{event}")?;
        }
        writeln!(w, "Writeset:")?;
        for event in &cycle.writeset {
            writeln!(w, "\t{event}")?;
        }
    }
    Ok(())
}

fn render_cycles_pretty(payload: &CyclesOutput, w: &mut dyn Write) -> std::io::Result<()> {
    if payload.cycles.is_empty() {
        writeln!(w, "No reconcile cycles with writes found.")?;
        return Ok(());
    }

    writeln!(w, "Reconcile cycles ({})", payload.cycles.len())?;
    for cycle in &payload.cycles {
        writeln!(w)?;
        writeln!(w, "{}  controller {}", cycle.reconcile_id, cycle.controller_id)?;
        pretty_rule(w)?;
        writeln!(w, "  reads ({})", cycle.readset.len())?;
        for event in &cycle.readset {
            writeln!(w, "    {event}")?;
        }
        writeln!(w, "  writes ({})", cycle.writeset.len())?;
        for event in &cycle.writeset {
            let marker = if event.is_orphaned() { "  (orphan)" } else { "" };
            writeln!(w, "    {event}{marker}")?;
        }
    }
    Ok(())
}
