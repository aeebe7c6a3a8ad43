//! `sleeve versions`: object version catalog.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use clap::Args;
use serde::Serialize;
use sleeve_core::Diagnostics;
use sleeve_core::catalog::VersionCatalog;

use super::input::InputArgs;
use super::load_config;
use crate::output::{CliError, OutputMode, render, render_error};

/// Arguments for `sleeve versions`.
#[derive(Args, Debug, Default)]
pub struct VersionsArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Debug, Serialize)]
struct VersionEntry {
    id: String,
    object_id: String,
    version: String,
    status: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct VersionsOutput {
    versions: Vec<VersionEntry>,
    skipped: usize,
    diagnostics: Diagnostics,
}

/// Execute `sleeve versions`.
pub fn run_versions(
    args: &VersionsArgs,
    output: OutputMode,
    project_root: &Path,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    let config = load_config(project_root, config_path, output)?;
    if !args.input.has_versions() {
        let msg = "no version input: pass --log or --versions";
        render_error(output, &CliError::new(msg))?;
        anyhow::bail!("{msg}");
    }
    let inputs = args.input.load(&config)?;

    let batch = VersionCatalog::from_lines(inputs.version_lines(), &config);
    let versions = batch
        .catalog
        .iter()
        .map(|(key, version)| VersionEntry {
            id: key.to_string(),
            object_id: version.object_id.clone(),
            version: version.version.clone(),
            status: batch.catalog.status_conditions(version),
        })
        .collect();
    let payload = VersionsOutput {
        versions,
        skipped: batch.skipped,
        diagnostics: batch.diagnostics,
    };

    render(output, &payload, render_versions_human)
}

fn render_versions_human(payload: &VersionsOutput, w: &mut dyn Write) -> std::io::Result<()> {
    if payload.versions.is_empty() {
        writeln!(w, "No version snapshots found.")?;
    }
    for entry in &payload.versions {
        write!(w, "{}  {}@{}", entry.id, entry.object_id, entry.version)?;
        for (name, value) in &entry.status {
            write!(w, "  {name}={value}")?;
        }
        writeln!(w)?;
    }
    if payload.skipped > 0 {
        writeln!(w, "({} records skipped)", payload.skipped)?;
    }
    Ok(())
}
