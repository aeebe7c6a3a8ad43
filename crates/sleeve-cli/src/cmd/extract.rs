//! `sleeve extract`: pull instrumentation records out of a raw log.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, ValueEnum};

use super::load_config;
use crate::extract::{ExtractedLog, split_log};
use crate::output::{OutputMode, pretty_section, render_mode};

/// Which records to print.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Stream {
    #[default]
    All,
    Events,
    Versions,
}

/// Arguments for `sleeve extract`.
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Raw controller log.
    pub log: PathBuf,

    /// Only print one kind of record.
    #[arg(long, value_enum, default_value_t = Stream::All)]
    pub stream: Stream,
}

/// Execute `sleeve extract`.
pub fn run_extract(
    args: &ExtractArgs,
    output: OutputMode,
    project_root: &Path,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    let config = load_config(project_root, config_path, output)?;
    let content = fs::read_to_string(&args.log)
        .with_context(|| format!("Failed to read {}", args.log.display()))?;

    let mut extracted = split_log(&content, &config.extract);
    match args.stream {
        Stream::All => {}
        Stream::Events => extracted.versions.clear(),
        Stream::Versions => extracted.events.clear(),
    }

    render_mode(output, &extracted, render_extract_text, render_extract_pretty)
}

/// One record per line, ready to feed back in as `--events`/`--versions`.
fn render_extract_text(extracted: &ExtractedLog, w: &mut dyn Write) -> std::io::Result<()> {
    for line in extracted.event_lines().chain(extracted.version_lines()) {
        writeln!(w, "{line}")?;
    }
    Ok(())
}

fn render_extract_pretty(extracted: &ExtractedLog, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, &format!("Controller operations ({})", extracted.events.len()))?;
    for line in &extracted.events {
        writeln!(w, "  {line}")?;
    }
    writeln!(w)?;
    pretty_section(w, &format!("Object versions ({})", extracted.versions.len()))?;
    for line in &extracted.versions {
        writeln!(w, "  {line}")?;
    }
    if extracted.dropped > 0 {
        writeln!(w, "\n{} tagged lines of unknown type dropped", extracted.dropped)?;
    }
    Ok(())
}
