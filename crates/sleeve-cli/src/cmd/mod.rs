pub mod completions;
pub mod cycles;
pub mod extract;
pub mod graph;
pub mod input;
pub mod versions;

use std::path::Path;

use sleeve_core::config::{Config, resolve_config};
use sleeve_core::{Correlation, ErrorCode, correlate};

use crate::output::{CliError, OutputMode, render_error};
use input::{InputArgs, Inputs};

/// Resolve the effective config, rendering a config error before failing.
pub fn load_config(
    project_root: &Path,
    explicit: Option<&Path>,
    output: OutputMode,
) -> anyhow::Result<Config> {
    resolve_config(project_root, explicit).map_err(|err| {
        render_error(
            output,
            &CliError::with_code(ErrorCode::ConfigParseError, format!("{err:#}")),
        )
        .ok();
        err
    })
}

/// Load inputs that must include event records.
pub fn load_event_inputs(
    input: &InputArgs,
    config: &Config,
    output: OutputMode,
) -> anyhow::Result<Inputs> {
    if !input.has_events() {
        let msg = "no event input: pass --log or --events";
        render_error(output, &CliError::new(msg))?;
        anyhow::bail!("{msg}");
    }
    input.load(config)
}

/// Run the full pipeline. A cycle invariant violation is rendered and
/// returned as an error.
pub fn run_pipeline(
    inputs: &Inputs,
    config: &Config,
    output: OutputMode,
) -> anyhow::Result<Correlation> {
    match correlate(inputs.event_lines(), inputs.version_lines(), config) {
        Ok(correlation) => Ok(correlation),
        Err(err) => {
            let cli_error = CliError::from(&err);
            render_error(output, &cli_error)?;
            anyhow::bail!("{}", cli_error.message);
        }
    }
}
