use clap::Args;
use clap_complete::{Shell, generate};

/// Arguments for `sleeve completions`.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate the completion script for.
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Write the completion script for `command` to stdout.
pub fn run_completions(shell: Shell, command: &mut clap::Command) -> anyhow::Result<()> {
    let bin_name = command.get_name().to_string();
    generate(shell, command, bin_name, &mut std::io::stdout().lock());
    Ok(())
}
