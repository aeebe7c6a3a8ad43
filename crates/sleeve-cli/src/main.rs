#![forbid(unsafe_code)]

mod cmd;
mod extract;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use output::OutputMode;
use std::env;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "sleeve",
    author,
    version,
    about = "sleeve: causal read/write correlation for reconciler logs",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format.
    #[arg(long, value_enum, global = true)]
    format: Option<OutputMode>,

    /// Emit JSON output (same as `--format json`).
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Config file to use instead of `.sleeve/config.toml`.
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Derive the output mode from flags.
    fn output_mode(&self) -> OutputMode {
        output::resolve_output_mode(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Build the causal read/write graph",
        long_about = "Correlate controller operations into reconcile cycles and emit the causal graph: \
                      one node per object state read or written, one edge from every read to every write \
                      of the same cycle.",
        after_help = "EXAMPLES:\n    # From a raw controller log\n    sleeve graph --log controller.log\n\n    # From extracted records\n    sleeve graph --events ops.jsonl --versions versions.jsonl\n\n    # Emit machine-readable output\n    sleeve graph --log controller.log --json"
    )]
    Graph(cmd::graph::GraphArgs),

    #[command(
        about = "Show readsets and writesets per reconcile cycle",
        after_help = "EXAMPLES:\n    # Cycles that wrote something\n    sleeve cycles --events ops.jsonl\n\n    # Include read-only cycles\n    sleeve cycles --events ops.jsonl --all"
    )]
    Cycles(cmd::cycles::CyclesArgs),

    #[command(
        about = "List object version snapshots",
        after_help = "EXAMPLES:\n    sleeve versions --versions versions.jsonl\n    sleeve versions --log controller.log --json"
    )]
    Versions(cmd::versions::VersionsArgs),

    #[command(
        about = "Extract instrumentation records from a raw log",
        after_help = "EXAMPLES:\n    # Split a log into operation records\n    sleeve extract controller.log --stream events > ops.jsonl"
    )]
    Extract(cmd::extract::ExtractArgs),

    #[command(about = "Generate shell completions")]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("SLEEVE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "sleeve=debug,info"
        } else {
            "sleeve=info,warn"
        })
    });

    let format = env::var("SLEEVE_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let project_root = env::current_dir()?;
    let output = cli.output_mode();
    let config_path = cli.config.as_deref();
    debug!(?output, root = %project_root.display(), "starting");

    match cli.command {
        Commands::Graph(ref args) => {
            cmd::graph::run_graph(args, output, &project_root, config_path)
        }
        Commands::Cycles(ref args) => {
            cmd::cycles::run_cycles(args, output, &project_root, config_path)
        }
        Commands::Versions(ref args) => {
            cmd::versions::run_versions(args, output, &project_root, config_path)
        }
        Commands::Extract(ref args) => {
            cmd::extract::run_extract(args, output, &project_root, config_path)
        }
        Commands::Completions(ref args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}
