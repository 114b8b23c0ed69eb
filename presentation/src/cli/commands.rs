//! CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for batch reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Status and counts only
    Summary,
    /// Status, counts and every task's content
    Full,
    /// JSON output
    Json,
}

impl From<OutputFormat> for simbatch_domain::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Summary => Self::Summary,
            OutputFormat::Full => Self::Full,
            OutputFormat::Json => Self::Json,
        }
    }
}

/// CLI arguments for simbatch
#[derive(Parser, Debug)]
#[command(name = "simbatch")]
#[command(author, version, about = "Batch simulation orchestrator")]
#[command(long_about = r#"
simbatch runs batches of multi-entity simulations against a text generation
service.

A batch spec names a pool of entities and asks for N distinct combinations of
k entities. Each combination becomes a task that runs R rounds of T turns,
every round continuing where the previous one stopped. Tasks run on a bounded
worker pool and each result is stored as soon as it is ready.

Configuration files are loaded from (in priority order):
1. SIMBATCH_* environment variables (e.g. SIMBATCH_SCHEDULER__MAX_CONCURRENCY)
2. --config <path>     Explicit config file
3. ./simbatch.toml     Project-level config
4. ~/.config/simbatch/config.toml   Global config

Example:
  simbatch run tavern.toml
  simbatch run tavern.toml --dry-run -p 4
  simbatch status 1f2e3d4c-...
  simbatch results 1f2e3d4c-... --failures-only
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Output format (defaults to the [output] config, then "summary")
    #[arg(short, long, value_enum, global = true)]
    pub output: Option<OutputFormat>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Submit a batch from a .toml or .json spec file and run it
    Run {
        /// Batch spec file
        spec: PathBuf,

        /// Tasks allowed to run at once (overrides scheduler.max_concurrency)
        #[arg(short = 'p', long, value_name = "N")]
        concurrency: Option<usize>,

        /// Use the offline generator and an in-memory store
        #[arg(long)]
        dry_run: bool,

        /// Print the batch ID right away and run without progress output
        #[arg(long)]
        detach: bool,

        /// Sampling seed (overrides the spec's seed)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show status and task counts of a batch
    Status {
        /// Batch ID as printed by `run`
        batch_id: String,
    },

    /// Show the task results of a batch in sequence order
    Results {
        /// Batch ID as printed by `run`
        batch_id: String,

        /// Only show failed tasks
        #[arg(long)]
        failures_only: bool,
    },

    /// List known batches, newest first
    List,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::parse_from([
            "simbatch", "-vv", "run", "spec.toml", "-p", "4", "--dry-run", "--output", "json",
        ]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.output, Some(OutputFormat::Json));
        match cli.command {
            Some(Command::Run {
                spec,
                concurrency,
                dry_run,
                detach,
                seed,
            }) => {
                assert_eq!(spec, PathBuf::from("spec.toml"));
                assert_eq!(concurrency, Some(4));
                assert!(dry_run);
                assert!(!detach);
                assert_eq!(seed, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_results() {
        let cli = Cli::parse_from(["simbatch", "results", "abc", "--failures-only"]);
        assert!(matches!(
            cli.command,
            Some(Command::Results { ref batch_id, failures_only: true }) if batch_id == "abc"
        ));
    }

    #[test]
    fn test_show_config_without_command() {
        let cli = Cli::parse_from(["simbatch", "--show-config"]);
        assert!(cli.show_config);
        assert!(cli.command.is_none());
    }
}
