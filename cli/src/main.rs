//! CLI entrypoint for simbatch
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use colored::Colorize;
use simbatch_application::{
    BatchEventLogger, BatchProgressNotifier, BatchStore, ContinuationRunner, NoEventLogger,
    NoProgress, QueryBatchesUseCase, RunBatchUseCase, SchedulerParams, TaskScheduler,
    TextGenerator,
};
use simbatch_domain::{BatchId, BatchSpec, BatchStatus, OutputFormat};
use simbatch_infrastructure::{
    ConfigLoader, DryRunGenerator, FileBatchStore, FileConfig, HttpTextGenerator,
    InMemoryBatchStore, JsonlEventLogger, RetryingGenerator, StorageBackend, load_batch_spec,
};
use simbatch_presentation::{Cli, Command, ConsoleFormatter, ProgressReporter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Settings of a `run` invocation after merging CLI flags and config
struct RunOptions {
    format: OutputFormat,
    quiet: bool,
    detach: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        ConfigLoader::print_config_sources();
        return Ok(());
    }

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };

    // Keep the guard alive so the file writer flushes on exit
    let _log_guard = init_tracing(cli.verbose, config.logging.log_dir.as_deref());
    info!("Starting simbatch");

    let issues = config.validate();
    for issue in &issues {
        if issue.is_error() {
            eprintln!("{} {}", "error:".red().bold(), issue.message);
        } else {
            warn!("{}", issue.message);
        }
    }
    if issues.iter().any(|i| i.is_error()) {
        bail!("Invalid configuration");
    }

    if !config.output.color {
        colored::control::set_override(false);
    }

    let format: OutputFormat = cli
        .output
        .map(Into::into)
        .or(config.output.format)
        .unwrap_or_default();

    let Some(command) = cli.command else {
        bail!("No command given. Run `simbatch --help` for usage.");
    };

    match command {
        Command::Run {
            spec,
            concurrency,
            dry_run,
            detach,
            seed,
        } => {
            let mut spec = load_batch_spec(&spec)?;
            if let Some(seed) = seed {
                spec = spec.with_seed(seed);
            }

            let mut params = config.scheduler_params();
            if let Some(p) = concurrency {
                params = params.with_max_concurrency(p);
            }

            let options = RunOptions {
                format,
                quiet: cli.quiet,
                detach,
            };

            if dry_run {
                info!("Dry run: offline generator, in-memory store");
                let generator = DryRunGenerator::new().with_latency(Duration::from_millis(50));
                let store = Arc::new(InMemoryBatchStore::new());
                run_batch(generator, store, spec, params, &config, options).await
            } else {
                let endpoint = config
                    .generator
                    .endpoint
                    .clone()
                    .context("generator.endpoint is not configured (or use --dry-run)")?;
                let policy = config.generator.retry_policy();
                let timeout = Duration::from_secs(config.generator.timeout_secs);
                let http = HttpTextGenerator::new(endpoint, timeout)?;
                let generator = RetryingGenerator::new(http, policy);

                match config.storage.parse_backend().0 {
                    StorageBackend::File => {
                        let store = Arc::new(file_store(&config));
                        run_batch(generator, store, spec, params, &config, options).await
                    }
                    StorageBackend::Memory => {
                        let store = Arc::new(InMemoryBatchStore::new());
                        run_batch(generator, store, spec, params, &config, options).await
                    }
                }
            }
        }
        Command::Status { batch_id } => {
            show_status(&queries(&config), &BatchId::new(batch_id), format).await
        }
        Command::Results {
            batch_id,
            failures_only,
        } => {
            show_results(
                &queries(&config),
                &BatchId::new(batch_id),
                failures_only,
                format,
            )
            .await
        }
        Command::List => show_list(&queries(&config), format).await,
    }
}

/// Initialize logging based on verbosity level; `RUST_LOG` wins when set.
///
/// With `log_dir`, records are also written to a daily-rotated file.
fn init_tracing(verbose: u8, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let console = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "simbatch.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .init();
            None
        }
    }
}

fn file_store(config: &FileConfig) -> FileBatchStore {
    let dir: PathBuf = config.storage.resolved_data_dir();
    info!("Using batch store at {}", dir.display());
    FileBatchStore::new(dir)
}

/// Status and results are always read from the file store; a memory store
/// does not outlive the process that ran the batch.
fn queries(config: &FileConfig) -> QueryBatchesUseCase<FileBatchStore> {
    if config.storage.parse_backend().0 == StorageBackend::Memory {
        warn!("storage.backend is 'memory'; reading batches from the file store instead");
    }
    QueryBatchesUseCase::new(Arc::new(file_store(config)))
}

fn event_logger(config: &FileConfig) -> Arc<dyn BatchEventLogger> {
    match config
        .logging
        .event_log
        .as_ref()
        .and_then(JsonlEventLogger::new)
    {
        Some(logger) => {
            info!("Writing batch events to {}", logger.path().display());
            Arc::new(logger)
        }
        None => Arc::new(NoEventLogger),
    }
}

async fn run_batch<G, S>(
    generator: G,
    store: Arc<S>,
    spec: BatchSpec,
    params: SchedulerParams,
    config: &FileConfig,
    options: RunOptions,
) -> Result<()>
where
    G: TextGenerator + 'static,
    S: BatchStore + 'static,
{
    let show_progress = !options.quiet && !options.detach && options.format != OutputFormat::Json;
    let progress: Arc<dyn BatchProgressNotifier> = if show_progress {
        Arc::new(ProgressReporter::new())
    } else {
        Arc::new(NoProgress)
    };
    let logger = event_logger(config);

    // === Dependency Injection ===
    let runner = ContinuationRunner::new(Arc::new(generator))
        .with_turn_marker(params.turn_marker.clone())
        .with_progress(Arc::clone(&progress))
        .with_event_logger(Arc::clone(&logger));
    let scheduler = Arc::new(TaskScheduler::from_params(Arc::new(runner), &params));
    let use_case = RunBatchUseCase::new(scheduler, store)
        .with_max_tasks(params.max_tasks)
        .with_progress(progress)
        .with_event_logger(logger);

    let submission = use_case.submit(spec).await?;
    let batch_id = submission.batch_id.clone();

    if options.detach {
        println!("{}", batch_id);
    } else if show_progress {
        println!("Submitted batch {}", batch_id);
    }

    let status = tokio::select! {
        result = submission.wait() => result?,
        _ = tokio::signal::ctrl_c() => {
            bail!("Interrupted; batch {} was left unfinished", batch_id);
        }
    };

    if options.detach {
        return Ok(());
    }

    let batch = use_case.get_batch(&batch_id).await?;
    let output = match options.format {
        OutputFormat::Json => ConsoleFormatter::format_json(&batch),
        OutputFormat::Summary => ConsoleFormatter::format_batch(&batch),
        OutputFormat::Full => format!(
            "{}{}",
            ConsoleFormatter::format_batch(&batch),
            ConsoleFormatter::format_results(batch.results_by_sequence(), true)
        ),
    };
    println!("{}", output);

    if status == BatchStatus::Failed {
        bail!("Batch {} failed", batch_id);
    }
    Ok(())
}

async fn show_status<S: BatchStore + 'static>(
    queries: &QueryBatchesUseCase<S>,
    batch_id: &BatchId,
    format: OutputFormat,
) -> Result<()> {
    let batch = queries.get_batch(batch_id).await?;
    let output = match format {
        OutputFormat::Json => ConsoleFormatter::format_json(&batch),
        OutputFormat::Summary => ConsoleFormatter::format_batch(&batch),
        OutputFormat::Full => format!(
            "{}{}",
            ConsoleFormatter::format_batch(&batch),
            ConsoleFormatter::format_results(batch.results_by_sequence(), false)
        ),
    };
    println!("{}", output);
    Ok(())
}

async fn show_results<S: BatchStore + 'static>(
    queries: &QueryBatchesUseCase<S>,
    batch_id: &BatchId,
    failures_only: bool,
    format: OutputFormat,
) -> Result<()> {
    let results = if failures_only {
        queries.list_failures(batch_id).await?
    } else {
        queries.list_task_results(batch_id).await?
    };
    let output = match format {
        OutputFormat::Json => ConsoleFormatter::format_json(&results),
        other => ConsoleFormatter::format_results(&results, other == OutputFormat::Full),
    };
    println!("{}", output);
    Ok(())
}

async fn show_list<S: BatchStore + 'static>(
    queries: &QueryBatchesUseCase<S>,
    format: OutputFormat,
) -> Result<()> {
    let batches = queries.list_batches().await?;
    let output = match format {
        OutputFormat::Json => ConsoleFormatter::format_json(&batches),
        _ => ConsoleFormatter::format_batch_list(&batches),
    };
    println!("{}", output);
    Ok(())
}
