//! rlbatch - sequential RL experiment batches and cross-run analysis
//!
//! ## Commands
//!
//! - `run`: train every job of a batch file, then build the comparison report
//! - `report`: rebuild the comparison report from existing log stores
//! - `export`: write one scalar series of a run to CSV
//! - `summarize`: print the summary statistics of one run
//! - `init`: write a starter batch file

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};

use rlbatch_core::{
    build_report, export_scalars, render_console_summary, summarize, BatchConfig,
    JsonlLogReader, ReportRequest, RunRef, DEFAULT_BATCH_TOML,
};
use rlbatch_runner::{BatchOrchestrator, ConsoleSink, JobRunner, StdoutSink, TrainerCommand};

const DEFAULT_BATCH_FILE: &str = "rlbatch.toml";

#[derive(Parser)]
#[command(name = "rlbatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run RL training batches and compare their results", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every job of a batch file in order, then report
    Run {
        /// Batch file
        #[arg(env = "RLBATCH_BATCH", default_value = DEFAULT_BATCH_FILE)]
        batch: PathBuf,

        /// Seconds to wait between jobs (overrides the batch file)
        #[arg(long)]
        delay_secs: Option<u64>,

        /// Directory for the report and plots (overrides the batch file)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip the comparison report after the batch
        #[arg(long)]
        no_report: bool,
    },

    /// Build the comparison report from the log stores of a batch
    Report {
        /// Batch file
        #[arg(env = "RLBATCH_BATCH", default_value = DEFAULT_BATCH_FILE)]
        batch: PathBuf,

        /// Directory for the report and plots (overrides the batch file)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export one scalar series to CSV
    Export {
        /// Log file or log directory of the run
        log_location: PathBuf,

        /// Scalar tag to export
        tag: String,

        /// CSV file to write
        output: PathBuf,
    },

    /// Print the summary statistics of one run
    Summarize {
        /// Log file or log directory of the run
        log_location: PathBuf,

        /// Scalar tag to summarize
        tag: String,

        /// Label shown for the run (default: the log location)
        #[arg(short, long)]
        label: Option<String>,

        /// Print the summary as JSON
        #[arg(long)]
        as_json: bool,
    },

    /// Write a starter batch file
    Init {
        /// Where to write the batch file
        #[arg(default_value = DEFAULT_BATCH_FILE)]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    rlbatch_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Run {
            batch,
            delay_secs,
            output,
            no_report,
        } => cmd_run(&batch, delay_secs, output.as_deref(), no_report).await,
        Commands::Report { batch, output } => cmd_report(&batch, output.as_deref()),
        Commands::Export {
            log_location,
            tag,
            output,
        } => cmd_export(&log_location, &tag, &output).map(|_| ()),
        Commands::Summarize {
            log_location,
            tag,
            label,
            as_json,
        } => cmd_summarize(&log_location, &tag, label.as_deref(), as_json),
        Commands::Init { path, force } => cmd_init(&path, force),
    }
}

fn load_batch(path: &Path) -> Result<BatchConfig> {
    BatchConfig::load(path).with_context(|| format!("Failed to load batch file {:?}", path))
}

/// Run a batch. Failed jobs are reported but do not fail the command.
async fn cmd_run(
    batch: &Path,
    delay_secs: Option<u64>,
    output: Option<&Path>,
    no_report: bool,
) -> Result<()> {
    let config = load_batch(batch)?;
    let metric_tags = config.metric_tags()?;
    let delay = delay_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.inter_job_delay());
    let descriptors = config.descriptors();

    info!(batch = ?batch, jobs = descriptors.len(), "Running batch");

    let sink: Arc<dyn ConsoleSink> = Arc::new(StdoutSink);
    let runner = JobRunner::new(TrainerCommand::from(&config.trainer), sink.clone());
    let orchestrator = BatchOrchestrator::new(runner, sink);

    let result = orchestrator.run_batch(&descriptors, delay).await;

    println!();
    for outcome in &result.outcomes {
        let status = if outcome.succeeded() { "✓" } else { "✗" };
        println!(
            "  {} {} ({:.2}s, exit code: {})",
            status,
            outcome.descriptor.display_name,
            outcome.duration.as_secs_f64(),
            outcome.exit_code()
        );
    }
    println!("Batch digest: {}", result.batch_digest);

    if no_report {
        return Ok(());
    }

    let output_dir = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.analysis_dir.clone());
    let report = orchestrator
        .report(&JsonlLogReader, &result, output_dir, metric_tags)
        .context("Failed to build comparison report")?;
    print!("{}", render_console_summary(&report.families));

    Ok(())
}

/// Report over every declared run, whether or not it was trained in this session.
fn cmd_report(batch: &Path, output: Option<&Path>) -> Result<()> {
    let config = load_batch(batch)?;
    let runs = config
        .descriptors()
        .into_iter()
        .map(|d| RunRef {
            label: d.display_name,
            agent_kind: d.agent_kind,
            log_location: d.log_dir,
        })
        .collect();

    let output_dir = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.analysis_dir.clone());
    let mut request = ReportRequest::new(runs, output_dir);
    request.metric_tags = config.metric_tags()?;
    request.batch_digest = Some(rlbatch_core::compute_batch_digest(&config.descriptors()));

    let report =
        build_report(&JsonlLogReader, &request).context("Failed to build comparison report")?;

    print!("{}", render_console_summary(&report.families));
    println!();
    println!("Report written to {}", report.report_path.display());
    for plot in &report.plot_paths {
        println!("Plot written to {}", plot.display());
    }
    println!("Results written to {}", report.results_path.display());

    Ok(())
}

/// Export a series and report how many rows were written.
fn cmd_export(log_location: &Path, tag: &str, output: &Path) -> Result<usize> {
    let rows = export_scalars(&JsonlLogReader, log_location, tag, output)
        .with_context(|| format!("Failed to export {tag} to {:?}", output))?;
    println!("{}", export_message(rows, output));
    Ok(rows)
}

fn export_message(rows: usize, output: &Path) -> String {
    format!("Exported {} rows to {}", rows, output.display())
}

fn cmd_summarize(log_location: &Path, tag: &str, label: Option<&str>, as_json: bool) -> Result<()> {
    let label = label
        .map(str::to_string)
        .unwrap_or_else(|| log_location.display().to_string());

    let Some(summary) = summarize(&JsonlLogReader, &label, log_location, tag) else {
        println!("{label}: no data available for `{tag}`");
        return Ok(());
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}:", summary.run_label);
        println!("  - max {tag}: {:.2}", summary.max_value);
        println!("  - final average {tag}: {:.2}", summary.trailing_average);
        println!("  - samples: {}", summary.sample_count);
    }
    Ok(())
}

fn cmd_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {:?}", parent))?;
    }
    std::fs::write(path, DEFAULT_BATCH_TOML)
        .with_context(|| format!("Failed to write {:?}", path))?;

    println!("Wrote batch file to {}", path.display());
    Ok(())
}
