//! jetcorr CLI

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use jc_hist::{Archive, CorrectionProvider, CorrectionSet, NoCorrection, RawInput};
use jc_pipeline::{Corrections, PipelineOrchestrator, PipelineStep, StepStatus, Store};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "jetcorr")]
#[command(about = "jetcorr - corrections and jet shapes from jet-track correlations")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the correction pipeline
    Process {
        /// Run configuration (YAML, or JSON with a .json extension)
        #[arg(short, long)]
        config: PathBuf,

        /// Raw input (JSON source tables). When the configured start level is
        /// later than the mixed-event correction, an archive from a previous run.
        #[arg(short, long)]
        input: PathBuf,

        /// Output archive. The run report is written next to it as `<stem>.report.json`.
        #[arg(short, long)]
        output: PathBuf,

        /// Fragmentation-bias correction maps
        #[arg(long)]
        jff: Option<PathBuf>,

        /// Spillover correction maps
        #[arg(long)]
        spillover: Option<PathBuf>,

        /// Tracking residual correction maps
        #[arg(long)]
        tracking: Option<PathBuf>,

        /// Threads (0 = auto). Overrides the config value.
        #[arg(long)]
        threads: Option<usize>,
    },

    /// List the distributions stored in an archive
    List {
        /// Archive
        #[arg(short, long)]
        input: PathBuf,

        /// Only paths starting with this prefix
        #[arg(long, default_value = "")]
        prefix: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    match cli.command {
        Commands::Process { config, input, output, jff, spillover, tracking, threads } => {
            let corrections = Corrections {
                tracking: load_corrections(tracking.as_deref(), "tracking")?,
                spillover: load_corrections(spillover.as_deref(), "spillover")?,
                jff: load_corrections(jff.as_deref(), "fragmentation-bias")?,
            };
            cmd_process(&config, &input, &output, corrections, threads)
        }
        Commands::List { input, prefix } => cmd_list(&input, &prefix),
    }
}

fn load_corrections(path: Option<&Path>, what: &str) -> Result<Box<dyn CorrectionProvider>> {
    let Some(path) = path else {
        return Ok(Box::new(NoCorrection));
    };
    let set = CorrectionSet::load(path).with_context(|| format!("loading {what} corrections {}", path.display()))?;
    tracing::info!(path = %path.display(), entries = set.len(), "{what} corrections loaded");
    Ok(Box::new(set))
}

fn report_path(output: &Path) -> PathBuf {
    output.with_extension("report.json")
}

fn cmd_process(
    config: &Path,
    input: &Path,
    output: &Path,
    corrections: Corrections,
    threads: Option<usize>,
) -> Result<()> {
    let cfg = config::read_pipeline_config(config)?;
    let threads = threads.unwrap_or(cfg.threads);
    if threads > 0 {
        // Best-effort; if a global pool already exists, keep going.
        let _ = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global();
    }

    let orchestrator = PipelineOrchestrator::new(&cfg, corrections)?;
    let mut store;
    let report = if cfg.start_level == PipelineStep::MixedEventCorrection {
        tracing::info!(path = %input.display(), "loading raw input");
        let raw = RawInput::load(input).with_context(|| format!("loading raw input {}", input.display()))?;
        tracing::info!(tables = raw.tables.len(), "raw input loaded");
        store = Store::new();
        orchestrator.run(Some(&raw), &mut store)?
    } else {
        tracing::info!(path = %input.display(), start = %cfg.start_level, "resuming from archive");
        let archive = Archive::load(input).with_context(|| format!("loading archive {}", input.display()))?;
        store = Store::from_archive(&archive);
        orchestrator.run(None, &mut store)?
    };

    for step in &report.steps {
        match &step.status {
            StepStatus::Ran => tracing::info!(
                step = %step.step,
                produced = step.produced,
                unchanged = step.unchanged,
                skipped = step.skipped,
                "step done"
            ),
            StepStatus::Skipped { reason } => tracing::info!(step = %step.step, reason = %reason, "step skipped"),
        }
    }
    for mismatch in &report.mismatches {
        tracing::warn!("{mismatch}");
    }

    store.to_archive().save(output).with_context(|| format!("writing {}", output.display()))?;
    let report_file = report_path(output);
    report.save(&report_file).with_context(|| format!("writing {}", report_file.display()))?;
    tracing::info!(path = %output.display(), distributions = store.len(), "archive written");
    Ok(())
}

fn cmd_list(input: &Path, prefix: &str) -> Result<()> {
    let archive = Archive::load(input).with_context(|| format!("loading archive {}", input.display()))?;
    for path in archive.paths(prefix) {
        if let Some(d) = archive.read(path) {
            println!("{path}\t{}x{}", d.nx(), d.ny());
        }
    }
    Ok(())
}
