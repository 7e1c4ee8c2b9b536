use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::Output;
use crate::config::DnacompConfig;
use crate::files::{OutputDirectory, list_inputs};
use crate::parallel::{AggregateStats, CancellationToken, RunSummary, ShutdownStatus, TaskCoordinator};
use crate::strand::FileStatus;

/// Exit code used when Ctrl-C interrupts a run
pub const EXIT_INTERRUPTED: i32 = 130;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Directory of strand files (default: input.directory from config)
    #[arg(value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Directory for complement files (default: output.directory from config)
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Maximum worker threads (0 = grow with demand)
    #[arg(long)]
    pub max_threads: Option<usize>,

    /// Seconds to wait for tasks before cancelling them
    #[arg(long, value_name = "SECS")]
    pub graceful_timeout: Option<u64>,

    /// Seconds to wait after cancelling before giving up
    #[arg(long, value_name = "SECS")]
    pub forced_timeout: Option<u64>,

    /// Only process files matching these globs
    #[arg(long, value_delimiter = ',')]
    pub include: Vec<String>,

    /// Skip files matching these globs
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Report format
    #[arg(long, value_enum, default_value = "text")]
    pub format: ReportFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    /// Human-readable summary
    Text,
    /// The full run summary as JSON
    Json,
}

impl RunArgs {
    /// Config overrides for the flags that were given
    fn overrides(&self) -> serde_json::Value {
        let non_empty = |v: &Vec<String>| (!v.is_empty()).then(|| v.clone());
        json!({
            "input": {
                "directory": self.directory,
                "include": non_empty(&self.include),
                "exclude": non_empty(&self.exclude),
            },
            "output": { "directory": self.output_dir },
            "pool": {
                "max_threads": self.max_threads,
                "graceful_timeout_secs": self.graceful_timeout,
                "forced_timeout_secs": self.forced_timeout,
            }
        })
    }
}

pub async fn execute(args: RunArgs, config_path: Option<&str>, verbose: u8, quiet: bool, output: &Output) -> Result<()> {
    let config = DnacompConfig::load(config_path, Some(args.overrides()))?;
    crate::logging::init(&config.logging.level, verbose, quiet);
    config.validate()?;

    // Keep stdout clean for machine-readable output
    let chatty = args.format == ReportFormat::Text;

    let inputs = list_inputs(&config.input.directory, &config.input_filter())?;
    if chatty {
        output.info(&format!(
            "Processing {} files from {}",
            inputs.len(),
            config.input.directory.display()
        ));
    }

    let interrupt = CancellationToken::new();
    let ctrl_c = {
        let interrupt = interrupt.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupt.cancel();
            }
        })
    };

    let coordinator = TaskCoordinator::new(
        config.coordinator_config(),
        config.processor(),
        Arc::new(AggregateStats::new()),
    );
    let target = Arc::new(OutputDirectory::new(&config.output.directory, config.output.prefix.clone()));
    let run_interrupt = interrupt.clone();

    // The coordinator blocks on condition variables; keep it off the async workers
    let summary = tokio::task::spawn_blocking(move || coordinator.run(inputs, target, &run_interrupt))
        .await
        .context("Coordinator thread panicked")??;
    ctrl_c.abort();

    match args.format {
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        ReportFormat::Text => print_text_report(&summary, &config.output.directory, output),
    }

    match summary.status {
        ShutdownStatus::Completed | ShutdownStatus::CompletedAfterCancel => {}
        ShutdownStatus::DidNotTerminate => output.warning("Pool did not terminate; some files may be incomplete"),
        ShutdownStatus::Interrupted => {
            output.error("Interrupted; outstanding tasks were cancelled");
            std::process::exit(EXIT_INTERRUPTED);
        }
    }

    Ok(())
}

fn print_text_report(summary: &RunSummary, output_dir: &std::path::Path, output: &Output) {
    let stats = &summary.stats;

    output.header("Strand Statistics");
    output.summary_stats("Total strands", stats.total);
    output.summary_stats("Valid strands", stats.valid);
    output.summary_stats("Invalid strands", stats.invalid);
    output.key_value("Invalid lines", &format!("{:?}", stats.invalid_lines), false);

    output.blank_line();
    output.summary_stats("Files submitted", summary.files_submitted);
    output.summary_stats("Files completed", summary.completed().count());
    output.key_value("Output directory", &output_dir.display().to_string(), true);
    output.verbose(&format!(
        "{} workers, {} ms, pool {:?}",
        summary.workers_spawned, summary.elapsed_ms, summary.final_state
    ));

    for report in &summary.files {
        match &report.status {
            FileStatus::Completed => {}
            FileStatus::Cancelled => output.warning(&format!("{}: cancelled", report.input)),
            FileStatus::Failed(error) => output.warning(&format!("{}: {}", report.input, error)),
        }
    }

    match summary.status {
        ShutdownStatus::Completed if summary.failed().next().is_none() => output.success("All files processed"),
        ShutdownStatus::CompletedAfterCancel => output.warning("Graceful wait elapsed; running tasks were cancelled"),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: RunArgs,
    }

    #[test]
    fn test_overrides_only_include_given_flags() {
        let harness = Harness::parse_from(["dnacomp", "data", "--max-threads", "3", "--include", "*.txt,*.dna"]);
        let overrides = harness.args.overrides();

        assert_eq!(overrides["input"]["directory"], json!("data"));
        assert_eq!(overrides["input"]["include"], json!(["*.txt", "*.dna"]));
        assert!(overrides["input"]["exclude"].is_null());
        assert!(overrides["output"]["directory"].is_null());
        assert_eq!(overrides["pool"]["max_threads"], json!(3));
        assert!(overrides["pool"]["graceful_timeout_secs"].is_null());
    }

    #[test]
    fn test_default_format_is_text() {
        let harness = Harness::parse_from(["dnacomp"]);
        assert_eq!(harness.args.format, ReportFormat::Text);
        assert!(harness.args.directory.is_none());
    }
}
