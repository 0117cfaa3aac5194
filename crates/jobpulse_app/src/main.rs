mod cli;
mod report;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use jobpulse_core::RunOutcome;
use jobpulse_engine::{export_run, ExportOptions, FetchSettings, Pipeline, ReqwestPageClient};
use pulse_logging::{pulse_error, pulse_info, pulse_warn};
use tokio_util::sync::CancellationToken;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if !pulse_logging::initialize(cli.log.into(), cli.log_level()) {
        eprintln!("warning: logging could not be initialized");
    }

    match run(&cli).await {
        Ok(outcome) => match outcome {
            RunOutcome::Results | RunOutcome::NoMatches => ExitCode::SUCCESS,
            RunOutcome::AllSourcesFailed => ExitCode::from(2),
            RunOutcome::Cancelled => ExitCode::from(130),
        },
        Err(err) => {
            pulse_error!("{:#}", err);
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<RunOutcome> {
    let config = cli.pipeline_config()?;
    let validated = config.validate().context("invalid pipeline configuration")?;

    let client = ReqwestPageClient::new(FetchSettings::default())
        .context("building the HTTP client")?;
    let pipeline = Pipeline::new(Arc::new(client));

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            pulse_warn!("Interrupt received, finishing the current page");
            on_interrupt.cancel();
        }
    });

    let run = pipeline.run(&validated, &cancel).await;
    print!("{}", report::render(&run));

    if !cli.no_export {
        let summary = export_run(&cli.output_dir, &run, &ExportOptions::default())
            .with_context(|| format!("exporting to {}", cli.output_dir.display()))?;
        pulse_info!(
            "Exported {} rows to {:?}",
            summary.row_count,
            summary.csv_path
        );
        println!();
        println!("Wrote {} row(s) to {}", summary.row_count, summary.csv_path.display());
        if let Some(manifest) = &summary.manifest_path {
            println!("Run manifest: {}", manifest.display());
        }
    }

    Ok(run.summary.outcome())
}
