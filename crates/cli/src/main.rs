//! `docveil`: extract document fields, match them to a schema and redact them.

mod args;
mod input;
mod report;

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use docveil_core::{JobResult, Pipeline, PipelineConfig, PipelineJob};
use tracing_subscriber::EnvFilter;

use crate::args::{Cli, Command, JobArgs, RedactArgs};
use crate::report::JobReport;

fn init_logging(json: bool, verbose: u8) {
    let fallback = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Run `job` with Ctrl-C wired to cancellation, logging progress as it arrives.
async fn run_job(config: PipelineConfig, job: PipelineJob) -> Result<JobResult> {
    let pipeline = Arc::new(Pipeline::from_config(config).context("invalid pipeline configuration")?);
    let mut handle = pipeline.start(job);

    let cancel = handle.cancellation_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, finishing pages in flight");
            cancel.cancel();
        }
    });

    while let Some(progress) = handle.next_progress().await {
        tracing::debug!(
            status = %progress.status,
            processed = progress.processed_pages,
            total = progress.total_pages,
            "progress"
        );
    }
    interrupt.abort();

    Ok(handle.wait().await?)
}

fn write_report(report: &JobReport<'_>, path: Option<&Path>) -> Result<()> {
    let json = report.to_json().context("failed to serialize report")?;
    match path {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("failed to write report {}", path.display()))?,
        None => println!("{}", json),
    }
    Ok(())
}

fn prepare(config: &mut PipelineConfig, args: &JobArgs) -> Result<PipelineJob> {
    args.apply_to(config);
    let document = input::load_document(&args.input)?;
    let elements = input::load_schema(&args.schema)?;
    tracing::info!(
        document = document.name.as_deref().unwrap_or(""),
        mime = document.mime.as_str(),
        elements = elements.len(),
        "starting job"
    );
    Ok(PipelineJob::new(document, elements))
}

fn finish(result: &JobResult, document: Option<&str>, report: Option<&Path>) -> Result<()> {
    write_report(&JobReport::new(document, result), report)?;
    if let Some(e) = &result.error {
        bail!("job {} ({}): {}", result.state, e.code(), e);
    }
    Ok(())
}

async fn extract(mut config: PipelineConfig, args: JobArgs) -> Result<()> {
    let job = prepare(&mut config, &args)?;
    let name = job.document.name.clone();

    let result = run_job(config, job).await?;
    finish(&result, name.as_deref(), args.report.as_deref())
}

async fn redact(mut config: PipelineConfig, args: RedactArgs) -> Result<()> {
    let mut job = prepare(&mut config, &args.job)?;
    if args.no_verify {
        config.verify = None;
    }
    for id in &args.select {
        job.selection.select(id.clone());
    }
    if let Some(path) = &args.regions {
        for region in input::load_regions(path)? {
            job.selection.add_region(region);
        }
    }
    job.auto_select = !args.no_auto_select;
    let job = job.rendered();
    let name = job.document.name.clone();

    let result = run_job(config, job).await?;
    if let Some(artifact) = &result.artifact {
        std::fs::write(&args.output, &artifact.bytes)
            .with_context(|| format!("failed to write {}", args.output.display()))?;
        tracing::info!(
            output = %args.output.display(),
            drawn = artifact.drawn(),
            entries = artifact.entries.len(),
            "redacted copy written"
        );
    }
    finish(&result, name.as_deref(), args.job.report.as_deref())?;

    if let Some(e) = &result.render_error {
        bail!("rendering failed ({}): {}", e.code(), e);
    }
    if let Some(verification) = result.verification.as_ref().filter(|v| !v.ok) {
        bail!(
            "verification failed: {}",
            verification.failures.join("; ")
        );
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = input::load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Extract(args) => extract(config, args).await,
        Command::Redact(args) => redact(config, args).await,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs, cli.verbose);
    tracing::info!("docveil v{}", env!("CARGO_PKG_VERSION"));

    run(cli).await
}
