use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use std::path::Path;
use subhound::output::ReportWriter;
use subhound::{config, utils, Args, Engine};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let mut config = config::load_config(args.config_path.as_deref())?;
    config.output.prefix = args.output.clone();
    if let Some(dir) = &args.reports_dir {
        config.output.directory = dir.clone();
    }

    let domains = utils::read_domains(&args.file)
        .with_context(|| format!("Failed to read domains from {}", args.file.display()))?;

    let (mut report, report_path) =
        ReportWriter::create(Path::new(&config.output.directory), &config.output.prefix)?;

    let engine = Engine::new(&config)?;

    let progress = ProgressBar::new(domains.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner} Processing domains [{bar:40}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    let stats = engine.run(&domains, &mut report, &progress).await?;
    progress.finish_and_clear();
    report.finish()?;

    info!(
        "Processed {} domains: {} rows ({} resolved, {} unresolved, {} discovery errors) in {:.2}s",
        stats.domains,
        stats.rows_written,
        stats.resolved,
        stats.unresolved,
        stats.discovery_errors,
        stats.duration.as_secs_f64()
    );
    info!("Report written to {}", report_path.display());

    Ok(())
}
