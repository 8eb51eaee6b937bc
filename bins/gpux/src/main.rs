//! GPU Index CLI Binary
//!
//! Entry point for computing the weighted GPU rental index, pushing it
//! through the change gate, and inspecting history.

use anyhow::{Context, Result};
use cli::{Cli, Commands};
use config::{generate_default_config, load_config, save_config, validate_config, IndexConfig};
use index_engine::{
    availability_summary, GateOutcome, IndexEngine, IndexPipeline, IndexResult, RateProvider,
};
use observability::{init_logging, init_metrics, LogFormat};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Exit code for a computation the change gate refused
const EXIT_REJECTED: u8 = 2;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse_args();

    let format: LogFormat = cli.log_format.as_str().parse().map_err(anyhow::Error::msg)?;
    init_logging("gpux", format)?;
    debug!(?cli, "CLI arguments parsed");

    if let Some(port) = cli.metrics_port {
        init_metrics(port)?;
    }

    match cli.command {
        Commands::Compute {
            config,
            input,
            output,
        } => {
            info!("Executing 'compute' command");
            compute_command(config, input, output).await
        }
        Commands::Push {
            config,
            report,
            force,
        } => {
            info!("Executing 'push' command");
            push_command(config, report, force).await
        }
        Commands::Run {
            config,
            input,
            output,
            force,
        } => {
            info!("Executing 'run' command");
            run_command(config, input, output, force).await
        }
        Commands::History { config, limit } => {
            info!("Executing 'history' command");
            history_command(config, limit).await
        }
        Commands::Validate { config } => {
            info!("Executing 'validate' command");
            validate_command(config).await
        }
        Commands::Init { output } => {
            info!("Executing 'init' command");
            init_command(output).await
        }
    }
}

/// Load configuration and refuse to continue on validation errors
fn load_valid_config(path: &Path) -> Result<Arc<IndexConfig>> {
    let config = load_config(path)?;
    let report = validate_config(&config);

    for warning in &report.warnings {
        warn!(field = %warning.field, message = %warning.message, "Configuration warning");
    }

    if !report.is_valid() {
        error!(
            error_count = report.errors.len(),
            "Configuration validation failed"
        );
        for err in &report.errors {
            error!("{}", err);
        }
        anyhow::bail!("Invalid configuration: {:?}", path);
    }

    Ok(Arc::new(config))
}

async fn pipeline(config: Arc<IndexConfig>) -> Result<IndexPipeline> {
    let rates = RateProvider::from_config(&config.exchange_rate)?;
    let store = storage::open_store(&config.storage)
        .await
        .context("Failed to open history store")?;
    Ok(IndexPipeline::from_config(config, rates, store))
}

async fn compute_index(config: Arc<IndexConfig>, input: Option<PathBuf>) -> Result<IndexResult> {
    let input = input.unwrap_or_else(|| PathBuf::from(&config.ingest.input_dir));
    let reports = ingest::load_input(&input, &config.ingest.file_suffix)
        .with_context(|| format!("Failed to load price reports from {:?}", input))?;

    let rates = RateProvider::from_config(&config.exchange_rate)?;
    let engine = IndexEngine::new(config, rates);

    engine
        .compute(&reports)
        .await
        .context("Index computation failed")
}

fn write_report(result: &IndexResult, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
    }

    let json = serde_json::to_string_pretty(result)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write report: {:?}", path))?;

    info!(?path, "Report written");
    Ok(())
}

fn read_report(path: &Path) -> Result<IndexResult> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read report: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid report: {:?}", path))
}

fn print_result(result: &IndexResult) {
    println!("\n=== {} Weighted Index ===\n", result.gpu_model);
    println!("Index price:        ${:.2}/hr", result.final_index_price);
    println!(
        "Anchor component:   ${:.4}/hr ({} providers)",
        result.anchor_component, result.anchor_count
    );
    println!(
        "Long-tail component: ${:.4}/hr ({} providers)",
        result.long_tail_component, result.long_tail_count
    );

    if !result.anchor_details.is_empty() {
        println!("\nAnchors:");
        for detail in &result.anchor_details {
            println!(
                "  {:<10} list ${:.2} -> effective ${:.2} x {:.4} = ${:.4}",
                detail.anchor,
                detail.effective.original_price,
                detail.effective.blended_price,
                detail.applied_weight,
                detail.contribution
            );
        }
    }

    if !result.long_tail_details.is_empty() {
        println!("\nLong tail:");
        for detail in &result.long_tail_details {
            println!(
                "  {:<16} ${:.2} [{}] x {:.4} = ${:.4}",
                detail.provider_name,
                detail.price,
                detail.availability,
                detail.applied_weight,
                detail.contribution
            );
        }
    }

    let summary = availability_summary(result);
    let summary: Vec<String> = summary
        .iter()
        .map(|(level, count)| format!("{}={}", level, count))
        .collect();
    println!("\nAvailability: {}", summary.join(", "));

    if let Some(rate) = result.exchange_rate {
        println!("Exchange rate: {:.4} ({})", rate.rate, rate.origin);
    }
    println!();
}

fn print_outcome(outcome: &GateOutcome) -> ExitCode {
    match outcome {
        GateOutcome::Committed(meta) => {
            match meta.previous_price {
                Some(previous) => println!(
                    "[ok] Committed (previous ${:.2}, change {:+.2}%)",
                    previous, meta.change_percent
                ),
                None => println!("[ok] Committed (first observation)"),
            }
            if meta.override_applied {
                println!("[warn] Change gate overridden");
            }
            ExitCode::SUCCESS
        }
        GateOutcome::Rejected {
            new,
            last,
            change_percent,
        } => {
            println!(
                "[rejected] New price ${:.2} is {:+.2}% from last price ${:.2}",
                new, change_percent, last
            );
            println!("           Re-run with --force to commit anyway.");
            ExitCode::from(EXIT_REJECTED)
        }
    }
}

async fn compute_command(
    config_path: PathBuf,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<ExitCode> {
    let config = load_valid_config(&config_path)?;
    let output = output.unwrap_or_else(|| PathBuf::from(&config.ingest.report_output));

    let result = compute_index(config, input).await?;
    write_report(&result, &output)?;
    print_result(&result);
    println!("Report: {:?}", output);

    Ok(ExitCode::SUCCESS)
}

async fn push_command(
    config_path: PathBuf,
    report: Option<PathBuf>,
    force: bool,
) -> Result<ExitCode> {
    let config = load_valid_config(&config_path)?;
    let report = report.unwrap_or_else(|| PathBuf::from(&config.ingest.report_output));

    let result = read_report(&report)?;
    println!("Index price: ${:.2}/hr", result.final_index_price);

    let pipeline = pipeline(config).await?;
    let outcome = pipeline.push(&result, force).await?;
    Ok(print_outcome(&outcome))
}

async fn run_command(
    config_path: PathBuf,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    force: bool,
) -> Result<ExitCode> {
    let config = load_valid_config(&config_path)?;
    let output = output.unwrap_or_else(|| PathBuf::from(&config.ingest.report_output));
    let input = input.unwrap_or_else(|| PathBuf::from(&config.ingest.input_dir));

    let reports = ingest::load_input(&input, &config.ingest.file_suffix)
        .with_context(|| format!("Failed to load price reports from {:?}", input))?;

    let pipeline = pipeline(config).await?;
    let outcome = pipeline
        .run(&reports, force)
        .await
        .context("Index run failed")?;

    write_report(&outcome.result, &output)?;
    print_result(&outcome.result);
    Ok(print_outcome(&outcome.gate))
}

async fn history_command(config_path: PathBuf, limit: usize) -> Result<ExitCode> {
    let config = load_valid_config(&config_path)?;
    let pipeline = pipeline(config).await?;
    let records = pipeline.history(limit).await?;

    if records.is_empty() {
        println!("No committed index values.");
        return Ok(ExitCode::SUCCESS);
    }

    println!("\n=== Index History (newest first) ===\n");
    for record in &records {
        let flag = match (record.validation_passed, record.override_applied) {
            (_, true) => "override",
            (true, false) => "ok",
            (false, false) => "failed",
        };
        println!(
            "  {}  {:<6} ${:>7.2}  {:+7.2}%  [{}]",
            record.recorded_at.format("%Y-%m-%d %H:%M:%S"),
            record.gpu_model,
            record.index_price,
            record.change_percent,
            flag
        );
    }
    println!();

    Ok(ExitCode::SUCCESS)
}

async fn validate_command(config_path: PathBuf) -> Result<ExitCode> {
    info!(path = ?config_path, "Validating configuration");

    let config = match load_config(&config_path) {
        Ok(c) => c,
        Err(e) => {
            error!(%e, "Failed to load configuration");
            anyhow::bail!(e);
        }
    };

    let report = validate_config(&config);

    println!("\n=== Configuration Validation Report ===\n");

    if !report.warnings.is_empty() {
        println!("Warnings ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("  [warn] [{}] {}", warning.field, warning.message);
        }
        println!();
    }

    if !report.errors.is_empty() {
        println!("Errors ({}):", report.errors.len());
        for err in &report.errors {
            println!("  [error] {}", err);
        }
        println!();
        anyhow::bail!("Configuration validation failed");
    }

    println!("[ok] Configuration is valid!");
    println!();
    println!("GPU model: {}", config.index.gpu_model);
    println!(
        "Cohort shares: anchor {:.2} / long tail {:.2}",
        config.index.anchor_share, config.index.long_tail_share
    );
    println!(
        "Anchors: {}",
        config
            .anchors
            .iter()
            .map(|a| a.id.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("Gate threshold: ±{}%", config.gate.max_change_percent);
    println!("History backend: {:?}", config.storage.backend);

    Ok(ExitCode::SUCCESS)
}

async fn init_command(output_path: PathBuf) -> Result<ExitCode> {
    info!(?output_path, "Initializing new configuration file");

    let config = generate_default_config();

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
    }

    save_config(&config, &output_path)?;

    println!("[ok] Configuration file created successfully!");
    println!();
    println!("Location: {:?}", output_path);
    println!();
    println!("Next steps:");
    println!("  1. Adjust anchors, weights and the gate threshold");
    println!("  2. Set GPU_INDEX_HISTORY or storage.path for the history file");
    println!(
        "  3. Run 'gpux validate --config {:?}' to check configuration",
        output_path
    );
    println!(
        "  4. Run 'gpux run --config {:?} --input <collector dir>' to compute and commit",
        output_path
    );

    Ok(ExitCode::SUCCESS)
}
