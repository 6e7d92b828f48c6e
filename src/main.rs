use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use log::info;
use serde_json::{Value, json};
use std::fs;
use std::path::PathBuf;

mod cli;
mod config;

use cli::Cli;
use cli::commands::{Commands, SessionCommands};
use config::{Config, StorageBackend};
use iterloop::combinations::{cartesian_product, normalize_inputs};
use iterloop::domain::SinkOutput;
use iterloop::nodes::{IterationSink, IterationSource};
use iterloop::registry::LoopRegistry;
use iterloop::resubmit::LogResubmitter;
use iterloop::runner::LoopRunner;
use iterloop::storage::{JsonlStorage, Storage};

fn setup_logging(level: Option<&str>) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("iterloop")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("iterloop.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.unwrap_or("info")))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

/// Parse a JSON array of loop inputs.
fn parse_inputs(text: &str) -> Result<Vec<Value>> {
    match serde_json::from_str(text).context("Inputs are not valid JSON")? {
        Value::Array(items) => Ok(items),
        other => Err(eyre!("Inputs must be a JSON array, got {}", other)),
    }
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

fn run_application<S: Storage>(cli: &Cli, config: &Config, registry: LoopRegistry<S>) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        eprintln!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Combos { inputs } => handle_combos_command(inputs),
        Commands::Source { inputs, control, origin } => {
            handle_source_command(registry, inputs, control, origin.as_deref())
        }
        Commands::Sink {
            result,
            context,
            node_id,
        } => handle_sink_command(registry, result, context, node_id),
        Commands::Run { inputs } => handle_run_command(registry, inputs, config),
        Commands::Sessions { command } => handle_sessions_command(registry, command),
    }
}

fn handle_combos_command(inputs: &str) -> Result<()> {
    let inputs = parse_inputs(inputs)?;
    for combo in cartesian_product(&normalize_inputs(&inputs)) {
        print_json(&Value::Array(combo))?;
    }
    Ok(())
}

fn handle_source_command<S: Storage>(
    registry: LoopRegistry<S>,
    inputs: &str,
    control: &str,
    origin: Option<&str>,
) -> Result<()> {
    let inputs = parse_inputs(inputs)?;
    let mut source = IterationSource::new(registry);
    if let Some(origin) = origin {
        source = source.with_origin(origin);
    }
    let out = source.execute(&inputs, control);
    print_json(&json!({
        "item": out.item_value(),
        "context": out.context,
    }))
}

fn handle_sink_command<S: Storage>(registry: LoopRegistry<S>, result: &str, context: &str, node_id: &str) -> Result<()> {
    let result: Value = serde_json::from_str(result).context("Result is not valid JSON")?;
    let sink = IterationSink::new(registry, LogResubmitter);
    match sink.execute(result, context, node_id) {
        SinkOutput::Continue(request) => print_json(&json!({ "resubmit": request.control })),
        SinkOutput::Finished { results, status } => print_json(&json!({
            "status": status,
            "results": results,
        })),
    }
}

fn handle_run_command<S: Storage>(registry: LoopRegistry<S>, inputs: &str, config: &Config) -> Result<()> {
    let inputs = parse_inputs(inputs)?;
    let runner = LoopRunner::with_config(registry, (&config.runner).into());
    let report = runner
        .run(&inputs, |combo| Value::Array(combo.to_vec()))
        .context("Loop run failed")?;
    print_json(&json!({
        "loop_id": report.loop_id,
        "passes": report.passes,
        "resubmissions": report.resubmissions,
        "status": report.output.status(),
        "results": report.output.results(),
    }))
}

fn handle_sessions_command<S: Storage>(registry: LoopRegistry<S>, command: &SessionCommands) -> Result<()> {
    info!("Handling sessions command: {:?}", command);
    match command {
        SessionCommands::List => {
            let loops = registry.active_loops().context("Failed to list sessions")?;
            if loops.is_empty() {
                println!("{}", "No active loops".cyan());
            }
            for summary in loops {
                println!(
                    "{} total={} served={} received={} origin={}",
                    summary.loop_id.green(),
                    fmt_count(summary.total_iterations),
                    fmt_count(summary.current_index),
                    fmt_count(summary.received_count),
                    summary.origin_id.as_deref().unwrap_or("-"),
                );
            }
        }
        SessionCommands::Clear { loop_id } => {
            if registry.clear_loop(loop_id).context("Failed to clear loop")? {
                println!("{} {}", "Cleared:".green(), loop_id);
            } else {
                println!("{} {}", "Not found:".yellow(), loop_id);
            }
        }
        SessionCommands::Purge { older_than_secs } => {
            let purged = registry
                .purge_older_than(older_than_secs.saturating_mul(1000))
                .context("Failed to purge sessions")?;
            println!("{} {} loop(s)", "Purged".green(), purged.len());
        }
    }
    Ok(())
}

fn fmt_count(value: Option<usize>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(config.log_level.as_deref()).context("Failed to setup logging")?;
    info!("Starting with config from: {:?}", cli.config);

    let result = match config.storage.backend {
        StorageBackend::Memory => run_application(&cli, &config, LoopRegistry::shared()),
        StorageBackend::Jsonl => {
            let storage = JsonlStorage::new(&config.storage.dir)
                .with_context(|| format!("Failed to open session store at {}", config.storage.dir.display()))?;
            info!("Session store: {}", storage.base_path().display());
            run_application(&cli, &config, LoopRegistry::new(storage))
        }
    };
    result.context("Application failed")
}
