use anyhow::{Context, Result};
use pipeflow::cli::commands::{ReporterArg, RunCommand, ValidateCommand};
use pipeflow::cli::output::*;
use pipeflow::cli::{Cli, Command};
use pipeflow::core::config::FlowConfig;
use pipeflow::execution::{Plumber, TracingListener};
use pipeflow::{Flow, PipeId, PipeResult, Value};
use std::sync::Arc;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Execute command
    match &cli.command {
        Command::Run(cmd) => run_flow(cmd)?,
        Command::Validate(cmd) => validate_flow(cmd)?,
    }

    Ok(())
}

fn run_flow(cmd: &RunCommand) -> Result<()> {
    let config = FlowConfig::from_file(&cmd.file).context("Failed to load flow config")?;

    println!("{} Loaded flow: {}", INFO, style(&config.name).bold());

    let (mut flow, roots) = config.build()?;

    // Seed root inputs
    if !cmd.input.is_empty() {
        let seed = seed_inputs(&cmd.input);
        for root in &roots {
            flow.attach_input(*root, seed.clone())?;
        }
        for (key, value) in &cmd.input {
            println!(
                "{} Input: {} = {}",
                INFO,
                style(key).cyan(),
                style(value).dim()
            );
        }
    }

    let mut runner = match Plumber::translate(&mut flow, &roots) {
        Ok(runner) => runner,
        Err(err) => {
            println!("{} {} is not runnable", CROSS, style(&config.name).bold());
            println!("  {}", format_error(&err));
            error!("{}", err);
            std::process::exit(1);
        }
    };

    match cmd.reporter {
        ReporterArg::Console => runner.add_listener(Arc::new(ConsoleListener::stdout())),
        ReporterArg::Log => runner.add_listener(Arc::new(TracingListener)),
        ReporterArg::Quiet => {}
    }

    // Execute flow
    println!();
    match runner.run() {
        Ok(report) => {
            println!(
                "\n{} {} completed {}",
                CHECK,
                style(&config.name).bold(),
                style("successfully").green()
            );
            if cmd.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            Ok(())
        }
        Err(err) => {
            println!(
                "\n{} {} {}",
                CROSS,
                style(&config.name).bold(),
                style("failed").red()
            );
            println!("  {}", format_error(&err));
            error!("{}", err);
            std::process::exit(1);
        }
    }
}

fn validate_flow(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating flow...", INFO);

    let built = FlowConfig::from_file(&cmd.file)
        .and_then(|config| config.build().map(|(flow, roots)| (config, flow, roots)));
    let (config, flow, roots) = match built {
        Ok(built) => built,
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(format!("{:#}", e)).red());
            std::process::exit(1);
        }
    };

    match Plumber::validate(&flow, &roots) {
        Ok(order) => {
            println!("{} Flow configuration is valid!", CHECK);
            println!("  Name: {}", style(&config.name).bold());
            println!("  Pipes: {}", style(flow.len()).cyan());
            println!("  Roots: {}", style(names(&flow, &roots)?.join(", ")).cyan());
            println!("  Order: {}", names(&flow, &order)?.join(" -> "));

            if order.len() < flow.len() {
                println!(
                    "{}{} pipe(s) are not reachable from the roots and will not run",
                    WARN,
                    flow.len() - order.len()
                );
            }

            if cmd.dot {
                println!("\n{}", Plumber::to_dot(&flow, &roots)?);
            }

            if cmd.json {
                println!("\n{}", serde_json::to_string_pretty(&config)?);
            }
            Ok(())
        }
        Err(err) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", format_error(&err));
            std::process::exit(1);
        }
    }
}

/// Parse `--input` values as YAML scalars, falling back to plain text
fn seed_inputs(pairs: &[(String, String)]) -> PipeResult {
    pairs
        .iter()
        .map(|(key, raw)| {
            let value = serde_yaml::from_str::<serde_yaml::Value>(raw)
                .map(Value::from)
                .unwrap_or_else(|_| Value::from(raw.as_str()));
            (key.clone(), value)
        })
        .collect()
}

fn names(flow: &Flow, ids: &[PipeId]) -> Result<Vec<String>> {
    ids.iter()
        .map(|id| Ok(flow.name(*id)?.to_string()))
        .collect()
}
