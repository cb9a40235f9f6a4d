//! savagepot - dining savages CLI
//!
//! CLI entry point for running the cook and the savages and for inspecting
//! the events of past runs.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{CommandFactory, FromArgMatches};
use colored::*;
use eyre::{Context, Result};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use savagepot::audit::{audit_events, infer_capacity};
use savagepot::cli::{Cli, Command, OutputFormat, RunArgs, generate_after_help, validate_tribe};
use savagepot::config::Config;
use savagepot::engine::{Engine, RunReport};
use savagepot::events::{
    EventBus, EventKind, EventSink, PotEvent, Tee, TracingSink, list_runs, read_run_events, spawn_event_logger,
};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Can't log here yet, the subscriber isn't installed
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("savagepot")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("sp.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_thread_names(true)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cmd = Cli::command().after_help(generate_after_help());
    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    // Log level first, before the full config load can log anything
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Run(args) => {
            debug!("main: matched Run command");
            cmd_run(config, args).await
        }
        Command::Events { run_id, runs_dir } => {
            debug!(%run_id, ?runs_dir, "main: matched Events command");
            cmd_events(&resolve_runs_dir(&config, runs_dir), &run_id)
        }
        Command::Audit {
            run_id,
            capacity,
            runs_dir,
            format,
        } => {
            debug!(%run_id, ?capacity, ?runs_dir, ?format, "main: matched Audit command");
            cmd_audit(&resolve_runs_dir(&config, runs_dir), &run_id, capacity, format)
        }
        Command::Runs { runs_dir } => {
            debug!(?runs_dir, "main: matched Runs command");
            cmd_runs(&resolve_runs_dir(&config, runs_dir))
        }
    }
}

fn resolve_runs_dir(config: &Config, runs_dir: Option<PathBuf>) -> PathBuf {
    runs_dir.unwrap_or_else(|| config.events.runs_dir.clone())
}

/// Run the cook and the savages to the end of the configured mode
async fn cmd_run(mut config: Config, args: RunArgs) -> Result<()> {
    debug!(?args, "cmd_run: called");
    args.apply(&mut config);
    validate_tribe(config.pot.capacity, config.savages.count)?;

    let engine_config = config.engine_config();
    let mode = config.run_mode();
    let run_id = Uuid::now_v7().to_string();

    // Subscribe before the run starts; the bus itself only lives inside the
    // engine's sink so the channel closes once the engine is gone
    let bus = EventBus::new(config.events.channel_capacity);
    let logger_handle = if config.events.persist {
        debug!(runs_dir = ?config.events.runs_dir, %run_id, "cmd_run: persisting events");
        Some(spawn_event_logger(bus.subscribe(), &config.events.runs_dir, &run_id))
    } else {
        None
    };
    let echo_handle = if config.events.echo && args.format == OutputFormat::Text {
        Some(tokio::spawn(echo_events(bus.subscribe())))
    } else {
        None
    };

    let sinks: Vec<Arc<dyn EventSink>> = vec![Arc::new(TracingSink), Arc::new(bus)];
    let sink: Arc<dyn EventSink> = Arc::new(Tee::new(sinks));
    let engine = Engine::with_sink(engine_config, sink)?;
    let shutdown = engine.shutdown_handle();

    info!(%run_id, %mode, "cmd_run: starting engine");
    let mut run = tokio::task::spawn_blocking(move || engine.run(mode));
    let joined = tokio::select! {
        joined = &mut run => joined,
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => warn!("cmd_run: SIGINT received, cancelling run"),
                Err(e) => warn!(error = %e, "cmd_run: failed to listen for ctrl-c, cancelling run"),
            }
            shutdown.cancel();
            run.await
        }
    };
    let report = joined.context("Engine task failed")??;

    if let Some(handle) = echo_handle {
        handle.await.context("Event echo task failed")?;
    }
    let written = match logger_handle {
        Some(handle) => Some(handle.await.context("Event logger task failed")?),
        None => None,
    };
    debug!(?written, "cmd_run: event tasks finished");

    match args.format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "run_id": run_id,
                "report": report,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            print_report(&report);
            if let Some(written) = written {
                println!();
                println!("Run {} ({} events persisted)", run_id.bold(), written);
            }
        }
    }

    Ok(())
}

/// Print events as they arrive
async fn echo_events(mut rx: broadcast::Receiver<PotEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => println!("{}", paint(&event)),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(lagged = n, "echo_events: lagged behind, skipped events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn paint(event: &PotEvent) -> ColoredString {
    let line = event.to_string();
    match event.kind {
        EventKind::Bite => line.normal(),
        EventKind::RefillRequested => line.yellow(),
        EventKind::Refilled => line.green(),
        EventKind::RoundReset { .. } => line.cyan(),
    }
}

fn print_report(report: &RunReport) {
    println!();
    println!("Run Report");
    println!("----------");
    println!("Policy:         {}", report.policy);
    println!("Mode:           {}", report.mode);
    println!("Pot capacity:   {}", report.capacity);
    println!("Savages:        {}", report.savages);
    println!("Final servings: {}", report.final_servings);
    println!("Refills:        {}", report.refills);
    println!("Total bites:    {}", report.total_bites);
    if let Some(round) = report.round {
        println!("Round:          {}", round);
        println!(
            "Resets:         {} natural, {} forced",
            report.natural_resets, report.forced_resets
        );
    }
    println!("Elapsed:        {} ms", report.elapsed_ms);
    println!();
    println!("{:<10} {:>6}", "SAVAGE", "BITES");
    for (slot, bites) in report.bites_per_savage.iter().enumerate() {
        println!("{:<10} {:>6}", slot + 1, bites);
    }
    println!();
    if report.cancelled {
        println!("{} Run cancelled (spread {})", "⚠".yellow(), report.bite_spread());
    } else {
        println!("{} Run finished (spread {})", "✓".green(), report.bite_spread());
    }
}

/// Print the events of a past run
fn cmd_events(runs_dir: &Path, run_id: &str) -> Result<()> {
    debug!(?runs_dir, %run_id, "cmd_events: called");
    let entries = read_run_events(runs_dir, run_id)?;
    for entry in &entries {
        println!(
            "{} {:>6}  {}",
            entry.timestamp.format("%H:%M:%S%.3f").to_string().dimmed(),
            entry.event.seq,
            paint(&entry.event)
        );
    }
    debug!(count = entries.len(), "cmd_events: printed events");
    Ok(())
}

/// Audit the events of a past run
fn cmd_audit(runs_dir: &Path, run_id: &str, capacity: Option<usize>, format: OutputFormat) -> Result<()> {
    debug!(?runs_dir, %run_id, ?capacity, "cmd_audit: called");
    let events: Vec<PotEvent> = read_run_events(runs_dir, run_id)?
        .into_iter()
        .map(|entry| entry.event)
        .collect();

    let capacity = match capacity.or_else(|| infer_capacity(&events)) {
        Some(capacity) => capacity,
        None => {
            debug!("cmd_audit: capacity unknown");
            return Err(eyre::eyre!(
                "Cannot infer the pot capacity of run {}; pass --capacity",
                run_id
            ));
        }
    };
    let report = audit_events(&events, capacity);

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!("Audit of run {}", run_id);
            println!("-----------------");
            println!("Events:          {}", report.events);
            println!("Bites:           {}", report.bites);
            println!("Refill requests: {}", report.refill_requests);
            println!("Refills:         {}", report.refills);
            if report.fair {
                println!(
                    "Resets:          {} natural, {} forced",
                    report.natural_resets, report.forced_resets
                );
            }
            if report.gaps > 0 {
                println!("Missing events:  {}", report.gaps);
            }
            println!();
            if report.is_clean() {
                println!("{} No violations", "✓".green());
            } else {
                for violation in &report.violations {
                    println!("{} {}", "✗".red(), violation);
                }
            }
        }
    }

    if !report.is_clean() {
        debug!(violations = report.violations.len(), "cmd_audit: violations found");
        std::process::exit(1);
    }
    Ok(())
}

/// List past runs
fn cmd_runs(runs_dir: &Path) -> Result<()> {
    debug!(?runs_dir, "cmd_runs: called");
    let runs = list_runs(runs_dir)?;
    if runs.is_empty() {
        println!("No runs found in {}", runs_dir.display());
        return Ok(());
    }
    for run in runs {
        println!("{}", run);
    }
    Ok(())
}
