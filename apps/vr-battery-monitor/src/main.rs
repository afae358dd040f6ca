use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use vr_battery_monitor::cli::Cli;
use vr_battery_monitor::config::Settings;
use vr_battery_monitor::devices;
use vr_battery_monitor::logger::Logger;
use vr_battery_monitor::paths::RuntimePaths;
use vr_battery_monitor::poller::Poller;
use vr_battery_monitor::sink::InfluxSink;

fn init_tracing() -> Result<()> {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    Ok(())
}

fn resolve_paths(cli: &Cli) -> Result<RuntimePaths> {
    if let (Some(config), Some(log)) = (&cli.config, &cli.log_file) {
        return Ok(RuntimePaths {
            config: config.clone(),
            log: log.clone(),
        });
    }
    let mut paths =
        RuntimePaths::for_current_exe().context("failed to locate the running executable")?;
    if let Some(config) = &cli.config {
        paths.config = config.clone();
    }
    if let Some(log) = &cli.log_file {
        paths.log = log.clone();
    }
    Ok(paths)
}

fn run(cli: &Cli, paths: &RuntimePaths, logger: &mut Logger) -> Result<()> {
    logger.log(format!("Loading config from: {}", paths.config.display()));
    let settings = Settings::load(&paths.config)?;
    tracing::debug!(?settings, "config loaded");

    let registry = devices::connect()?;
    logger.log("VR system initialized");

    let sink = InfluxSink::new(&settings)?;
    logger.log(format!("InfluxDB writer initialized: {}", sink.endpoint()));

    let interval_seconds = settings.interval_seconds;
    if interval_seconds == 0 {
        logger.log("interval_seconds is 0; cycles will run back to back");
    }
    let poller = Poller::new(registry, sink, settings);

    if cli.once {
        poller.run_cycle(logger);
        drop(poller);
        logger.log("VR system shut down");
        return Ok(());
    }

    logger.log(format!("Starting monitoring loop with {interval_seconds}s interval"));
    poller.run(logger)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = init_tracing() {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    let paths = match resolve_paths(&cli) {
        Ok(paths) => paths,
        Err(err) => {
            eprintln!("{err:#}");
            return ExitCode::FAILURE;
        }
    };

    let mut logger = match Logger::open(&paths.log) {
        Ok(logger) => logger,
        Err(err) => {
            eprintln!("Failed to open log file {}: {err}", paths.log.display());
            return ExitCode::FAILURE;
        }
    };

    logger.log("VR Battery Monitor starting");
    match run(&cli, &paths, &mut logger) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            logger.log(format!("Fatal error: {err:#}"));
            ExitCode::FAILURE
        }
    }
}
