#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! `lapse` binary: config loading, logging init, and command dispatch.

mod cli;
mod error_fmt;
mod link;
mod run;

use clap::Parser;
use cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use eyre::WrapErr;
use lapse_config::{Config, Logging};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Load the config file; a missing file means built-in defaults.
fn load_config(cli: &Cli) -> eyre::Result<(Config, bool)> {
    if !cli.config.exists() {
        return Ok((Config::default(), false));
    }
    let cfg = lapse_config::load_file(&cli.config).wrap_err(error_fmt::INVALID_CONFIG)?;
    Ok((cfg, true))
}

fn init_logging(json: bool, level: &str, logging: &Logging) -> eyre::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => EnvFilter::try_new(level).wrap_err_with(|| format!("invalid log level {level:?}"))?,
    };

    let mut layers: Vec<BoxedLayer> = Vec::new();
    let console = fmt::layer().with_writer(std::io::stderr).with_target(false);
    if json {
        layers.push(console.json().boxed());
    } else {
        layers.push(console.boxed());
    }

    if let Some(path) = logging.file.as_deref() {
        let path = std::path::Path::new(path);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| std::path::Path::new("."));
        let name = path
            .file_name()
            .map_or_else(|| "lapse.log".into(), |n| n.to_os_string());
        let rotation = logging
            .rotation
            .as_deref()
            .unwrap_or("never")
            .to_ascii_lowercase();
        let appender = match rotation.as_str() {
            "daily" => tracing_appender::rolling::daily(dir, name),
            "hourly" => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .wrap_err("install log subscriber")?;
    Ok(())
}

fn check_config(cfg: &Config, from_file: bool, json: bool) {
    let v = serde_json::json!({
        "source": if from_file { "file" } else { "defaults" },
        "debounce": { "dwell_ms": cfg.debounce.dwell_ms },
        "trigger": {
            "settle_ms": cfg.trigger.settle_ms,
            "max_attempts": cfg.trigger.max_attempts,
            "retry_backoff_ms": cfg.trigger.retry_backoff_ms,
            "busy_wait_ms": cfg.trigger.busy_wait_ms,
        },
        "classifier": {
            "heating_nozzle_c": cfg.classifier.heating_nozzle_c,
            "heating_bed_c": cfg.classifier.heating_bed_c,
            "finish_tokens": cfg.classifier.finish_tokens,
            "idle_tokens": cfg.classifier.idle_tokens,
        },
        "status": { "log_capacity": cfg.status.log_capacity, "file": cfg.status.file },
        "bridge": {
            "command": cfg.bridge.command,
            "args": cfg.bridge.args,
            "command_timeout_ms": cfg.bridge.command_timeout_ms,
        },
        "actuator": { "assume_ready": cfg.actuator.assume_ready },
    });
    if json {
        println!("{v}");
    } else {
        println!("config ok ({})", if from_file { "file" } else { "built-in defaults" });
        println!("dwell_ms = {}", cfg.debounce.dwell_ms);
        println!("settle_ms = {}", cfg.trigger.settle_ms);
        println!("max_attempts = {}", cfg.trigger.max_attempts);
        println!("retry_backoff_ms = {}", cfg.trigger.retry_backoff_ms);
        println!("busy_wait_ms = {}", cfg.trigger.busy_wait_ms);
        println!(
            "camera = {}",
            cfg.bridge.command.as_deref().unwrap_or("simulated")
        );
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let (cfg, from_file) = load_config(&cli)?;
    let level = cli
        .log_level
        .clone()
        .or_else(|| cfg.logging.level.clone())
        .unwrap_or_else(|| "info".to_string());
    init_logging(cli.json, &level, &cfg.logging)?;
    if !from_file {
        tracing::warn!(path = %cli.config.display(), "config file not found; using built-in defaults");
    }

    match cli.cmd {
        Commands::CheckConfig => {
            check_config(&cfg, from_file, cli.json);
            Ok(())
        }
        Commands::Run {
            telemetry,
            pace_ms,
            dry_run,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = shutdown.clone();
            if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
                tracing::warn!(error = %e, "Ctrl-C handler not installed");
            }
            let opts = run::RunOpts {
                telemetry,
                pace: pace_ms.map(Duration::from_millis),
                dry_run,
            };
            let (status, report) = run::run_telemetry(&cfg, &opts, shutdown)?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string(&status).wrap_err("serialize status")?
                );
            } else {
                print!("{}", run::render_summary(&status, &report));
            }
            Ok(())
        }
    }
}

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(err) = real_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", error_fmt::format_error_json(&err));
        } else {
            eprintln!("{}", error_fmt::humanize(&err));
        }
        std::process::exit(error_fmt::exit_code_for_error(&err));
    }
}
