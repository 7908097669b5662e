//! Entry point for the sritop TUI. Parses args, starts the samplers and runs the App.

mod app;
mod history;
mod ui;

use std::env;
use std::fs::OpenOptions;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use app::App;
use serde::Serialize;
use sritop_core::{Family, Sampler, SamplerConfig, SamplerError, Snapshot, SysinfoSource};
use tokio::time::{sleep, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "[--disk PATH|-d PATH] [--top N|-n N] [--once]";
const ONCE_WAIT: Duration = Duration::from_secs(5);

// Cadence overrides in milliseconds, one per family
const CADENCE_ENV: [(Family, &str); 5] = [
    (Family::Cpu, "SRITOP_CPU_MS"),
    (Family::Memory, "SRITOP_MEM_MS"),
    (Family::Disk, "SRITOP_DISK_MS"),
    (Family::Network, "SRITOP_NET_MS"),
    (Family::Processes, "SRITOP_PROC_MS"),
];

#[derive(Debug, Default, PartialEq)]
struct ParsedArgs {
    disk: Option<String>,
    top: Option<usize>,
    once: bool,
}

#[derive(Debug, PartialEq)]
enum ArgError {
    Help(String),
    Invalid(String),
}

fn parse_top(v: Option<String>, prog: &str) -> Result<usize, ArgError> {
    let v = v.ok_or_else(|| ArgError::Invalid(format!("--top needs a value. Usage: {prog} {USAGE}")))?;
    match v.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ArgError::Invalid(format!(
            "--top expects a positive integer, got '{v}'. Usage: {prog} {USAGE}"
        ))),
    }
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, ArgError> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "sritop".into());
    let mut parsed = ParsedArgs::default();

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                return Err(ArgError::Help(format!("Usage: {prog} {USAGE}")));
            }
            "--disk" | "-d" => {
                parsed.disk = it.next();
            }
            "--top" | "-n" => {
                parsed.top = Some(parse_top(it.next(), &prog)?);
            }
            "--once" => {
                parsed.once = true;
            }
            _ if arg.starts_with("--disk=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    if !v.is_empty() {
                        parsed.disk = Some(v.to_string());
                    }
                }
            }
            _ if arg.starts_with("--top=") => {
                let v = arg.split_once('=').map(|(_, v)| v.to_string());
                parsed.top = Some(parse_top(v, &prog)?);
            }
            _ => {
                return Err(ArgError::Invalid(format!(
                    "Unexpected argument '{arg}'. Usage: {prog} {USAGE}"
                )));
            }
        }
    }
    Ok(parsed)
}

fn cadence_from_env(key: &str) -> Option<Duration> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Some(Duration::from_millis(ms)),
        _ => {
            warn!(key, value = %raw, "ignoring cadence override, expected milliseconds > 0");
            None
        }
    }
}

fn build_config(parsed: &ParsedArgs) -> SamplerConfig {
    let mut config = SamplerConfig::default();
    for (family, key) in CADENCE_ENV {
        if let Some(period) = cadence_from_env(key) {
            config.cadences.set(family, period);
        }
    }
    if let Some(disk) = parsed.disk.as_deref() {
        config = config.with_disk_path(disk);
    }
    if let Some(n) = parsed.top {
        config = config.with_top_n(n);
    }
    config
}

/// Logs go to `SRITOP_LOG_FILE` when set. Otherwise `--once` logs to stderr
/// and the TUI stays silent so nothing scribbles over the alternate screen.
/// Returns whether a subscriber was installed.
fn init_tracing(once: bool) -> Result<bool> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if let Ok(path) = env::var("SRITOP_LOG_FILE") {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening log file {path}"))?;
        builder
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init()
            .map_err(|e| anyhow!(e))?;
    } else if once {
        builder
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| anyhow!(e))?;
    } else {
        return Ok(false);
    }
    Ok(true)
}

#[derive(Serialize)]
struct OnceReport {
    host: String,
    complete: bool,
    snapshots: Vec<Snapshot>,
}

async fn run_once(sampler: &Sampler<SysinfoSource>) -> Result<()> {
    let store = sampler.store();
    let deadline = Instant::now() + ONCE_WAIT;
    while !store.is_complete() && Instant::now() < deadline {
        sleep(Duration::from_millis(50)).await;
    }

    let snapshots: Vec<Snapshot> = Family::ALL
        .iter()
        .filter_map(|&f| store.get(f))
        .map(|s| (*s).clone())
        .collect();
    let report = OnceReport {
        host: SysinfoSource::host_name(),
        complete: snapshots.len() == Family::ALL.len(),
        snapshots,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn stop_message(e: &SamplerError) -> String {
    format!("sritop: {e}")
}

/// Stop the samplers. Problems go to the log, or to stderr when nothing is
/// logging (the terminal is back to normal by now).
async fn shutdown(mut sampler: Sampler<SysinfoSource>, logging: bool) {
    let Err(e) = sampler.stop().await else {
        return;
    };
    match &e {
        SamplerError::ShutdownIncomplete { pending } => {
            warn!(?pending, "samplers did not stop within the grace period");
        }
        _ => warn!(error = %e, "stopping samplers failed"),
    }
    if !logging {
        eprintln!("{}", stop_message(&e));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let parsed = match parse_args(env::args()) {
        Ok(v) => v,
        Err(ArgError::Help(msg)) => {
            println!("{msg}");
            return Ok(());
        }
        Err(ArgError::Invalid(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
    };

    let logging = init_tracing(parsed.once)?;

    let config = build_config(&parsed);
    let source = SysinfoSource::new(config.cpu_window);
    let mut sampler = Sampler::new(source, config);
    sampler.start()?;
    info!(
        disk = %sampler.config().disk_path.display(),
        top_n = sampler.config().top_n,
        mode = if parsed.once { "once" } else { "tui" },
        "sritop running"
    );

    let res = if parsed.once {
        run_once(&sampler).await
    } else {
        let mut app = App::new(sampler.store(), SysinfoSource::host_name());
        app.run(&sampler).await
    };

    shutdown(sampler, logging).await;
    res
}
