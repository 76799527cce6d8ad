//! Mission runner.
//!
//! Runs the LARK-7 mission, optionally applying a scripted list of actions,
//! and prints the final snapshot as JSON. Ticks are paced against the wall
//! clock unless `--headless` is given or the config sets `headless`, in which
//! case a manual clock is stepped as fast as possible.
//!
//! ```text
//! mission-sim [--config PATH] [--script PATH] [--until-ms N] [--headless]
//!             [--record PATH] [--replay PATH] [--checkpoint-every N]
//! ```
//!
//! `--record` writes an action log for a headless run; `--replay` verifies a
//! previously written log instead of running a script. Set `RUST_LOG` for
//! engine logging (default `warn`).

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context};
use mission_engine::prelude::*;

const DEFAULT_UNTIL_MS: u64 = 180_000;
const DEFAULT_CHECKPOINT_EVERY: u64 = 50;

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    script: Option<PathBuf>,
    until_ms: Option<u64>,
    record: Option<PathBuf>,
    replay: Option<PathBuf>,
    checkpoint_every: Option<u64>,
    headless: bool,
}

fn parse_args() -> Result<Args, anyhow::Error> {
    let mut args = Args::default();
    let mut iter = std::env::args().skip(1);
    while let Some(flag) = iter.next() {
        let mut value = || {
            iter.next()
                .with_context(|| format!("{flag} expects a value"))
        };
        match flag.as_str() {
            "--config" => args.config = Some(value()?.into()),
            "--script" => args.script = Some(value()?.into()),
            "--record" => args.record = Some(value()?.into()),
            "--replay" => args.replay = Some(value()?.into()),
            "--headless" => args.headless = true,
            "--until-ms" => {
                args.until_ms = Some(value()?.parse().context("--until-ms expects milliseconds")?)
            }
            "--checkpoint-every" => {
                args.checkpoint_every =
                    Some(value()?.parse().context("--checkpoint-every expects a tick count")?)
            }
            other => bail!("unknown argument: {other}"),
        }
    }
    if args.replay.is_some() && args.script.is_some() {
        bail!("--replay and --script cannot be combined");
    }
    Ok(args)
}

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = parse_args()?;

    if let Some(path) = &args.replay {
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read action log {}", path.display()))?;
        let log: ActionLog = serde_json::from_str(&json)
            .with_context(|| format!("failed to parse action log {}", path.display()))?;
        let result = replay(&log)?;
        println!("{}", serde_json::to_string_pretty(&result)?);
        if !result.completed {
            bail!("replay diverged");
        }
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => MissionConfig::from_path(path)?,
        None => MissionConfig::default(),
    };
    let script: Vec<ScriptedAction> = match &args.script {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("failed to read script {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("failed to parse script {}", path.display()))?
        }
        None => Vec::new(),
    };

    let until = MissionTime(args.until_ms.unwrap_or(DEFAULT_UNTIL_MS));
    let headless = args.headless || config.headless;
    if !headless && args.record.is_some() {
        bail!("--record needs a headless run (pass --headless or set headless in the config)");
    }

    let snapshot = if headless {
        let mut driver = match &args.record {
            Some(_) => HeadlessDriver::recording(
                config,
                args.checkpoint_every.unwrap_or(DEFAULT_CHECKPOINT_EVERY),
            )?,
            None => HeadlessDriver::new(config)?,
        };
        report_rejections(driver.run_script(&script, until));

        if let (Some(path), Some(log)) = (&args.record, driver.finish_recording()) {
            let json = serde_json::to_string_pretty(&log)?;
            fs::write(path, json)
                .with_context(|| format!("failed to write action log {}", path.display()))?;
        }
        driver.session().capture_snapshot()
    } else {
        let mut session = MissionSession::new(config, Box::new(SystemTimeSource::new()))?;
        report_rejections(session.run_realtime(&script, until));
        session.capture_snapshot()
    };

    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

fn report_rejections(rejected: Vec<(ScriptedAction, ActionRejected)>) {
    for (scripted, rejection) in rejected {
        eprintln!(
            "t+{} ms {}: rejected: {rejection}",
            scripted.at_ms,
            scripted.action.name()
        );
    }
}
