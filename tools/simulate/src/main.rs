//! Run the moving-grounding-line flowline model on a prepared profile.
//!
//! Input is a profile JSON (`distance`, `bedrock`, `initial_thickness`,
//! optional `target_thickness`) and an optional config JSON. Output is the
//! run report as JSON. With `--sweep-smb` the same profile is run once per
//! surface mass balance value, in parallel.

use std::{fs, io::Write, path::PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use flowline_core::{ProfileSet, SimulationConfig, SimulationFailure, SimulationLoop, SimulationReport};
use log::LevelFilter;
use rayon::prelude::*;
use serde::Serialize;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "simulate", about = "Flowline glacier run with grounding-line tracking")]
struct Args {
    /// Profile JSON file.
    #[arg(short, long)]
    profile: PathBuf,

    /// Config JSON file; built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the report here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Stop after at most this many steps even if the horizon is not reached.
    #[arg(long)]
    steps: Option<usize>,

    /// Comma-separated surface mass balance values to sweep (e.g. -0.5,0,0.3).
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    sweep_smb: Vec<f64>,

    /// Log level (error, warn, info, debug, trace). Falls back to RUST_LOG.
    #[arg(long)]
    log_level: Option<String>,
}

// ── Output types ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum RunOutcome {
    Completed {
        #[serde(flatten)]
        report: SimulationReport,
    },
    Failed {
        step: usize,
        error: String,
        last_valid_thickness: Vec<f64>,
    },
}

impl From<SimulationFailure> for RunOutcome {
    fn from(f: SimulationFailure) -> Self {
        RunOutcome::Failed {
            step: f.step,
            error: f.source.to_string(),
            last_valid_thickness: f.last_valid.into_values(),
        }
    }
}

#[derive(Serialize)]
struct SweepEntry {
    surface_mass_balance: f64,
    #[serde(flatten)]
    outcome: RunOutcome,
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn init_logging(level: Option<&str>) {
    let level = level
        .and_then(|l| l.parse::<LevelFilter>().ok())
        .or_else(|| std::env::var("RUST_LOG").ok().and_then(|v| v.parse().ok()))
        .unwrap_or(LevelFilter::Info);
    env_logger::Builder::new().filter_level(level).format_timestamp_secs().init();
}

fn run_one(config: SimulationConfig, profile: &ProfileSet, max_steps: Option<usize>) -> Result<RunOutcome> {
    let mut sim = SimulationLoop::new(config, profile).context("setting up simulation")?;
    let result = match max_steps {
        Some(n) => sim.run_for(n).map(|_| sim.report()),
        None => sim.run(),
    };
    Ok(match result {
        Ok(report) => RunOutcome::Completed { report },
        Err(failure) => {
            log::error!("{failure}");
            failure.into()
        }
    })
}

fn write_json<T: Serialize>(value: &T, output: Option<&PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            log::info!("report written to {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(json.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_level.as_deref());

    let profile = ProfileSet::load(&args.profile)
        .with_context(|| format!("loading profile {}", args.profile.display()))?;
    let config = match &args.config {
        Some(path) => SimulationConfig::load(path).with_context(|| format!("loading config {}", path.display()))?,
        None => SimulationConfig::default(),
    };
    log::info!("profile: {} samples from {}", profile.len(), args.profile.display());

    if args.sweep_smb.is_empty() {
        let outcome = run_one(config, &profile, args.steps)?;
        let failed = matches!(outcome, RunOutcome::Failed { .. });
        write_json(&outcome, args.output.as_ref())?;
        if failed {
            bail!("simulation did not reach the horizon");
        }
        return Ok(());
    }

    log::info!("sweeping {} surface mass balance values", args.sweep_smb.len());
    let entries: Vec<SweepEntry> = args
        .sweep_smb
        .par_iter()
        .map(|&a0| {
            let cfg = SimulationConfig { surface_mass_balance: a0, ..config.clone() };
            run_one(cfg, &profile, args.steps).map(|outcome| SweepEntry { surface_mass_balance: a0, outcome })
        })
        .collect::<Result<_>>()?;

    let failed = entries.iter().filter(|e| matches!(e.outcome, RunOutcome::Failed { .. })).count();
    if failed > 0 {
        log::warn!("{failed} of {} sweep runs failed before the horizon", entries.len());
    }
    write_json(&entries, args.output.as_ref())
}
