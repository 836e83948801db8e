use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use log::info;
use serde::Serialize;

use kinematic_tracker_rs::{
    run, FilterSnapshot, StepRecord, TargetSimulator, TrackerConfig,
};

#[derive(Parser, Debug)]
#[command(name = "kinematic_tracker")]
#[command(about = "Constant-acceleration Kalman tracking against a simulated target", long_about = None)]
struct Args {
    /// JSON config; omitted fields use the reference defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of predict/update steps
    #[arg(long)]
    steps: Option<usize>,

    /// Simulator RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Time step (seconds)
    #[arg(long)]
    dt: Option<f64>,

    /// Acceleration noise std for the process model (m/s²)
    #[arg(long)]
    accel_std: Option<f64>,

    /// Write the full run report as JSON
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct RunReport {
    generated_at: String,
    config: TrackerConfig,
    final_snapshot: FilterSnapshot,
    position_rmse: Vec<f64>,
    records: Vec<StepRecord>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => TrackerConfig::load(path)?,
        None => TrackerConfig::default(),
    };
    if let Some(steps) = args.steps {
        config.steps = steps;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(dt) = args.dt {
        config.dt = dt;
    }
    if let Some(accel_std) = args.accel_std {
        config.accel_std = accel_std;
    }
    config.validate().context("Invalid configuration")?;

    info!(
        "Tracking {} axes for {} steps (dt = {} s, accel_std = {})",
        config.axes, config.steps, config.dt, config.accel_std
    );

    let mut source = TargetSimulator::from_config(&config)?;
    let (tracker, history) = run(&config, &mut source)?;
    let snapshot = tracker.filter().snapshot();
    let rmse = history.position_rmse();

    println!("\n=== Final Estimate ===");
    for (axis, (pos, std)) in snapshot
        .position
        .iter()
        .zip(snapshot.position_std.iter())
        .enumerate()
    {
        println!(
            "  axis {}: {:.4} ± {:.4} m (RMSE {:.4} m)",
            axis,
            pos,
            std,
            rmse.get(axis).copied().unwrap_or(f64::NAN)
        );
    }
    println!(
        "  updates: {} accepted, {} rejected",
        snapshot.update_count, snapshot.rejected_updates
    );

    if let Some(path) = &args.output {
        let report = RunReport {
            generated_at: Utc::now().to_rfc3339(),
            config,
            final_snapshot: snapshot,
            position_rmse: rmse,
            records: history.records,
        };
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        info!("Report written to {}", path.display());
    }

    Ok(())
}
