//! Cascade Simulator CLI
//!
//! Usage:
//!   rf-cascade-sim --rounds 100000 --policy rtp --target-rtp 0.95
//!   rf-cascade-sim --config engine.yaml --report report.json

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use rf_cascade::EngineConfig;
use rf_cascade_sim::{OraclePolicy, SessionStats, SimConfig, Simulator};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "rf-cascade-sim", about = "Batch simulator for the cascading grid engine")]
struct Cli {
    /// Rounds to play
    #[arg(short, long, default_value_t = 10_000)]
    rounds: u64,

    /// Worker threads (defaults to the number of CPUs)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Session seed
    #[arg(short, long, default_value_t = 0)]
    seed: u64,

    /// Bet amount; must be in the bet table
    #[arg(short, long, default_value_t = 1.0)]
    bet: f64,

    /// Oracle policy
    #[arg(short, long, value_enum, default_value_t = OraclePolicy::Rtp)]
    policy: OraclePolicy,

    /// Target RTP handed to the oracle
    #[arg(long, default_value_t = 0.96)]
    target_rtp: f64,

    /// Engine config (JSON, or YAML by .yaml/.yml extension)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the JSON report here
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Serialize)]
struct Report<'a> {
    sim: &'a SimConfig,
    stats: &'a SessionStats,
    rtp_percent: f64,
    hit_rate_percent: f64,
    bypass_rate_percent: f64,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let engine = match &cli.config {
        Some(path) => load_engine_config(path)?,
        None => EngineConfig::standard(),
    };
    let sim_config = SimConfig {
        rounds: cli.rounds,
        threads: cli.threads.unwrap_or_else(num_cpus::get),
        seed: cli.seed,
        bet: cli.bet,
        policy: cli.policy,
        target_rtp: cli.target_rtp,
    };

    let simulator = Simulator::new(engine, sim_config).context("Invalid simulation setup")?;
    let stats = simulator.run().context("Simulation failed")?;

    print_summary(&stats);

    if let Some(path) = &cli.report {
        let report = Report {
            sim: simulator.config(),
            stats: &stats,
            rtp_percent: stats.rtp(),
            hit_rate_percent: stats.hit_rate(),
            bypass_rate_percent: stats.bypass_rate(),
        };
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("Report written to {}", path.display());
    }
    Ok(())
}

fn load_engine_config(path: &Path) -> Result<EngineConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let config = if is_yaml {
        EngineConfig::from_yaml(&text)?
    } else {
        EngineConfig::from_json(&text)?
    };
    Ok(config)
}

fn print_summary(stats: &SessionStats) {
    println!("Rounds:              {}", stats.rounds);
    println!("Phases:              {}", stats.phases);
    println!("Wagered:             {:.2}", stats.total_bet);
    println!("Paid:                {:.2}", stats.total_win);
    println!("RTP:                 {:.2}%", stats.rtp());
    println!("Hit rate:            {:.2}%", stats.hit_rate());
    println!("Level advances:      {}", stats.level_advances);
    println!("Free-round triggers: {}", stats.free_round_triggers);
    println!("Max cascade depth:   {}", stats.max_cascade_depth);
    println!("Oracle calls:        {}", stats.oracle_calls);
    println!(
        "Bypassed refusals:   {} ({:.2}%)",
        stats.bypasses,
        stats.bypass_rate()
    );
}
