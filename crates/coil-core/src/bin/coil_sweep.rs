// ─────────────────────────────────────────────────────────────────────
// Solenoid Force Core — Sweep Runner
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use anyhow::{Context, Result};
use clap::Parser;
use coil_core::run_sweep;
use coil_types::config::SweepConfig;
use std::io::Write;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "coil-sweep")]
#[command(version)]
#[command(about = "Minimum solenoid drive current over a core-radius × coil-length grid")]
struct Args {
    /// Path to JSON sweep configuration
    config: String,

    /// Worker threads (overrides the configuration)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Share one elliptic-integral cache across all sweep points
    #[arg(long)]
    shared_cache: bool,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = SweepConfig::from_file(&args.config)
        .with_context(|| format!("failed to load config {}", args.config))?;
    if args.workers.is_some() {
        config.sweep.workers = args.workers;
    }
    if args.shared_cache {
        config.sweep.shared_cache = true;
    }

    let started = Instant::now();
    let report = run_sweep(&config).context("sweep aborted")?;
    let elapsed = started.elapsed();

    let json = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{json}").context("failed to write report")?;

    let counts = report.counts();
    eprintln!(
        "{}: {} points ({} found, {} not found, {} failed), target {:.4} N, {:.2}s",
        report.run_name,
        report.records.len(),
        counts.found,
        counts.not_found,
        counts.failed,
        report.target_force,
        elapsed.as_secs_f64()
    );
    if let Some(stats) = report.cache {
        eprintln!(
            "shared cache: {} entries, hit rate {:.1}%",
            stats.entries,
            100.0 * stats.hit_rate()
        );
    }
    Ok(())
}
