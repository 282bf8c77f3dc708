use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use rtd_lib::filter::hampel_filter;
use rtd_lib::io::table;
use rtd_run::{read_session, run_session, synthetic_recording, SimulateSpec, StimulusKind};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "rtd",
    version,
    about = "Residence-time distribution analysis for tracer recordings"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum KindArg {
    Impulse,
    StepUp,
    StepDown,
}

impl From<KindArg> for StimulusKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Impulse => StimulusKind::Impulse,
            KindArg::StepUp => StimulusKind::StepUp,
            KindArg::StepDown => StimulusKind::StepDown,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full analysis session from a TOML config and write per-event
    /// curves plus a properties table
    Analyze {
        #[arg(long)]
        config: PathBuf,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Remove Hampel outliers from a recording and write the cleaned table
    Filter {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 10)]
        half_window: usize,
        #[arg(long, default_value_t = 6.0)]
        sigma: f64,
    },
    /// Generate a synthetic tracer recording in the acquisition schema
    Simulate {
        #[arg(long, default_value = "impulse")]
        kind: KindArg,
        #[arg(long, default_value_t = 600.0)]
        duration_s: f64,
        #[arg(long, default_value_t = 10.0)]
        rate_hz: f64,
        #[arg(long, default_value_t = 120.0)]
        event_time: f64,
        #[arg(long, default_value_t = 0.05)]
        noise: f64,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze { config, out } => cmd_analyze(&config, &out)?,
        Commands::Filter {
            input,
            out,
            half_window,
            sigma,
        } => cmd_filter(&input, &out, half_window, sigma)?,
        Commands::Simulate {
            kind,
            duration_s,
            rate_hz,
            event_time,
            noise,
            seed,
            out,
        } => cmd_simulate(kind, duration_s, rate_hz, event_time, noise, seed, &out)?,
    }
    Ok(())
}

fn cmd_analyze(config_path: &Path, out: &Path) -> Result<()> {
    let config = read_session(config_path)?;
    let summary = run_session(&config, out)?;
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

fn cmd_filter(input: &Path, out: &Path, half_window: usize, sigma: f64) -> Result<()> {
    let series = table::read_recording_csv(input)?;
    let (cleaned, removed) = hampel_filter(&series, half_window, sigma);
    table::write_recording_csv(out, &cleaned)?;
    println!(
        "{}",
        serde_json::json!({
            "input": input,
            "out": out,
            "removed": removed,
            "remaining": cleaned.len(),
        })
    );
    Ok(())
}

fn cmd_simulate(
    kind: KindArg,
    duration_s: f64,
    rate_hz: f64,
    event_time: f64,
    noise: f64,
    seed: u64,
    out: &Path,
) -> Result<()> {
    let spec = SimulateSpec {
        kind: kind.into(),
        duration_s,
        rate_hz,
        event_time,
        noise,
        seed,
    };
    let series = synthetic_recording(&spec);
    table::write_recording_csv(out, &series)?;
    println!(
        "{}",
        serde_json::json!({
            "out": out,
            "kind": spec.kind,
            "samples": series.len(),
        })
    );
    Ok(())
}
