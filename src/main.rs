use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use sysgauge::{App, Settings};
use sysgauge_engine::{RunKind, TimeRange};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sysgauge")]
#[command(version, about = "System health sampling, scoring and run history")]
struct Args {
    /// TOML settings file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory for the durable store (overrides settings)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Delay between run steps in milliseconds (overrides settings)
    #[arg(long, global = true)]
    step_delay_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Take one snapshot and print it with its health score
    Sample,

    /// Sample repeatedly and print the chart series
    Monitor {
        /// Number of samples to take
        #[arg(long, default_value = "5")]
        ticks: usize,
    },

    /// Run a plan: install, check or tweak
    Run {
        kind: RunKind,

        /// Cancel once this many steps have completed
        #[arg(long)]
        cancel_after: Option<usize>,
    },

    /// Print recorded runs
    History {
        /// 1h, 24h, 7d, 30d or all
        #[arg(long, default_value = "all")]
        range: TimeRange,
    },

    /// Write the full run history to a file
    ExportHistory {
        #[arg(long)]
        out: PathBuf,
    },

    /// Replace the run history with a previously exported file
    ImportHistory {
        #[arg(long)]
        from: PathBuf,
    },

    /// Write a point-in-time report with recommendations
    Report {
        #[arg(long)]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(dir) = args.data_dir {
        settings.data_dir = dir;
    }
    if let Some(delay) = args.step_delay_ms {
        settings.step_delay_ms = delay;
    }

    init_tracing(&settings.log_level);

    let mut app = App::new(settings);

    match args.command {
        Command::Sample => {
            let reading = app.sample()?;
            print_json(&serde_json::json!({
                "snapshot": reading.snapshot,
                "healthScore": reading.score.value,
                "healthStatus": reading.score.status.label(),
            }))?;
        }
        Command::Monitor { ticks } => {
            let charts = app.monitor(ticks).await?;
            print_json(&charts)?;
        }
        Command::Run { kind, cancel_after } => {
            println!("{}", kind.title());
            let record = app
                .run(kind, cancel_after, |p| {
                    println!("[{:>3.0}%] {}", p.percent_complete, p.description);
                })
                .await?;
            print_json(&record)?;
        }
        Command::History { range } => {
            print_json(&app.history(range))?;
        }
        Command::ExportHistory { out } => {
            let count = app.export_history(&out)?;
            println!("Exported {} records to: {}", count, out.display());
        }
        Command::ImportHistory { from } => {
            let count = app.import_history(&from)?;
            println!("Imported {} records from: {}", count, from.display());
        }
        Command::Report { out } => {
            let report = app.report(&out)?;
            println!(
                "Health {} ({}), report written to: {}",
                report.health_score,
                report.health_status,
                out.display()
            );
        }
    }

    Ok(())
}

/// Log to stderr so stdout stays parseable. `RUST_LOG` wins over the setting.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
