use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use rover_rc_runtime::RuntimeConfig;
use rover_rc_runtime::messages::CycleReport;
use rover_rc_runtime::sim::{Scenario, run_scenario};

#[derive(Parser)]
#[command(name = "rover-rc-runtime", about = "RC rover control core bench")]
struct Cli {
    /// JSON runtime config (defaults are used when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Play a recorded/scripted receiver scenario through the control core
    Simulate {
        scenario: PathBuf,
        /// Print cycle reports as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print the default runtime config as JSON
    Defaults,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=debug to see every actuator command)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = match &cli.config {
        Some(path) => {
            info!("Loading config from {}", path.display());
            RuntimeConfig::load(path)?
        }
        None => RuntimeConfig::default(),
    };

    match cli.command {
        Command::Defaults => {
            println!("{}", serde_json::to_string_pretty(&RuntimeConfig::default())?);
        }
        Command::Simulate { scenario, json } => {
            let scenario = Scenario::load(&scenario)?;
            info!(
                "Simulating {} frames starting in {:?}",
                scenario.frames.len(),
                scenario.initial_mode
            );

            // The control core blocks; keep it off the async workers
            let reports =
                tokio::task::spawn_blocking(move || run_scenario(&scenario, &config)).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                for report in &reports {
                    print_report(report);
                }
            }
        }
    }
    Ok(())
}

fn print_report(report: &CycleReport) {
    println!(
        "#{:<4} {:?} {:?} {:?}",
        report.cycle, report.mode, report.health, report.propulsion
    );
    for event in &report.events {
        println!("      {:?}", event);
    }
}
