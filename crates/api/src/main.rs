//! Disaster Risk Prediction - Main Entry Point

use std::path::PathBuf;

use anyhow::Context;
use api::{init_logging, run_server, AppState, PredictionReport, Settings};
use clap::{Args, Parser, Subcommand};
use reading_sources::{collect_readings, JsonFileSource, ReadingSource, Scenario, SimulatedSource};
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    name = "disaster-risk",
    version,
    about = "Natural disaster risk prediction from environmental readings",
    long_about = "Normalizes sensor readings into a complete feature vector and classifies\n\
        it as Flood, Earthquake, Landslide, Cyclone or None, using a trained model\n\
        when one is configured and the rule cascade otherwise.\n\n\
        EXAMPLES:\n\
        \n  disaster-risk simulate flood                 Run the flood scenario\n\
        \n  disaster-risk predict weather.json seismic.json   Predict from reading files\n\
        \n  disaster-risk serve --addr 127.0.0.1:8080    Start the HTTP API"
)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity level (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the HTTP API server
    Serve(ServeArgs),

    /// Run a predefined scenario (1-5 or a name); unknown choices run "safe"
    Simulate { scenario: String },

    /// Predict from JSON reading files, highest priority first
    Predict {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List simulation scenarios
    Scenarios,
}

#[derive(Debug, Args)]
struct ServeArgs {
    /// Listen address, overrides `server.addr`
    #[arg(long)]
    addr: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref()).context("loading configuration")?;
    match cli.verbose {
        0 => {}
        1 => settings.logging.level = "debug".to_string(),
        _ => settings.logging.level = "trace".to_string(),
    }
    init_logging(&settings.logging);

    info!("=== Disaster Risk v{} ===", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Serve(args) => {
            if let Some(addr) = args.addr {
                settings.server.addr = addr;
            }
            run_server(&settings).await?;
        }
        Command::Simulate { scenario } => {
            let scenario = Scenario::select(&scenario);
            println!("Simulating {} scenario", scenario);

            let state = AppState::from_settings(&settings)?;
            let readings = collect_readings(&[&SimulatedSource::new(scenario)]);
            print_report(&state.predict(&readings).await);
        }
        Command::Predict { files } => {
            let sources: Vec<JsonFileSource> = files.into_iter().map(JsonFileSource::new).collect();
            let sources: Vec<&dyn ReadingSource> =
                sources.iter().map(|s| s as &dyn ReadingSource).collect();

            let state = AppState::from_settings(&settings)?;
            let readings = collect_readings(&sources);
            print_report(&state.predict(&readings).await);
        }
        Command::Scenarios => {
            for scenario in Scenario::ALL {
                println!("{}. {}", scenario.menu_key(), scenario);
            }
        }
    }

    Ok(())
}

fn print_report(report: &PredictionReport) {
    let prediction = &report.prediction;

    println!("\nInput Data:");
    for (name, value) in prediction.features.iter() {
        let marker = match prediction.features.origin(name) {
            Some(origin) if origin.is_default() => " (default)",
            _ => "",
        };
        println!("  {}: {}{}", name, value, marker);
    }

    match prediction.confidence {
        Some(confidence) => println!(
            "\nPredicted Disaster: {} ({:.1}%)",
            prediction.disaster,
            confidence * 100.0
        ),
        None => println!("\nPredicted Disaster: {}", prediction.disaster),
    }
    if let Some(reason) = &prediction.fallback_reason {
        println!("Model unavailable, rule-based verdict: {}", reason);
    }

    match &report.alert {
        Some(alert) => {
            println!("\n{} {}", alert.title, alert.message);
            println!("Recommended action: {}", alert.recommended_action);
        }
        None if prediction.disaster.is_disaster() => {
            println!("\nAlert suppressed by cooldown or confidence gating.");
        }
        None => println!("\nNo significant disaster predicted. No alert sent."),
    }
}
