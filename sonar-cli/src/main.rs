use clap::{Parser, Subcommand};
use sonar::{SonarConfig, SonarConfigBuilder, TelemetryConfig, init_tracing};
use std::path::PathBuf;

mod commands;

use commands::{CliError, list_tools, run_research, summarize_log};

#[derive(Parser, Debug)]
#[command(name = "sonar", version)]
#[command(about = "Sonar - instrumented research agent")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Research a topic and print the run report
    Run {
        /// Topic to research
        #[arg(long)]
        topic: String,
        /// Also print Prometheus metrics for the run
        #[arg(long)]
        metrics: bool,
    },
    /// Summarize the local event log
    Summary {
        /// Log file (default: SONAR_LOG_PATH or agent_logs.json)
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// List the stock research tools
    Tools,
}

fn load_config() -> Result<SonarConfig, CliError> {
    Ok(SonarConfigBuilder::from_env()?.build()?)
}

#[tokio::main]
async fn main() {
    // A missing .env file is fine.
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            let _ = init_tracing(&TelemetryConfig::default());
            tracing::error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    if let Err(e) = init_tracing(&config.telemetry) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let result = match cli.command {
        Commands::Run { topic, metrics } => run_research(&config, &topic, metrics).await,
        Commands::Summary { log } => {
            let path = log.unwrap_or_else(|| config.telemetry.log_path.clone());
            summarize_log(&path)
        }
        Commands::Tools => list_tools(),
    };

    match result {
        Ok(output) => println!("{output}"),
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            std::process::exit(1);
        }
    }
}
