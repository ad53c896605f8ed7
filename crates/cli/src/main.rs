//! Diabetes Risk Predictor CLI
//!
//! A command-line tool for requesting predictions, validating input locally
//! and inspecting the model served by the predictor.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{model, predict, schema};

/// Diabetes Risk Predictor CLI
#[derive(Parser)]
#[command(name = "dpx")]
#[command(author, version, about = "CLI for the Diabetes Risk Predictor", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via DPX_API_URL env var)
    #[arg(long, env = "DPX_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Request a diabetes prediction from the service
    Predict(predict::FeatureArgs),

    /// Validate measurements locally without contacting the service
    Validate(predict::FeatureArgs),

    /// Show the accepted features and their ranges
    Schema,

    /// Inspect or reload the model session
    #[command(subcommand)]
    Model(ModelCommands),
}

#[derive(Subcommand)]
pub enum ModelCommands {
    /// Show the model session state
    Status,

    /// Retry loading the model after a failure
    Reload,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate(args) => predict::validate(&args, cli.format)?,
        Commands::Predict(args) => {
            let client = client::ApiClient::new(&cli.api_url)?;
            predict::predict(&client, &args, cli.format).await?;
        }
        Commands::Schema => {
            let client = client::ApiClient::new(&cli.api_url)?;
            schema::show_schema(&client, cli.format).await?;
        }
        Commands::Model(model_cmd) => {
            let client = client::ApiClient::new(&cli.api_url)?;
            match model_cmd {
                ModelCommands::Status => model::show_status(&client, cli.format).await?,
                ModelCommands::Reload => model::reload(&client, cli.format).await?,
            }
        }
    }

    Ok(())
}
