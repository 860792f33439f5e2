// deployer/src/main.rs

use clap::{Parser, Subcommand};
use eyre::Result;
use gif_deployer::{
    config::load_config,
    scripts::{deploy_components, run_deployer},
};
use serde::Serialize;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Deploys GIF instance components against a local or remote chain", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Print the deployment summary as JSON on stdout when done.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Grant owner roles on INSTANCE_ADDRESS, then deploy and register a distribution, a pool and a product.
    DeployComponents,
    /// Deploy the all-in-one Deployer contract against REGISTRY_ADDRESS and read back what it set up.
    RunDeployer {
        /// Overrides DEPLOYMENT_ID.
        #[arg(long, value_name = "ID")]
        deployment_id: Option<String>,
    },
}

fn print_summary<T: Serialize>(summary: &T, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config()?;
    match cli.command {
        Command::DeployComponents => {
            let summary = deploy_components(&config).await?;
            print_summary(&summary, cli.json)
        }
        Command::RunDeployer { deployment_id } => {
            if let Some(id) = deployment_id {
                config.deployment_id = id;
            }
            let summary = run_deployer(&config).await?;
            print_summary(&summary, cli.json)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    info!(command = ?cli.command, "Starting...");
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ Deployment failed: {:?}", e);
            ExitCode::FAILURE
        }
    }
}
