//! Model registry operator - installs config models into Pod model registries

use clap::{Parser, Subcommand};

use modelreg_common::kube_utils::create_client;
use modelreg_common::telemetry::init_telemetry;
use modelreg_operator::config::ControllerConfig;
use modelreg_operator::controller_runner::build_model_controller;
use modelreg_operator::startup::{ensure_crds_installed, model_crd_yaml};

/// Distributes config model plugins to the model registries of injected Pods
#[derive(Parser, Debug)]
#[command(name = "modelreg-operator", version, about, long_about = None)]
struct Cli {
    /// Print the Model CRD manifest and exit
    #[arg(long)]
    crd: bool,

    #[command(flatten)]
    config: ControllerConfig,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the Model controller (default mode)
    ///
    /// Watches Model CRDs and registry-injected Pods, installs each Model's
    /// plugin into every registry of its namespace and removes it again when
    /// the Model is deleted.
    Controller,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.crd {
        println!("{}", model_crd_yaml()?);
        return Ok(());
    }

    init_telemetry(cli.config.telemetry())?;

    match cli.command {
        Some(Commands::Controller) | None => run_controller(cli.config).await,
    }
}

async fn run_controller(config: ControllerConfig) -> anyhow::Result<()> {
    let client = create_client().await?;

    ensure_crds_installed(&client).await?;

    tracing::info!(
        namespace = ?config.watch_namespace(),
        registry_port = config.registry_port,
        "Starting Model controller"
    );
    build_model_controller(client, &config).await;

    tracing::info!("Model controller stopped");
    Ok(())
}
