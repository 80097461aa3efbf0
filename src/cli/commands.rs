//! CLI command definitions for service-engine.
//!
//! Thin front end over the [`Engine`] contract: every subcommand maps to a
//! single lifecycle operation, bounded by the configured operation timeout.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::Parser;
use tracing::info;

use crate::config::EngineConfig;
use crate::docker::DockerEngine;
use crate::engine::{Engine, LabelFilters};
use crate::error::EngineError;
use crate::spec::ServiceSpec;

/// Manage containers from declarative service specs.
#[derive(Parser)]
#[command(name = "service-engine")]
#[command(about = "Create, run and inspect containers from declarative service specs")]
#[command(version)]
#[command(
    long_about = "service-engine translates YAML service specs into container runtime calls.\n\nExample usage:\n  service-engine pull nginx:1.25\n  service-engine create --name web-0 --file web.yaml\n  service-engine ps --label app=web --all"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    /// Docker daemon address (overrides ENGINE_DOCKER_HOST and DOCKER_HOST).
    #[arg(long, global = true)]
    pub host: Option<String>,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Pull an image.
    Pull(PullArgs),

    /// Create a container from a service spec file and print its ID.
    Create(CreateArgs),

    /// Start a created container.
    Start(ContainerArgs),

    /// Stop a running container.
    Stop(RemovalArgs),

    /// Remove a container.
    #[command(alias = "remove")]
    Rm(RemovalArgs),

    /// List containers, optionally filtered by label.
    #[command(alias = "list")]
    Ps(PsArgs),
}

/// Arguments for `service-engine pull`.
#[derive(Parser, Debug)]
pub struct PullArgs {
    /// Image reference (e.g. nginx:1.25).
    pub image: String,
}

/// Arguments for `service-engine create`.
#[derive(Parser, Debug)]
pub struct CreateArgs {
    /// Container name.
    #[arg(short, long)]
    pub name: String,

    /// Path to the YAML service spec.
    #[arg(short, long)]
    pub file: PathBuf,
}

/// Arguments naming one container.
#[derive(Parser, Debug)]
pub struct ContainerArgs {
    /// Container ID or name.
    pub id: String,
}

/// Arguments for `service-engine stop` and `service-engine rm`.
#[derive(Parser, Debug)]
pub struct RemovalArgs {
    /// Container ID or name.
    pub id: String,

    /// Succeed when the container does not exist.
    #[arg(long)]
    pub ignore_missing: bool,
}

/// Arguments for `service-engine ps`.
#[derive(Parser, Debug)]
pub struct PsArgs {
    /// Label selector, `key` or `key=value`. Repeat to require several.
    #[arg(short, long = "label")]
    pub labels: Vec<String>,

    /// Include stopped containers.
    #[arg(short, long)]
    pub all: bool,

    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// Parse CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
///
/// Builds the engine configuration from the environment, applies `--host`,
/// connects, and executes the subcommand.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    let mut config = EngineConfig::from_env().context("Invalid engine configuration")?;
    if let Some(host) = cli.host {
        config = config.with_docker_host(host);
        config.validate().context("Invalid --host")?;
    }

    let engine = DockerEngine::connect(&config)?;
    execute(&engine, cli.command, config.operation_timeout).await
}

/// Executes one subcommand against `engine`.
pub async fn execute<E>(engine: &E, command: Commands, limit: Duration) -> anyhow::Result<()>
where
    E: Engine + ?Sized,
{
    match command {
        Commands::Pull(args) => {
            bounded(limit, engine.pull_image(&args.image))
                .await?
                .with_context(|| format!("Failed to pull image {}", args.image))?;
            info!(image = %args.image, "Image pulled");
        }
        Commands::Create(args) => {
            let spec = ServiceSpec::from_yaml_file(&args.file)
                .with_context(|| format!("Failed to load spec {}", args.file.display()))?;
            let id = bounded(limit, engine.create_container(&args.name, &spec))
                .await?
                .with_context(|| format!("Failed to create container {}", args.name))?;
            info!(container = %args.name, id = %id, "Container created");
            println!("{id}");
        }
        Commands::Start(args) => {
            bounded(limit, engine.start_container(&args.id))
                .await?
                .with_context(|| format!("Failed to start container {}", args.id))?;
            info!(container = %args.id, "Container started");
        }
        Commands::Stop(args) => {
            let result = bounded(limit, engine.stop_container(&args.id)).await?;
            tolerate_missing(result, &args)
                .with_context(|| format!("Failed to stop container {}", args.id))?;
        }
        Commands::Rm(args) => {
            let result = bounded(limit, engine.remove_container(&args.id)).await?;
            tolerate_missing(result, &args)
                .with_context(|| format!("Failed to remove container {}", args.id))?;
        }
        Commands::Ps(args) => {
            let filters = LabelFilters::from_selectors(&args.labels);
            let instances = bounded(limit, engine.list_matching(&filters, args.all))
                .await?
                .context("Failed to list containers")?;

            if args.json {
                println!("{}", serde_json::to_string_pretty(&instances)?);
            } else {
                println!("{:<16} {:<8} LABELS", "ID", "RUNNING");
                for instance in &instances {
                    let labels: Vec<String> = instance
                        .labels
                        .iter()
                        .map(|(k, v)| format!("{k}={v}"))
                        .collect();
                    let short_id: String = instance.id.chars().take(12).collect();
                    println!("{:<16} {:<8} {}", short_id, instance.running, labels.join(","));
                }
            }
        }
    }
    Ok(())
}

/// Runs `operation` under a deadline; dropping it on expiry cancels the request.
async fn bounded<T, F>(limit: Duration, operation: F) -> anyhow::Result<Result<T, EngineError>>
where
    F: Future<Output = Result<T, EngineError>>,
{
    tokio::time::timeout(limit, operation)
        .await
        .map_err(|_| anyhow!("Operation timed out after {}s", limit.as_secs()))
}

fn tolerate_missing(result: Result<(), EngineError>, args: &RemovalArgs) -> Result<(), EngineError> {
    match result {
        Err(e) if e.is_not_found() && args.ignore_missing => {
            info!(container = %args.id, "Container not found, nothing to do");
            Ok(())
        }
        other => other,
    }
}
