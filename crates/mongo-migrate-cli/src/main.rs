//! mongo-migrate CLI - forward-only migrations for MongoDB and Cosmos DB.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use mongo_migrate::descriptor::parse_descriptor;
use mongo_migrate::{
    Action, AzureCli, CommandTarget, Config, ConnectionInfo, DeploymentMode, Engine, FixedPacing,
    Ledger, MigrateError, MongoStateBackend, MongoTarget, NoPacing, Orchestrator, Pacing,
    ProvisionContext, ProvisionIntent, Provisioner, Resolver, RunStatus,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "mongo-migrate")]
#[command(about = "MongoDB and Cosmos DB migration tool with minimal api")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// MongoDB connection URI (overrides connection.uri)
    #[arg(long, env = "URI", hide_env_values = true)]
    uri: Option<String>,

    /// Azure resource group of the Cosmos DB account
    #[arg(long, env = "RESOURCE_GROUP")]
    resource_group: Option<String>,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the migration history
    Init,

    /// Apply all pending migrations
    Up {
        /// Directory of your JSON files [default: migrations]
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Dry run: list pending migrations without applying them
        #[arg(long)]
        dry_run: bool,
    },

    /// Re-run the commands of one descriptor without recording it
    Fix {
        /// Descriptor file
        file: PathBuf,

        /// Skip the administrative command
        #[arg(long)]
        skip_admin: bool,
    },

    /// Set the recorded version, e.g. after a manual repair
    Revert {
        /// Version (descriptor file name) to record
        version: String,
    },

    /// Show the recorded version and pending migrations
    Status {
        /// Directory of your JSON files [default: migrations]
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Print the indexes of a collection
    Index {
        /// Collection name
        collection: String,
    },

    /// Run one collection action through the Azure CLI
    Collection {
        /// create, delete, list, show or exists
        action: Action,

        /// Collection name
        #[arg(short, long)]
        name: Option<String>,

        /// JSON file with the collection settings (shardKey, autoScale, throughput, ...)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if e.is_ledger_failure() {
                eprintln!("!!! The migration was applied but NOT recorded in the migration history.");
                eprintln!("!!! Record it with `mongo-migrate revert <version>` before running `up` again.\n");
            }
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(|e| MigrateError::Config(e.to_string()))?;

    let mut config = match &cli.config {
        Some(path) => {
            let config = Config::load(path)?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => Config::default(),
    };

    // Apply overrides
    if let Some(uri) = cli.uri.clone() {
        config.connection.uri = Some(uri);
    }
    if let Some(rg) = cli.resource_group.clone() {
        config.provisioning.resource_group = rg;
    }
    match &cli.command {
        Commands::Up { dir: Some(dir), .. } | Commands::Status { dir: Some(dir) } => {
            config.migration.dir = dir.clone();
        }
        _ => {}
    }
    config.validate()?;

    let info = config.connection_info()?;
    let mode = config.deployment_mode()?;

    // Provisioning only needs the parsed URI.
    if let Commands::Collection { action, name, file } = &cli.command {
        return collection(&cli, &config, &info, mode, *action, name.as_deref(), file.as_deref())
            .await;
    }

    let target = Arc::new(MongoTarget::connect(&info, config.connect_timeout()).await?);
    let ledger = Ledger::new(Arc::new(MongoStateBackend::new(target.database())));

    match cli.command {
        Commands::Collection { .. } => unreachable!(), // Handled above

        Commands::Init => {
            ledger.initialize().await?;
            println!("Migration history initialized in {}", info.database);
        }

        Commands::Up { dry_run, .. } => {
            let pacing: Arc<dyn Pacing> = if config.pacing().is_zero() {
                Arc::new(NoPacing)
            } else {
                Arc::new(FixedPacing(config.pacing()))
            };
            let orchestrator = Orchestrator::new(
                engine(&config, &info, mode, target, ledger.clone()),
                ledger,
                resolver(&config, &info),
                &config.migration.dir,
            )
            .with_pacing(pacing);

            if dry_run {
                let plan = orchestrator.plan().await?;
                if cli.output_json {
                    println!("{}", serde_json::to_string_pretty(&plan)?);
                } else if plan.is_empty() {
                    println!("Nothing to apply.");
                } else {
                    println!("Pending migrations:");
                    for version in &plan {
                        println!("  {}", version);
                    }
                }
                return Ok(());
            }

            let cancel_token = setup_signal_handler()?;
            let result = orchestrator.run(cancel_token).await?;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                let status_msg = match result.status {
                    RunStatus::Completed => "Migration completed!",
                    RunStatus::Cancelled => "Migration cancelled.",
                };
                println!("\n{}", status_msg);
                println!("  Run ID: {}", result.run_id);
                println!("  Duration: {:.2}s", result.duration_seconds);
                println!("  Applied: {}", result.applied.len());
                for version in &result.applied {
                    println!("    {}", version);
                }
                println!("  Current: {}", result.pointer);
            }

            if result.status == RunStatus::Cancelled {
                return Err(MigrateError::Cancelled);
            }
        }

        Commands::Fix { file, skip_admin } => {
            let descriptor = parse_descriptor(&file, &info.database)?;
            engine(&config, &info, mode, target, ledger)
                .fix(&descriptor, skip_admin)
                .await?;
            println!("Re-applied {}", descriptor.version);
        }

        Commands::Revert { version } => {
            let previous = ledger.revert(&version).await?;
            println!(
                "Recorded version changed from {} to {}",
                previous.as_deref().unwrap_or("(none)"),
                version
            );
        }

        Commands::Status { .. } => {
            let current = ledger.current().await?;
            let pending = resolver(&config, &info).pending(&config.migration.dir, &current)?;

            if cli.output_json {
                let status = serde_json::json!({
                    "database": info.database,
                    "mode": mode,
                    "current": current,
                    "pending": pending,
                });
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("Database: {} ({} mode)", info.database, mode);
                println!("Current:  {}", current);
                println!("Pending:  {}", pending.len());
                for version in &pending {
                    println!("  {}", version);
                }
            }
        }

        Commands::Index { collection } => {
            let indexes = target.list_indexes(&collection).await?;
            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&indexes)?);
            } else {
                println!("Indexes on {}.{}:", info.database, collection);
                for index in &indexes {
                    println!("  {}", index);
                }
            }
        }
    }

    Ok(())
}

fn engine(
    config: &Config,
    info: &ConnectionInfo,
    mode: DeploymentMode,
    target: Arc<MongoTarget>,
    ledger: Ledger,
) -> Engine {
    Engine::new(
        target,
        ledger,
        Arc::new(AzureCli::new(&config.provisioning.executable)),
        mode,
        provision_context(config, info),
    )
}

fn resolver(config: &Config, info: &ConnectionInfo) -> Resolver {
    Resolver::new(&info.database).with_policy(config.migration.on_unknown_pointer)
}

fn provision_context(config: &Config, info: &ConnectionInfo) -> ProvisionContext {
    ProvisionContext::new(
        &config.provisioning.resource_group,
        &info.username,
        &info.database,
    )
}

async fn collection(
    cli: &Cli,
    config: &Config,
    info: &ConnectionInfo,
    mode: DeploymentMode,
    action: Action,
    name: Option<&str>,
    file: Option<&Path>,
) -> Result<(), MigrateError> {
    if mode != DeploymentMode::ManagedCloud {
        return Err(MigrateError::InvalidInput(format!(
            "collection commands need a managed cloud account, but {} is {}",
            info.hostname(),
            mode
        )));
    }

    let mut intent = match file {
        Some(path) => {
            let content = std::fs::read_to_string(path).map_err(|source| {
                MigrateError::DescriptorRead {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
            serde_json::from_str::<ProvisionIntent>(&content)?
        }
        None => ProvisionIntent::default(),
    };
    if let Some(name) = name {
        intent.collection = name.to_string();
    }

    let args = intent.command_args(action, &provision_context(config, info))?;
    if !intent.description.is_empty() {
        info!("{}", intent.description);
    }

    let output = AzureCli::new(&config.provisioning.executable)
        .execute(&args)
        .await?;

    if cli.output_json || !output.trim().is_empty() {
        println!("{}", output.trim_end());
    } else {
        warn!("{} returned no output", action);
    }

    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => "debug",
        "info" => "info",
        "warn" => "warn",
        "error" => "error",
        other => return Err(format!("unknown verbosity '{}'", other)),
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        "json" => subscriber.json().init(),
        "text" => subscriber.init(),
        other => return Err(format!("unknown log format '{}'", other)),
    }

    Ok(())
}

/// Setup signal handlers for graceful shutdown.
/// Handles both SIGINT (Ctrl-C) and SIGTERM.
/// Returns a CancellationToken that is cancelled when a signal is received;
/// the migration in progress still runs to completion.
#[cfg(unix)]
fn setup_signal_handler() -> Result<CancellationToken, MigrateError> {
    let cancel_token = CancellationToken::new();

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let token = cancel_token.clone();
    tokio::spawn(async move {
        let name = tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
        };
        eprintln!("\nReceived {}. Stopping after the current migration...", name);
        token.cancel();
    });

    Ok(cancel_token)
}

/// Setup signal handler for Windows (only Ctrl-C)
#[cfg(not(unix))]
fn setup_signal_handler() -> Result<CancellationToken, MigrateError> {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C. Stopping after the current migration...");
            token.cancel();
        }
    });

    Ok(cancel_token)
}
