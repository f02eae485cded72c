//! # mongo-migrate
//!
//! Forward-only schema migrations for MongoDB and Azure Cosmos DB (MongoDB API).
//!
//! Migrations are JSON descriptor files applied in file-name order. Each one
//! may carry:
//!
//! - **`adminCommand`**: run against the `admin` database locally, or
//!   translated into an `az cosmosdb mongodb collection create` call on a
//!   managed cloud account
//! - **`command`**: a database command run against the working database
//!
//! Progress is a single pointer record in the `migrations` collection of
//! the working database.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use mongo_migrate::{
//!     AzureCli, Config, Engine, Ledger, MongoStateBackend, MongoTarget, Orchestrator,
//!     ProvisionContext, Resolver,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> mongo_migrate::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let info = config.connection_info()?;
//!     let target = Arc::new(MongoTarget::connect(&info, config.connect_timeout()).await?);
//!     let ledger = Ledger::new(Arc::new(MongoStateBackend::new(target.database())));
//!
//!     let engine = Engine::new(
//!         target,
//!         ledger.clone(),
//!         Arc::new(AzureCli::default()),
//!         config.deployment_mode()?,
//!         ProvisionContext::new("my-group", &info.username, &info.database),
//!     );
//!     let orchestrator = Orchestrator::new(engine, ledger, Resolver::new(&info.database), "migrations");
//!     let result = orchestrator.run(CancellationToken::new()).await?;
//!     println!("Applied {} migrations", result.applied.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod provision;
pub mod resolver;
pub mod state;
pub mod target;
pub mod uri;

#[cfg(test)]
mod testing;

// Re-exports for convenient access
pub use config::{Config, ConnectionConfig, MigrationConfig, ModeSetting, ProvisioningConfig};
pub use descriptor::{Descriptor, RawCommand};
pub use engine::Engine;
pub use error::{MigrateError, Result};
pub use orchestrator::{FixedPacing, MigrationResult, NoPacing, Orchestrator, Pacing, RunStatus};
pub use provision::{Action, AzureCli, ProvisionContext, ProvisionIntent, Provisioner};
pub use resolver::{Resolver, UnknownPointerPolicy};
pub use state::{Ledger, MongoStateBackend, StateBackend, INITIAL_VERSION};
pub use target::{CommandTarget, MongoTarget};
pub use uri::{ConnectionInfo, DeploymentMode};
