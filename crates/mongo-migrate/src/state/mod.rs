//! Migration ledger: the single persisted progress pointer.
//!
//! The pointer holds the version of the most recently applied descriptor,
//! or [`INITIAL_VERSION`] when nothing has been applied yet.

mod backend;
mod db;

pub use backend::StateBackend;
pub use db::MongoStateBackend;

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{MigrateError, Result};

/// Collection holding the pointer record.
pub const MIGRATION_COLLECTION: &str = "migrations";

/// Field of the pointer record.
pub const MIGRATION_KEY: &str = "latest";

/// Pointer value meaning "no descriptor applied yet".
pub const INITIAL_VERSION: &str = "0";

/// Progress pointer over an injected storage backend.
#[derive(Clone)]
pub struct Ledger {
    backend: Arc<dyn StateBackend>,
}

impl Ledger {
    pub fn new(backend: Arc<dyn StateBackend>) -> Self {
        Self { backend }
    }

    /// Create the pointer record with the initial value.
    ///
    /// Fails when a record already exists, so a live history is never
    /// reset by accident.
    pub async fn initialize(&self) -> Result<()> {
        if let Some(existing) = self.backend.load_pointer().await? {
            debug!("Pointer already present at {}", existing);
            return Err(MigrateError::AlreadyInitialized {
                key: MIGRATION_KEY.to_string(),
            });
        }

        self.backend.insert_pointer(INITIAL_VERSION).await?;
        info!(
            "Initialized migration history ({} backend)",
            self.backend.backend_type()
        );
        Ok(())
    }

    /// Current pointer value.
    pub async fn current(&self) -> Result<String> {
        self.backend
            .load_pointer()
            .await?
            .ok_or(MigrateError::NotInitialized)
    }

    /// Record `version` as the latest applied descriptor.
    pub async fn advance(&self, version: &str) -> Result<()> {
        self.backend.upsert_pointer(version).await?;
        debug!("Pointer advanced to {}", version);
        Ok(())
    }

    /// Operator override: move the pointer to an arbitrary, possibly earlier, version.
    ///
    /// Works on an uninitialized history too. Returns the previous value.
    pub async fn revert(&self, version: &str) -> Result<Option<String>> {
        if version.is_empty() {
            return Err(MigrateError::InvalidInput(
                "version to revert to is required".into(),
            ));
        }
        let previous = self.backend.load_pointer().await?;
        self.advance(version).await?;
        info!(
            "Pointer set to {} (was {})",
            version,
            previous.as_deref().unwrap_or("unset")
        );
        Ok(previous)
    }
}
