//! Migration orchestrator - the apply loop.

mod pacing;

pub use pacing::{FixedPacing, NoPacing, Pacing};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::engine::Engine;
use crate::error::{MigrateError, Result};
use crate::resolver::Resolver;
use crate::state::Ledger;

/// Migration orchestrator.
pub struct Orchestrator {
    engine: Engine,
    ledger: Ledger,
    resolver: Resolver,
    dir: PathBuf,
    pacing: Arc<dyn Pacing>,
}

/// Overall run status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Cancelled,
}

/// Result of a migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    /// Unique run identifier.
    pub run_id: String,

    pub status: RunStatus,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Versions applied by this run, in order.
    pub applied: Vec<String>,

    /// Pointer value at the end of the run.
    pub pointer: String,
}

impl MigrationResult {
    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Orchestrator {
    /// Create a new orchestrator over `dir`.
    pub fn new(engine: Engine, ledger: Ledger, resolver: Resolver, dir: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            ledger,
            resolver,
            dir: dir.into(),
            pacing: Arc::new(FixedPacing::default()),
        }
    }

    /// Set the pause policy between migrations.
    pub fn with_pacing(mut self, pacing: Arc<dyn Pacing>) -> Self {
        self.pacing = pacing;
        self
    }

    /// Versions that a run would apply, without applying them.
    pub async fn plan(&self) -> Result<Vec<String>> {
        let current = self.ledger.current().await?;
        self.resolve(move |resolver, dir| resolver.pending(dir, &current))
            .await
    }

    /// Run a directory scan on the blocking pool.
    async fn resolve<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Resolver, &Path) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let resolver = self.resolver.clone();
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || f(&resolver, &dir))
            .await
            .map_err(|e| MigrateError::State(format!("directory scan task failed: {}", e)))?
    }

    /// Apply every pending migration in order.
    ///
    /// Stops at the first failure. `cancel` is only checked between
    /// migrations; a migration that has started always runs to the end.
    pub async fn run(&self, cancel: CancellationToken) -> Result<MigrationResult> {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let mut applied: Vec<String> = Vec::new();

        info!(
            "Starting migration run {} from {} ({} mode)",
            run_id,
            self.dir.display(),
            self.engine.mode()
        );

        let status = loop {
            if cancel.is_cancelled() {
                warn!("Cancellation requested; stopping before the next migration");
                break RunStatus::Cancelled;
            }

            let current = self.ledger.current().await?;
            let next = self
                .resolve(move |resolver, dir| resolver.next(dir, &current))
                .await?;
            let Some(next) = next else {
                info!("No more migrations");
                break RunStatus::Completed;
            };

            if let Err(e) = self.engine.apply(&next).await {
                error!(
                    "Migration {} failed after {} applied in this run",
                    next.version,
                    applied.len()
                );
                return Err(e);
            }
            applied.push(next.version);

            let delay = self.pacing.delay(applied.len());
            if !delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => {}
                }
            }
        };

        let pointer = self.ledger.current().await?;
        let completed_at = Utc::now();
        let result = MigrationResult {
            run_id,
            status,
            started_at,
            completed_at,
            duration_seconds: (completed_at - started_at).num_milliseconds() as f64 / 1000.0,
            applied,
            pointer,
        };

        info!(
            "Migration run {:?}: {} applied in {:.1}s, pointer at {}",
            result.status,
            result.applied.len(),
            result.duration_seconds,
            result.pointer
        );

        Ok(result)
    }
}
