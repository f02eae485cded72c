//! Execution engine: applies one descriptor.
//!
//! A migration runs strictly in order:
//!
//! 1. **Admin** (when the descriptor has `adminCommand`): a database command
//!    against `admin` in local mode, or an `az` collection create in
//!    managed-cloud mode.
//! 2. **General** (when the descriptor has `command`): a database command
//!    against the working database.
//! 3. **Ledger**: the pointer is advanced to the descriptor version.
//!
//! Any failure stops the remaining phases. There is no rollback.

use std::sync::Arc;

use bson::{Bson, Document};
use tracing::{error, info};

use crate::descriptor::Descriptor;
use crate::error::{MigrateError, Result};
use crate::provision::{Action, ProvisionContext, ProvisionIntent, Provisioner};
use crate::state::Ledger;
use crate::target::CommandTarget;
use crate::uri::DeploymentMode;

/// Applies descriptors against a target.
pub struct Engine {
    target: Arc<dyn CommandTarget>,
    ledger: Ledger,
    provisioner: Arc<dyn Provisioner>,
    mode: DeploymentMode,
    context: ProvisionContext,
}

impl Engine {
    pub fn new(
        target: Arc<dyn CommandTarget>,
        ledger: Ledger,
        provisioner: Arc<dyn Provisioner>,
        mode: DeploymentMode,
        context: ProvisionContext,
    ) -> Self {
        Self {
            target,
            ledger,
            provisioner,
            mode,
            context,
        }
    }

    pub fn mode(&self) -> DeploymentMode {
        self.mode
    }

    /// Apply a descriptor and record it in the ledger.
    pub async fn apply(&self, descriptor: &Descriptor) -> Result<()> {
        info!(
            "Applying {} to {} ({} mode)",
            descriptor.version,
            self.target.database_name(),
            self.mode
        );

        self.run_phases(descriptor, false).await?;

        if let Err(e) = self.ledger.advance(&descriptor.version).await {
            error!(
                "{} ({}) was applied but the ledger could not be advanced; \
                 set the pointer with `revert {}` before running again",
                descriptor.version,
                descriptor.path.display(),
                descriptor.version
            );
            return Err(MigrateError::ledger_failed(&descriptor.version, e));
        }

        info!("Applied {}", descriptor.version);
        Ok(())
    }

    /// Re-run a descriptor's commands without touching the ledger.
    pub async fn fix(&self, descriptor: &Descriptor, skip_admin: bool) -> Result<()> {
        info!(
            "Re-applying {} (admin phase {})",
            descriptor.version,
            if skip_admin { "skipped" } else { "enabled" }
        );
        self.run_phases(descriptor, skip_admin).await
    }

    async fn run_phases(&self, descriptor: &Descriptor, skip_admin: bool) -> Result<()> {
        if !descriptor.admin.is_empty() && !skip_admin {
            self.admin_phase(descriptor)
                .await
                .map_err(|e| MigrateError::admin_failed(&descriptor.version, e))?;
        }

        if !descriptor.general.is_empty() {
            self.general_phase(descriptor)
                .await
                .map_err(|e| MigrateError::general_failed(&descriptor.version, e))?;
        }

        Ok(())
    }

    async fn admin_phase(&self, descriptor: &Descriptor) -> Result<()> {
        match self.mode {
            DeploymentMode::Local => {
                let command = descriptor.admin.to_document()?;
                let reply = self.target.run_admin_command(command).await?;
                check_reply(&reply)?;
            }
            DeploymentMode::ManagedCloud => {
                let intent: ProvisionIntent = descriptor.admin.deserialize()?;
                if !intent.description.is_empty() {
                    info!("{}", intent.description);
                }
                let args = intent.command_args(Action::Create, &self.context)?;
                self.provisioner.execute(&args).await?;
            }
        }
        Ok(())
    }

    async fn general_phase(&self, descriptor: &Descriptor) -> Result<()> {
        let command = descriptor.general.to_document()?;
        let reply = self.target.run_command(command).await?;
        check_reply(&reply)
    }
}

/// Fail on `writeErrors` / `writeConcernError`, which arrive with `ok: 1`.
fn check_reply(reply: &Document) -> Result<()> {
    if let Ok(errors) = reply.get_array("writeErrors") {
        if !errors.is_empty() {
            let first = errors
                .first()
                .and_then(Bson::as_document)
                .and_then(|e| e.get_str("errmsg").ok())
                .unwrap_or("unknown error");
            return Err(MigrateError::WriteErrors(format!(
                "{} failed, first: {}",
                errors.len(),
                first
            )));
        }
    }
    if let Ok(concern) = reply.get_document("writeConcernError") {
        let message = concern.get_str("errmsg").unwrap_or("unknown error");
        return Err(MigrateError::WriteErrors(format!(
            "write concern: {}",
            message
        )));
    }
    Ok(())
}
