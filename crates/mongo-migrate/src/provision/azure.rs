//! External provisioning tool invocation.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error};

use crate::error::{MigrateError, Result};

/// Runs a provisioning tool with an argument list.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Run the tool and return its captured standard output.
    async fn execute(&self, args: &[String]) -> Result<String>;
}

/// The Azure CLI (`az`).
#[derive(Debug, Clone)]
pub struct AzureCli {
    executable: String,
}

impl AzureCli {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
        }
    }
}

impl Default for AzureCli {
    fn default() -> Self {
        Self::new("az")
    }
}

#[async_trait]
impl Provisioner for AzureCli {
    async fn execute(&self, args: &[String]) -> Result<String> {
        debug!("{} {}", self.executable, args.join(" "));

        let output = Command::new(&self.executable)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!("{} command failed: {}", self.executable, stderr);
            return Err(MigrateError::Provisioner {
                status: output.status.to_string(),
                stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_stdout() {
        let cli = AzureCli::new("echo");
        let out = cli
            .execute(&["cosmosdb".to_string(), "mongodb".to_string()])
            .await
            .unwrap();
        assert_eq!(out.trim(), "cosmosdb mongodb");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_error() {
        let cli = AzureCli::new("false");
        assert!(matches!(
            cli.execute(&[]).await,
            Err(MigrateError::Provisioner { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_executable_is_io_error() {
        let cli = AzureCli::new("definitely-not-an-installed-tool");
        assert!(matches!(cli.execute(&[]).await, Err(MigrateError::Io(_))));
    }
}
