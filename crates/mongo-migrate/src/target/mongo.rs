//! MongoDB driver-backed target.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use mongodb::options::{ClientOptions, ReadPreference, SelectionCriteria};
use mongodb::{Client, Database};
use tracing::{debug, info};

use super::CommandTarget;
use crate::error::{MigrateError, Result};
use crate::uri::ConnectionInfo;

/// Connected MongoDB client bound to the working database.
pub struct MongoTarget {
    client: Client,
    db: Database,
}

impl MongoTarget {
    /// Connect and verify the server is reachable on the primary.
    pub async fn connect(info: &ConnectionInfo, timeout: Duration) -> Result<Self> {
        let mut options = ClientOptions::parse(info.as_str()).await?;
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);
        options.app_name = Some("mongo-migrate".to_string());

        let client = Client::with_options(options)?;
        let db = client.database(&info.database);
        let target = Self { client, db };

        let started = Instant::now();
        target
            .client
            .database("admin")
            .run_command(doc! { "ping": 1 }, primary())
            .await?;
        info!(
            "Connected to {} (database: {}, {}ms)",
            info.host,
            info.database,
            started.elapsed().as_millis()
        );

        Ok(target)
    }

    /// Handle to the working database, for the ledger backend.
    pub fn database(&self) -> &Database {
        &self.db
    }
}

fn primary() -> Option<SelectionCriteria> {
    Some(SelectionCriteria::ReadPreference(ReadPreference::Primary))
}

#[async_trait]
impl CommandTarget for MongoTarget {
    fn database_name(&self) -> &str {
        self.db.name()
    }

    async fn run_admin_command(&self, command: Document) -> Result<Document> {
        debug!("admin command: {}", command);
        Ok(self
            .client
            .database("admin")
            .run_command(command, primary())
            .await?)
    }

    async fn run_command(&self, command: Document) -> Result<Document> {
        debug!("command on {}: {}", self.db.name(), command);
        Ok(self.db.run_command(command, primary()).await?)
    }

    async fn list_indexes(&self, collection: &str) -> Result<Vec<Document>> {
        let reply = self
            .db
            .run_command(
                doc! { "listIndexes": collection, "maxTimeMS": 2000 },
                primary(),
            )
            .await?;

        let batch = reply
            .get_document("cursor")
            .and_then(|c| c.get_array("firstBatch"))
            .map_err(|e| MigrateError::State(format!("unexpected listIndexes reply: {}", e)))?;

        Ok(batch
            .iter()
            .filter_map(|b| match b {
                Bson::Document(d) => Some(d.clone()),
                _ => None,
            })
            .collect())
    }
}
