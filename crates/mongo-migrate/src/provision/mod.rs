//! Collection provisioning for Azure Cosmos DB for MongoDB.
//!
//! On Cosmos DB, collection-level administration (shard keys, RU/s) goes
//! through the Azure CLI rather than database commands. A
//! [`ProvisionIntent`] is the administrative payload of a descriptor in
//! managed-cloud mode; [`ProvisionIntent::command_args`] turns it into an
//! `az cosmosdb mongodb collection ...` argument list.
//!
//! Throughput rules for `create`:
//!
//! | sharedRU | autoScale | emitted flag            | minimum |
//! |----------|-----------|-------------------------|---------|
//! | true     | any       | none                    | -       |
//! | false    | true      | `--max-throughput N`    | 4000    |
//! | false    | false/unset | `--throughput N`      | 400     |
//!
//! Database-shared RU/s cannot later be switched to dedicated RU/s, so the
//! choice is made explicitly in every intent.

mod azure;

pub use azure::{AzureCli, Provisioner};

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use tracing::warn;

use crate::error::{MigrateError, Result};

/// Minimum RU/s for autoscale (maximum throughput).
pub const MIN_AUTOSCALE_THROUGHPUT: i64 = 4000;

/// Minimum RU/s for manual throughput.
pub const MIN_MANUAL_THROUGHPUT: i64 = 400;

/// Collection to create or inspect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProvisionIntent {
    /// Free text, logged before the tool runs.
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub collection: String,

    #[serde(default, rename = "shardKey")]
    pub shard_key: String,

    /// Use the database's shared RU/s instead of dedicated throughput.
    #[serde(default, rename = "sharedRU")]
    pub shared_ru: bool,

    #[serde(default, rename = "autoScale")]
    pub autoscale: Option<bool>,

    #[serde(default)]
    pub throughput: Option<i64>,
}

/// `az cosmosdb mongodb collection` sub-command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Delete,
    List,
    Show,
    Exists,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Delete => "delete",
            Action::List => "list",
            Action::Show => "show",
            Action::Exists => "exists",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "create" => Ok(Action::Create),
            "delete" => Ok(Action::Delete),
            "list" => Ok(Action::List),
            "show" => Ok(Action::Show),
            "exists" => Ok(Action::Exists),
            other => Err(MigrateError::InvalidAction(other.to_string())),
        }
    }
}

/// Where the collection lives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionContext {
    pub resource_group: String,
    /// Cosmos DB account; the same string as the connection username.
    pub account: String,
    pub database: String,
}

impl ProvisionContext {
    pub fn new(
        resource_group: impl Into<String>,
        account: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            resource_group: resource_group.into(),
            account: account.into(),
            database: database.into(),
        }
    }
}

impl ProvisionIntent {
    /// Intent naming only a collection, for inspection actions.
    pub fn for_collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            ..Self::default()
        }
    }

    /// Build the provisioning tool arguments for `action`.
    pub fn command_args(&self, action: Action, ctx: &ProvisionContext) -> Result<Vec<String>> {
        if action != Action::List && self.collection.is_empty() {
            return Err(MigrateError::MissingField("collection"));
        }
        if ctx.resource_group.is_empty() {
            return Err(MigrateError::MissingField("resource_group"));
        }
        if ctx.account.is_empty() {
            return Err(MigrateError::MissingField("account"));
        }
        if ctx.database.is_empty() {
            return Err(MigrateError::MissingField("database"));
        }

        let mut args: Vec<String> = ["cosmosdb", "mongodb", "collection", action.as_str()]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.extend([
            "-g".to_string(),
            ctx.resource_group.clone(),
            "-a".to_string(),
            ctx.account.clone(),
            "-d".to_string(),
            ctx.database.clone(),
        ]);

        if action == Action::List {
            return Ok(args);
        }
        args.extend(["-n".to_string(), self.collection.clone()]);

        if action == Action::Create {
            self.append_create_flags(&mut args)?;
        }

        Ok(args)
    }

    fn append_create_flags(&self, args: &mut Vec<String>) -> Result<()> {
        if self.shard_key.is_empty() {
            return Err(MigrateError::MissingShardKey {
                collection: self.collection.clone(),
            });
        }
        args.extend(["--shard".to_string(), self.shard_key.clone()]);

        if self.shared_ru {
            if self.throughput.is_some() {
                warn!(
                    "Collection {} uses shared RU/s; ignoring throughput {:?}",
                    self.collection, self.throughput
                );
            }
            return Ok(());
        }

        let throughput = self.throughput.ok_or_else(|| MigrateError::ConflictingThroughput {
            collection: self.collection.clone(),
        })?;

        if self.autoscale.unwrap_or(false) {
            if throughput < MIN_AUTOSCALE_THROUGHPUT {
                return Err(MigrateError::AutoscaleThroughputTooLow { throughput });
            }
            args.extend(["--max-throughput".to_string(), throughput.to_string()]);
        } else {
            if throughput < MIN_MANUAL_THROUGHPUT {
                return Err(MigrateError::ManualThroughputTooLow { throughput });
            }
            args.extend(["--throughput".to_string(), throughput.to_string()]);
        }

        Ok(())
    }
}
