//! Database-backed progress pointer.
//!
//! The pointer lives in the `migrations` collection of the working database
//! as a single `{ "latest": "<version>" }` document.

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use mongodb::options::UpdateOptions;
use mongodb::{Collection, Database};

use super::backend::StateBackend;
use super::{MIGRATION_COLLECTION, MIGRATION_KEY};
use crate::error::{MigrateError, Result};

/// MongoDB state backend for the progress pointer.
pub struct MongoStateBackend {
    collection: Collection<Document>,
}

impl MongoStateBackend {
    /// Create a backend storing the pointer in `db.migrations`.
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(MIGRATION_COLLECTION),
        }
    }

    fn filter() -> Document {
        doc! { MIGRATION_KEY: { "$exists": true } }
    }
}

#[async_trait]
impl StateBackend for MongoStateBackend {
    async fn load_pointer(&self) -> Result<Option<String>> {
        let found = self.collection.find_one(Self::filter(), None).await?;

        match found {
            None => Ok(None),
            Some(record) => match record.get(MIGRATION_KEY) {
                Some(Bson::String(value)) => Ok(Some(value.clone())),
                other => Err(MigrateError::State(format!(
                    "pointer field '{}' is not a string: {:?}",
                    MIGRATION_KEY, other
                ))),
            },
        }
    }

    async fn insert_pointer(&self, value: &str) -> Result<()> {
        self.collection
            .insert_one(doc! { MIGRATION_KEY: value }, None)
            .await?;
        Ok(())
    }

    async fn upsert_pointer(&self, value: &str) -> Result<()> {
        let opts = UpdateOptions::builder().upsert(true).build();
        self.collection
            .update_one(
                Self::filter(),
                doc! { "$set": { MIGRATION_KEY: value } },
                opts,
            )
            .await?;
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "mongodb"
    }
}
