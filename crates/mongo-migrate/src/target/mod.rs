//! Target database abstraction.
//!
//! [`CommandTarget`] is everything the engine needs from a database
//! connection: run a command as administrator, run a command against the
//! working database, and read index metadata. [`MongoTarget`] is the
//! driver-backed implementation; it is constructed once and passed into
//! the components that need it.

mod mongo;

pub use mongo::MongoTarget;

use async_trait::async_trait;
use bson::Document;

use crate::error::Result;

/// Database handle used by the execution engine.
#[async_trait]
pub trait CommandTarget: Send + Sync {
    /// Name of the working database.
    fn database_name(&self) -> &str;

    /// Run a command against the `admin` database.
    async fn run_admin_command(&self, command: Document) -> Result<Document>;

    /// Run a command against the working database.
    async fn run_command(&self, command: Document) -> Result<Document>;

    /// Index specifications of a collection in the working database.
    async fn list_indexes(&self, collection: &str) -> Result<Vec<Document>>;
}
