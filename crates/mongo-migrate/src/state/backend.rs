//! State backend trait for the progress pointer.
//!
//! The [`StateBackend`] trait is the storage seam under the [`Ledger`]:
//! it knows how to read, insert and upsert the single pointer record, but
//! none of the lifecycle rules. Those live in the ledger.
//!
//! - **MongoDB**: [`MongoStateBackend`] in `db.rs`
//!
//! [`Ledger`]: super::Ledger
//! [`MongoStateBackend`]: super::MongoStateBackend

use async_trait::async_trait;

use crate::error::Result;

/// Trait for progress pointer persistence backends.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so the ledger can be shared
/// behind an `Arc`.
///
/// # Example
///
/// ```rust,ignore
/// let backend: Arc<dyn StateBackend> = Arc::new(MongoStateBackend::new(db));
/// let ledger = Ledger::new(backend);
/// ledger.initialize().await?;
/// ```
#[async_trait]
pub trait StateBackend: Send + Sync {
    /// Read the pointer value, or `None` when no record exists.
    async fn load_pointer(&self) -> Result<Option<String>>;

    /// Insert a new pointer record.
    async fn insert_pointer(&self, value: &str) -> Result<()>;

    /// Create or overwrite the pointer record so its value becomes `value`.
    async fn upsert_pointer(&self, value: &str) -> Result<()>;

    /// Get the backend type name for logging/debugging.
    fn backend_type(&self) -> &'static str;
}
