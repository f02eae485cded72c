//! Error types for the migration library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Malformed caller arguments (empty path, empty database name, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection string rejected
    #[error("Invalid connection URI: {0}")]
    InvalidUri(String),

    /// IO error (file operations, process spawn)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Descriptor file could not be read
    #[error("Cannot read descriptor {path}: {source}")]
    DescriptorRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Descriptor content is not the expected JSON shape
    #[error("Parse error in {file}: {message}")]
    Parse { file: String, message: String },

    /// The next migration file exists but cannot be parsed
    #[error("Descriptor {file} is corrupt, schema is possibly broken")]
    CorruptDescriptor {
        file: String,
        #[source]
        source: Box<MigrateError>,
    },

    /// No progress pointer record exists yet
    #[error("Migration history is not initialized; run `init` first")]
    NotInitialized,

    /// A progress pointer record already exists
    #[error("Record already exists for migration key '{key}'")]
    AlreadyInitialized { key: String },

    /// The pointer record is present but unreadable
    #[error("State error: {0}")]
    State(String),

    /// Migration directory holds no descriptor files
    #[error("Directory {0} does not contain any migration files in JSON")]
    EmptyDirectory(PathBuf),

    /// The recorded pointer does not match any descriptor in the directory
    #[error("Recorded migration '{current}' was not found in {dir}")]
    InconsistentState { current: String, dir: PathBuf },

    /// Required provisioning field is empty
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Collection creation without a shard key
    #[error("Shard key is required to create collection '{collection}'")]
    MissingShardKey { collection: String },

    /// Dedicated throughput requested without a value
    #[error("Collection '{collection}' does not share database RU/s, so a throughput value is required")]
    ConflictingThroughput { collection: String },

    /// Autoscale maximum below the service floor
    #[error("maxThroughput must be greater than or equal to 4000, got {throughput}")]
    AutoscaleThroughputTooLow { throughput: i64 },

    /// Manual throughput below the service floor
    #[error("throughput must be greater than or equal to 400, got {throughput}")]
    ManualThroughputTooLow { throughput: i64 },

    /// Unknown provisioning action
    #[error("Invalid action '{0}'")]
    InvalidAction(String),

    /// External provisioning tool exited unsuccessfully
    #[error("Provisioning tool exited with {status}: {stderr}")]
    Provisioner { status: String, stderr: String },

    /// Command completed but the server reported failed writes
    #[error("Command reported write errors: {0}")]
    WriteErrors(String),

    /// Admin phase of a migration failed
    #[error("Administrative command failed for {version}")]
    AdministrativeCommandFailed {
        version: String,
        #[source]
        source: Box<MigrateError>,
    },

    /// General phase of a migration failed
    #[error("Command failed for {version}")]
    GeneralCommandFailed {
        version: String,
        #[source]
        source: Box<MigrateError>,
    },

    /// Migration was applied but progress could not be recorded
    #[error(
        "Migration {version} was applied but the ledger was NOT advanced; \
         the next run will apply it again unless the pointer is set manually"
    )]
    LedgerAdvanceFailed {
        version: String,
        #[source]
        source: Box<MigrateError>,
    },

    /// Database driver error
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    /// Payload is not valid MongoDB Extended JSON
    #[error("BSON error: {0}")]
    Bson(#[from] bson::extjson::de::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Run was cancelled between migrations (SIGINT, etc.)
    #[error("Migration cancelled")]
    Cancelled,
}

impl MigrateError {
    /// Create a Parse error for a descriptor file.
    pub fn parse(file: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Parse {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Wrap an admin-phase failure.
    pub fn admin_failed(version: impl Into<String>, source: MigrateError) -> Self {
        MigrateError::AdministrativeCommandFailed {
            version: version.into(),
            source: Box::new(source),
        }
    }

    /// Wrap a general-phase failure.
    pub fn general_failed(version: impl Into<String>, source: MigrateError) -> Self {
        MigrateError::GeneralCommandFailed {
            version: version.into(),
            source: Box::new(source),
        }
    }

    /// Wrap a ledger-advance failure.
    pub fn ledger_failed(version: impl Into<String>, source: MigrateError) -> Self {
        MigrateError::LedgerAdvanceFailed {
            version: version.into(),
            source: Box::new(source),
        }
    }

    /// True when the migration's effects happened but were not recorded.
    pub fn is_ledger_failure(&self) -> bool {
        matches!(self, MigrateError::LedgerAdvanceFailed { .. })
    }

    /// Process exit code for this error class.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::LedgerAdvanceFailed { .. } => 3,
            MigrateError::AdministrativeCommandFailed { .. }
            | MigrateError::GeneralCommandFailed { .. } => 4,
            MigrateError::Cancelled => 130,
            MigrateError::InvalidInput(_)
            | MigrateError::Config(_)
            | MigrateError::InvalidUri(_)
            | MigrateError::Yaml(_) => 2,
            _ => 1,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
