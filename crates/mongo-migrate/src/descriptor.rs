//! Migration descriptor files.
//!
//! A descriptor is a JSON document with two optional members:
//!
//! ```json
//! {
//!   "adminCommand": { "shardCollection": "<db>.users", "key": { "_id": "hashed" } },
//!   "command": { "createIndexes": "users", "indexes": [ ... ] }
//! }
//! ```
//!
//! Both payloads are kept as raw JSON text until execution, since they are
//! arbitrary database commands. Every `<db>` in the file is replaced with
//! the working database name before parsing.

use std::path::{Path, PathBuf};

use bson::{Bson, Document};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::value::RawValue;

use crate::error::{MigrateError, Result};

/// Token replaced with the working database name.
pub const DB_PLACEHOLDER: &str = "<db>";

/// Uninterpreted command payload; empty when the descriptor omits it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCommand(String);

impl RawCommand {
    pub fn new(json: impl Into<String>) -> Self {
        Self(json.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode as a MongoDB command document (Extended JSON), keeping key order.
    pub fn to_document(&self) -> Result<Document> {
        let value: serde_json::Value = serde_json::from_str(&self.0)?;
        match Bson::try_from(value)? {
            Bson::Document(doc) => Ok(doc),
            other => Err(MigrateError::InvalidInput(format!(
                "command must be a document, got {:?}",
                other.element_type()
            ))),
        }
    }

    /// Decode into a typed value.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.0)?)
    }
}

/// One migration unit.
#[derive(Debug, Clone)]
pub struct Descriptor {
    /// File base name; the ordering key recorded in the ledger.
    pub version: String,
    /// Elevated-privilege payload.
    pub admin: RawCommand,
    /// Working-database payload.
    pub general: RawCommand,
    pub path: PathBuf,
}

#[derive(Deserialize)]
struct DescriptorFile {
    #[serde(rename = "adminCommand", default)]
    admin: Option<Box<RawValue>>,
    #[serde(default)]
    command: Option<Box<RawValue>>,
}

/// Last path segment of a descriptor path.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Read and parse one descriptor file for the given database.
pub fn parse_descriptor(path: &Path, database: &str) -> Result<Descriptor> {
    if path.as_os_str().is_empty() || database.is_empty() {
        return Err(MigrateError::InvalidInput(
            "descriptor path and database name are required".into(),
        ));
    }

    let raw = std::fs::read_to_string(path).map_err(|source| MigrateError::DescriptorRead {
        path: path.to_path_buf(),
        source,
    })?;

    let version = file_name(path);
    let (admin, general) = parse_payloads(&raw, database, &version)?;

    Ok(Descriptor {
        version,
        admin,
        general,
        path: path.to_path_buf(),
    })
}

/// Substitute the placeholder and extract both payloads from descriptor text.
pub fn parse_payloads(raw: &str, database: &str, file: &str) -> Result<(RawCommand, RawCommand)> {
    let text = raw.replace(DB_PLACEHOLDER, database);

    let root: Box<RawValue> =
        serde_json::from_str(&text).map_err(|e| MigrateError::parse(file, e.to_string()))?;
    // The derived visitor also accepts arrays, filling fields by position.
    if !root.get().trim_start().starts_with('{') {
        return Err(MigrateError::parse(file, "descriptor must be a JSON object"));
    }
    let parsed: DescriptorFile =
        serde_json::from_str(root.get()).map_err(|e| MigrateError::parse(file, e.to_string()))?;

    let admin = extract(parsed.admin.as_deref(), "adminCommand", file)?;
    let general = extract(parsed.command.as_deref(), "command", file)?;
    Ok((admin, general))
}

fn extract(value: Option<&RawValue>, field: &str, file: &str) -> Result<RawCommand> {
    let Some(value) = value else {
        return Ok(RawCommand::default());
    };
    let text = value.get().trim();

    match text.as_bytes().first() {
        Some(b'{') => Ok(RawCommand::new(text)),
        Some(b'n') if text == "null" => Ok(RawCommand::default()),
        // Pre-serialized command: the string itself must hold a JSON object.
        Some(b'"') => {
            let inner: String = serde_json::from_str(text)
                .map_err(|e| MigrateError::parse(file, format!("{}: {}", field, e)))?;
            if inner.trim().is_empty() {
                return Ok(RawCommand::default());
            }
            let nested: Box<RawValue> = serde_json::from_str(&inner)
                .map_err(|e| MigrateError::parse(file, format!("{}: {}", field, e)))?;
            if !nested.get().trim_start().starts_with('{') {
                return Err(MigrateError::parse(
                    file,
                    format!("{} must encode a JSON object", field),
                ));
            }
            Ok(RawCommand::new(inner))
        }
        _ => Err(MigrateError::parse(
            file,
            format!("{} must be an object or a JSON string, got {}", field, text),
        )),
    }
}
