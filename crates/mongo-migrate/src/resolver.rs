//! Next-migration resolution.
//!
//! Descriptor files are ordered by file name, so names are expected to
//! carry a zero-padded numeric prefix (`000000001_users.json`). That order
//! is the only ordering the tool knows.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::descriptor::{file_name, parse_descriptor, Descriptor};
use crate::error::{MigrateError, Result};
use crate::state::INITIAL_VERSION;

/// Descriptor file extension.
pub const DESCRIPTOR_EXTENSION: &str = "json";

/// Policy when the recorded version is missing from the directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownPointerPolicy {
    /// Report `InconsistentState`.
    #[default]
    Fail,
    /// Treat it as "nothing left to apply".
    Complete,
}

/// Finds the next unapplied descriptor.
#[derive(Debug, Clone)]
pub struct Resolver {
    database: String,
    policy: UnknownPointerPolicy,
}

impl Resolver {
    /// Resolver substituting `database` into descriptors.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            policy: UnknownPointerPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: UnknownPointerPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Descriptor files in application order.
    pub fn list(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(MigrateError::EmptyDirectory(dir.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            let is_descriptor = path
                .extension()
                .map(|ext| ext == DESCRIPTOR_EXTENSION)
                .unwrap_or(false);
            if is_descriptor && entry.file_type()?.is_file() {
                paths.push(path);
            }
        }

        if paths.is_empty() {
            return Err(MigrateError::EmptyDirectory(dir.to_path_buf()));
        }

        paths.sort_by_key(|p| file_name(p));
        Ok(paths)
    }

    /// Position after `current` in `paths`, or `None` when nothing follows.
    fn next_index(&self, dir: &Path, paths: &[PathBuf], current: &str) -> Result<Option<usize>> {
        if current == INITIAL_VERSION {
            return Ok(Some(0));
        }

        match paths.iter().position(|p| file_name(p) == current) {
            Some(idx) if idx + 1 < paths.len() => Ok(Some(idx + 1)),
            Some(_) => Ok(None),
            None => match self.policy {
                UnknownPointerPolicy::Fail => Err(MigrateError::InconsistentState {
                    current: current.to_string(),
                    dir: dir.to_path_buf(),
                }),
                UnknownPointerPolicy::Complete => {
                    warn!(
                        "Recorded migration {} is not in {}; treating as complete",
                        current,
                        dir.display()
                    );
                    Ok(None)
                }
            },
        }
    }

    /// Next descriptor after `current`, or `None` when migration is complete.
    pub fn next(&self, dir: &Path, current: &str) -> Result<Option<Descriptor>> {
        let paths = self.list(dir)?;

        let Some(idx) = self.next_index(dir, &paths, current)? else {
            return Ok(None);
        };

        let path = &paths[idx];
        debug!("Next migration after {}: {}", current, path.display());

        parse_descriptor(path, &self.database)
            .map(Some)
            .map_err(|e| MigrateError::CorruptDescriptor {
                file: file_name(path),
                source: Box::new(e),
            })
    }

    /// Versions still to apply after `current`, in order. Files are not parsed.
    pub fn pending(&self, dir: &Path, current: &str) -> Result<Vec<String>> {
        let paths = self.list(dir)?;
        let start = self.next_index(dir, &paths, current)?;

        Ok(match start {
            Some(idx) => paths[idx..].iter().map(|p| file_name(p)).collect(),
            None => Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dir_with(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            std::fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    fn abc() -> TempDir {
        // Written out of order on purpose.
        dir_with(&[
            ("C.json", r#"{"command": {"create": "c"}}"#),
            ("A.json", r#"{"adminCommand": {"ping": 1}, "command": {"create": "a"}}"#),
            ("B.json", r#"{"command": {"create": "b"}}"#),
            ("notes.txt", "ignored"),
        ])
    }

    #[test]
    fn test_ordering() {
        let dir = abc();
        let resolver = Resolver::new("demo");

        let first = resolver.next(dir.path(), INITIAL_VERSION).unwrap().unwrap();
        assert_eq!(first.version, "A.json");
        assert_eq!(first.path, dir.path().join("A.json"));
        assert!(!first.admin.is_empty());

        let second = resolver.next(dir.path(), "A.json").unwrap().unwrap();
        assert_eq!(second.version, "B.json");

        let third = resolver.next(dir.path(), "B.json").unwrap().unwrap();
        assert_eq!(third.version, "C.json");

        assert!(resolver.next(dir.path(), "C.json").unwrap().is_none());
    }

    #[test]
    fn test_list_filters_extension() {
        let dir = abc();
        std::fs::create_dir(dir.path().join("nested.json")).unwrap();
        let names: Vec<String> = Resolver::new("demo")
            .list(dir.path())
            .unwrap()
            .iter()
            .map(|p| file_name(p))
            .collect();
        assert_eq!(names, vec!["A.json", "B.json", "C.json"]);
    }

    #[test]
    fn test_empty_and_missing_directory() {
        let dir = dir_with(&[("readme.md", "")]);
        let resolver = Resolver::new("demo");
        assert!(matches!(
            resolver.next(dir.path(), INITIAL_VERSION),
            Err(MigrateError::EmptyDirectory(_))
        ));
        assert!(matches!(
            resolver.next(&dir.path().join("non-existent"), INITIAL_VERSION),
            Err(MigrateError::EmptyDirectory(_))
        ));
    }

    #[test]
    fn test_unknown_pointer_policy() {
        let dir = abc();

        let strict = Resolver::new("demo");
        assert!(matches!(
            strict.next(dir.path(), "Z.json"),
            Err(MigrateError::InconsistentState { .. })
        ));

        let lenient = Resolver::new("demo").with_policy(UnknownPointerPolicy::Complete);
        assert!(lenient.next(dir.path(), "Z.json").unwrap().is_none());
        assert!(lenient.pending(dir.path(), "Z.json").unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_next_descriptor() {
        let dir = dir_with(&[
            ("001.json", r#"{"command": {"create": "a"}}"#),
            ("002.json", r#"{"command": {"create": }"#),
        ]);
        let resolver = Resolver::new("demo");

        // The already-applied file is never re-parsed.
        let err = resolver.next(dir.path(), "001.json").unwrap_err();
        match err {
            MigrateError::CorruptDescriptor { file, source } => {
                assert_eq!(file, "002.json");
                assert!(matches!(*source, MigrateError::Parse { .. }));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_pending() {
        let dir = abc();
        let resolver = Resolver::new("demo");
        assert_eq!(
            resolver.pending(dir.path(), INITIAL_VERSION).unwrap(),
            vec!["A.json", "B.json", "C.json"]
        );
        assert_eq!(resolver.pending(dir.path(), "A.json").unwrap(), vec!["B.json", "C.json"]);
        assert!(resolver.pending(dir.path(), "C.json").unwrap().is_empty());
    }

    #[test]
    fn test_placeholder_substituted() {
        let dir = dir_with(&[("1.json", r#"{"command": {"create": "<db>_log"}}"#)]);
        let got = Resolver::new("shop")
            .next(dir.path(), INITIAL_VERSION)
            .unwrap()
            .unwrap();
        assert_eq!(got.general.to_document().unwrap().get_str("create").unwrap(), "shop_log");
    }

    #[test]
    fn test_demo_migrations() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/migrations");
        let resolver = Resolver::new("shop");

        assert_eq!(
            resolver.pending(&dir, INITIAL_VERSION).unwrap(),
            vec!["000000001_users.json", "000000002_audit.json"]
        );

        let first = resolver.next(&dir, INITIAL_VERSION).unwrap().unwrap();
        let intent: crate::provision::ProvisionIntent = first.admin.deserialize().unwrap();
        assert_eq!(intent.shard_key, "tenantId");

        let second = resolver.next(&dir, &first.version).unwrap().unwrap();
        assert!(second.admin.is_empty());
        assert!(second.general.as_str().contains("\"shop\""));
    }
}
