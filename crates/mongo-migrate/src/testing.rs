//! In-memory doubles for the database, ledger store and provisioning tool.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bson::{doc, Document};

use crate::error::{MigrateError, Result};
use crate::provision::Provisioner;
use crate::state::StateBackend;
use crate::target::CommandTarget;

#[derive(Default)]
pub struct MemoryStateBackend {
    records: Mutex<Vec<String>>,
    pub fail_upsert: AtomicBool,
}

impl MemoryStateBackend {
    pub fn with_value(value: &str) -> Self {
        let backend = Self::default();
        backend.records.lock().unwrap().push(value.to_string());
        backend
    }

    pub fn value(&self) -> Option<String> {
        self.records.lock().unwrap().first().cloned()
    }

    pub fn records(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait]
impl StateBackend for MemoryStateBackend {
    async fn load_pointer(&self) -> Result<Option<String>> {
        Ok(self.value())
    }

    async fn insert_pointer(&self, value: &str) -> Result<()> {
        self.records.lock().unwrap().push(value.to_string());
        Ok(())
    }

    async fn upsert_pointer(&self, value: &str) -> Result<()> {
        if self.fail_upsert.load(Ordering::SeqCst) {
            return Err(MigrateError::State("write concern timeout".into()));
        }
        let mut records = self.records.lock().unwrap();
        match records.first_mut() {
            Some(first) => *first = value.to_string(),
            None => records.push(value.to_string()),
        }
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}

pub struct RecordingTarget {
    database: String,
    pub admin: Mutex<Vec<Document>>,
    pub general: Mutex<Vec<Document>>,
    pub fail_admin: AtomicBool,
    pub fail_general: AtomicBool,
    reply: Mutex<Document>,
}

impl RecordingTarget {
    pub fn new(database: &str) -> Self {
        Self {
            database: database.to_string(),
            admin: Mutex::new(Vec::new()),
            general: Mutex::new(Vec::new()),
            fail_admin: AtomicBool::new(false),
            fail_general: AtomicBool::new(false),
            reply: Mutex::new(doc! { "ok": 1 }),
        }
    }

    /// Reply returned by both command methods.
    pub fn set_reply(&self, reply: Document) {
        *self.reply.lock().unwrap() = reply;
    }

    pub fn admin_commands(&self) -> Vec<Document> {
        self.admin.lock().unwrap().clone()
    }

    pub fn general_commands(&self) -> Vec<Document> {
        self.general.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandTarget for RecordingTarget {
    fn database_name(&self) -> &str {
        &self.database
    }

    async fn run_admin_command(&self, command: Document) -> Result<Document> {
        if self.fail_admin.load(Ordering::SeqCst) {
            return Err(MigrateError::State("not authorized on admin".into()));
        }
        self.admin.lock().unwrap().push(command);
        Ok(self.reply.lock().unwrap().clone())
    }

    async fn run_command(&self, command: Document) -> Result<Document> {
        if self.fail_general.load(Ordering::SeqCst) {
            return Err(MigrateError::State("command failed".into()));
        }
        self.general.lock().unwrap().push(command);
        Ok(self.reply.lock().unwrap().clone())
    }

    async fn list_indexes(&self, collection: &str) -> Result<Vec<Document>> {
        Ok(vec![doc! { "v": 2, "key": { "_id": 1 }, "name": "_id_", "ns": collection }])
    }
}

#[derive(Default)]
pub struct RecordingProvisioner {
    pub calls: Mutex<Vec<Vec<String>>>,
    pub fail: AtomicBool,
}

impl RecordingProvisioner {
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provisioner for RecordingProvisioner {
    async fn execute(&self, args: &[String]) -> Result<String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MigrateError::Provisioner {
                status: "exit status: 1".into(),
                stderr: "ResourceNotFound".into(),
            });
        }
        self.calls.lock().unwrap().push(args.to_vec());
        Ok("{}".to_string())
    }
}
