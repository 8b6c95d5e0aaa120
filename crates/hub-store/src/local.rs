//! [`LocalBackend`]: the persistence service, in process.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use tracing::{debug, info, warn};

use hub_shared::{BackendError, BlobStorage, ChangeFeed, Filter, Functions, RowChange, Subscription, Tables};

use crate::blobs::{self, BlobStore};
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::feed::ChangeBus;

/// A remote procedure served by the local backend.
pub type FunctionHandler = Arc<dyn Fn(Value) -> std::result::Result<Value, String> + Send + Sync>;

/// SQLite rows, filesystem blobs and an in-process change bus behind the
/// `hub-shared` boundary traits.
pub struct LocalBackend {
    db: Mutex<Database>,
    blobs: BlobStore,
    bus: ChangeBus,
    public_url: String,
    functions: RwLock<HashMap<String, FunctionHandler>>,
}

impl LocalBackend {
    pub fn new(db: Database, blobs: BlobStore, public_url: impl Into<String>) -> Self {
        Self {
            db: Mutex::new(db),
            blobs,
            bus: ChangeBus::new(),
            public_url: public_url.into(),
            functions: RwLock::new(HashMap::new()),
        }
    }

    /// Open `<data_dir>/hub.db` and `<data_dir>/storage`.
    pub async fn open(data_dir: &Path, public_url: impl Into<String>, max_blob_size: usize) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir).await?;
        let db = Database::open_at(&data_dir.join("hub.db"))?;
        let blobs = BlobStore::new(data_dir.join("storage"), max_blob_size).await?;

        info!(path = %data_dir.display(), "local backend opened");
        Ok(Self::new(db, blobs, public_url))
    }

    /// In-memory rows with blobs under `blob_dir`.
    pub async fn open_in_memory(blob_dir: &Path, max_blob_size: usize) -> Result<Self> {
        let db = Database::open_in_memory()?;
        let blobs = BlobStore::new(blob_dir.to_path_buf(), max_blob_size).await?;
        Ok(Self::new(db, blobs, "http://localhost:8000"))
    }

    /// Serve `name` through [`Functions::invoke`].
    pub fn register_function<F>(&self, name: &str, handler: F)
    where
        F: Fn(Value) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        let mut functions = self
            .functions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        functions.insert(name.to_string(), Arc::new(handler));
    }

    pub fn bus(&self) -> &ChangeBus {
        &self.bus
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    fn db(&self) -> Result<MutexGuard<'_, Database>> {
        self.db.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

#[async_trait]
impl Tables for LocalBackend {
    async fn select(&self, table: &str, filters: &[Filter]) -> std::result::Result<Vec<Value>, BackendError> {
        self.db()
            .and_then(|db| db.select_rows(table, filters))
            .map_err(|e| BackendError::Query(e.to_string()))
    }

    async fn insert(&self, table: &str, record: Value) -> std::result::Result<Value, BackendError> {
        let row = self
            .db()
            .and_then(|db| db.insert_row(table, record))
            .map_err(|e| BackendError::Mutation(e.to_string()))?;

        self.bus.publish(&RowChange::inserted(table, row.clone()));
        Ok(row)
    }

    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Value,
    ) -> std::result::Result<Vec<Value>, BackendError> {
        let changed = self
            .db()
            .and_then(|mut db| db.update_rows(table, filters, patch))
            .map_err(|e| BackendError::Mutation(e.to_string()))?;

        let mut rows = Vec::with_capacity(changed.len());
        for (old, new) in changed {
            self.bus.publish(&RowChange::updated(table, old, new.clone()));
            rows.push(new);
        }
        Ok(rows)
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> std::result::Result<Vec<Value>, BackendError> {
        let removed = self
            .db()
            .and_then(|mut db| db.delete_rows(table, filters))
            .map_err(|e| BackendError::Mutation(e.to_string()))?;

        for old in &removed {
            self.bus.publish(&RowChange::deleted(table, old.clone()));
        }
        Ok(removed)
    }
}

#[async_trait]
impl BlobStorage for LocalBackend {
    async fn upload(&self, bucket: &str, path: &str, data: Bytes) -> std::result::Result<String, BackendError> {
        let url = blobs::public_url(&self.public_url, bucket, path).map_err(|e| BackendError::Storage(e.to_string()))?;
        self.blobs
            .put(bucket, path, &data)
            .await
            .map_err(|e| BackendError::Storage(e.to_string()))?;

        Ok(url)
    }
}

impl ChangeFeed for LocalBackend {
    fn subscribe(&self, table: &str, filter: Filter) -> std::result::Result<Subscription, BackendError> {
        Ok(self.bus.subscribe(table, filter))
    }
}

#[async_trait]
impl Functions for LocalBackend {
    async fn invoke(&self, name: &str, body: Value) -> std::result::Result<Value, BackendError> {
        let handler = {
            let functions = self
                .functions
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            functions.get(name).cloned()
        };

        let Some(handler) = handler else {
            warn!(function = name, "function not deployed");
            return Err(BackendError::Function(format!("Function not found: {name}")));
        };

        debug!(function = name, "invoking local function");
        handler(body).map_err(BackendError::Function)
    }
}
