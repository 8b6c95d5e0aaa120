#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use hub_client::HubClient;
use hub_shared::backend::matches_all;
use hub_shared::{BackendError, BlobStorage, ChangeFeed, Filter, Functions, RowChange, Subscription, Tables};

/// In-memory tables that log every call.
#[derive(Default)]
pub struct FakeTables {
    pub rows: Mutex<Vec<(String, Value)>>,
    pub calls: Mutex<Vec<String>>,
    next_id: AtomicUsize,
}

impl FakeTables {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn seed(&self, table: &str, row: Value) {
        self.rows.lock().unwrap().push((table.to_string(), row));
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Tables for FakeTables {
    async fn select(&self, table: &str, filters: &[Filter]) -> Result<Vec<Value>, BackendError> {
        self.log(format!("select {table}"));
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|(t, row)| t == table && matches_all(filters, row))
            .map(|(_, row)| row.clone())
            .collect())
    }

    async fn insert(&self, table: &str, mut record: Value) -> Result<Value, BackendError> {
        self.log(format!("insert {table}"));
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        record["id"] = json!(format!("row-{n}"));
        record["created_at"] = json!("2026-10-19T12:00:00Z");
        record["updated_at"] = json!("2026-10-19T12:00:00Z");
        self.rows.lock().unwrap().push((table.to_string(), record.clone()));
        Ok(record)
    }

    async fn update(&self, table: &str, filters: &[Filter], patch: Value) -> Result<Vec<Value>, BackendError> {
        self.log(format!("update {table}"));
        let mut rows = self.rows.lock().unwrap();
        let mut out = Vec::new();
        for (t, row) in rows.iter_mut() {
            if t == table && matches_all(filters, row) {
                if let (Some(row), Some(patch)) = (row.as_object_mut(), patch.as_object()) {
                    for (k, v) in patch {
                        row.insert(k.clone(), v.clone());
                    }
                }
                out.push(row.clone());
            }
        }
        Ok(out)
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<Vec<Value>, BackendError> {
        self.log(format!("delete {table}"));
        let mut rows = self.rows.lock().unwrap();
        let (removed, kept): (Vec<_>, Vec<_>) = rows
            .drain(..)
            .partition(|(t, row)| t == table && matches_all(filters, row));
        *rows = kept;
        Ok(removed.into_iter().map(|(_, row)| row).collect())
    }
}

/// Blob storage that fails on the `fail_on`-th upload (1-based).
pub struct FlakyBlobs {
    pub fail_on: Option<usize>,
    pub attempts: Mutex<Vec<String>>,
}

impl FlakyBlobs {
    pub fn new(fail_on: Option<usize>) -> Self {
        Self {
            fail_on,
            attempts: Mutex::new(Vec::new()),
        }
    }

    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlobStorage for FlakyBlobs {
    async fn upload(&self, bucket: &str, path: &str, _data: Bytes) -> Result<String, BackendError> {
        let mut attempts = self.attempts.lock().unwrap();
        attempts.push(path.to_string());
        if Some(attempts.len()) == self.fail_on {
            return Err(BackendError::Storage("quota exceeded".into()));
        }
        Ok(format!("https://cdn.test/{bucket}/{path}"))
    }
}

/// A feed the test drives by hand.
#[derive(Default)]
pub struct ManualFeed {
    senders: Mutex<Vec<(String, Filter, mpsc::UnboundedSender<RowChange>)>>,
    pub released: Arc<AtomicUsize>,
    pub log: Option<Arc<FakeTables>>,
}

impl ManualFeed {
    pub fn logging_to(tables: Arc<FakeTables>) -> Self {
        Self {
            log: Some(tables),
            ..Self::default()
        }
    }

    /// Deliver `change` to every matching subscriber.
    pub fn push(&self, change: RowChange) {
        let senders = self.senders.lock().unwrap();
        for (table, filter, tx) in senders.iter() {
            if *table == change.table && change.matches(filter) {
                let _ = tx.send(change.clone());
            }
        }
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

impl ChangeFeed for ManualFeed {
    fn subscribe(&self, table: &str, filter: Filter) -> Result<Subscription, BackendError> {
        if let Some(tables) = &self.log {
            tables.log(format!("subscribe {table}"));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.lock().unwrap().push((table.to_string(), filter, tx));
        let released = self.released.clone();
        Ok(Subscription::new(rx, move || {
            released.fetch_add(1, Ordering::SeqCst);
        }))
    }
}

pub struct NoFunctions;

#[async_trait]
impl Functions for NoFunctions {
    async fn invoke(&self, name: &str, _body: Value) -> Result<Value, BackendError> {
        Err(BackendError::Function(format!("Function not found: {name}")))
    }
}

pub struct Fakes {
    pub tables: Arc<FakeTables>,
    pub blobs: Arc<FlakyBlobs>,
    pub feed: Arc<ManualFeed>,
    pub client: HubClient,
}

pub fn fakes(fail_upload_on: Option<usize>) -> Fakes {
    let tables = Arc::new(FakeTables::default());
    let blobs = Arc::new(FlakyBlobs::new(fail_upload_on));
    let feed = Arc::new(ManualFeed::logging_to(tables.clone()));
    let client = HubClient::new(tables.clone(), blobs.clone(), feed.clone(), Arc::new(NoFunctions));
    Fakes {
        tables,
        blobs,
        feed,
        client,
    }
}
