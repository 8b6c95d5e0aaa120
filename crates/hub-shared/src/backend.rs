//! Boundary contracts of the persistence service.
//!
//! The core never talks to a concrete backend: it is handed trait objects
//! for tables, blob storage, the change feed and remote functions, so tests
//! (and the local SQLite backend) can stand in for the hosted service.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::BackendError;
use crate::types::ChangeKind;

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Exact-match predicate on one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    Eq(String, Value),
    /// Column value is one of the listed values.
    In(String, Vec<Value>),
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq(column.into(), value.into())
    }

    pub fn any_of<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::In(column.into(), values.into_iter().map(Into::into).collect())
    }

    pub fn column(&self) -> &str {
        match self {
            Self::Eq(c, _) | Self::In(c, _) => c,
        }
    }

    /// Evaluate the predicate against a JSON row.
    pub fn matches(&self, row: &Value) -> bool {
        // A missing column reads as null, the same as `json_extract`.
        let actual = row.get(self.column()).unwrap_or(&Value::Null);
        match self {
            Self::Eq(_, expected) => actual == expected,
            Self::In(_, values) => values.iter().any(|v| v == actual),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq(c, v) => write!(f, "{c}=eq.{v}"),
            Self::In(c, vs) => write!(f, "{c}=in.({})", vs.len()),
        }
    }
}

pub fn matches_all(filters: &[Filter], row: &Value) -> bool {
    filters.iter().all(|f| f.matches(row))
}

// ---------------------------------------------------------------------------
// Change feed payloads
// ---------------------------------------------------------------------------

/// One row-level change as delivered by the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowChange {
    pub table: String,
    #[serde(rename = "eventType")]
    pub kind: ChangeKind,
    #[serde(default)]
    pub old: Option<Value>,
    #[serde(default)]
    pub new: Option<Value>,
}

impl RowChange {
    pub fn inserted(table: impl Into<String>, row: Value) -> Self {
        Self {
            table: table.into(),
            kind: ChangeKind::Insert,
            old: None,
            new: Some(row),
        }
    }

    pub fn updated(table: impl Into<String>, old: Value, new: Value) -> Self {
        Self {
            table: table.into(),
            kind: ChangeKind::Update,
            old: Some(old),
            new: Some(new),
        }
    }

    pub fn deleted(table: impl Into<String>, old: Value) -> Self {
        Self {
            table: table.into(),
            kind: ChangeKind::Delete,
            old: Some(old),
            new: None,
        }
    }

    /// The row a subscription filter is evaluated against: the new image for
    /// inserts and updates, the old one for deletes.
    pub fn subject(&self) -> Option<&Value> {
        match self.kind {
            ChangeKind::Delete => self.old.as_ref(),
            _ => self.new.as_ref(),
        }
    }

    /// Whether a subscriber with `filter` should see this change. Updates
    /// match on either image, so a row moving out of a filter still reaches
    /// the listeners it is leaving.
    pub fn matches(&self, filter: &Filter) -> bool {
        match self.kind {
            ChangeKind::Update => self
                .old
                .iter()
                .chain(self.new.iter())
                .any(|row| filter.matches(row)),
            _ => self.subject().is_some_and(|row| filter.matches(row)),
        }
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

type Release = Box<dyn FnOnce() + Send>;

/// A live change-feed listener.
///
/// The listener is released when the subscription is dropped or
/// [`unsubscribe`](Self::unsubscribe)d, whichever comes first, so a view
/// that goes away on any path never leaves an orphaned listener behind.
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<RowChange>,
    release: Option<Release>,
}

impl Subscription {
    pub fn new(rx: mpsc::UnboundedReceiver<RowChange>, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            rx,
            release: Some(Box::new(release)),
        }
    }

    /// Wait for the next change. `None` once the feed has shut down.
    pub async fn recv(&mut self) -> Option<RowChange> {
        self.rx.recv().await
    }

    /// Take an already delivered change without waiting.
    pub fn try_recv(&mut self) -> Option<RowChange> {
        self.rx.try_recv().ok()
    }

    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            self.rx.close();
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl Stream for Subscription {
    type Item = RowChange;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Query and mutate rows. Rows are JSON objects keyed by column name.
#[async_trait]
pub trait Tables: Send + Sync {
    /// All rows matching every filter, in no particular order.
    async fn select(&self, table: &str, filters: &[Filter]) -> Result<Vec<Value>, BackendError>;

    /// Insert a partial record; the service assigns `id` and timestamps.
    async fn insert(&self, table: &str, record: Value) -> Result<Value, BackendError>;

    /// Merge `patch` into every matching row and return the stored rows.
    async fn update(&self, table: &str, filters: &[Filter], patch: Value) -> Result<Vec<Value>, BackendError>;

    /// Remove every matching row and return what was removed.
    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<Vec<Value>, BackendError>;
}

#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Store `data` under `bucket/path` and return its public URL.
    async fn upload(&self, bucket: &str, path: &str, data: Bytes) -> Result<String, BackendError>;
}

pub trait ChangeFeed: Send + Sync {
    fn subscribe(&self, table: &str, filter: Filter) -> Result<Subscription, BackendError>;
}

#[async_trait]
pub trait Functions: Send + Sync {
    async fn invoke(&self, name: &str, body: Value) -> Result<Value, BackendError>;
}
