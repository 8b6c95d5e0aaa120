//! In-process change feed.
//!
//! Every mutation performed through [`LocalBackend`](crate::LocalBackend) is
//! published here and fanned out to the subscribers whose table and filter
//! match. Subscribers are removed when their [`Subscription`] is released or
//! when their receiving half has gone away.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::mpsc;
use tracing::debug;

use hub_shared::{Filter, RowChange, Subscription};

struct Subscriber {
    table: String,
    filter: Filter,
    tx: mpsc::UnboundedSender<RowChange>,
}

#[derive(Default)]
struct BusInner {
    next_id: u64,
    subscribers: HashMap<u64, Subscriber>,
}

#[derive(Clone, Default)]
pub struct ChangeBus {
    inner: Arc<Mutex<BusInner>>,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, table: &str, filter: Filter) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();

        let id = {
            let mut inner = lock(&self.inner);
            inner.next_id += 1;
            let id = inner.next_id;
            inner.subscribers.insert(
                id,
                Subscriber {
                    table: table.to_string(),
                    filter: filter.clone(),
                    tx,
                },
            );
            id
        };

        debug!(table, subscription = id, filter = %filter, "feed subscriber added");

        let weak: Weak<Mutex<BusInner>> = Arc::downgrade(&self.inner);
        Subscription::new(rx, move || {
            if let Some(inner) = weak.upgrade() {
                lock(&inner).subscribers.remove(&id);
                debug!(subscription = id, "feed subscriber released");
            }
        })
    }

    /// Deliver `change` to every matching subscriber.
    pub fn publish(&self, change: &RowChange) {
        let mut inner = lock(&self.inner);
        inner.subscribers.retain(|_, sub| {
            if sub.table != change.table || !change.matches(&sub.filter) {
                return true;
            }
            // A closed receiver means the listener is gone; drop it.
            sub.tx.send(change.clone()).is_ok()
        });
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner).subscribers.len()
    }
}

fn lock(inner: &Mutex<BusInner>) -> MutexGuard<'_, BusInner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn delivers_only_matching_changes() {
        let bus = ChangeBus::new();
        let mut mine = bus.subscribe("scheduled_posts", Filter::eq("user_id", "u1"));
        let mut theirs = bus.subscribe("scheduled_posts", Filter::eq("user_id", "u2"));

        bus.publish(&RowChange::inserted("scheduled_posts", json!({ "id": "p1", "user_id": "u1" })));
        bus.publish(&RowChange::inserted("followers", json!({ "id": "r1", "user_id": "u1" })));

        let got = mine.recv().await.unwrap();
        assert_eq!(got.new.unwrap()["id"], "p1");
        assert!(mine.try_recv().is_none());
        assert!(theirs.try_recv().is_none());
    }

    #[tokio::test]
    async fn updates_reach_the_owner_a_row_leaves() {
        let bus = ChangeBus::new();
        let mut before = bus.subscribe("scheduled_posts", Filter::eq("user_id", "u1"));
        let mut after = bus.subscribe("scheduled_posts", Filter::eq("user_id", "u2"));

        bus.publish(&RowChange::updated(
            "scheduled_posts",
            json!({ "id": "p1", "user_id": "u1" }),
            json!({ "id": "p1", "user_id": "u2" }),
        ));

        assert!(before.try_recv().is_some());
        assert!(after.try_recv().is_some());
    }

    #[tokio::test]
    async fn deletes_match_on_old_row() {
        let bus = ChangeBus::new();
        let mut sub = bus.subscribe("followers", Filter::eq("influencer_id", "a"));

        bus.publish(&RowChange::deleted("followers", json!({ "id": "r1", "influencer_id": "a" })));
        assert!(sub.try_recv().is_some());
    }

    #[test]
    fn released_subscriptions_leave_no_listener() {
        let bus = ChangeBus::new();
        let first = bus.subscribe("t", Filter::eq("user_id", "u1"));
        let second = bus.subscribe("t", Filter::eq("user_id", "u1"));
        assert_eq!(bus.subscriber_count(), 2);

        drop(first);
        assert_eq!(bus.subscriber_count(), 1);

        second.unsubscribe();
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn release_after_bus_is_gone_is_harmless() {
        let bus = ChangeBus::new();
        let sub = bus.subscribe("t", Filter::eq("user_id", "u1"));
        drop(bus);
        drop(sub);
    }
}
