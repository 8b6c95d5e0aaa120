//! Live views: an owner-scoped [`Mirror`] kept current by the change feed.
//!
//! A [`LiveView`] subscribes first and loads second, so nothing committed
//! between the two is missed; anything delivered twice as a result is
//! absorbed by the mirror's idempotent `apply`.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use hub_shared::constants::{ACCOUNTS_TABLE, FOLLOWERS_TABLE, POSTS_TABLE, PROFILES_TABLE};
use hub_shared::models::{FollowerRelation, Profile, ScheduledPost, SocialAccount};
use hub_shared::{BackendError, CommandError, Filter, FollowStatus, OwnerId, Record, RowChange, Subscription, Tables};

use crate::client::HubClient;
use crate::events::{decode_change, decode_rows};
use crate::mirror::{Change, Mirror};

/// An owner-scoped remote collection a [`LiveView`] can follow.
#[async_trait]
pub trait Collection: Send + Sync {
    type Item: Record + DeserializeOwned + Clone + Send + Sync;

    fn table(&self) -> &'static str;

    /// Filters for the initial load.
    fn scope(&self, owner: &OwnerId) -> Vec<Filter>;

    /// Filter for the feed subscription. Usually the owner column only, so
    /// rows leaving the scope are still delivered and can be removed.
    fn feed_filter(&self, owner: &OwnerId) -> Filter;

    /// Whether a decoded row belongs in this owner's mirror.
    fn admits(&self, item: &Self::Item, owner: &OwnerId) -> bool;

    /// Fill in joined data before rows enter the mirror.
    async fn hydrate(&self, _tables: &dyn Tables, items: Vec<Self::Item>) -> Result<Vec<Self::Item>, BackendError> {
        Ok(items)
    }
}

pub struct LiveView<C: Collection> {
    collection: C,
    client: HubClient,
    owner: OwnerId,
    mirror: Mirror<C::Item>,
    subscription: Option<Subscription>,
}

impl<C: Collection> LiveView<C> {
    /// Subscribe to the owner's rows and load the current contents.
    pub async fn open(client: HubClient, owner: Option<&OwnerId>, collection: C) -> Result<Self, CommandError> {
        let owner = owner.ok_or(CommandError::NotAuthenticated)?.clone();

        let subscription = client
            .feed()
            .subscribe(collection.table(), collection.feed_filter(&owner))?;

        let mut view = Self {
            collection,
            client,
            owner,
            mirror: Mirror::new(),
            subscription: Some(subscription),
        };
        view.reload().await?;

        debug!(
            table = view.collection.table(),
            owner = %view.owner,
            rows = view.mirror.len(),
            "live view opened"
        );
        Ok(view)
    }

    /// Replace the mirror with a fresh load.
    pub async fn reload(&mut self) -> Result<(), CommandError> {
        let table = self.collection.table();
        let rows = self
            .client
            .tables()
            .select(table, &self.collection.scope(&self.owner))
            .await?;
        let items = decode_rows::<C::Item>(table, rows)?;
        let items = self.collection.hydrate(self.client.tables(), items).await?;

        let owner = &self.owner;
        let collection = &self.collection;
        self.mirror
            .replace_all(items.into_iter().filter(|item| collection.admits(item, owner)).collect());
        Ok(())
    }

    /// Apply a change to the mirror as-is.
    pub fn apply(&mut self, change: Change<C::Item>) -> bool {
        self.mirror.apply(change)
    }

    /// Wait for the next raw feed event without applying it.
    /// `None` once the view is closed or the feed has shut down.
    pub async fn next_change(&mut self) -> Option<RowChange> {
        match self.subscription.as_mut() {
            Some(sub) => sub.recv().await,
            None => None,
        }
    }

    /// Wait for one feed event and apply it. Returns whether the mirror
    /// changed, or `None` when there is nothing left to wait for.
    pub async fn recv(&mut self) -> Option<bool> {
        let raw = self.next_change().await?;
        Some(self.absorb(raw).await)
    }

    /// Apply every event already delivered, without waiting.
    pub async fn sync_pending(&mut self) -> usize {
        let mut pending = Vec::new();
        if let Some(sub) = self.subscription.as_mut() {
            while let Some(raw) = sub.try_recv() {
                pending.push(raw);
            }
        }

        let mut changed = 0;
        for raw in pending {
            if self.absorb(raw).await {
                changed += 1;
            }
        }
        changed
    }

    /// Decode and apply one feed event. Malformed events are skipped.
    pub async fn absorb(&mut self, raw: RowChange) -> bool {
        let table = self.collection.table();
        if raw.table != table {
            return false;
        }

        let change = match decode_change::<C::Item>(raw) {
            Ok(change) => change,
            Err(e) => {
                warn!(table, error = %e, "dropping malformed feed event");
                return false;
            }
        };

        let id = change.id().to_string();
        let changed = self.reconcile(change).await;
        debug!(table, id = %id, changed, "feed event applied");
        changed
    }

    /// Apply a row a command got back from the backend, joined and scoped
    /// exactly like a feed row so the later feed echo is a no-op.
    pub async fn apply_confirmed(&mut self, change: Change<C::Item>) -> bool {
        self.reconcile(change).await
    }

    async fn reconcile(&mut self, change: Change<C::Item>) -> bool {
        let change = match change {
            Change::Inserted(item) | Change::Updated(item) if !self.collection.admits(&item, &self.owner) => {
                Change::Deleted(item.id().to_string())
            }
            Change::Inserted(item) => Change::Inserted(self.hydrate_one(item).await),
            Change::Updated(item) => Change::Updated(self.hydrate_one(item).await),
            deleted => deleted,
        };
        self.mirror.apply(change)
    }

    async fn hydrate_one(&self, item: C::Item) -> C::Item {
        match self.collection.hydrate(self.client.tables(), vec![item.clone()]).await {
            Ok(mut items) if items.len() == 1 => items.remove(0),
            Ok(_) => item,
            Err(e) => {
                warn!(table = self.collection.table(), error = %e, "failed to hydrate feed row");
                item
            }
        }
    }

    /// Release the feed listener. The mirror keeps its last contents.
    pub fn close(&mut self) {
        if let Some(sub) = self.subscription.take() {
            sub.unsubscribe();
            debug!(table = self.collection.table(), owner = %self.owner, "live view closed");
        }
    }

    pub fn is_live(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    pub fn client(&self) -> &HubClient {
        &self.client
    }

    pub fn items(&self) -> &[C::Item] {
        self.mirror.items()
    }

    pub fn mirror(&self) -> &Mirror<C::Item> {
        &self.mirror
    }
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

/// The owner's scheduled posts.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduledPosts;

#[async_trait]
impl Collection for ScheduledPosts {
    type Item = ScheduledPost;

    fn table(&self) -> &'static str {
        POSTS_TABLE
    }

    fn scope(&self, owner: &OwnerId) -> Vec<Filter> {
        vec![self.feed_filter(owner)]
    }

    fn feed_filter(&self, owner: &OwnerId) -> Filter {
        Filter::eq("user_id", owner.as_str())
    }

    fn admits(&self, item: &ScheduledPost, owner: &OwnerId) -> bool {
        item.user_id == owner.as_str()
    }
}

/// The owner's connected social accounts.
#[derive(Debug, Clone, Copy, Default)]
pub struct SocialAccounts;

#[async_trait]
impl Collection for SocialAccounts {
    type Item = SocialAccount;

    fn table(&self) -> &'static str {
        ACCOUNTS_TABLE
    }

    fn scope(&self, owner: &OwnerId) -> Vec<Filter> {
        vec![self.feed_filter(owner)]
    }

    fn feed_filter(&self, owner: &OwnerId) -> Filter {
        Filter::eq("user_id", owner.as_str())
    }

    fn admits(&self, item: &SocialAccount, owner: &OwnerId) -> bool {
        item.user_id == owner.as_str()
    }
}

/// Active relations where the owner is the one being followed.
/// Each row carries the follower's profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct Followers;

#[async_trait]
impl Collection for Followers {
    type Item = FollowerRelation;

    fn table(&self) -> &'static str {
        FOLLOWERS_TABLE
    }

    fn scope(&self, owner: &OwnerId) -> Vec<Filter> {
        vec![self.feed_filter(owner), Filter::eq("status", "active")]
    }

    fn feed_filter(&self, owner: &OwnerId) -> Filter {
        Filter::eq("influencer_id", owner.as_str())
    }

    fn admits(&self, item: &FollowerRelation, owner: &OwnerId) -> bool {
        item.influencer_id == owner.as_str() && item.status == FollowStatus::Active
    }

    async fn hydrate(
        &self,
        tables: &dyn Tables,
        items: Vec<FollowerRelation>,
    ) -> Result<Vec<FollowerRelation>, BackendError> {
        join_profiles(tables, items, follower_of).await
    }
}

/// Active relations where the owner is the follower.
/// Each row carries the followed account's profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct Following;

#[async_trait]
impl Collection for Following {
    type Item = FollowerRelation;

    fn table(&self) -> &'static str {
        FOLLOWERS_TABLE
    }

    fn scope(&self, owner: &OwnerId) -> Vec<Filter> {
        vec![self.feed_filter(owner), Filter::eq("status", "active")]
    }

    fn feed_filter(&self, owner: &OwnerId) -> Filter {
        Filter::eq("follower_id", owner.as_str())
    }

    fn admits(&self, item: &FollowerRelation, owner: &OwnerId) -> bool {
        item.follower_id == owner.as_str() && item.status == FollowStatus::Active
    }

    async fn hydrate(
        &self,
        tables: &dyn Tables,
        items: Vec<FollowerRelation>,
    ) -> Result<Vec<FollowerRelation>, BackendError> {
        join_profiles(tables, items, influencer_of).await
    }
}

fn follower_of(rel: &FollowerRelation) -> &str {
    &rel.follower_id
}

fn influencer_of(rel: &FollowerRelation) -> &str {
    &rel.influencer_id
}

/// Attach the profile of the party selected by `other` to every relation.
/// Relations whose profile is missing are kept without one.
pub(crate) async fn join_profiles(
    tables: &dyn Tables,
    mut items: Vec<FollowerRelation>,
    other: fn(&FollowerRelation) -> &str,
) -> Result<Vec<FollowerRelation>, BackendError> {
    if items.is_empty() {
        return Ok(items);
    }

    let mut ids: Vec<Value> = items.iter().map(|rel| Value::from(other(rel))).collect();
    ids.sort_by(|a, b| a.as_str().cmp(&b.as_str()));
    ids.dedup();

    let rows = tables.select(PROFILES_TABLE, &[Filter::In("id".into(), ids)]).await?;
    let profiles: HashMap<String, Profile> = decode_rows::<Profile>(PROFILES_TABLE, rows)?
        .into_iter()
        .map(|p| (p.id.clone(), p))
        .collect();

    for rel in &mut items {
        rel.profile = profiles.get(other(rel)).cloned();
    }
    Ok(items)
}
