use chrono::{DateTime, Utc};

use hub_shared::models::{ScheduledPost, SocialAccount};
use hub_shared::{CommandError, OwnerId, Platform, PostStatus, RowChange};

use crate::client::HubClient;
use crate::commands::{accounts, scheduling};
use crate::commands::scheduling::ScheduleForm;
use crate::live::{LiveView, ScheduledPosts, SocialAccounts};
use crate::mirror::Change;

/// The owner's scheduled posts and the accounts they can be posted to.
pub struct SchedulingView {
    posts: LiveView<ScheduledPosts>,
    accounts: LiveView<SocialAccounts>,
}

enum Feed {
    Posts(RowChange),
    Accounts(RowChange),
}

impl SchedulingView {
    pub async fn open(client: HubClient, owner: Option<&OwnerId>) -> Result<Self, CommandError> {
        let posts = LiveView::open(client.clone(), owner, ScheduledPosts).await?;
        let accounts = LiveView::open(client, owner, SocialAccounts).await?;
        Ok(Self { posts, accounts })
    }

    pub fn owner(&self) -> &OwnerId {
        self.posts.owner()
    }

    pub fn posts(&self) -> &[ScheduledPost] {
        self.posts.items()
    }

    pub fn accounts(&self) -> &[SocialAccount] {
        self.accounts.items()
    }

    pub fn connected_platforms(&self) -> Vec<Platform> {
        accounts::connected_platforms(self.accounts.items())
    }

    /// All posts by schedule time, earliest first.
    pub fn by_schedule(&self) -> Vec<&ScheduledPost> {
        self.posts
            .mirror()
            .sorted_by(|post| (post.scheduled_for, post.id.clone()))
    }

    /// Scheduled posts due at or after `now`, soonest first.
    pub fn upcoming(&self, now: DateTime<Utc>, limit: usize) -> Vec<&ScheduledPost> {
        self.by_schedule()
            .into_iter()
            .filter(|post| post.status == PostStatus::Scheduled && post.scheduled_for >= now)
            .take(limit)
            .collect()
    }

    pub async fn submit(&mut self, form: &ScheduleForm) -> Result<ScheduledPost, CommandError> {
        let client = self.posts.client().clone();
        let owner = self.owner().clone();
        let post = scheduling::create_post(&client, Some(&owner), form, &self.connected_platforms()).await?;
        self.posts.apply_confirmed(Change::Inserted(post.clone())).await;
        Ok(post)
    }

    pub async fn edit(&mut self, post_id: &str, form: &ScheduleForm) -> Result<ScheduledPost, CommandError> {
        let client = self.posts.client().clone();
        let owner = self.owner().clone();
        let post =
            scheduling::update_post(&client, Some(&owner), post_id, form, &self.connected_platforms()).await?;
        self.posts.apply_confirmed(Change::Updated(post.clone())).await;
        Ok(post)
    }

    pub async fn remove(&mut self, post_id: &str) -> Result<ScheduledPost, CommandError> {
        let client = self.posts.client().clone();
        let owner = self.owner().clone();
        let post = scheduling::delete_post(&client, Some(&owner), post_id).await?;
        self.posts.apply_confirmed(Change::Deleted(post.id.clone())).await;
        Ok(post)
    }

    /// Wait for the next event on either feed and apply it.
    /// `None` once both feeds are gone.
    pub async fn next_change(&mut self) -> Option<bool> {
        let feed = tokio::select! {
            Some(raw) = self.posts.next_change() => Feed::Posts(raw),
            Some(raw) = self.accounts.next_change() => Feed::Accounts(raw),
            else => return None,
        };

        Some(match feed {
            Feed::Posts(raw) => self.posts.absorb(raw).await,
            Feed::Accounts(raw) => self.accounts.absorb(raw).await,
        })
    }

    pub async fn sync_pending(&mut self) -> usize {
        self.posts.sync_pending().await + self.accounts.sync_pending().await
    }

    pub async fn reload(&mut self) -> Result<(), CommandError> {
        self.posts.reload().await?;
        self.accounts.reload().await
    }

    pub fn close(&mut self) {
        self.posts.close();
        self.accounts.close();
    }
}
