use chrono::{DateTime, Utc};

use hub_shared::models::FollowerRelation;
use hub_shared::{CommandError, OwnerId, RowChange};

use crate::client::HubClient;
use crate::commands::followers;
use crate::live::{Followers, Following, LiveView};
use crate::mirror::Change;
use crate::stats::FollowerStats;

/// Who follows the owner, whom the owner follows, and follower stats.
pub struct FollowersView {
    followers: LiveView<Followers>,
    following: LiveView<Following>,
    stats: FollowerStats,
}

enum Feed {
    Followers(RowChange),
    Following(RowChange),
}

impl FollowersView {
    pub async fn open(client: HubClient, owner: Option<&OwnerId>) -> Result<Self, CommandError> {
        let followers = LiveView::open(client.clone(), owner, Followers).await?;
        let following = LiveView::open(client, owner, Following).await?;
        let stats = FollowerStats::compute(followers.items(), Utc::now());
        Ok(Self {
            followers,
            following,
            stats,
        })
    }

    pub fn owner(&self) -> &OwnerId {
        self.followers.owner()
    }

    pub fn followers(&self) -> &[FollowerRelation] {
        self.followers.items()
    }

    pub fn following(&self) -> &[FollowerRelation] {
        self.following.items()
    }

    /// Stats as of the last change.
    pub fn stats(&self) -> FollowerStats {
        self.stats
    }

    /// Stats recomputed against an explicit clock.
    pub fn stats_at(&self, now: DateTime<Utc>) -> FollowerStats {
        FollowerStats::compute(self.followers.items(), now)
    }

    pub fn is_following(&self, influencer_id: &str) -> bool {
        self.following
            .items()
            .iter()
            .any(|rel| rel.influencer_id == influencer_id)
    }

    pub async fn follow(&mut self, influencer_id: &str) -> Result<FollowerRelation, CommandError> {
        let client = self.following.client().clone();
        let owner = self.owner().clone();
        let rel = followers::follow(&client, Some(&owner), influencer_id).await?;
        self.following.apply_confirmed(Change::Inserted(rel.clone())).await;
        Ok(rel)
    }

    pub async fn unfollow(&mut self, influencer_id: &str) -> Result<FollowerRelation, CommandError> {
        let client = self.following.client().clone();
        let owner = self.owner().clone();
        let rel = followers::unfollow(&client, Some(&owner), influencer_id).await?;
        self.following.apply_confirmed(Change::Deleted(rel.id.clone())).await;
        Ok(rel)
    }

    /// Wait for the next event on either feed and apply it.
    /// `None` once both feeds are gone.
    pub async fn next_change(&mut self) -> Option<bool> {
        let feed = tokio::select! {
            Some(raw) = self.followers.next_change() => Feed::Followers(raw),
            Some(raw) = self.following.next_change() => Feed::Following(raw),
            else => return None,
        };

        let changed = match feed {
            Feed::Followers(raw) => self.followers.absorb(raw).await,
            Feed::Following(raw) => self.following.absorb(raw).await,
        };
        self.refresh_stats();
        Some(changed)
    }

    pub async fn sync_pending(&mut self) -> usize {
        let changed = self.followers.sync_pending().await + self.following.sync_pending().await;
        self.refresh_stats();
        changed
    }

    pub async fn reload(&mut self) -> Result<(), CommandError> {
        self.followers.reload().await?;
        self.following.reload().await?;
        self.refresh_stats();
        Ok(())
    }

    pub fn close(&mut self) {
        self.followers.close();
        self.following.close();
    }

    fn refresh_stats(&mut self) {
        self.stats = FollowerStats::compute(self.followers.items(), Utc::now());
    }
}
