//! Row models exchanged with the persistence service.
//!
//! Field names follow the remote column names so rows can be decoded with
//! `serde_json::from_value` directly.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::ANALYTICS_WINDOW_DAYS;
use crate::types::{FollowStatus, Platform, PostStatus, Sentiment};

/// A row with a stable, opaque identity.
pub trait Record {
    fn id(&self) -> &str;
}

// ---------------------------------------------------------------------------
// ScheduledPost
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduledPost {
    pub id: String,
    /// Owner id.
    pub user_id: String,
    pub platform: Platform,
    #[serde(default)]
    pub content: String,
    /// Stored as `null` when the post has no media.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub media_urls: Vec<String>,
    pub scheduled_for: DateTime<Utc>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    pub status: PostStatus,
    #[serde(default)]
    pub platform_post_id: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for ScheduledPost {
    fn id(&self) -> &str {
        &self.id
    }
}

// ---------------------------------------------------------------------------
// Followers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FollowerRelation {
    pub id: String,
    pub influencer_id: String,
    pub follower_id: String,
    pub status: FollowStatus,
    pub created_at: DateTime<Utc>,
    /// Snapshot of the other party, relative to the query direction.
    /// Filled in by the client after the row is fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
}

impl Record for FollowerRelation {
    fn id(&self) -> &str {
        &self.id
    }
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

/// A follower comment waiting in the influencer's inbox.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub id: String,
    /// Owner id: the influencer the comment was left for.
    pub influencer_id: String,
    pub follower_id: String,
    #[serde(default)]
    pub content: String,
    /// Missing until the comment has been classified.
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
    #[serde(default)]
    pub is_responded: bool,
    #[serde(default)]
    pub response: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Record for Comment {
    fn id(&self) -> &str {
        &self.id
    }
}

// ---------------------------------------------------------------------------
// Social accounts
// ---------------------------------------------------------------------------

/// A connected third-party account. Tokens stay server side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SocialAccount {
    pub id: String,
    pub user_id: String,
    pub platform: Platform,
    #[serde(default)]
    pub platform_account_id: String,
    pub username: String,
    #[serde(default)]
    pub profile_picture_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for SocialAccount {
    fn id(&self) -> &str {
        &self.id
    }
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalyticsTimeframe {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl AnalyticsTimeframe {
    /// The trailing window ending on `today`.
    pub fn last_days(today: NaiveDate, days: i64) -> Self {
        Self {
            start_date: today - Duration::days(days),
            end_date: today,
        }
    }
}

impl Default for AnalyticsTimeframe {
    fn default() -> Self {
        Self::last_days(Utc::now().date_naive(), ANALYTICS_WINDOW_DAYS)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalyticsOverview {
    pub total_followers: i64,
    pub followers_change: f64,
    pub total_engagement: i64,
    pub engagement_change: f64,
    pub total_reach: i64,
    pub reach_change: f64,
    pub total_posts: i64,
    pub posts_change: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricPoint {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlatformSeries {
    pub platform: Platform,
    pub data: Vec<MetricPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostPerformance {
    pub id: String,
    pub platform: Platform,
    pub content: String,
    #[serde(default)]
    pub media_url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
    pub impressions: i64,
    pub engagement_rate: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub overview: AnalyticsOverview,
    #[serde(default)]
    pub follower_growth: Vec<PlatformSeries>,
    #[serde(default)]
    pub engagement_data: Vec<PlatformSeries>,
    #[serde(default)]
    pub top_posts: Vec<PostPerformance>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
