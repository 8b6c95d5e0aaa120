/// Table holding scheduled posts, one row per post.
pub const POSTS_TABLE: &str = "scheduled_posts";

/// Table holding follower relations (influencer_id, follower_id).
pub const FOLLOWERS_TABLE: &str = "followers";

/// Public user profiles joined into follower relations.
pub const PROFILES_TABLE: &str = "profiles";

/// Connected third-party social accounts.
pub const ACCOUNTS_TABLE: &str = "social_accounts";

/// Comments left by followers on the influencer's content.
pub const COMMENTS_TABLE: &str = "comments";

/// Blob bucket receiving media attached to scheduled posts.
pub const MEDIA_BUCKET: &str = "post-media";

/// Remote function completing a social account connection.
pub const FN_CONNECT_ACCOUNT: &str = "connect-social-account";

/// Remote function aggregating analytics for a timeframe.
pub const FN_ANALYTICS: &str = "get-analytics";

/// Default per-file upload limit (50 MiB).
pub const MAX_MEDIA_SIZE: usize = 50 * 1024 * 1024;

/// Default analytics window in days.
pub const ANALYTICS_WINDOW_DAYS: i64 = 30;
