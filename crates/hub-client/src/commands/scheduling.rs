//! Create, edit and delete scheduled posts.

use std::collections::HashSet;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::{debug, info};

use hub_shared::constants::{MEDIA_BUCKET, POSTS_TABLE};
use hub_shared::models::ScheduledPost;
use hub_shared::{CommandError, Filter, OwnerId, Platform, PostStatus};

use super::{logged, require_owner};
use crate::client::HubClient;
use crate::events::{decode_row, decode_rows};

/// A file picked for upload with a post.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaFile {
    pub name: String,
    pub data: Bytes,
}

impl MediaFile {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

/// What the user submitted. Every field may be missing until validated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleForm {
    pub platform: Option<Platform>,
    pub content: String,
    pub media: Vec<MediaFile>,
    pub scheduled_for: Option<DateTime<Utc>>,
}

/// A form that passed validation.
#[derive(Debug, Clone, Copy)]
pub struct ValidForm<'a> {
    pub platform: Platform,
    pub content: &'a str,
    pub media: &'a [MediaFile],
    pub scheduled_for: DateTime<Utc>,
}

/// Check a form without any backend access.
pub fn validate<'a>(
    form: &'a ScheduleForm,
    connected: &[Platform],
    max_media_size: usize,
) -> Result<ValidForm<'a>, CommandError> {
    let platform = form
        .platform
        .ok_or_else(|| CommandError::validation("Please select a platform"))?;

    if connected.is_empty() {
        return Err(CommandError::validation(
            "Please connect at least one social media platform first",
        ));
    }
    if !connected.contains(&platform) {
        return Err(CommandError::validation(format!("{platform} is not connected")));
    }

    if form.content.trim().is_empty() && form.media.is_empty() {
        return Err(CommandError::validation("Please add content or media to your post"));
    }

    let scheduled_for = form
        .scheduled_for
        .ok_or_else(|| CommandError::validation("Please select a date and time for your post"))?;

    let mut names = HashSet::new();
    for file in &form.media {
        let name = file.name.trim();
        if name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name.starts_with('.')
            || name.chars().any(char::is_control)
        {
            return Err(CommandError::validation(format!("Invalid file name: {:?}", file.name)));
        }
        if !names.insert(name) {
            return Err(CommandError::validation(format!("{name} was added twice")));
        }
        if file.data.is_empty() {
            return Err(CommandError::validation(format!("{name} is empty")));
        }
        if file.data.len() > max_media_size {
            return Err(CommandError::validation(format!(
                "{name} is too large ({} bytes, max {max_media_size})",
                file.data.len()
            )));
        }
    }

    Ok(ValidForm {
        platform,
        content: &form.content,
        media: &form.media,
        scheduled_for,
    })
}

/// Storage key for one file of a submission.
pub fn media_path(owner: &OwnerId, submitted_millis: i64, file_name: &str) -> String {
    format!("{owner}/{submitted_millis}-{}", file_name.trim())
}

/// Upload files one at a time, stopping at the first failure.
async fn upload_media(client: &HubClient, owner: &OwnerId, media: &[MediaFile]) -> Result<Vec<String>, CommandError> {
    let submitted = Utc::now().timestamp_millis();
    let mut urls = Vec::with_capacity(media.len());

    for file in media {
        let path = media_path(owner, submitted, &file.name);
        let url = client.blobs().upload(MEDIA_BUCKET, &path, file.data.clone()).await?;
        debug!(path = %path, size = file.data.len(), "media uploaded");
        urls.push(url);
    }
    Ok(urls)
}

fn media_column(urls: &[String]) -> Value {
    if urls.is_empty() {
        Value::Null
    } else {
        json!(urls)
    }
}

fn owned(owner: &OwnerId, post_id: &str) -> [Filter; 2] {
    [Filter::eq("id", post_id), Filter::eq("user_id", owner.as_str())]
}

/// All of the owner's posts, in no particular order.
pub async fn list_posts(client: &HubClient, owner: Option<&OwnerId>) -> Result<Vec<ScheduledPost>, CommandError> {
    let owner = require_owner(owner)?;
    let rows = client
        .tables()
        .select(POSTS_TABLE, &[Filter::eq("user_id", owner.as_str())])
        .await?;
    Ok(decode_rows(POSTS_TABLE, rows)?)
}

/// One of the owner's posts. Another owner's post is `NotFound`.
pub async fn fetch_post(client: &HubClient, owner: Option<&OwnerId>, post_id: &str) -> Result<ScheduledPost, CommandError> {
    let owner = require_owner(owner)?;
    let rows = client.tables().select(POSTS_TABLE, &owned(owner, post_id)).await?;
    let row = rows.into_iter().next().ok_or(CommandError::NotFound)?;
    Ok(decode_row(POSTS_TABLE, row)?)
}

/// Validate, upload media, then insert the post as `scheduled`.
pub async fn create_post(
    client: &HubClient,
    owner: Option<&OwnerId>,
    form: &ScheduleForm,
    connected: &[Platform],
) -> Result<ScheduledPost, CommandError> {
    logged("create_post", create(client, owner, form, connected).await)
}

async fn create(
    client: &HubClient,
    owner: Option<&OwnerId>,
    form: &ScheduleForm,
    connected: &[Platform],
) -> Result<ScheduledPost, CommandError> {
    let owner = require_owner(owner)?;
    let form = validate(form, connected, client.max_media_size())?;

    let media_urls = upload_media(client, owner, form.media).await?;

    let row = client
        .tables()
        .insert(
            POSTS_TABLE,
            json!({
                "user_id": owner.as_str(),
                "platform": form.platform,
                "content": form.content,
                "media_urls": media_column(&media_urls),
                "scheduled_for": form.scheduled_for,
                "status": PostStatus::Scheduled,
            }),
        )
        .await?;
    let post: ScheduledPost = decode_row(POSTS_TABLE, row)?;

    info!(
        post_id = %post.id,
        platform = %post.platform,
        media = post.media_urls.len(),
        scheduled_for = %post.scheduled_for,
        "post scheduled"
    );
    Ok(post)
}

/// Edit a post that is still scheduled. New media replace the old list;
/// no new media keep it.
pub async fn update_post(
    client: &HubClient,
    owner: Option<&OwnerId>,
    post_id: &str,
    form: &ScheduleForm,
    connected: &[Platform],
) -> Result<ScheduledPost, CommandError> {
    logged("update_post", update(client, owner, post_id, form, connected).await)
}

async fn update(
    client: &HubClient,
    owner: Option<&OwnerId>,
    post_id: &str,
    form: &ScheduleForm,
    connected: &[Platform],
) -> Result<ScheduledPost, CommandError> {
    let owner = require_owner(owner)?;
    let form = validate(form, connected, client.max_media_size())?;

    let existing = fetch_post(client, Some(owner), post_id).await?;
    if !existing.status.is_editable() {
        return Err(CommandError::validation(format!(
            "Only scheduled posts can be edited (this one is {})",
            existing.status
        )));
    }

    let media_urls = if form.media.is_empty() {
        existing.media_urls
    } else {
        upload_media(client, owner, form.media).await?
    };

    let rows = client
        .tables()
        .update(
            POSTS_TABLE,
            &owned(owner, post_id),
            json!({
                "platform": form.platform,
                "content": form.content,
                "media_urls": media_column(&media_urls),
                "scheduled_for": form.scheduled_for,
            }),
        )
        .await?;
    let row = rows.into_iter().next().ok_or(CommandError::NotFound)?;
    let post: ScheduledPost = decode_row(POSTS_TABLE, row)?;

    info!(post_id = %post.id, "post updated");
    Ok(post)
}

/// Delete a post that has not been published or failed yet.
/// Returns the removed row.
pub async fn delete_post(client: &HubClient, owner: Option<&OwnerId>, post_id: &str) -> Result<ScheduledPost, CommandError> {
    logged("delete_post", delete(client, owner, post_id).await)
}

async fn delete(client: &HubClient, owner: Option<&OwnerId>, post_id: &str) -> Result<ScheduledPost, CommandError> {
    let owner = require_owner(owner)?;

    let existing = fetch_post(client, Some(owner), post_id).await?;
    if existing.status.is_terminal() {
        return Err(CommandError::validation(format!(
            "A {} post can no longer be deleted",
            existing.status
        )));
    }

    let rows = client.tables().delete(POSTS_TABLE, &owned(owner, post_id)).await?;
    let row = rows.into_iter().next().ok_or(CommandError::NotFound)?;
    let post: ScheduledPost = decode_row(POSTS_TABLE, row)?;

    info!(post_id = %post.id, "post deleted");
    Ok(post)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone};

    use super::*;
    use hub_shared::Tables;
    use hub_store::LocalBackend;

    const MAX: usize = 1024;

    async fn client() -> (tempfile::TempDir, Arc<LocalBackend>, HubClient) {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(LocalBackend::open_in_memory(dir.path(), MAX).await.unwrap());
        let client = HubClient::from_backend(backend.clone()).with_max_media_size(MAX);
        (dir, backend, client)
    }

    fn when() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 11, 1, 9, 30, 0).unwrap()
    }

    fn form(content: &str) -> ScheduleForm {
        ScheduleForm {
            platform: Some(Platform::Instagram),
            content: content.into(),
            media: vec![],
            scheduled_for: Some(when()),
        }
    }

    const CONNECTED: &[Platform] = &[Platform::Instagram, Platform::Twitter];

    #[test]
    fn validation_reasons() {
        let reason = |f: &ScheduleForm, connected: &[Platform]| match validate(f, connected, MAX) {
            Err(CommandError::Validation(reason)) => reason,
            other => panic!("expected validation error, got {other:?}"),
        };

        let mut f = form("hi");
        f.platform = None;
        assert_eq!(reason(&f, CONNECTED), "Please select a platform");

        assert!(reason(&form("hi"), &[]).contains("connect at least one"));
        assert!(reason(&form("hi"), &[Platform::Youtube]).contains("instagram is not connected"));

        assert_eq!(reason(&form("  \n"), CONNECTED), "Please add content or media to your post");

        let mut f = form("hi");
        f.scheduled_for = None;
        assert!(reason(&f, CONNECTED).contains("date and time"));

        let mut f = form("");
        f.media = vec![MediaFile::new("big.png", vec![0u8; MAX + 1])];
        assert!(reason(&f, CONNECTED).contains("too large"));

        let mut f = form("");
        f.media = vec![MediaFile::new("../etc/passwd", vec![1u8])];
        assert!(reason(&f, CONNECTED).contains("Invalid file name"));

        let mut f = form("");
        f.media = vec![MediaFile::new("a.png", vec![1u8]), MediaFile::new("a.png", vec![2u8])];
        assert!(reason(&f, CONNECTED).contains("twice"));
        let mut f = form("");
        f.media = vec![MediaFile::new("blank.png", Vec::<u8>::new())];
        assert_eq!(reason(&f, CONNECTED), "blank.png is empty");

        let mut f = form("");
        f.media = vec![MediaFile::new("tab\there.png", vec![1u8])];
        assert!(reason(&f, CONNECTED).contains("Invalid file name"));
    }

    #[test]
    fn media_only_posts_are_valid() {
        let mut f = form("");
        f.media = vec![MediaFile::new("a.png", vec![1u8; MAX])];
        let valid = validate(&f, CONNECTED, MAX).unwrap();
        assert_eq!(valid.platform, Platform::Instagram);
        assert_eq!(valid.media.len(), 1);
    }

    #[test]
    fn media_paths_are_owner_prefixed() {
        let owner = OwnerId::new("u1");
        assert_eq!(media_path(&owner, 1_700_000_000_000, "cat.png"), "u1/1700000000000-cat.png");
    }

    #[tokio::test]
    async fn create_stores_scheduled_post_with_media() {
        let (dir, _backend, client) = client().await;
        let owner = OwnerId::new("u1");
        let mut f = form("launch day");
        f.media = vec![MediaFile::new("a.png", vec![1u8, 2, 3]), MediaFile::new("b.png", vec![4u8])];

        let post = create_post(&client, Some(&owner), &f, CONNECTED).await.unwrap();

        assert!(!post.id.is_empty());
        assert_eq!(post.user_id, "u1");
        assert_eq!(post.status, PostStatus::Scheduled);
        assert_eq!(post.scheduled_for, when());
        assert_eq!(post.media_urls.len(), 2);
        assert!(post.media_urls[0].contains("/post-media/u1/"));
        assert!(post.media_urls[0].ends_with("-a.png"));

        let stored = dir.path().join("post-media").join("u1");
        assert_eq!(std::fs::read_dir(stored).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn media_urls_name_the_uploaded_object() {
        let (dir, _backend, client) = client().await;
        let owner = OwnerId::new("me");
        let mut f = form("");
        f.media = vec![MediaFile::new("summer #1?.png", vec![7u8])];

        let post = create_post(&client, Some(&owner), &f, CONNECTED).await.unwrap();

        let url = reqwest::Url::parse(&post.media_urls[0]).unwrap();
        assert!(url.fragment().is_none());
        assert!(url.query().is_none());
        assert!(url.path().ends_with("-summer%20%231%3F.png"));

        let stored: Vec<_> = std::fs::read_dir(dir.path().join("post-media").join("me"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].ends_with("-summer #1?.png"));
        let millis = stored[0].trim_end_matches("-summer #1?.png");
        assert!(url.path().ends_with(&format!("/me/{millis}-summer%20%231%3F.png")));
    }

    #[tokio::test]
    async fn create_without_media_stores_null() {
        let (_dir, backend, client) = client().await;
        let owner = OwnerId::new("u1");
        let post = create_post(&client, Some(&owner), &form("text only"), CONNECTED).await.unwrap();

        let tables: &dyn Tables = backend.as_ref();
        let rows = tables.select(POSTS_TABLE, &[Filter::eq("id", post.id.as_str())]).await.unwrap();
        assert_eq!(rows[0]["media_urls"], Value::Null);
        assert!(post.media_urls.is_empty());
    }

    #[tokio::test]
    async fn commands_require_an_owner() {
        let (_dir, _backend, client) = client().await;
        assert_eq!(
            create_post(&client, None, &form("hi"), CONNECTED).await.unwrap_err(),
            CommandError::NotAuthenticated
        );
        assert_eq!(delete_post(&client, None, "p1").await.unwrap_err(), CommandError::NotAuthenticated);
    }

    #[tokio::test]
    async fn update_keeps_media_unless_replaced() {
        let (_dir, _backend, client) = client().await;
        let owner = OwnerId::new("u1");
        let mut f = form("v1");
        f.media = vec![MediaFile::new("a.png", vec![1u8])];
        let post = create_post(&client, Some(&owner), &f, CONNECTED).await.unwrap();

        let mut edit = form("v2");
        edit.scheduled_for = Some(when() + Duration::hours(1));
        let updated = update_post(&client, Some(&owner), &post.id, &edit, CONNECTED).await.unwrap();
        assert_eq!(updated.id, post.id);
        assert_eq!(updated.content, "v2");
        assert_eq!(updated.media_urls, post.media_urls);
        assert_eq!(updated.scheduled_for, when() + Duration::hours(1));

        edit.media = vec![MediaFile::new("b.png", vec![2u8])];
        let replaced = update_post(&client, Some(&owner), &post.id, &edit, CONNECTED).await.unwrap();
        assert_eq!(replaced.media_urls.len(), 1);
        assert!(replaced.media_urls[0].ends_with("-b.png"));
    }

    #[tokio::test]
    async fn only_scheduled_posts_are_editable() {
        let (_dir, backend, client) = client().await;
        let owner = OwnerId::new("u1");
        let post = create_post(&client, Some(&owner), &form("hi"), CONNECTED).await.unwrap();

        let tables: &dyn Tables = backend.as_ref();
        tables
            .update(POSTS_TABLE, &[Filter::eq("id", post.id.as_str())], json!({ "status": "published" }))
            .await
            .unwrap();

        let err = update_post(&client, Some(&owner), &post.id, &form("edit"), CONNECTED)
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Validation(_)));

        let err = delete_post(&client, Some(&owner), &post.id).await.unwrap_err();
        assert!(matches!(err, CommandError::Validation(_)));
    }

    #[tokio::test]
    async fn delete_returns_removed_row() {
        let (_dir, _backend, client) = client().await;
        let owner = OwnerId::new("u1");
        let post = create_post(&client, Some(&owner), &form("bye"), CONNECTED).await.unwrap();

        let removed = delete_post(&client, Some(&owner), &post.id).await.unwrap();
        assert_eq!(removed.id, post.id);
        assert!(list_posts(&client, Some(&owner)).await.unwrap().is_empty());

        assert_eq!(
            delete_post(&client, Some(&owner), &post.id).await.unwrap_err(),
            CommandError::NotFound
        );
    }
}
